//! Sparse chunk-keyed triangle soup used for terrain collision.
//!
//! Owned by the client simulation thread: inserts come from the chunk
//! intake, erases from the unload policy. Every three entries in a chunk's
//! list form one world-space triangle.

use std::collections::HashMap;

use glam::Vec3;

use crate::chunk::{ChunkCoord, ChunkMesh};

pub struct TriSoup {
    chunks: HashMap<ChunkCoord, Vec<Vec3>>,
}

impl TriSoup {
    pub fn new() -> Self {
        Self {
            chunks: HashMap::new(),
        }
    }

    /// Expand an indexed chunk mesh into world-space triangles.
    ///
    /// Empty meshes still claim their slot so the spawn gate can tell "chunk
    /// arrived, nothing solid here" apart from "chunk not streamed yet".
    pub fn insert_mesh(&mut self, mesh: &ChunkMesh) {
        let offset = mesh.coord.world_offset();
        let mut triangles = Vec::with_capacity(mesh.indices.len());
        for tri in mesh.indices.chunks_exact(3) {
            triangles.push(mesh.vertices[tri[0] as usize].position + offset);
            triangles.push(mesh.vertices[tri[1] as usize].position + offset);
            triangles.push(mesh.vertices[tri[2] as usize].position + offset);
        }
        self.chunks.insert(mesh.coord, triangles);
    }

    pub fn remove(&mut self, coord: ChunkCoord) {
        self.chunks.remove(&coord);
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn triangles(&self, coord: ChunkCoord) -> Option<&[Vec3]> {
        self.chunks.get(&coord).map(|v| v.as_slice())
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Unload policy: drop chunks strictly outside the working-set radius
    /// plus one on any axis.
    pub fn retain_near(&mut self, center: ChunkCoord, radius_xz: i32, radius_y: i32) {
        self.chunks.retain(|cc, _| {
            (cc.x - center.x).abs() <= radius_xz + 1
                && (cc.y - center.y).abs() <= radius_y + 1
                && (cc.z - center.z).abs() <= radius_xz + 1
        });
    }
}

impl Default for TriSoup {
    fn default() -> Self {
        Self::new()
    }
}
