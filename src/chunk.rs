//! Chunk-level data shared by both peers: coordinates, scalar fields and
//! extracted meshes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::world::{CHUNK_SIZE, CHUNK_SIZE_F32, PADDED};

/// Position of a chunk in the world (chunk coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The unique chunk containing a world position
    pub fn from_world_pos(pos: Vec3) -> Self {
        Self {
            x: (pos.x / CHUNK_SIZE_F32).floor() as i32,
            y: (pos.y / CHUNK_SIZE_F32).floor() as i32,
            z: (pos.z / CHUNK_SIZE_F32).floor() as i32,
        }
    }

    /// World-space position of this chunk's low corner
    pub fn world_offset(&self) -> Vec3 {
        Vec3::new(
            (self.x * CHUNK_SIZE) as f32,
            (self.y * CHUNK_SIZE) as f32,
            (self.z * CHUNK_SIZE) as f32,
        )
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// A single mesh vertex in chunk-local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Triangle mesh extracted from one chunk's scalar field.
///
/// Positions are in `[0, CHUNK_SIZE]` local space; world-space use requires
/// adding `coord * CHUNK_SIZE`. Triangles wind counter-clockwise seen from
/// outside the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMesh {
    pub coord: ChunkCoord,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn empty(coord: ChunkCoord) -> Self {
        Self {
            coord,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Padded scalar field for one chunk: `PADDED^3` samples, one past the high
/// edge on each axis so neighboring chunks mesh without seams.
///
/// Sign convention: negative = inside the surface.
pub struct ScalarField {
    pub coord: ChunkCoord,
    values: Vec<f32>,
}

impl ScalarField {
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            values: vec![0.0; PADDED * PADDED * PADDED],
        }
    }

    #[inline]
    fn index(x: usize, y: usize, z: usize) -> usize {
        (z * PADDED + y) * PADDED + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[Self::index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        self.values[Self::index(x, y, z)] = value;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
