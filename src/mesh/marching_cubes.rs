//! Marching-cubes surface extraction.
//!
//! Walks every cell of a padded scalar field, classifies the eight corner
//! signs and emits the table-driven triangles with vertices interpolated to
//! the zero level. Vertices are deduplicated per chunk by the lattice edge
//! they sit on, which keeps the mesh watertight and makes boundary vertices
//! identical to the ones a neighboring chunk produces independently.

use std::collections::HashMap;

use glam::Vec3;

use crate::chunk::{ChunkCoord, ChunkMesh, ScalarField, Vertex};
use crate::constants::world::CHUNK_SIZE;

use super::tables::{EDGE_TABLE, TRI_TABLE};

/// Corner layout of a cell (matches the lookup tables; triangles come out
/// counter-clockwise seen from outside the surface)
const CORNER_OFFSETS: [[i32; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 0, 1],
    [0, 0, 1],
    [0, 1, 0],
    [1, 1, 0],
    [1, 1, 1],
    [0, 1, 1],
];

/// The two corners each of the 12 cell edges connects
const EDGE_ENDPOINTS: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

const ISO_EPSILON: f32 = 1e-5;
const AREA_EPSILON_SQ: f32 = 1e-12;

/// Extract the triangle mesh for one chunk, in chunk-local space.
pub fn extract_mesh(field: &ScalarField) -> ChunkMesh {
    Extractor::new(field.coord).run(field)
}

struct Extractor {
    mesh: ChunkMesh,
    /// Lattice edge (canonically ordered endpoints) -> vertex index
    edge_vertices: HashMap<([i32; 3], [i32; 3]), u32>,
    /// Accumulated (unnormalized) face normals per vertex
    normals: Vec<Vec3>,
}

impl Extractor {
    fn new(coord: ChunkCoord) -> Self {
        Self {
            mesh: ChunkMesh::empty(coord),
            edge_vertices: HashMap::new(),
            normals: Vec::new(),
        }
    }

    fn run(mut self, field: &ScalarField) -> ChunkMesh {
        let size = CHUNK_SIZE as usize;
        for cz in 0..size {
            for cy in 0..size {
                for cx in 0..size {
                    self.march_cell(field, cx as i32, cy as i32, cz as i32);
                }
            }
        }
        self.finish()
    }

    fn march_cell(&mut self, field: &ScalarField, cx: i32, cy: i32, cz: i32) {
        let mut values = [0.0f32; 8];
        let mut cube_index = 0usize;
        for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
            let v = field.get(
                (cx + offset[0]) as usize,
                (cy + offset[1]) as usize,
                (cz + offset[2]) as usize,
            );
            values[i] = v;
            if v < 0.0 {
                cube_index |= 1 << i;
            }
        }

        if EDGE_TABLE[cube_index] == 0 {
            return;
        }

        let mut edge_index = [u32::MAX; 12];
        for (edge, endpoints) in EDGE_ENDPOINTS.iter().enumerate() {
            if EDGE_TABLE[cube_index] & (1 << edge) == 0 {
                continue;
            }
            edge_index[edge] =
                self.edge_vertex(cx, cy, cz, endpoints[0], endpoints[1], &values);
        }

        let triangles = &TRI_TABLE[cube_index];
        let mut t = 0;
        while t < 16 && triangles[t] >= 0 {
            let i0 = edge_index[triangles[t] as usize];
            let i1 = edge_index[triangles[t + 1] as usize];
            let i2 = edge_index[triangles[t + 2] as usize];
            t += 3;
            self.push_triangle(i0, i1, i2);
        }
    }

    /// Vertex on the cell edge between corners `a` and `b`, interpolated to
    /// the zero crossing. Endpoints are ordered canonically so every cell
    /// touching this lattice edge computes the same bits.
    fn edge_vertex(
        &mut self,
        cx: i32,
        cy: i32,
        cz: i32,
        a: usize,
        b: usize,
        values: &[f32; 8],
    ) -> u32 {
        let pa = [
            cx + CORNER_OFFSETS[a][0],
            cy + CORNER_OFFSETS[a][1],
            cz + CORNER_OFFSETS[a][2],
        ];
        let pb = [
            cx + CORNER_OFFSETS[b][0],
            cy + CORNER_OFFSETS[b][1],
            cz + CORNER_OFFSETS[b][2],
        ];
        let (lo, hi, va, vb) = if pa <= pb {
            (pa, pb, values[a], values[b])
        } else {
            (pb, pa, values[b], values[a])
        };

        if let Some(&index) = self.edge_vertices.get(&(lo, hi)) {
            return index;
        }

        let p0 = Vec3::new(lo[0] as f32, lo[1] as f32, lo[2] as f32);
        let p1 = Vec3::new(hi[0] as f32, hi[1] as f32, hi[2] as f32);
        let position = if va.abs() < ISO_EPSILON {
            p0
        } else if vb.abs() < ISO_EPSILON {
            p1
        } else if (va - vb).abs() < ISO_EPSILON {
            p0
        } else {
            let t = (0.0 - va) / (vb - va);
            p0 + (p1 - p0) * t
        };

        let index = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(Vertex {
            position,
            normal: Vec3::ZERO,
        });
        self.normals.push(Vec3::ZERO);
        self.edge_vertices.insert((lo, hi), index);
        index
    }

    fn push_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        if i0 == i1 || i1 == i2 || i0 == i2 {
            return;
        }
        let a = self.mesh.vertices[i0 as usize].position;
        let b = self.mesh.vertices[i1 as usize].position;
        let c = self.mesh.vertices[i2 as usize].position;
        let face = (b - a).cross(c - a);
        if face.length_squared() < AREA_EPSILON_SQ {
            return;
        }
        self.mesh.indices.extend_from_slice(&[i0, i1, i2]);
        self.normals[i0 as usize] += face;
        self.normals[i1 as usize] += face;
        self.normals[i2 as usize] += face;
    }

    fn finish(mut self) -> ChunkMesh {
        for (vertex, accum) in self.mesh.vertices.iter_mut().zip(&self.normals) {
            vertex.normal = if accum.length_squared() > f32::EPSILON {
                accum.normalize()
            } else {
                Vec3::Y
            };
        }
        self.mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::world::PADDED;

    /// Field filled from an explicit density function (negative = inside)
    fn field_from(coord: ChunkCoord, f: impl Fn(f32, f32, f32) -> f32) -> ScalarField {
        let mut field = ScalarField::new(coord);
        for x in 0..PADDED {
            for y in 0..PADDED {
                for z in 0..PADDED {
                    field.set(x, y, z, f(x as f32, y as f32, z as f32));
                }
            }
        }
        field
    }

    #[test]
    fn uniform_fields_produce_no_mesh() {
        let empty = field_from(ChunkCoord::new(0, 0, 0), |_, _, _| 1.0);
        assert!(extract_mesh(&empty).is_empty());
        let solid = field_from(ChunkCoord::new(0, 0, 0), |_, _, _| -1.0);
        assert!(extract_mesh(&solid).is_empty());
    }

    #[test]
    fn flat_floor_meshes_at_plane_height() {
        // Inside below y = 10.5
        let field = field_from(ChunkCoord::new(0, 0, 0), |_, y, _| y - 10.5);
        let mesh = extract_mesh(&field);
        assert!(!mesh.is_empty());
        for v in &mesh.vertices {
            assert!((v.position.y - 10.5).abs() < 1e-4);
            assert!(v.normal.y > 0.9, "floor normal should point up");
        }
    }

    #[test]
    fn sphere_mesh_is_watertight_and_normalized() {
        let center = Vec3::splat(16.0);
        let field = field_from(ChunkCoord::new(0, 0, 0), |x, y, z| {
            (Vec3::new(x, y, z) - center).length() - 8.0
        });
        let mesh = extract_mesh(&field);
        assert!(!mesh.is_empty());
        assert_eq!(mesh.indices.len() % 3, 0);
        for v in &mesh.vertices {
            assert!((v.normal.length() - 1.0).abs() < 1e-4);
            let r = (v.position - center).length();
            assert!((r - 8.0).abs() < 0.6, "vertex off the isosurface: r={r}");
        }
        // Watertight: every interior edge is shared by exactly two triangles.
        let mut edge_use: HashMap<(u32, u32), u32> = HashMap::new();
        for tri in mesh.indices.chunks(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let key = (a.min(b), a.max(b));
                *edge_use.entry(key).or_insert(0) += 1;
            }
        }
        assert!(edge_use.values().all(|&n| n == 2));
    }

    #[test]
    fn identical_fields_extract_identical_meshes() {
        let field_a = field_from(ChunkCoord::new(0, 0, 0), |x, y, z| {
            (Vec3::new(x, y, z) - Vec3::splat(12.0)).length() - 6.0
        });
        let field_b = field_from(ChunkCoord::new(0, 0, 0), |x, y, z| {
            (Vec3::new(x, y, z) - Vec3::splat(12.0)).length() - 6.0
        });
        assert_eq!(extract_mesh(&field_a), extract_mesh(&field_b));
    }

    #[test]
    fn sphere_triangles_wind_outward() {
        let center = Vec3::splat(16.0);
        let field = field_from(ChunkCoord::new(0, 0, 0), |x, y, z| {
            (Vec3::new(x, y, z) - center).length() - 8.0
        });
        let mesh = extract_mesh(&field);
        let mut outward = 0usize;
        let mut total = 0usize;
        for tri in mesh.indices.chunks(3) {
            let a = mesh.vertices[tri[0] as usize].position;
            let b = mesh.vertices[tri[1] as usize].position;
            let c = mesh.vertices[tri[2] as usize].position;
            let face = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            total += 1;
            if face.dot(centroid - center) > 0.0 {
                outward += 1;
            }
        }
        assert_eq!(outward, total, "all sphere faces should wind outward");
    }
}
