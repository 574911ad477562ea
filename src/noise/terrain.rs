//! World-space terrain sampling: surface height and padded volume fields.

use crate::chunk::{ChunkCoord, ScalarField};
use crate::constants::terrain::*;
use crate::constants::world::{CHUNK_SIZE, PADDED};

use super::ValueNoise;

/// Deterministic scalar-field generator for the whole world.
///
/// Two decorrelated fBm sources shape the surface and two more carve caves;
/// the generator is freely shared across worker threads.
pub struct TerrainGenerator {
    base: ValueNoise,
    detail: ValueNoise,
    cave_a: ValueNoise,
    cave_b: ValueNoise,
}

impl TerrainGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            base: ValueNoise::new(seed),
            detail: ValueNoise::new(seed.wrapping_add(0x517c_c1b7_2722_0a95)),
            cave_a: ValueNoise::new(seed.wrapping_add(0x2545_f491_4f6c_dd1d)),
            cave_b: ValueNoise::new(seed.wrapping_add(0x9e6c_63d0_876a_68de)),
        }
    }

    /// Continuous world-space surface height at an XZ column
    pub fn surface_height(&self, wx: f32, wz: f32) -> f32 {
        let base = self.base.fbm2(wx * BASE_FREQ, wz * BASE_FREQ, BASE_OCTAVES);
        let detail = self
            .detail
            .fbm2(wx * DETAIL_FREQ, wz * DETAIL_FREQ, DETAIL_OCTAVES);
        SEA_LEVEL + (base + detail * 0.25) * AMPLITUDE
    }

    /// Carve term for a point known to be below `surface - CAVE_DEPTH`.
    ///
    /// The absolute product of two decorrelated fBms gives ridged tubes
    /// rather than open blobs; the clamp bounds how hard a cave can cut.
    fn cave_term(&self, wx: f32, wy: f32, wz: f32) -> f32 {
        let a = self
            .cave_a
            .fbm3(wx * CAVE_FREQ, wy * CAVE_FREQ, wz * CAVE_FREQ, CAVE_OCTAVES)
            * 2.0
            - 1.0;
        let b = self
            .cave_b
            .fbm3(wx * CAVE_FREQ, wy * CAVE_FREQ, wz * CAVE_FREQ, CAVE_OCTAVES)
            * 2.0
            - 1.0;
        -((a * b).abs() * CAVE_STRENGTH).clamp(0.0, CAVE_CLAMP)
    }

    /// Fill the padded scalar field for one chunk.
    ///
    /// The stored value is `-density` so negative means inside the surface,
    /// which is the convention the mesher and collider expect.
    pub fn generate(&self, coord: ChunkCoord) -> ScalarField {
        let mut field = ScalarField::new(coord);
        let origin_x = coord.x * CHUNK_SIZE;
        let origin_y = coord.y * CHUNK_SIZE;
        let origin_z = coord.z * CHUNK_SIZE;

        for x in 0..PADDED {
            let wx = (origin_x + x as i32) as f32;
            for z in 0..PADDED {
                let wz = (origin_z + z as i32) as f32;
                let surface = self.surface_height(wx, wz);
                for y in 0..PADDED {
                    let wy = (origin_y + y as i32) as f32;
                    // Clamp the column term first so caves can still flip the
                    // sign at depth.
                    let mut density = (surface - wy).clamp(-DENSITY_CLAMP, DENSITY_CLAMP);
                    if wy < surface - CAVE_DEPTH {
                        density += self.cave_term(wx, wy, wz);
                    }
                    density = density.clamp(-DENSITY_CLAMP, DENSITY_CLAMP);
                    field.set(x, y, z, -density);
                }
            }
        }
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_is_bitwise_deterministic() {
        let gen_a = TerrainGenerator::new(42);
        let gen_b = TerrainGenerator::new(42);
        let coord = ChunkCoord::new(1, 0, -2);
        let a = gen_a.generate(coord);
        let b = gen_b.generate(coord);
        for (va, vb) in a.values().iter().zip(b.values()) {
            assert_eq!(va.to_bits(), vb.to_bits());
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = TerrainGenerator::new(1).generate(ChunkCoord::new(0, 0, 0));
        let b = TerrainGenerator::new(2).generate(ChunkCoord::new(0, 0, 0));
        let identical = a
            .values()
            .iter()
            .zip(b.values())
            .filter(|(x, y)| x.to_bits() == y.to_bits())
            .count();
        assert!(identical < a.values().len() / 2);
    }

    #[test]
    fn shared_face_samples_match_between_neighbors() {
        // The padded high face of chunk (0,0,0) covers the same world lattice
        // as the low face of chunk (1,0,0).
        let generator = TerrainGenerator::new(42);
        let a = generator.generate(ChunkCoord::new(0, 0, 0));
        let b = generator.generate(ChunkCoord::new(1, 0, 0));
        for y in 0..PADDED {
            for z in 0..PADDED {
                assert_eq!(
                    a.get(CHUNK_SIZE as usize, y, z).to_bits(),
                    b.get(0, y, z).to_bits(),
                    "face mismatch at y={y} z={z}"
                );
            }
        }
    }

    #[test]
    fn deep_ground_is_inside_sky_is_outside() {
        let generator = TerrainGenerator::new(7);
        // Far above the maximum possible surface.
        let sky = generator.generate(ChunkCoord::new(0, 4, 0));
        assert!(sky.values().iter().all(|v| *v > 0.0));
        // Field values are clamped to the conditioning range.
        let ground = generator.generate(ChunkCoord::new(0, -4, 0));
        for v in ground.values() {
            assert!(v.abs() <= DENSITY_CLAMP + f32::EPSILON);
        }
    }

    #[test]
    fn surface_sits_near_sea_level_band() {
        let generator = TerrainGenerator::new(42);
        for i in 0..32 {
            let h = generator.surface_height(i as f32 * 13.0, i as f32 * -7.0);
            assert!(h >= SEA_LEVEL && h <= SEA_LEVEL + AMPLITUDE * 1.25);
        }
    }
}
