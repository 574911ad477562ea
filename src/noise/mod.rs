//! Deterministic terrain noise.
//!
//! Everything here is a pure function of the world seed and integer lattice
//! coordinates: for a fixed seed, the generated fields are bitwise identical
//! across runs and across peers. That property is what lets the server cache
//! serialized chunks and lets clients trust locally derived spawn chunks.

mod value;
mod terrain;

pub use terrain::TerrainGenerator;
pub use value::ValueNoise;
