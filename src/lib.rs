//! Shared simulation and streaming core of a networked voxel-terrain
//! action game.
//!
//! The server generates, caches and streams an infinite isosurface world;
//! the client turns the streamed fields into renderable meshes and a
//! collidable triangle soup, and runs a deterministic player/combat
//! simulation on top of an entity-component store.

pub mod chunk;
pub mod client;
pub mod combat;
pub mod constants;
pub mod ecs;
pub mod error;
pub mod mesh;
pub mod network;
pub mod noise;
pub mod physics;
pub mod player;
pub mod server;
pub mod time;
pub mod worker;

pub use chunk::{ChunkCoord, ChunkMesh, ScalarField, Vertex};
pub use error::{EngineError, EngineResult};
