//! Client side: chunk intake off the main thread, input shaping and the
//! per-tick simulation loop.

mod client;
mod input;
mod intake;

pub use client::{Client, ClientConfig, MeshSink, NullSink};
pub use input::InputState;
pub use intake::ChunkIntake;
