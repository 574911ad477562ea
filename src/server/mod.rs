//! Server side of the chunk pipeline: cached generation, per-client
//! streaming and the transport loop.

mod cache;
mod server;
mod streamer;

pub use cache::ChunkCache;
pub use server::{Server, ServerConfig};
pub use streamer::{ChunkStreamer, ReadyChunk};
