//! Wire protocol and transport.
//!
//! The codec is a fixed big-endian tag + payload format (see [`packet`]);
//! transport is non-blocking TCP with a 4-byte length prefix per frame,
//! which gives the reliable ordered stream the chunk pipeline needs.

mod connection;
mod packet;

pub use connection::{Connection, ConnectionManager, FrameSink, PeerId};
pub use packet::{Packet, TAG_CHUNK_DATA};
