//! Packet encoding and decoding.
//!
//! Every message is a single tag byte followed by big-endian fields:
//!
//! ```text
//! ChunkData      : 0x01 | i32 cx cy cz | u32 vcount | vcount * 6 f32 | u32 icount | icount * u32
//! PlayerMove     : 0x02 | f32 x y z yaw pitch
//! PlayerJoin     : 0x03 | u32 len | len * u8 (UTF-8)
//! PlayerLeave    : 0x04
//! SpawnPosition  : 0x05 | f32 x y z
//! RespawnRequest : 0x06
//! ```
//!
//! Decoding never returns partial state: any truncation, unknown tag or
//! impossible count yields a typed error and the caller drops the packet.

use glam::Vec3;

use crate::chunk::{ChunkCoord, ChunkMesh, Vertex};
use crate::error::{EngineError, EngineResult};

pub const TAG_CHUNK_DATA: u8 = 0x01;
pub const TAG_PLAYER_MOVE: u8 = 0x02;
pub const TAG_PLAYER_JOIN: u8 = 0x03;
pub const TAG_PLAYER_LEAVE: u8 = 0x04;
pub const TAG_SPAWN_POSITION: u8 = 0x05;
pub const TAG_RESPAWN_REQUEST: u8 = 0x06;

/// One wire message, either direction
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    ChunkData(ChunkMesh),
    PlayerMove {
        position: Vec3,
        yaw: f32,
        pitch: f32,
    },
    PlayerJoin {
        name: String,
    },
    PlayerLeave,
    SpawnPosition {
        position: Vec3,
    },
    RespawnRequest,
}

impl Packet {
    pub fn tag(&self) -> u8 {
        match self {
            Packet::ChunkData(_) => TAG_CHUNK_DATA,
            Packet::PlayerMove { .. } => TAG_PLAYER_MOVE,
            Packet::PlayerJoin { .. } => TAG_PLAYER_JOIN,
            Packet::PlayerLeave => TAG_PLAYER_LEAVE,
            Packet::SpawnPosition { .. } => TAG_SPAWN_POSITION,
            Packet::RespawnRequest => TAG_RESPAWN_REQUEST,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_tag(self.tag());
        match self {
            Packet::ChunkData(mesh) => {
                w.put_i32(mesh.coord.x);
                w.put_i32(mesh.coord.y);
                w.put_i32(mesh.coord.z);
                w.put_u32(mesh.vertices.len() as u32);
                for v in &mesh.vertices {
                    w.put_f32(v.position.x);
                    w.put_f32(v.position.y);
                    w.put_f32(v.position.z);
                    w.put_f32(v.normal.x);
                    w.put_f32(v.normal.y);
                    w.put_f32(v.normal.z);
                }
                w.put_u32(mesh.indices.len() as u32);
                for &i in &mesh.indices {
                    w.put_u32(i);
                }
            }
            Packet::PlayerMove {
                position,
                yaw,
                pitch,
            } => {
                w.put_f32(position.x);
                w.put_f32(position.y);
                w.put_f32(position.z);
                w.put_f32(*yaw);
                w.put_f32(*pitch);
            }
            Packet::PlayerJoin { name } => {
                w.put_u32(name.len() as u32);
                w.bytes.extend_from_slice(name.as_bytes());
            }
            Packet::PlayerLeave | Packet::RespawnRequest => {}
            Packet::SpawnPosition { position } => {
                w.put_f32(position.x);
                w.put_f32(position.y);
                w.put_f32(position.z);
            }
        }
        w.bytes
    }

    pub fn decode(data: &[u8]) -> EngineResult<Packet> {
        let mut r = Reader::new(data);
        let tag = r.take_u8()?;
        match tag {
            TAG_CHUNK_DATA => {
                let coord = ChunkCoord::new(r.take_i32()?, r.take_i32()?, r.take_i32()?);
                let vcount = r.take_count(6 * 4)?;
                let mut vertices = Vec::with_capacity(vcount as usize);
                for _ in 0..vcount {
                    let position =
                        Vec3::new(r.take_f32()?, r.take_f32()?, r.take_f32()?);
                    let normal = Vec3::new(r.take_f32()?, r.take_f32()?, r.take_f32()?);
                    vertices.push(Vertex { position, normal });
                }
                let icount = r.take_count(4)?;
                let mut indices = Vec::with_capacity(icount as usize);
                for _ in 0..icount {
                    indices.push(r.take_u32()?);
                }
                Ok(Packet::ChunkData(ChunkMesh {
                    coord,
                    vertices,
                    indices,
                }))
            }
            TAG_PLAYER_MOVE => {
                let position = Vec3::new(
                    r.take_finite_f32("move.x")?,
                    r.take_finite_f32("move.y")?,
                    r.take_finite_f32("move.z")?,
                );
                let yaw = r.take_finite_f32("move.yaw")?;
                let pitch = r.take_finite_f32("move.pitch")?;
                Ok(Packet::PlayerMove {
                    position,
                    yaw,
                    pitch,
                })
            }
            TAG_PLAYER_JOIN => {
                let len = r.take_count(1)?;
                let bytes = r.take_bytes(len as usize)?;
                let name = String::from_utf8_lossy(bytes).into_owned();
                Ok(Packet::PlayerJoin { name })
            }
            TAG_PLAYER_LEAVE => Ok(Packet::PlayerLeave),
            TAG_SPAWN_POSITION => {
                let position = Vec3::new(
                    r.take_finite_f32("spawn.x")?,
                    r.take_finite_f32("spawn.y")?,
                    r.take_finite_f32("spawn.z")?,
                );
                Ok(Packet::SpawnPosition { position })
            }
            TAG_RESPAWN_REQUEST => Ok(Packet::RespawnRequest),
            tag => Err(EngineError::UnknownTag { tag }),
        }
    }
}

struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn with_tag(tag: u8) -> Self {
        Self { bytes: vec![tag] }
    }

    fn put_u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }

    fn put_i32(&mut self, v: i32) {
        self.put_u32(v as u32);
    }

    fn put_f32(&mut self, v: f32) {
        self.put_u32(v.to_bits());
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take_bytes(&mut self, n: usize) -> EngineResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(EngineError::PacketTruncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> EngineResult<u8> {
        Ok(self.take_bytes(1)?[0])
    }

    fn take_u32(&mut self) -> EngineResult<u32> {
        let b = self.take_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_i32(&mut self) -> EngineResult<i32> {
        Ok(self.take_u32()? as i32)
    }

    fn take_f32(&mut self) -> EngineResult<f32> {
        Ok(f32::from_bits(self.take_u32()?))
    }

    fn take_finite_f32(&mut self, field: &'static str) -> EngineResult<f32> {
        let v = self.take_f32()?;
        if !v.is_finite() {
            return Err(EngineError::NonFiniteFloat { field });
        }
        Ok(v)
    }

    /// Read an element count and verify the claimed payload fits in the
    /// buffer before anything is allocated.
    fn take_count(&mut self, element_size: usize) -> EngineResult<u32> {
        let count = self.take_u32()?;
        let needed = (count as usize).checked_mul(element_size);
        match needed {
            Some(n) if n <= self.remaining() => Ok(count),
            _ => Err(EngineError::CountOverflow {
                count,
                remaining: self.remaining(),
            }),
        }
    }
}
