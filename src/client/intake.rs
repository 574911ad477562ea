//! Chunk intake: wire bytes to meshes without stalling the main thread.
//!
//! The transport hands over raw packet bytes (copied, so its buffer can be
//! released immediately); a worker decodes them; the main thread drains a
//! bounded number of finished meshes per tick. A worker that hits a decode
//! error pushes the typed failure into the same queue instead of unwinding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;

use crate::chunk::ChunkMesh;
use crate::error::{EngineError, EngineResult};
use crate::network::Packet;
use crate::worker::WorkerPool;

pub struct ChunkIntake {
    pool: WorkerPool,
    ready: Arc<Mutex<Vec<EngineResult<ChunkMesh>>>>,
    in_flight: Arc<AtomicUsize>,
}

impl ChunkIntake {
    /// `threads == 0` auto-sizes the decode pool
    pub fn new(threads: usize) -> Self {
        Self {
            pool: WorkerPool::new(threads),
            ready: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Copy packet bytes and schedule the decode. Non-blocking.
    pub fn submit(&self, bytes: &[u8]) {
        let data = bytes.to_vec();
        let ready = Arc::clone(&self.ready);
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::SeqCst);
        self.pool.submit(move || {
            let result = match Packet::decode(&data) {
                Ok(Packet::ChunkData(mesh)) => Ok(mesh),
                Ok(_) => Err(EngineError::UnexpectedPacket { kind: "non-chunk" }),
                Err(e) => Err(e),
            };
            ready.lock().push(result);
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Pop up to `max` finished meshes. Decode failures are logged and
    /// dropped here, invisible to the caller.
    pub fn drain(&self, max: usize) -> Vec<ChunkMesh> {
        let mut queue = self.ready.lock();
        let take = queue.len().min(max);
        let drained: Vec<_> = queue.drain(..take).collect();
        drop(queue);

        let mut meshes = Vec::with_capacity(drained.len());
        for result in drained {
            match result {
                Ok(mesh) => meshes.push(mesh),
                Err(e) => warn!("dropping bad chunk packet: {e}"),
            }
        }
        meshes
    }

    /// Decodes still in flight plus finished ones not yet drained, for
    /// loading HUDs
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst) + self.ready.lock().len()
    }
}
