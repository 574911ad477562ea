//! Per-client chunk streaming.
//!
//! Each client owns a working set around its chunk: `sent` coords have been
//! handed to the transport, `pending` coords are in flight on the worker
//! pool. The two sets never intersect. Workers finish into a ready queue;
//! only the transport thread drains it and only the transport thread sends.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::Vec3;
use log::{debug, trace};
use parking_lot::Mutex;

use crate::chunk::ChunkCoord;
use crate::mesh::extract_mesh;
use crate::network::{FrameSink, Packet, PeerId};
use crate::noise::TerrainGenerator;
use crate::worker::WorkerPool;

use super::ChunkCache;

/// A serialized chunk waiting for the transport thread
pub struct ReadyChunk {
    pub peer: PeerId,
    pub coord: ChunkCoord,
    pub bytes: Arc<Vec<u8>>,
}

struct ClientState {
    last_chunk: Option<ChunkCoord>,
    sent: HashSet<ChunkCoord>,
    pending: HashSet<ChunkCoord>,
}

impl ClientState {
    fn new() -> Self {
        Self {
            last_chunk: None,
            sent: HashSet::new(),
            pending: HashSet::new(),
        }
    }
}

pub struct ChunkStreamer {
    clients: HashMap<PeerId, ClientState>,
    cache: Arc<ChunkCache>,
    generator: Arc<TerrainGenerator>,
    pool: WorkerPool,
    ready: Arc<Mutex<Vec<ReadyChunk>>>,
    radius_xz: i32,
    radius_y: i32,
}

impl ChunkStreamer {
    pub fn new(
        generator: Arc<TerrainGenerator>,
        cache: Arc<ChunkCache>,
        pool: WorkerPool,
        radius_xz: i32,
        radius_y: i32,
    ) -> Self {
        Self {
            clients: HashMap::new(),
            cache,
            generator,
            pool,
            ready: Arc::new(Mutex::new(Vec::new())),
            radius_xz,
            radius_y,
        }
    }

    pub fn add_client(&mut self, peer: PeerId) {
        self.clients.insert(peer, ClientState::new());
    }

    pub fn remove_client(&mut self, peer: PeerId) {
        self.clients.remove(&peer);
    }

    /// Forget what a client has; pending completions will simply re-enter
    /// `sent` on delivery. Used on respawn.
    pub fn reset_client(&mut self, peer: PeerId) {
        if let Some(state) = self.clients.get_mut(&peer) {
            state.sent.clear();
            state.pending.clear();
            state.last_chunk = None;
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Coords promised to a peer but not yet delivered
    pub fn pending_for(&self, peer: PeerId) -> usize {
        self.clients.get(&peer).map(|c| c.pending.len()).unwrap_or(0)
    }

    pub fn sent_for(&self, peer: PeerId) -> usize {
        self.clients.get(&peer).map(|c| c.sent.len()).unwrap_or(0)
    }

    /// React to a position update: when the client crossed into a new
    /// chunk, schedule every not-yet-owned coord of its working set.
    pub fn update_client(&mut self, peer: PeerId, pos: Vec3) {
        let center = ChunkCoord::from_world_pos(pos);
        let Some(state) = self.clients.get_mut(&peer) else {
            return;
        };
        if state.last_chunk == Some(center) {
            return;
        }
        state.last_chunk = Some(center);

        let (rxz, ry) = (self.radius_xz, self.radius_y);
        let mut wanted = Vec::new();
        for dx in -rxz..=rxz {
            for dy in -ry..=ry {
                for dz in -rxz..=rxz {
                    wanted.push(center.offset(dx, dy, dz));
                }
            }
        }
        trace!("{peer} entered {center:?}, window of {} coords", wanted.len());
        for coord in wanted {
            self.schedule_chunk(peer, coord);
        }
    }

    /// Put one coord on the path to the client unless it is already owned
    /// or promised. Cache hits skip the pool entirely.
    fn schedule_chunk(&mut self, peer: PeerId, coord: ChunkCoord) {
        let Some(state) = self.clients.get_mut(&peer) else {
            return;
        };
        if state.sent.contains(&coord) || state.pending.contains(&coord) {
            return;
        }

        if let Some(bytes) = self.cache.get(coord) {
            state.sent.insert(coord);
            debug_assert!(state.sent.is_disjoint(&state.pending));
            self.ready.lock().push(ReadyChunk { peer, coord, bytes });
            return;
        }

        state.pending.insert(coord);
        debug_assert!(state.sent.is_disjoint(&state.pending));
        let cache = Arc::clone(&self.cache);
        let generator = Arc::clone(&self.generator);
        let ready = Arc::clone(&self.ready);
        self.pool.submit(move || {
            let bytes = cache.get_or_build(coord, || {
                let field = generator.generate(coord);
                Packet::ChunkData(extract_mesh(&field)).encode()
            });
            ready.lock().push(ReadyChunk { peer, coord, bytes });
        });
    }

    /// Drain finished chunks onto the wire. Runs on the transport thread.
    /// Completions for departed peers are dropped silently.
    pub fn flush_ready(&mut self, sink: &mut impl FrameSink) {
        let drained = std::mem::take(&mut *self.ready.lock());
        if drained.is_empty() {
            return;
        }

        let mut sent_any = false;
        for ready in drained {
            let Some(state) = self.clients.get_mut(&ready.peer) else {
                debug!("dropping tardy chunk {:?} for departed {}", ready.coord, ready.peer);
                continue;
            };
            state.pending.remove(&ready.coord);
            if sink.send_frame(ready.peer, &ready.bytes) {
                state.sent.insert(ready.coord);
                sent_any = true;
            }
            debug_assert!(state.sent.is_disjoint(&state.pending));
        }
        if sent_any {
            sink.flush();
        }
    }

    /// Advisory count of generation tasks not yet picked up
    pub fn queued_tasks(&self) -> usize {
        self.pool.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::world::{RADIUS_XZ, RADIUS_Y};

    /// Sink that records sends instead of touching sockets
    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<(PeerId, usize)>,
        flushes: usize,
        alive: HashSet<u32>,
    }

    impl FrameSink for RecordingSink {
        fn send_frame(&mut self, peer: PeerId, payload: &[u8]) -> bool {
            if !self.alive.contains(&peer.0) {
                return false;
            }
            self.sent.push((peer, payload.len()));
            true
        }

        fn flush(&mut self) {
            self.flushes += 1;
        }
    }

    fn streamer() -> ChunkStreamer {
        ChunkStreamer::new(
            Arc::new(TerrainGenerator::new(42)),
            Arc::new(ChunkCache::new(0)),
            WorkerPool::new(1),
            RADIUS_XZ,
            RADIUS_Y,
        )
    }

    /// Pre-fill the cache for the whole window around a position so
    /// scheduling takes the synchronous hit path.
    fn warm_cache(s: &ChunkStreamer, pos: Vec3) {
        let center = ChunkCoord::from_world_pos(pos);
        for dx in -RADIUS_XZ..=RADIUS_XZ {
            for dy in -RADIUS_Y..=RADIUS_Y {
                for dz in -RADIUS_XZ..=RADIUS_XZ {
                    s.cache
                        .get_or_build(center.offset(dx, dy, dz), || vec![0xAB; 8]);
                }
            }
        }
    }

    #[test]
    fn first_update_schedules_the_full_window() {
        let mut s = streamer();
        let peer = PeerId(1);
        let pos = Vec3::new(0.0, 64.0, 0.0);
        warm_cache(&s, pos);

        s.add_client(peer);
        s.update_client(peer, pos);
        // Rxz=2, Ry=1: 5 * 3 * 5 coords
        assert_eq!(s.sent_for(peer), 75);
        assert_eq!(s.pending_for(peer), 0);

        let mut sink = RecordingSink::default();
        sink.alive.insert(1);
        s.flush_ready(&mut sink);
        assert_eq!(sink.sent.len(), 75);
        assert_eq!(sink.flushes, 1);
    }

    #[test]
    fn same_chunk_update_schedules_nothing() {
        let mut s = streamer();
        let peer = PeerId(1);
        let pos = Vec3::new(0.0, 64.0, 0.0);
        warm_cache(&s, pos);

        s.add_client(peer);
        s.update_client(peer, pos);
        let mut sink = RecordingSink::default();
        sink.alive.insert(1);
        s.flush_ready(&mut sink);
        assert_eq!(sink.sent.len(), 75);

        // (1, 64, 1) is still chunk (0, 2, 0): nothing new.
        s.update_client(peer, Vec3::new(1.0, 64.0, 1.0));
        s.flush_ready(&mut sink);
        assert_eq!(sink.sent.len(), 75);
        assert_eq!(s.sent_for(peer), 75);
    }

    #[test]
    fn crossing_a_boundary_schedules_only_the_new_slab() {
        let mut s = streamer();
        let peer = PeerId(1);
        warm_cache(&s, Vec3::new(0.0, 64.0, 0.0));
        warm_cache(&s, Vec3::new(32.0, 64.0, 0.0));

        s.add_client(peer);
        s.update_client(peer, Vec3::new(0.0, 64.0, 0.0));
        assert_eq!(s.sent_for(peer), 75);
        s.update_client(peer, Vec3::new(33.0, 64.0, 0.0));
        // One new 1x3x5 slab on the +x side.
        assert_eq!(s.sent_for(peer), 75 + 15);
    }

    #[test]
    fn worker_path_delivers_generated_chunks() {
        let mut s = streamer();
        let peer = PeerId(1);
        s.add_client(peer);
        // Cold cache: every coord goes through the pool.
        s.update_client(peer, Vec3::new(0.0, 64.0, 0.0));
        assert_eq!(s.pending_for(peer) + s.sent_for(peer), 75);

        let mut sink = RecordingSink::default();
        sink.alive.insert(1);
        for _ in 0..600 {
            s.flush_ready(&mut sink);
            if sink.sent.len() == 75 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(sink.sent.len(), 75, "all pending chunks delivered");
        assert_eq!(s.pending_for(peer), 0);
        assert_eq!(s.sent_for(peer), 75);
    }

    #[test]
    fn reset_client_restreams_the_window() {
        let mut s = streamer();
        let peer = PeerId(1);
        let pos = Vec3::new(0.0, 64.0, 0.0);
        warm_cache(&s, pos);
        s.add_client(peer);
        s.update_client(peer, pos);
        assert_eq!(s.sent_for(peer), 75);

        s.reset_client(peer);
        assert_eq!(s.sent_for(peer), 0);
        s.update_client(peer, pos);
        assert_eq!(s.sent_for(peer), 75, "window rescheduled after reset");
    }

    #[test]
    fn tardy_completions_for_departed_peers_are_dropped() {
        let mut s = streamer();
        let peer = PeerId(1);
        s.add_client(peer);
        s.update_client(peer, Vec3::new(0.0, 64.0, 0.0));
        s.remove_client(peer);

        let mut sink = RecordingSink::default();
        sink.alive.insert(1);
        // Wait for workers to finish into the ready queue, then flush.
        for _ in 0..600 {
            if s.queued_tasks() == 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
        s.flush_ready(&mut sink);
        assert!(sink.sent.is_empty(), "no sends for a departed peer");
    }

    #[test]
    fn rejected_sends_do_not_flush_the_transport() {
        let mut s = streamer();
        let peer = PeerId(1);
        let pos = Vec3::new(0.0, 64.0, 0.0);
        warm_cache(&s, pos);
        s.add_client(peer);
        s.update_client(peer, pos);

        // The sink refuses the peer (its connection raced away).
        let mut sink = RecordingSink::default();
        s.flush_ready(&mut sink);
        assert_eq!(sink.sent.len(), 0);
        assert_eq!(sink.flushes, 0, "no flush when nothing was sent");
    }
}
