//! The server transport loop.
//!
//! Single-threaded event pump: accept connections, service frames, feed the
//! streamer, flush ready chunks, sleep a millisecond so the generation
//! workers get cycles on small machines. Workers never send; everything on
//! the wire goes through this thread.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use glam::Vec3;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{movement, net, world};
use crate::error::EngineResult;
use crate::network::{ConnectionManager, FrameSink, Packet, PeerId};
use crate::noise::TerrainGenerator;
use crate::server::{ChunkCache, ChunkStreamer};
use crate::worker::WorkerPool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_clients: usize,
    pub seed: u64,
    pub radius_xz: i32,
    pub radius_y: i32,
    /// 0 = auto (cores - 1)
    pub worker_threads: usize,
    /// 0 = unbounded chunk cache
    pub cache_max_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: net::DEFAULT_PORT,
            max_clients: net::MAX_CLIENTS,
            seed: 0,
            radius_xz: world::RADIUS_XZ,
            radius_y: world::RADIUS_Y,
            worker_threads: 0,
            cache_max_bytes: 0,
        }
    }
}

pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    connections: ConnectionManager,
    streamer: ChunkStreamer,
    positions: HashMap<PeerId, Vec3>,
    spawn_position: Vec3,
}

impl Server {
    /// Bind the listen socket and precompute the spawn point from the
    /// surface sampler.
    pub fn bind(config: ServerConfig) -> EngineResult<Self> {
        let listener = TcpListener::bind(("0.0.0.0", config.port))?;
        listener.set_nonblocking(true)?;

        let generator = Arc::new(TerrainGenerator::new(config.seed));
        let spawn_y = generator.surface_height(0.0, 0.0) + movement::PLAYER_HEIGHT + 1.0;
        let spawn_position = Vec3::new(0.0, spawn_y, 0.0);

        let streamer = ChunkStreamer::new(
            Arc::clone(&generator),
            Arc::new(ChunkCache::new(config.cache_max_bytes)),
            WorkerPool::new(config.worker_threads),
            config.radius_xz,
            config.radius_y,
        );

        info!(
            "server listening on port {}, seed {}, spawn y {:.1}",
            listener.local_addr()?.port(),
            config.seed,
            spawn_y
        );
        Ok(Self {
            config,
            listener,
            connections: ConnectionManager::new(),
            streamer,
            positions: HashMap::new(),
            spawn_position,
        })
    }

    pub fn local_addr(&self) -> EngineResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run forever
    pub fn run(mut self) -> EngineResult<()> {
        loop {
            self.tick()?;
            std::thread::sleep(net::SERVER_SLEEP);
        }
    }

    /// One pass of the event pump; exposed separately so tests can drive
    /// the loop at their own cadence.
    pub fn tick(&mut self) -> EngineResult<()> {
        self.accept_new();

        let (frames, disconnected) = self.connections.service();
        for (peer, frame) in frames {
            self.handle_frame(peer, &frame);
        }
        for peer in disconnected {
            self.drop_peer(peer);
        }

        self.streamer.flush_ready(&mut self.connections);
        Ok(())
    }

    fn accept_new(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if self.connections.len() >= self.config.max_clients {
                        warn!("refusing connection from {addr}: server full");
                        continue;
                    }
                    match self.connections.add(stream, addr) {
                        Ok(peer) => self.on_connect(peer),
                        Err(e) => warn!("failed to set up connection from {addr}: {e}"),
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("accept failed: {e}");
                    break;
                }
            }
        }
    }

    fn on_connect(&mut self, peer: PeerId) {
        info!("{peer} connected");
        self.streamer.add_client(peer);
        self.positions.insert(peer, self.spawn_position);

        // Schedule the spawn working set before SpawnPosition goes out so
        // chunk frames pipeline ahead of the teleport.
        self.streamer.update_client(peer, self.spawn_position);
        self.streamer.flush_ready(&mut self.connections);

        let spawn = Packet::SpawnPosition {
            position: self.spawn_position,
        }
        .encode();
        self.connections.send_frame(peer, &spawn);
        self.connections.flush();
    }

    fn handle_frame(&mut self, peer: PeerId, frame: &[u8]) {
        match Packet::decode(frame) {
            Ok(Packet::PlayerMove { position, .. }) => {
                self.positions.insert(peer, position);
                self.streamer.update_client(peer, position);
            }
            Ok(Packet::RespawnRequest) => {
                info!("{peer} respawning at y {:.1}", self.spawn_position.y);
                self.positions.insert(peer, self.spawn_position);
                self.streamer.reset_client(peer);
                self.streamer.update_client(peer, self.spawn_position);

                let spawn = Packet::SpawnPosition {
                    position: self.spawn_position,
                }
                .encode();
                self.connections.send_frame(peer, &spawn);
                self.connections.flush();
            }
            Ok(Packet::PlayerJoin { name }) => {
                info!("{peer} joined as {name:?}");
            }
            Ok(Packet::PlayerLeave) => {
                self.connections.remove(peer);
                self.drop_peer(peer);
            }
            Ok(other) => {
                warn!("{peer} sent unexpected {:#04x} packet", other.tag());
            }
            // A bad packet is dropped; the connection stays.
            Err(e) => warn!("{peer} sent undecodable packet: {e}"),
        }
    }

    fn drop_peer(&mut self, peer: PeerId) {
        info!("{peer} disconnected");
        self.streamer.remove_client(peer);
        self.positions.remove(&peer);
    }
}
