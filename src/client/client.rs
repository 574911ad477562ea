//! The client loop.
//!
//! One tick: service the wire, drain decoded meshes into the collision soup
//! and the render sink, run the combat input phase, integrate the player,
//! tick combat, unload far chunks, send our position at 20 Hz and advance
//! the day-night phase.

use std::net::TcpStream;

use glam::Vec3;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::chunk::{ChunkCoord, ChunkMesh};
use crate::combat::CombatSystem;
use crate::constants::net;
use crate::ecs::Registry;
use crate::error::{EngineError, EngineResult};
use crate::network::{Connection, Packet, PeerId};
use crate::physics::TriSoup;
use crate::player::{MoveInput, PlayerController};
use crate::time::DayNight;

use super::{ChunkIntake, InputState};

/// Where finished meshes go for rendering. The GPU upload path lives
/// outside this crate; the loop only forwards.
pub trait MeshSink {
    fn accept(&mut self, mesh: &ChunkMesh);
}

/// Sink for headless runs and tests
pub struct NullSink;

impl MeshSink for NullSink {
    fn accept(&mut self, _mesh: &ChunkMesh) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_addr: String,
    pub name: String,
    /// 0 = auto
    pub worker_threads: usize,
    /// Mesh integrations per frame; keeps pop-in from stuttering the tick
    pub meshes_per_frame: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{}", net::DEFAULT_PORT),
            name: "player".to_string(),
            worker_threads: 1,
            meshes_per_frame: 4,
        }
    }
}

pub struct Client {
    connection: Connection,
    intake: ChunkIntake,
    soup: TriSoup,
    registry: Registry,
    controller: PlayerController,
    combat: CombatSystem,
    day_night: DayNight,
    move_accum: f32,
    meshes_per_frame: usize,
}

impl Client {
    /// Connect with the protocol's 5 second timeout. Failure here is fatal
    /// to the session; the caller exits non-zero.
    pub fn connect(config: ClientConfig) -> EngineResult<Self> {
        let addr = config
            .server_addr
            .parse()
            .map_err(|e| EngineError::ConnectionFailed {
                addr: config.server_addr.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{e}")),
            })?;
        let stream = TcpStream::connect_timeout(&addr, net::CONNECT_TIMEOUT).map_err(|e| {
            EngineError::ConnectionFailed {
                addr: config.server_addr.clone(),
                source: e,
            }
        })?;
        let mut connection = Connection::new(stream, addr, PeerId(0))?;
        info!("connected to {addr}");

        connection.queue_frame(&Packet::PlayerJoin { name: config.name }.encode());
        connection.flush_send();

        let mut registry = Registry::new();
        let controller = PlayerController::new(&mut registry);
        Ok(Self {
            connection,
            intake: ChunkIntake::new(config.worker_threads),
            soup: TriSoup::new(),
            registry,
            controller,
            combat: CombatSystem::new(),
            day_night: DayNight::new(),
            move_accum: 0.0,
            meshes_per_frame: config.meshes_per_frame.max(1),
        })
    }

    /// One simulation tick. Returns an error only when the transport died.
    pub fn tick(
        &mut self,
        dt: f32,
        input: &InputState,
        sink: &mut impl MeshSink,
    ) -> EngineResult<()> {
        self.service_wire(input)?;
        self.integrate_meshes(sink);

        // Combat input phase before movement, so a fresh dodge already
        // steers this tick's integration.
        let player = self.controller.entity();
        if self.controller.is_spawned() {
            let facing = input.facing();
            if input.light_attack {
                self.combat
                    .player_light_attack(&mut self.registry, player, facing);
            }
            if input.heavy_attack {
                self.combat
                    .player_heavy_attack(&mut self.registry, player, facing);
            }
            if input.parry {
                self.combat.player_parry(&mut self.registry, player);
            }
            if input.dodge {
                self.combat
                    .player_dodge(&mut self.registry, player, input.wish_dir());
            }
        }

        let move_input = MoveInput {
            wish_dir: input.wish_dir(),
            sprint: input.sprint,
            jump: input.jump,
        };
        let dodge_vel = self.combat.dodge_velocity(&self.registry, player);
        self.controller
            .update(&mut self.registry, &self.soup, dt, &move_input, dodge_vel);

        self.combat.update(&mut self.registry, dt, player);

        if self.controller.is_spawned() {
            let player_chunk = ChunkCoord::from_world_pos(self.controller.position(&self.registry));
            self.soup.retain_near(
                player_chunk,
                crate::constants::world::RADIUS_XZ,
                crate::constants::world::RADIUS_Y,
            );
        }

        self.send_position(dt, input);
        self.day_night.update(dt);
        Ok(())
    }

    fn service_wire(&mut self, input: &InputState) -> EngineResult<()> {
        if input.respawn {
            self.connection
                .queue_frame(&Packet::RespawnRequest.encode());
            self.connection.flush_send();
        }

        let frames = self.connection.receive_frames()?;
        if self.connection.is_closed() {
            return Err(EngineError::ConnectionFailed {
                addr: self.connection.addr().to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "server closed the connection",
                ),
            });
        }
        for frame in frames {
            match frame.first() {
                // Heavy payloads go to the decode workers untouched.
                Some(&crate::network::TAG_CHUNK_DATA) => self.intake.submit(&frame),
                _ => match Packet::decode(&frame) {
                    Ok(Packet::SpawnPosition { position }) => {
                        info!("spawn position {position}");
                        self.controller.set_spawn_position(position);
                    }
                    Ok(other) => warn!("ignoring unexpected {:#04x} packet", other.tag()),
                    Err(e) => warn!("dropping undecodable frame: {e}"),
                },
            }
        }
        Ok(())
    }

    fn integrate_meshes(&mut self, sink: &mut impl MeshSink) {
        for mesh in self.intake.drain(self.meshes_per_frame) {
            self.soup.insert_mesh(&mesh);
            sink.accept(&mesh);
        }
    }

    /// Send PlayerMove at most every 50 ms
    fn send_position(&mut self, dt: f32, input: &InputState) {
        self.move_accum += dt;
        if self.move_accum < net::MOVE_INTERVAL {
            return;
        }
        self.move_accum = 0.0;
        let packet = Packet::PlayerMove {
            position: self.controller.position(&self.registry),
            yaw: input.yaw,
            pitch: input.pitch,
        };
        self.connection.queue_frame(&packet.encode());
        self.connection.flush_send();
    }

    pub fn spawn_progress(&self) -> f32 {
        self.controller.spawn_progress(&self.soup)
    }

    pub fn is_spawned(&self) -> bool {
        self.controller.is_spawned()
    }

    pub fn position(&self) -> Vec3 {
        self.controller.position(&self.registry)
    }

    pub fn chunks_loaded(&self) -> usize {
        self.soup.chunk_count()
    }

    /// Decodes still in flight, for loading screens
    pub fn pending_chunks(&self) -> usize {
        self.intake.pending()
    }

    pub fn day_night(&self) -> &DayNight {
        &self.day_night
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Drop an enemy into the local simulation (combat runs client-side)
    pub fn spawn_enemy(&mut self, pos: Vec3) -> crate::ecs::Entity {
        self.combat.spawn_enemy(&mut self.registry, pos)
    }
}
