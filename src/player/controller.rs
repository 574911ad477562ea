//! The player controller.
//!
//! Movement is the classic accelerate/friction split: velocity only grows
//! along the wish direction up to the wish speed, ground friction bleeds it
//! off, gravity owns the air. Each tick integrates in four sub-steps with a
//! collision resolve between steps so fast falls cannot tunnel through
//! terrain.

use glam::Vec3;
use log::info;

use crate::chunk::ChunkCoord;
use crate::combat::{AttackState, DodgeState, Health, ParryState};
use crate::constants::movement;
use crate::ecs::{BodyBox, Entity, Grounded, Registry, Stamina, Transform, Velocity};
use crate::physics::{resolve_terrain, TriSoup};

/// Movement intent for one tick, already resolved into world space
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveInput {
    /// Normalized wish direction on the XZ plane (zero when idle)
    pub wish_dir: Vec3,
    pub sprint: bool,
    pub jump: bool,
}

pub struct PlayerController {
    entity: Entity,
    spawned: bool,
    pending_spawn: Option<Vec3>,
}

impl PlayerController {
    /// Create the player entity with its full component set
    pub fn new(reg: &mut Registry) -> Self {
        let entity = reg
            .spawn()
            .with(Transform {
                pos: Vec3::new(0.0, 80.0, 0.0),
            })
            .with(Velocity::default())
            .with(BodyBox::player())
            .with(Grounded::default())
            .with(Stamina::default())
            .with(Health::default())
            .with(AttackState::default())
            .with(ParryState::default())
            .with(DodgeState::default())
            .build();
        Self {
            entity,
            spawned: false,
            pending_spawn: None,
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    pub fn position(&self, reg: &Registry) -> Vec3 {
        reg.get::<Transform>(self.entity)
            .map(|t| t.pos)
            .unwrap_or(Vec3::ZERO)
    }

    /// Store the authoritative spawn point and re-arm the gate. Also used on
    /// respawn: the player freezes until the destination chunks stream in.
    pub fn set_spawn_position(&mut self, pos: Vec3) {
        self.pending_spawn = Some(pos);
        self.spawned = false;
    }

    /// Fraction of the spawn working set (3x3x3 around the spawn cell)
    /// already present in the triangle soup. Monotonic until the gate opens.
    pub fn spawn_progress(&self, soup: &TriSoup) -> f32 {
        let Some(spawn) = self.pending_spawn else {
            return if self.spawned { 1.0 } else { 0.0 };
        };
        let center = ChunkCoord::from_world_pos(spawn);
        let mut present = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if soup.contains(center.offset(dx, dy, dz)) {
                        present += 1;
                    }
                }
            }
        }
        present as f32 / 27.0
    }

    /// Gate condition: the spawn cell and the cell directly below it must
    /// both exist client-side before simulation starts.
    fn gate_open(&self, soup: &TriSoup) -> bool {
        match self.pending_spawn {
            Some(spawn) => {
                let cell = ChunkCoord::from_world_pos(spawn);
                soup.contains(cell) && soup.contains(cell.offset(0, -1, 0))
            }
            None => false,
        }
    }

    pub fn update(
        &mut self,
        reg: &mut Registry,
        soup: &TriSoup,
        dt: f32,
        input: &MoveInput,
        dodge_vel: Vec3,
    ) {
        if !self.spawned {
            if !self.gate_open(soup) {
                return;
            }
            let spawn = self.pending_spawn.take().expect("gate opened while unarmed");
            if let Some(t) = reg.get_mut::<Transform>(self.entity) {
                t.pos = spawn;
            }
            if let Some(v) = reg.get_mut::<Velocity>(self.entity) {
                v.vel = Vec3::ZERO;
            }
            self.spawned = true;
            info!("spawn gate released at {spawn}");
        }

        let half = match reg.get::<BodyBox>(self.entity) {
            Some(b) => b.half,
            None => return,
        };
        let grounded_now = reg
            .get::<Grounded>(self.entity)
            .map(|g| g.on_ground)
            .unwrap_or(false);
        let recovering = reg
            .get::<AttackState>(self.entity)
            .map(|a| a.is_recovering())
            .unwrap_or(false);
        let rolling = dodge_vel.length_squared() > 0.0;

        // Stamina bookkeeping happens before movement so a sprint that just
        // emptied the pool no longer boosts this tick.
        let moving = input.wish_dir.length_squared() > 0.001;
        let mut sprinting = input.sprint && moving && !rolling;
        if let Some(stamina) = reg.get_mut::<Stamina>(self.entity) {
            stamina.tick(dt);
            if sprinting {
                stamina.drain(stamina.sprint_drain * dt);
                sprinting = !stamina.depleted;
            }
        }

        let mut wish_speed = if moving {
            movement::WALK_SPEED
                * if sprinting {
                    movement::SPRINT_MULT
                } else {
                    1.0
                }
        } else {
            0.0
        };
        if recovering {
            wish_speed *= movement::RECOVERY_SPEED_SCALE;
        }

        let Some(vel) = reg.get::<Velocity>(self.entity).map(|v| v.vel) else {
            return;
        };
        let mut horizontal = Vec3::new(vel.x, 0.0, vel.z);
        let mut vertical = vel.y;

        if rolling {
            // The roll owns the horizontal plane; gravity still applies.
            horizontal = Vec3::new(dodge_vel.x, 0.0, dodge_vel.z);
            if !grounded_now {
                vertical += movement::GRAVITY * dt;
            }
        } else if grounded_now {
            let speed = horizontal.length();
            if speed > 0.001 {
                let drop = speed * movement::FRICTION * dt;
                horizontal *= (speed - drop).max(0.0) / speed;
            }
            horizontal = accelerate(
                horizontal,
                input.wish_dir,
                wish_speed,
                movement::GROUND_ACCEL,
                dt,
            );
            if vertical < 0.0 {
                vertical = 0.0;
            }
            if input.jump {
                let allowed = reg
                    .get_mut::<Stamina>(self.entity)
                    .map(|s| s.try_spend(s.jump_cost))
                    .unwrap_or(false);
                // Refused silently when the pool cannot pay.
                if allowed {
                    vertical = movement::JUMP_VEL;
                    if let Some(g) = reg.get_mut::<Grounded>(self.entity) {
                        g.on_ground = false;
                    }
                }
            }
        } else {
            horizontal = accelerate(
                horizontal,
                input.wish_dir,
                wish_speed,
                movement::AIR_ACCEL,
                dt,
            );
            vertical += movement::GRAVITY * dt;
        }

        let mut pos = self.position(reg);
        let mut new_vel = Vec3::new(horizontal.x, vertical, horizontal.z);

        // Sub-stepped integration: advance, resolve, repeat.
        let sub_dt = dt / movement::SUB_STEPS as f32;
        let mut grounded = false;
        for _ in 0..movement::SUB_STEPS {
            pos += new_vel * sub_dt;
            grounded = resolve_terrain(&mut pos, &mut new_vel, half, soup);
        }

        if let Some(t) = reg.get_mut::<Transform>(self.entity) {
            t.pos = pos;
        }
        if let Some(v) = reg.get_mut::<Velocity>(self.entity) {
            v.vel = new_vel;
        }
        if let Some(g) = reg.get_mut::<Grounded>(self.entity) {
            g.on_ground = grounded;
        }
    }
}

/// Only add velocity along the wish direction, and only up to the wish
/// speed; already moving that fast means no gain.
fn accelerate(vel: Vec3, wish_dir: Vec3, wish_speed: f32, accel: f32, dt: f32) -> Vec3 {
    let current = vel.dot(wish_dir);
    let add = wish_speed - current;
    if add <= 0.0 {
        return vel;
    }
    let gain = (accel * wish_speed * dt).min(add);
    vel + wish_dir * gain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkMesh, Vertex};

    /// Flat ground surface across a 3x3 ring of chunks at the given height,
    /// with the full 3x3x3 spawn neighborhood registered.
    fn ground_soup(height: f32) -> TriSoup {
        let mut soup = TriSoup::new();
        let ground_chunk = ChunkCoord::from_world_pos(Vec3::new(0.0, height, 0.0));
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let cc = ground_chunk.offset(dx, dy, dz);
                    if dy == 0 {
                        let local_y = height - cc.world_offset().y;
                        let v = |x: f32, z: f32| Vertex {
                            position: Vec3::new(x, local_y, z),
                            normal: Vec3::Y,
                        };
                        soup.insert_mesh(&ChunkMesh {
                            coord: cc,
                            vertices: vec![
                                v(-64.0, -64.0),
                                v(96.0, -64.0),
                                v(96.0, 96.0),
                                v(-64.0, 96.0),
                            ],
                            indices: vec![0, 2, 1, 0, 3, 2],
                        });
                    } else {
                        soup.insert_mesh(&ChunkMesh::empty(cc));
                    }
                }
            }
        }
        soup
    }

    fn spawned_player(reg: &mut Registry, soup: &TriSoup, spawn: Vec3) -> PlayerController {
        let mut player = PlayerController::new(reg);
        player.set_spawn_position(spawn);
        player.update(reg, soup, 0.016, &MoveInput::default(), Vec3::ZERO);
        assert!(player.is_spawned());
        player
    }

    #[test]
    fn gate_holds_until_reference_chunks_arrive() {
        let mut reg = Registry::new();
        let mut player = PlayerController::new(&mut reg);
        let soup = TriSoup::new();
        player.set_spawn_position(Vec3::new(0.0, 40.0, 0.0));

        let before = player.position(&reg);
        player.update(&mut reg, &soup, 0.016, &MoveInput::default(), Vec3::ZERO);
        assert!(!player.is_spawned());
        assert_eq!(player.position(&reg), before, "held in place by the gate");
        assert_eq!(player.spawn_progress(&soup), 0.0);
    }

    #[test]
    fn spawn_progress_counts_the_working_set() {
        let mut reg = Registry::new();
        let mut player = PlayerController::new(&mut reg);
        let mut soup = TriSoup::new();
        player.set_spawn_position(Vec3::new(0.0, 40.0, 0.0));

        let center = ChunkCoord::from_world_pos(Vec3::new(0.0, 40.0, 0.0));
        soup.insert_mesh(&ChunkMesh::empty(center));
        let progress = player.spawn_progress(&soup);
        assert!((progress - 1.0 / 27.0).abs() < 1e-6);

        soup.insert_mesh(&ChunkMesh::empty(center.offset(0, -1, 0)));
        let more = player.spawn_progress(&soup);
        assert!(more > progress, "progress is monotone as chunks land");
    }

    #[test]
    fn gate_release_teleports_and_zeroes_velocity() {
        let mut reg = Registry::new();
        let soup = ground_soup(40.0);
        let spawn = Vec3::new(0.0, 42.0, 0.0);
        let player = spawned_player(&mut reg, &soup, spawn);
        let pos = player.position(&reg);
        assert!((pos - spawn).length() < 1.0, "teleported to pending spawn");
    }

    #[test]
    fn player_falls_and_lands_on_the_ground() {
        let mut reg = Registry::new();
        let soup = ground_soup(40.0);
        let mut player = spawned_player(&mut reg, &soup, Vec3::new(0.0, 45.0, 0.0));

        for _ in 0..300 {
            player.update(&mut reg, &soup, 0.016, &MoveInput::default(), Vec3::ZERO);
        }
        let pos = player.position(&reg);
        let expected = 40.0 + movement::PLAYER_HEIGHT * 0.5;
        assert!(
            (pos.y - expected).abs() < 0.05,
            "resting height {} vs expected {expected}",
            pos.y
        );
        assert!(reg.get::<Grounded>(player.entity()).unwrap().on_ground);
    }

    #[test]
    fn walking_accelerates_to_wish_speed_and_friction_stops() {
        let mut reg = Registry::new();
        let soup = ground_soup(40.0);
        let mut player = spawned_player(&mut reg, &soup, Vec3::new(0.0, 41.0, 0.0));

        let walk = MoveInput {
            wish_dir: Vec3::X,
            ..Default::default()
        };
        for _ in 0..120 {
            player.update(&mut reg, &soup, 0.016, &walk, Vec3::ZERO);
        }
        let vel = reg.get::<Velocity>(player.entity()).unwrap().vel;
        assert!(
            (vel.x - movement::WALK_SPEED).abs() < 0.5,
            "cruise speed {}",
            vel.x
        );

        for _ in 0..120 {
            player.update(&mut reg, &soup, 0.016, &MoveInput::default(), Vec3::ZERO);
        }
        let vel = reg.get::<Velocity>(player.entity()).unwrap().vel;
        assert!(vel.length() < 0.05, "friction stops the slide");
    }

    #[test]
    fn jump_costs_stamina_and_is_refused_when_depleted() {
        let mut reg = Registry::new();
        let soup = ground_soup(40.0);
        let mut player = spawned_player(&mut reg, &soup, Vec3::new(0.0, 41.0, 0.0));
        // Settle on the ground first.
        for _ in 0..60 {
            player.update(&mut reg, &soup, 0.016, &MoveInput::default(), Vec3::ZERO);
        }

        let jump = MoveInput {
            jump: true,
            ..Default::default()
        };
        let stamina_before = reg.get::<Stamina>(player.entity()).unwrap().current;
        player.update(&mut reg, &soup, 0.016, &jump, Vec3::ZERO);
        let vel = reg.get::<Velocity>(player.entity()).unwrap().vel;
        assert!(vel.y > movement::JUMP_VEL * 0.8, "launched upward");
        let stamina_after = reg.get::<Stamina>(player.entity()).unwrap().current;
        assert!(stamina_after < stamina_before);

        // Drain the pool and land again: the next jump is silently refused.
        {
            let s = reg.get_mut::<Stamina>(player.entity()).unwrap();
            s.current = 0.5;
        }
        for _ in 0..120 {
            player.update(&mut reg, &soup, 0.016, &MoveInput::default(), Vec3::ZERO);
        }
        {
            let s = reg.get_mut::<Stamina>(player.entity()).unwrap();
            s.current = 1.0;
            s.depleted = false;
        }
        player.update(&mut reg, &soup, 0.016, &jump, Vec3::ZERO);
        let vel = reg.get::<Velocity>(player.entity()).unwrap().vel;
        assert!(vel.y.abs() < 0.5, "jump refused without stamina");
    }

    #[test]
    fn dodge_velocity_overrides_the_horizontal_plane() {
        let mut reg = Registry::new();
        let soup = ground_soup(40.0);
        let mut player = spawned_player(&mut reg, &soup, Vec3::new(0.0, 41.0, 0.0));
        for _ in 0..60 {
            player.update(&mut reg, &soup, 0.016, &MoveInput::default(), Vec3::ZERO);
        }

        let roll = Vec3::new(12.0, 0.0, 0.0);
        player.update(&mut reg, &soup, 0.016, &MoveInput::default(), roll);
        let vel = reg.get::<Velocity>(player.entity()).unwrap().vel;
        assert!((vel.x - 12.0).abs() < 1e-3);
    }

    #[test]
    fn accelerate_never_exceeds_wish_speed_along_wish_dir() {
        let mut vel = Vec3::ZERO;
        for _ in 0..1000 {
            vel = accelerate(vel, Vec3::X, 8.0, 15.0, 0.016);
        }
        assert!(vel.x <= 8.0 + 1e-3);
        // Perpendicular velocity is untouched.
        let v = accelerate(Vec3::new(0.0, 0.0, 5.0), Vec3::X, 8.0, 15.0, 0.016);
        assert_eq!(v.z, 5.0);
    }
}
