//! The combat state machine driver.
//!
//! Tick phases run in a fixed order; parry-on-hit semantics depend on it:
//! attacks, parry, dodge, invincibility, enemy AI, hit resolution, hit
//! cleanup, enemy knockback.

use std::collections::HashMap;

use glam::Vec3;
use log::debug;

use crate::ecs::{BodyBox, Entity, Registry, Stamina, Transform, Velocity};
use crate::physics::Aabb;

use super::components::{
    AiState, AttackPhase, AttackState, DodgePhase, DodgeState, Enemy, Health, Invincible,
    ParryPhase, ParryState, PendingHit,
};
use super::data::{AttackData, HEAVY, HEAVY_STAMINA_COST, LIGHT};

/// Enemy chase speed while aggroed, units/second
const ENEMY_WALK_SPEED: f32 = 3.5;
/// Invincibility granted by a successful parry
const PARRY_INVINCIBILITY: f32 = 0.5;
/// Brief i-frames after eating a hit
const HIT_INVINCIBILITY: f32 = 0.3;

pub struct CombatSystem {
    /// Facing captured when an attack starts, so the hitbox lands where the
    /// attacker was aiming rather than where they drifted to
    attack_dir: HashMap<Entity, Vec3>,
    /// Hit entities created this tick, destroyed after resolution
    pending_hits: Vec<Entity>,
}

impl CombatSystem {
    pub fn new() -> Self {
        Self {
            attack_dir: HashMap::new(),
            pending_hits: Vec::new(),
        }
    }

    // ── Player request surface ───────────────────────────────────────────

    pub fn player_light_attack(&mut self, reg: &mut Registry, player: Entity, facing: Vec3) {
        self.start_attack(reg, player, &LIGHT, facing);
    }

    pub fn player_heavy_attack(&mut self, reg: &mut Registry, player: Entity, facing: Vec3) {
        let idle = reg
            .get::<AttackState>(player)
            .map(|a| a.is_idle())
            .unwrap_or(false);
        if !idle {
            return;
        }
        let Some(stamina) = reg.get_mut::<Stamina>(player) else {
            return;
        };
        if !stamina.try_spend(HEAVY_STAMINA_COST) {
            return;
        }
        self.start_attack(reg, player, &HEAVY, facing);
    }

    pub fn player_parry(&mut self, reg: &mut Registry, player: Entity) {
        let attack_idle = reg
            .get::<AttackState>(player)
            .map(|a| a.is_idle())
            .unwrap_or(false);
        if !attack_idle {
            return;
        }
        let Some(parry) = reg.get_mut::<ParryState>(player) else {
            return;
        };
        if parry.phase != ParryPhase::Idle {
            return;
        }
        parry.phase = ParryPhase::Active;
        parry.timer = ParryState::WINDOW;
    }

    pub fn player_dodge(&mut self, reg: &mut Registry, player: Entity, wish_dir: Vec3) {
        let attack_idle = reg
            .get::<AttackState>(player)
            .map(|a| a.is_idle())
            .unwrap_or(false);
        let can_dodge = reg
            .get::<DodgeState>(player)
            .map(|d| d.can_dodge())
            .unwrap_or(false);
        if !attack_idle || !can_dodge {
            return;
        }
        let Some(stamina) = reg.get_mut::<Stamina>(player) else {
            return;
        };
        if !stamina.try_spend(DodgeState::STAMINA_COST) {
            return;
        }
        let dir = if wish_dir.length() > 0.001 {
            wish_dir.normalize()
        } else {
            Vec3::new(0.0, 0.0, -1.0)
        };
        if let Some(dodge) = reg.get_mut::<DodgeState>(player) {
            dodge.phase = DodgePhase::Rolling;
            dodge.timer = DodgeState::DURATION;
            dodge.dir = dir;
        }
    }

    /// Horizontal velocity the player sim applies while rolling, zero
    /// otherwise. Read in the same thread after the combat input phase.
    pub fn dodge_velocity(&self, reg: &Registry, entity: Entity) -> Vec3 {
        match reg.get::<DodgeState>(entity) {
            Some(dodge) if dodge.is_rolling() => dodge.dir * dodge.speed,
            _ => Vec3::ZERO,
        }
    }

    pub fn is_dodging(&self, reg: &Registry, entity: Entity) -> bool {
        reg.get::<DodgeState>(entity)
            .map(|d| d.is_rolling())
            .unwrap_or(false)
    }

    // ── Enemy spawning ───────────────────────────────────────────────────

    pub fn spawn_enemy(&mut self, reg: &mut Registry, pos: Vec3) -> Entity {
        reg.spawn()
            .with(Transform { pos })
            .with(Velocity::default())
            .with(BodyBox {
                half: Vec3::splat(0.5),
            })
            .with(Health::new(60.0))
            .with(AttackState::default())
            .with(Enemy::at(pos))
            .build()
    }

    // ── Per-tick update ──────────────────────────────────────────────────

    pub fn update(&mut self, reg: &mut Registry, dt: f32, player: Entity) {
        self.tick_attacks(reg, dt, player);
        self.tick_parry(reg, dt);
        self.tick_dodge(reg, dt);
        self.tick_invincibility(reg, dt);
        self.tick_enemy_ai(reg, dt, player);
        self.resolve_hits(reg, player);
        self.clear_hits(reg);
        self.tick_enemy_knockback(reg, dt);
    }

    // ── Attack FSM ───────────────────────────────────────────────────────

    fn start_attack(
        &mut self,
        reg: &mut Registry,
        attacker: Entity,
        data: &'static AttackData,
        facing: Vec3,
    ) {
        let Some(attack) = reg.get_mut::<AttackState>(attacker) else {
            return;
        };
        if !attack.is_idle() {
            return;
        }
        attack.data = Some(data);
        attack.phase = AttackPhase::Startup;
        attack.timer = data.startup;

        let flat = Vec3::new(facing.x, 0.0, facing.z);
        let dir = if flat.length() > 0.001 {
            flat.normalize()
        } else {
            Vec3::new(0.0, 0.0, -1.0)
        };
        self.attack_dir.insert(attacker, dir);
    }

    fn tick_attacks(&mut self, reg: &mut Registry, dt: f32, player: Entity) {
        for entity in reg.entities_with::<AttackState>() {
            let Some(pos) = reg.get::<Transform>(entity).map(|t| t.pos) else {
                continue;
            };
            let mut went_active: Option<&'static AttackData> = None;
            if let Some(attack) = reg.get_mut::<AttackState>(entity) {
                if attack.is_idle() {
                    continue;
                }
                attack.timer -= dt;
                if attack.timer > 0.0 {
                    continue;
                }
                match attack.phase {
                    AttackPhase::Startup => {
                        let data = attack.data.expect("attack in startup without data");
                        attack.phase = AttackPhase::Active;
                        attack.timer = data.active;
                        went_active = Some(data);
                    }
                    AttackPhase::Active => {
                        let data = attack.data.expect("attack active without data");
                        attack.phase = AttackPhase::Recovery;
                        attack.timer = data.recovery;
                    }
                    AttackPhase::Recovery => {
                        attack.phase = AttackPhase::Idle;
                        attack.timer = 0.0;
                        attack.data = None;
                    }
                    AttackPhase::Idle => {}
                }
            }
            if let Some(data) = went_active {
                self.emit_hitbox(reg, entity, pos, data, entity == player);
            }
        }
    }

    /// Materialize the attack's active window as a one-tick hit entity
    fn emit_hitbox(
        &mut self,
        reg: &mut Registry,
        attacker: Entity,
        attacker_pos: Vec3,
        data: &'static AttackData,
        from_player: bool,
    ) {
        let facing = self
            .attack_dir
            .get(&attacker)
            .copied()
            .unwrap_or(Vec3::new(0.0, 0.0, -1.0));
        let offset = rotate_yaw(data.hitbox_offset, yaw_of(facing));
        let center = attacker_pos + offset;

        let hit = reg
            .spawn()
            .with(PendingHit {
                world_min: center - data.hitbox_half,
                world_max: center + data.hitbox_half,
                damage: data.damage,
                knockback: data.knockback,
                knock_dir: facing,
                from_player,
            })
            .build();
        self.pending_hits.push(hit);
    }

    // ── Parry / dodge / invincibility FSMs ───────────────────────────────

    fn tick_parry(&mut self, reg: &mut Registry, dt: f32) {
        for entity in reg.entities_with::<ParryState>() {
            let Some(parry) = reg.get_mut::<ParryState>(entity) else {
                continue;
            };
            if parry.phase == ParryPhase::Idle {
                continue;
            }
            parry.timer -= dt;
            if parry.timer > 0.0 {
                continue;
            }
            if parry.phase == ParryPhase::Active {
                parry.phase = ParryPhase::Cooldown;
                parry.timer = ParryState::COOLDOWN;
            } else {
                parry.phase = ParryPhase::Idle;
            }
        }
    }

    fn tick_dodge(&mut self, reg: &mut Registry, dt: f32) {
        for entity in reg.entities_with::<DodgeState>() {
            let Some(dodge) = reg.get_mut::<DodgeState>(entity) else {
                continue;
            };
            if dodge.phase == DodgePhase::Idle {
                continue;
            }
            dodge.timer -= dt;
            if dodge.timer > 0.0 {
                continue;
            }
            if dodge.phase == DodgePhase::Rolling {
                dodge.phase = DodgePhase::Cooldown;
                dodge.timer = DodgeState::COOLDOWN;
            } else {
                dodge.phase = DodgePhase::Idle;
            }
        }
    }

    fn tick_invincibility(&mut self, reg: &mut Registry, dt: f32) {
        for entity in reg.entities_with::<Invincible>() {
            let expired = match reg.get_mut::<Invincible>(entity) {
                Some(inv) => {
                    inv.timer -= dt;
                    inv.timer <= 0.0
                }
                None => false,
            };
            if expired {
                reg.remove::<Invincible>(entity);
            }
        }
    }

    // ── Enemy AI ─────────────────────────────────────────────────────────

    fn tick_enemy_ai(&mut self, reg: &mut Registry, dt: f32, player: Entity) {
        let Some(player_pos) = reg.get::<Transform>(player).map(|t| t.pos) else {
            return;
        };
        let player_dead = reg
            .get::<Health>(player)
            .map(|h| h.dead)
            .unwrap_or(true);

        for entity in reg.entities_with::<Enemy>() {
            let Some(pos) = reg.get::<Transform>(entity).map(|t| t.pos) else {
                continue;
            };
            let Some(enemy) = reg.get::<Enemy>(entity).copied() else {
                continue;
            };
            if reg
                .get::<Health>(entity)
                .map(|h| h.dead)
                .unwrap_or(false)
            {
                continue;
            }

            let dist = (player_pos - pos).length();
            match enemy.ai {
                AiState::Patrol => {
                    if !player_dead && dist < enemy.aggro_range {
                        if let Some(e) = reg.get_mut::<Enemy>(entity) {
                            e.ai = AiState::Aggro;
                        }
                    }
                }
                AiState::Aggro => {
                    if dist > enemy.aggro_range * 1.5 {
                        if let Some(e) = reg.get_mut::<Enemy>(entity) {
                            e.ai = AiState::Patrol;
                        }
                        continue;
                    }
                    let to_player = player_pos - pos;
                    if to_player.length() > 0.01 {
                        if let Some(t) = reg.get_mut::<Transform>(entity) {
                            t.pos += to_player.normalize() * ENEMY_WALK_SPEED * dt;
                        }
                    }
                    if dist < enemy.attack_range {
                        if let Some(e) = reg.get_mut::<Enemy>(entity) {
                            e.ai = AiState::Attack;
                        }
                    }
                }
                AiState::Attack => {
                    if dist > enemy.attack_range * 1.5 {
                        if let Some(e) = reg.get_mut::<Enemy>(entity) {
                            e.ai = AiState::Aggro;
                        }
                        continue;
                    }
                    let attack_idle = reg
                        .get::<AttackState>(entity)
                        .map(|a| a.is_idle())
                        .unwrap_or(false);
                    let mut fire = false;
                    if let Some(e) = reg.get_mut::<Enemy>(entity) {
                        e.attack_timer -= dt;
                        if e.attack_timer <= 0.0 && attack_idle {
                            fire = true;
                            e.attack_timer = e.attack_cooldown;
                        }
                    }
                    if fire {
                        let aim = (player_pos - pos).normalize_or_zero();
                        self.start_attack(reg, entity, &LIGHT, aim);
                    }
                }
                AiState::Dead => {}
            }
        }
    }

    // ── Hit resolution ───────────────────────────────────────────────────

    fn resolve_hits(&mut self, reg: &mut Registry, player: Entity) {
        for index in 0..self.pending_hits.len() {
            let hit_entity = self.pending_hits[index];
            let Some(hit) = reg.get::<PendingHit>(hit_entity).copied() else {
                continue;
            };
            if hit.from_player {
                self.resolve_player_hit(reg, &hit);
            } else {
                self.resolve_enemy_hit(reg, player, &hit);
            }
        }
    }

    fn resolve_player_hit(&mut self, reg: &mut Registry, hit: &PendingHit) {
        for entity in reg.entities_with::<Enemy>() {
            let alive = reg
                .get::<Health>(entity)
                .map(|h| !h.dead)
                .unwrap_or(false);
            if !alive {
                continue;
            }
            let (Some(pos), Some(half)) = (
                reg.get::<Transform>(entity).map(|t| t.pos),
                reg.get::<BodyBox>(entity).map(|b| b.half),
            ) else {
                continue;
            };
            let body = Aabb::from_center_half(pos, half);
            if !Aabb::new(hit.world_min, hit.world_max).intersects(&body) {
                continue;
            }

            let mut died = false;
            if let Some(hp) = reg.get_mut::<Health>(entity) {
                hp.current -= hit.damage;
                if hp.current <= 0.0 {
                    hp.current = 0.0;
                    hp.dead = true;
                    died = true;
                }
            }
            if let Some(enemy) = reg.get_mut::<Enemy>(entity) {
                enemy.knockback_vel = hit.knock_dir * hit.knockback;
                if died {
                    enemy.ai = AiState::Dead;
                }
            }
            if died {
                debug!("enemy {entity:?} slain");
            }
        }
    }

    fn resolve_enemy_hit(&mut self, reg: &mut Registry, player: Entity, hit: &PendingHit) {
        if !reg.exists(player) {
            return;
        }
        let dead = reg.get::<Health>(player).map(|h| h.dead).unwrap_or(true);
        if dead || reg.has::<Invincible>(player) {
            return;
        }
        if reg
            .get::<DodgeState>(player)
            .map(|d| d.has_iframes())
            .unwrap_or(false)
        {
            return;
        }
        let (Some(pos), Some(half)) = (
            reg.get::<Transform>(player).map(|t| t.pos),
            reg.get::<BodyBox>(player).map(|b| b.half),
        ) else {
            return;
        };
        let body = Aabb::from_center_half(pos, half);
        if !Aabb::new(hit.world_min, hit.world_max).intersects(&body) {
            return;
        }

        let parried = reg
            .get::<ParryState>(player)
            .map(|p| p.is_active())
            .unwrap_or(false);
        if parried {
            if let Some(parry) = reg.get_mut::<ParryState>(player) {
                parry.phase = ParryPhase::Cooldown;
                parry.timer = ParryState::COOLDOWN;
            }
            reg.insert(
                player,
                Invincible {
                    timer: PARRY_INVINCIBILITY,
                },
            );
            debug!("parried an incoming hit");
            return;
        }

        if let Some(hp) = reg.get_mut::<Health>(player) {
            hp.current -= hit.damage;
            if hp.current <= 0.0 {
                hp.current = 0.0;
                hp.dead = true;
            }
        }
        reg.insert(
            player,
            Invincible {
                timer: HIT_INVINCIBILITY,
            },
        );
    }

    fn clear_hits(&mut self, reg: &mut Registry) {
        for entity in self.pending_hits.drain(..) {
            reg.destroy(entity);
        }
    }

    fn tick_enemy_knockback(&mut self, reg: &mut Registry, dt: f32) {
        for entity in reg.entities_with::<Enemy>() {
            let Some(kb) = reg.get::<Enemy>(entity).map(|e| e.knockback_vel) else {
                continue;
            };
            if kb.length() < 0.01 {
                continue;
            }
            if let Some(t) = reg.get_mut::<Transform>(entity) {
                t.pos += kb * dt;
            }
            if let Some(e) = reg.get_mut::<Enemy>(entity) {
                e.knockback_vel *= (1.0 - 10.0 * dt).max(0.0);
            }
        }
    }
}

impl Default for CombatSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Yaw of a facing vector's XZ projection; zero faces -Z
fn yaw_of(facing: Vec3) -> f32 {
    facing.x.atan2(-facing.z)
}

/// Rotate around +Y; maps -Z onto the facing of `yaw_of`
fn rotate_yaw(v: Vec3, yaw: f32) -> Vec3 {
    let (sin, cos) = yaw.sin_cos();
    Vec3::new(v.x * cos - v.z * sin, v.y, v.x * sin + v.z * cos)
}
