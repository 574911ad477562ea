//! Movement-side components shared by the player and enemies.

use glam::Vec3;

use crate::constants::{movement, stamina};

/// World-space position
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub pos: Vec3,
}

/// World-space velocity
#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity {
    pub vel: Vec3,
}

/// Axis-aligned body extents around the transform
#[derive(Debug, Clone, Copy)]
pub struct BodyBox {
    pub half: Vec3,
}

impl BodyBox {
    /// The player's capsule-stand-in box
    pub fn player() -> Self {
        Self {
            half: Vec3::new(
                movement::PLAYER_WIDTH * 0.5,
                movement::PLAYER_HEIGHT * 0.5,
                movement::PLAYER_WIDTH * 0.5,
            ),
        }
    }
}

/// Whether the entity stood on the surface after the last resolve
#[derive(Debug, Clone, Copy, Default)]
pub struct Grounded {
    pub on_ground: bool,
}

/// Stamina pool driving sprint, jumps, dodges and heavy attacks.
///
/// Draining it to zero flips `depleted`; regen only resumes after
/// `cooldown` runs out, so mashing at empty keeps the pool locked.
#[derive(Debug, Clone, Copy)]
pub struct Stamina {
    pub current: f32,
    pub max: f32,
    pub regen: f32,
    pub sprint_drain: f32,
    pub jump_cost: f32,
    pub depleted: bool,
    pub cooldown: f32,
}

impl Default for Stamina {
    fn default() -> Self {
        Self {
            current: stamina::MAX,
            max: stamina::MAX,
            regen: stamina::REGEN,
            sprint_drain: stamina::SPRINT_DRAIN,
            jump_cost: stamina::JUMP_COST,
            depleted: false,
            cooldown: 0.0,
        }
    }
}

impl Stamina {
    /// Pay a flat cost if the pool allows it
    pub fn try_spend(&mut self, cost: f32) -> bool {
        if self.depleted || self.current < cost {
            return false;
        }
        self.current -= cost;
        self.note_drain();
        true
    }

    /// Continuous drain (sprinting); silently bottoms out
    pub fn drain(&mut self, amount: f32) {
        if self.depleted {
            return;
        }
        self.current = (self.current - amount).max(0.0);
        self.note_drain();
    }

    pub fn tick(&mut self, dt: f32) {
        if self.depleted {
            self.cooldown -= dt;
            if self.cooldown <= 0.0 {
                self.depleted = false;
            }
            return;
        }
        self.current = (self.current + self.regen * dt).min(self.max);
    }

    fn note_drain(&mut self) {
        if self.current <= 0.0 {
            self.current = 0.0;
            self.depleted = true;
            self.cooldown = stamina::DEPLETE_COOLDOWN;
        }
    }
}
