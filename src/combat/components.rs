//! Combat-side components.

use glam::Vec3;

use super::data::AttackData;

#[derive(Debug, Clone, Copy)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    pub dead: bool,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            dead: false,
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPhase {
    Idle,
    Startup,
    Active,
    Recovery,
}

/// Current attack state; `timer` counts down inside the current phase
#[derive(Debug, Clone, Copy)]
pub struct AttackState {
    pub phase: AttackPhase,
    pub timer: f32,
    pub data: Option<&'static AttackData>,
}

impl Default for AttackState {
    fn default() -> Self {
        Self {
            phase: AttackPhase::Idle,
            timer: 0.0,
            data: None,
        }
    }
}

impl AttackState {
    pub fn is_idle(&self) -> bool {
        self.phase == AttackPhase::Idle
    }

    pub fn is_recovering(&self) -> bool {
        self.phase == AttackPhase::Recovery
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParryPhase {
    Idle,
    Active,
    Cooldown,
}

#[derive(Debug, Clone, Copy)]
pub struct ParryState {
    pub phase: ParryPhase,
    pub timer: f32,
}

impl ParryState {
    /// How long the parry window stays open
    pub const WINDOW: f32 = 0.20;
    pub const COOLDOWN: f32 = 0.50;

    pub fn is_active(&self) -> bool {
        self.phase == ParryPhase::Active
    }
}

impl Default for ParryState {
    fn default() -> Self {
        Self {
            phase: ParryPhase::Idle,
            timer: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DodgePhase {
    Idle,
    Rolling,
    Cooldown,
}

/// Dodge roll with i-frames at the start of the roll
#[derive(Debug, Clone, Copy)]
pub struct DodgeState {
    pub phase: DodgePhase,
    pub timer: f32,
    pub dir: Vec3,
    pub speed: f32,
}

impl DodgeState {
    pub const DURATION: f32 = 0.30;
    /// I-frame window inside the roll duration
    pub const IFRAMES: f32 = 0.20;
    pub const COOLDOWN: f32 = 0.50;
    pub const STAMINA_COST: f32 = 20.0;

    pub fn is_rolling(&self) -> bool {
        self.phase == DodgePhase::Rolling
    }

    pub fn has_iframes(&self) -> bool {
        self.phase == DodgePhase::Rolling && self.timer > Self::DURATION - Self::IFRAMES
    }

    pub fn can_dodge(&self) -> bool {
        self.phase == DodgePhase::Idle
    }
}

impl Default for DodgeState {
    fn default() -> Self {
        Self {
            phase: DodgePhase::Idle,
            timer: 0.0,
            dir: Vec3::new(0.0, 0.0, -1.0),
            speed: 12.0,
        }
    }
}

/// Remaining invincibility (i-frames, parry success)
#[derive(Debug, Clone, Copy)]
pub struct Invincible {
    pub timer: f32,
}

/// One-tick damage source. Created when an attack goes active, destroyed at
/// end of tick.
#[derive(Debug, Clone, Copy)]
pub struct PendingHit {
    pub world_min: Vec3,
    pub world_max: Vec3,
    pub damage: f32,
    pub knockback: f32,
    pub knock_dir: Vec3,
    /// Player-sourced hits damage enemies; enemy hits damage the player
    pub from_player: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiState {
    Patrol,
    Aggro,
    Attack,
    Dead,
}

#[derive(Debug, Clone, Copy)]
pub struct Enemy {
    pub ai: AiState,
    pub patrol_origin: Vec3,
    pub aggro_range: f32,
    pub attack_range: f32,
    pub attack_timer: f32,
    pub attack_cooldown: f32,
    pub knockback_vel: Vec3,
}

impl Enemy {
    pub fn at(patrol_origin: Vec3) -> Self {
        Self {
            ai: AiState::Patrol,
            patrol_origin,
            aggro_range: 12.0,
            attack_range: 1.8,
            attack_timer: 0.0,
            attack_cooldown: 1.5,
            knockback_vel: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iframes_cover_the_front_of_the_roll() {
        let mut dodge = DodgeState {
            phase: DodgePhase::Rolling,
            timer: DodgeState::DURATION,
            ..Default::default()
        };
        assert!(dodge.has_iframes());
        dodge.timer = DodgeState::DURATION - DodgeState::IFRAMES + 0.01;
        assert!(dodge.has_iframes());
        dodge.timer = DodgeState::DURATION - DodgeState::IFRAMES - 0.01;
        assert!(!dodge.has_iframes());
        dodge.phase = DodgePhase::Cooldown;
        dodge.timer = DodgeState::DURATION;
        assert!(!dodge.has_iframes());
    }
}
