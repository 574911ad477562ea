//! Immutable attack descriptors.
//!
//! All times in seconds; the active window is when the hitbox is live.
//! Fewer than ten moves exist, so a pair of consts beats any dispatch
//! machinery.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackData {
    /// Time before the hitbox activates
    pub startup: f32,
    /// Duration the hitbox is live
    pub active: f32,
    /// Time after the active window before the next action
    pub recovery: f32,
    pub damage: f32,
    pub knockback: f32,
    /// Hitbox center relative to the attacker, facing -Z
    pub hitbox_offset: Vec3,
    /// Hitbox AABB half extents
    pub hitbox_half: Vec3,
}

pub const LIGHT: AttackData = AttackData {
    startup: 0.15,
    active: 0.10,
    recovery: 0.30,
    damage: 15.0,
    knockback: 3.0,
    hitbox_offset: Vec3::new(0.0, 0.0, -0.9),
    hitbox_half: Vec3::new(0.4, 0.6, 0.5),
};

pub const HEAVY: AttackData = AttackData {
    startup: 0.30,
    active: 0.15,
    recovery: 0.55,
    damage: 35.0,
    knockback: 7.0,
    hitbox_offset: Vec3::new(0.0, 0.0, -1.1),
    hitbox_half: Vec3::new(0.6, 0.7, 0.6),
};

/// Stamina cost of a heavy attack
pub const HEAVY_STAMINA_COST: f32 = 25.0;
