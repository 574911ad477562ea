//! Frame-data driven melee combat: timed attack/parry/dodge state machines,
//! one-tick hitbox entities, damage resolution and a small enemy AI.

mod components;
mod data;
mod system;

pub use components::{
    AiState, AttackPhase, AttackState, DodgePhase, DodgeState, Enemy, Health, Invincible,
    ParryPhase, ParryState, PendingHit,
};
pub use data::{AttackData, HEAVY, LIGHT};
pub use system::CombatSystem;
