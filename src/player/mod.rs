//! Player simulation: spawn gating, stamina-driven movement and sub-stepped
//! collision.

mod controller;

pub use controller::{MoveInput, PlayerController};
