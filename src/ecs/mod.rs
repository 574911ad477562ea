//! Entity-component store for the simulation.
//!
//! Owned by the simulation thread; cross-references between game objects are
//! always entity ids into this registry, never owning references. Workers
//! neither read nor write components.

mod component;
mod components;
mod entity;
mod registry;

pub use component::{Component, ComponentStorage};
pub use components::{BodyBox, Grounded, Stamina, Transform, Velocity};
pub use entity::{Entity, EntityAllocator};
pub use registry::{EntityBuilder, Registry};
