//! # Cohort Core
//!
//! Entity/component storage engine with live component groups:
//! - Entities are opaque integer handles, never recycled
//! - Each component type lives in one dense, entity-indexed store
//! - A group is the set of entities holding a given combination of component
//!   types, maintained incrementally as components come and go
//!
//! ## Architecture Rules
//!
//! 1. **Groups never go stale** - every attach, detach and destroy updates them
//! 2. **Systems bind once** - views and stores are acquired at setup, not per frame
//! 3. **Destruction is deferred** - queue during iteration, flush between frames
//!
//! ## Example
//!
//! ```rust
//! use bytemuck::{Pod, Zeroable};
//! use cohort_core::{Component, EntityRegistry};
//!
//! #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
//! #[repr(C)]
//! struct Position { x: f32, y: f32 }
//! impl Component for Position {}
//!
//! #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
//! #[repr(C)]
//! struct Velocity { x: f32, y: f32 }
//! impl Component for Velocity {}
//!
//! let mut registry = EntityRegistry::new();
//! let bodies = registry.group::<(Position, Velocity)>().unwrap();
//!
//! let ship = registry.create();
//! registry.attach(ship, Position { x: 0.0, y: 0.0 }).unwrap();
//! registry.attach(ship, Velocity { x: 1.0, y: 2.0 }).unwrap();
//!
//! bodies.each(|_, pos, vel| {
//!     pos.x += vel.x;
//!     pos.y += vel.y;
//! });
//! assert_eq!(registry.get::<Position>(ship).unwrap(), Position { x: 1.0, y: 2.0 });
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::RegistryConfig;
pub use ecs::{
    ceil_power_of_two, Component, ComponentBundle, ComponentKind, ComponentMask, ComponentStore,
    ComponentSystem, ComponentTypeId, Entity, EntityRegistry, GroupIndex, GroupKey, GroupQuery,
    GroupView, SharedStore, SubscriptionId,
};
pub use error::{EcsError, EcsResult};
