//! # Entity Component Storage
//!
//! Entities, component stores and the group indices that tie them together.
//!
//! ## Design Philosophy
//!
//! - Entity ids are monotonic and never recycled
//! - A component lives in its type's store at the slot equal to the entity id
//! - Groups are kept current on every mutation, never rebuilt by scanning
//! - Single-threaded: stores and groups are shared through `Rc<RefCell<_>>`

mod bundle;
mod component;
mod entity;
mod group;
mod registry;
mod storage;
mod system;
mod view;

pub use bundle::{ComponentBundle, ComponentKind};
pub use component::{Component, ComponentMask, ComponentTypeId};
pub use entity::Entity;
pub use group::{GroupIndex, GroupKey, SubscriptionId};
pub use registry::EntityRegistry;
pub use storage::{ceil_power_of_two, ComponentStore, SharedStore};
pub use system::ComponentSystem;
pub use view::{GroupQuery, GroupView};
