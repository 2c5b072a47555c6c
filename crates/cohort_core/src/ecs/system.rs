//! # Component Systems
//!
//! A system is built once against a registry and keeps the stores and group
//! views it needs as plain fields. Nothing is looked up per frame.
//!
//! ```rust,ignore
//! struct Movement {
//!     bodies: GroupView<(Position, Velocity)>,
//! }
//!
//! impl ComponentSystem for Movement {
//!     fn setup(registry: &mut EntityRegistry) -> EcsResult<Self> {
//!         Ok(Self { bodies: registry.group()? })
//!     }
//! }
//!
//! let movement = registry.add_system::<Movement>()?;
//! ```

use super::registry::EntityRegistry;
use crate::error::EcsResult;

/// A unit of behavior wired to a registry at construction time.
pub trait ComponentSystem: Sized {
    /// Acquires the stores and groups this system works on.
    ///
    /// Called by [`EntityRegistry::add_system`].
    ///
    /// # Errors
    ///
    /// Returns any error raised while requesting groups, such as a query that
    /// names a component type twice.
    fn setup(registry: &mut EntityRegistry) -> EcsResult<Self>;
}
