//! # Component Bundles and Kinds
//!
//! Two ways to hand several components to the registry at once:
//!
//! - [`ComponentBundle`]: a tuple of concrete component types, resolved at
//!   compile time. `(Position, Velocity)` attaches both.
//! - [`ComponentKind`]: a closed enum over component types, for code that
//!   does not know the concrete types statically (spawners, snapshots).
//!   Declare one with [`component_kind!`](crate::component_kind).
//!
//! Both attach one component at a time, so groups are re-evaluated after
//! each component.

use super::component::Component;
use super::entity::Entity;
use super::registry::EntityRegistry;
use crate::error::EcsResult;

/// A tuple of components attached together.
///
/// Implemented for tuples of one to six components.
pub trait ComponentBundle {
    /// Attaches every component of the bundle to `entity`, in tuple order.
    ///
    /// # Errors
    ///
    /// Fails with the first error returned by [`EntityRegistry::attach`].
    fn attach_to(self, registry: &mut EntityRegistry, entity: Entity) -> EcsResult<()>;
}

macro_rules! impl_component_bundle {
    ($($T:ident / $value:ident),+) => {
        impl<$($T: Component),+> ComponentBundle for ($($T,)+) {
            fn attach_to(self, registry: &mut EntityRegistry, entity: Entity) -> EcsResult<()> {
                let ($($value,)+) = self;
                $(registry.attach(entity, $value)?;)+
                Ok(())
            }
        }
    };
}

impl_component_bundle!(A / a);
impl_component_bundle!(A / a, B / b);
impl_component_bundle!(A / a, B / b, C / c);
impl_component_bundle!(A / a, B / b, C / c, D / d);
impl_component_bundle!(A / a, B / b, C / c, D / d, E / e);
impl_component_bundle!(A / a, B / b, C / c, D / d, E / e, F / f);

/// A value that holds exactly one component out of a closed set of types.
///
/// Usually generated with [`component_kind!`](crate::component_kind) rather
/// than implemented by hand.
pub trait ComponentKind: Sized {
    /// Attaches the held component to `entity`.
    ///
    /// # Errors
    ///
    /// Returns the error of [`EntityRegistry::attach`].
    fn attach_to(self, registry: &mut EntityRegistry, entity: Entity) -> EcsResult<()>;

    /// Collects every component of the set that `entity` has, in declaration
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`](crate::EcsError::EntityNotFound)
    /// if the entity does not exist.
    fn collect_from(registry: &EntityRegistry, entity: Entity) -> EcsResult<Vec<Self>>;
}

/// Declares an enum over component types and implements
/// [`ComponentKind`](crate::ComponentKind) and `From<Component>` for it.
///
/// # Example
///
/// ```rust
/// use bytemuck::{Pod, Zeroable};
/// use cohort_core::{component_kind, Component, EntityRegistry};
///
/// #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
/// #[repr(C)]
/// struct Position { x: f32, y: f32 }
/// impl Component for Position {}
///
/// #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
/// #[repr(C)]
/// struct Health(u32);
/// impl Component for Health {}
///
/// component_kind! {
///     enum Spawnable {
///         Position(Position),
///         Health(Health),
///     }
/// }
///
/// let mut registry = EntityRegistry::new();
/// let entity = registry
///     .create_with([Spawnable::from(Health(3)), Position { x: 1.0, y: 0.0 }.into()])
///     .unwrap();
/// let parts = registry.components_of::<Spawnable>(entity).unwrap();
/// assert!(matches!(parts.as_slice(), [Spawnable::Position(_), Spawnable::Health(Health(3))]));
/// ```
#[macro_export]
macro_rules! component_kind {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident($ty:ty)
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant($ty),
            )+
        }

        $(
            impl ::core::convert::From<$ty> for $name {
                fn from(component: $ty) -> Self {
                    Self::$variant(component)
                }
            }
        )+

        impl $crate::ComponentKind for $name {
            fn attach_to(
                self,
                registry: &mut $crate::EntityRegistry,
                entity: $crate::Entity,
            ) -> $crate::EcsResult<()> {
                match self {
                    $(Self::$variant(component) => registry.attach(entity, component),)+
                }
            }

            fn collect_from(
                registry: &$crate::EntityRegistry,
                entity: $crate::Entity,
            ) -> $crate::EcsResult<::std::vec::Vec<Self>> {
                let mut components = ::std::vec::Vec::new();
                $(
                    if registry.has::<$ty>(entity)? {
                        components.push(Self::$variant(registry.get::<$ty>(entity)?));
                    }
                )+
                ::core::result::Result::Ok(components)
            }
        }
    };
}
