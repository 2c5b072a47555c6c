//! # Registry Error Types
//!
//! All errors that can occur while manipulating entities, components and groups.
//!
//! Duplicate attaches and removals of things that are already gone are not
//! errors: they return normally and leave the registry untouched.

use thiserror::Error;

use crate::ecs::Entity;

/// Errors that can occur in the entity registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity is not known to the registry (never created, or destroyed).
    #[error("entity not found: {0}")]
    EntityNotFound(Entity),

    /// The entity exists but has no component of the requested type.
    #[error("{entity} has no component {component}")]
    ComponentNotFound {
        /// The entity that was queried.
        entity: Entity,
        /// Type name of the missing component.
        component: &'static str,
    },

    /// Every entity id up to the configured limit has been handed out.
    #[error("maximum entity id {limit} exceeded")]
    EntityIdsExhausted {
        /// The highest id the registry was allowed to assign.
        limit: u32,
    },

    /// A group query listed the same component type more than once.
    #[error("component type {0} appears more than once in a group query")]
    DuplicateComponentType(&'static str),

    /// Invalid configuration value or document.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for registry operations.
pub type EcsResult<T> = Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EcsError::ComponentNotFound {
            entity: Entity::from_raw(7),
            component: "Position",
        };
        assert_eq!(err.to_string(), "[Entity #7] has no component Position");

        let err = EcsError::EntityIdsExhausted { limit: 3 };
        assert_eq!(err.to_string(), "maximum entity id 3 exceeded");
    }
}
