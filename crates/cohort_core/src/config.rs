//! # Registry Configuration
//!
//! Tuning knobs for an [`EntityRegistry`](crate::EntityRegistry), loaded once at
//! startup. Values can come from code or from an external TOML document:
//!
//! ```toml
//! initial_store_capacity = 256
//! max_entity_id = 1000000
//! log_group_changes = false
//! ```

use serde::{Deserialize, Serialize};

use crate::ecs::ceil_power_of_two;
use crate::error::{EcsError, EcsResult};

/// Default first allocation of a component store.
pub const DEFAULT_STORE_CAPACITY: usize = 64;

/// Configuration for an entity registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Number of slots every component store allocates up front.
    ///
    /// Rounded up to a power of two when a store is created.
    pub initial_store_capacity: usize,
    /// Highest entity id `create` may assign. Id 0 is reserved.
    pub max_entity_id: u32,
    /// Emit a `trace` event for every group membership change.
    pub log_group_changes: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_store_capacity: DEFAULT_STORE_CAPACITY,
            max_entity_id: u32::MAX - 1,
            log_group_changes: false,
        }
    }
}

impl RegistryConfig {
    /// Parses and validates a configuration from a TOML document.
    ///
    /// Keys that are not present keep their default values.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the document cannot be parsed
    /// or a value is out of range.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] naming the offending key.
    pub fn validate(&self) -> EcsResult<()> {
        if self.initial_store_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "initial_store_capacity must be greater than zero".to_string(),
            ));
        }
        if self.max_entity_id == 0 {
            return Err(EcsError::InvalidConfig(
                "max_entity_id must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Store capacity actually allocated, rounded up to a power of two.
    #[must_use]
    pub fn store_capacity(&self) -> usize {
        ceil_power_of_two(self.initial_store_capacity)
    }
}
