//! # Entity Identity
//!
//! Entities are plain integer handles. Ids are assigned monotonically starting
//! at 1 and are never reused, so a stale handle can never name a newer entity.
//! Id 0 is the "no entity" sentinel.

use std::fmt;

/// Unique identifier for an entity.
///
/// The raw value doubles as the slot index in every component store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// The "no entity" sentinel.
    pub const NONE: Self = Self(0);

    /// Wraps a raw id.
    ///
    /// Only the registry hands out live ids; this exists for tooling and tests.
    #[inline]
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the slot index in component stores.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this is the sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Entity #{}]", self.0)
    }
}

/// Hands out entity ids in increasing order.
#[derive(Debug)]
pub(crate) struct EntityAllocator {
    next: u64,
    limit: u32,
}

impl EntityAllocator {
    pub(crate) const fn new(limit: u32) -> Self {
        Self { next: 1, limit }
    }

    /// Returns the next id, or `None` once `limit` has been handed out.
    pub(crate) fn allocate(&mut self) -> Option<Entity> {
        if self.next > u64::from(self.limit) {
            return None;
        }
        let id = u32::try_from(self.next).ok()?;
        self.next += 1;
        Some(Entity(id))
    }

    pub(crate) const fn limit(&self) -> u32 {
        self.limit
    }
}
