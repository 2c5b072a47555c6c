//! # Component Storage
//!
//! Dense storage for a single component type, addressed directly by entity id:
//! the entity id IS the array index. There is no indirection table.
//!
//! - Access is O(1) via entity index
//! - Iteration over a group touches one slot per store per entity
//! - Capacity grows to the next power of two when an id falls outside it,
//!   and never shrinks
//!
//! Whether a slot is meaningful is tracked by the registry, not by the store.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::component::Component;

/// Store shared between the registry and every view that reads it.
pub type SharedStore<C> = Rc<RefCell<ComponentStore<C>>>;

/// Rounds `x` up to the next power of two. Values below 2 round to 1.
///
/// # Example
///
/// ```rust
/// use cohort_core::ceil_power_of_two;
///
/// assert_eq!(ceil_power_of_two(0), 1);
/// assert_eq!(ceil_power_of_two(64), 64);
/// assert_eq!(ceil_power_of_two(65), 128);
/// ```
#[inline]
#[must_use]
pub fn ceil_power_of_two(x: usize) -> usize {
    if x < 2 {
        1
    } else {
        x.next_power_of_two()
    }
}

/// Entity-indexed storage for one component type.
///
/// # Type Parameters
///
/// * `C` - The component type to store
///
/// # Example
///
/// ```rust,ignore
/// let mut storage: ComponentStore<Position> = ComponentStore::new(64);
/// storage.set(100, Position::new(1.0, 2.0));
/// assert_eq!(storage.capacity(), 128);
/// ```
#[derive(Debug)]
pub struct ComponentStore<C: Component> {
    /// Slot `i` belongs to entity id `i`.
    data: Vec<C>,
}

impl<C: Component> ComponentStore<C> {
    /// Creates a store with `capacity` slots (rounded up to a power of two),
    /// all holding the component's default value.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![C::default(); ceil_power_of_two(capacity)],
        }
    }

    /// Returns the number of slots currently allocated.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Gets the slot for an entity index.
    ///
    /// Returns `None` only if the index was never grown into. A `Some` says
    /// nothing about whether the entity actually has the component.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.data.get(index)
    }

    /// Gets the mutable slot for an entity index.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.data.get_mut(index)
    }

    /// Writes a component, growing the store if `index` is out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize, component: C) {
        self.ensure_slot(index);
        self.data[index] = component;
    }

    /// Resets a slot to the default value. Out-of-range indices are ignored.
    #[inline]
    pub fn reset(&mut self, index: usize) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = C::default();
        }
    }

    /// Returns a slice of all slots, including unused ones.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.data
    }

    /// Mutable slot access for group iteration.
    ///
    /// # Panics
    ///
    /// Panics if `index` was never grown into. Group members always have a
    /// written slot, so this only fires on a caller bug.
    #[inline]
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut C {
        &mut self.data[index]
    }

    fn ensure_slot(&mut self, index: usize) {
        if index >= self.data.len() {
            let new_capacity = ceil_power_of_two(index + 1);
            self.data.resize(new_capacity, C::default());
        }
    }
}

/// Type-erased view of a shared store, for the registry's untyped paths.
pub(crate) trait ErasedStore {
    /// Resets the slot of `index` to the default value.
    fn reset_slot(&self, index: usize);

    /// Access to the concrete `SharedStore<C>` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<C: Component> ErasedStore for SharedStore<C> {
    fn reset_slot(&self, index: usize) {
        self.borrow_mut().reset(index);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
