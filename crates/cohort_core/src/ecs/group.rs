//! # Group Indices
//!
//! A group is the live set of entities whose component types are a superset
//! of a fixed key. The registry re-evaluates every group whenever an entity's
//! type set changes, so consumers never scan the whole population.
//!
//! ## Swap-Remove
//!
//! ```text
//! remove(B):  [A, B, C, D]  ->  [A, D, C]
//!                 ^      |
//!                 +------+  last entity moves into the hole
//! ```
//!
//! Membership is O(1) through the position map, removal is O(1), and the
//! order of the sequence is unstable across removals.
//!
//! ## Notifications
//!
//! When the index lives in a `RefCell` shared with views, listeners run only
//! after the mutable borrow is released, so a listener may read the group it
//! is subscribed to (or unsubscribe) without a borrow conflict.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use super::component::{ComponentMask, ComponentTypeId};
use super::entity::Entity;

/// Canonical key for a combination of component types.
///
/// The type list is sorted and deduplicated, so `(A, B)` and `(B, A)` produce
/// the same key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey {
    /// Sorted list of component type ids.
    types: Vec<ComponentTypeId>,
}

impl GroupKey {
    /// Creates a key from component type ids in any order.
    #[must_use]
    pub fn new(mut types: Vec<ComponentTypeId>) -> Self {
        types.sort_unstable();
        types.dedup();
        Self { types }
    }

    /// Returns the sorted type ids.
    #[must_use]
    pub fn types(&self) -> &[ComponentTypeId] {
        &self.types
    }

    /// Returns the number of component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Checks if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Builds the bitmask used for superset tests.
    #[must_use]
    pub fn to_mask(&self) -> ComponentMask {
        self.types.iter().copied().collect()
    }
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback fired with the entity that entered or left a group.
type Listener = Box<dyn FnMut(Entity)>;

/// Which side of a membership change a listener observes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    Added,
    Removed,
}

/// Dense, order-unstable list of the entities in one group.
#[derive(Default)]
pub struct GroupIndex {
    /// Members, densely packed.
    entities: Vec<Entity>,
    /// Position of each member in `entities`.
    positions: HashMap<Entity, usize>,
    added_listeners: Vec<(SubscriptionId, Listener)>,
    removed_listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    /// Listeners taken out of the index while they are being called.
    in_flight: Vec<SubscriptionId>,
    /// In-flight listeners unsubscribed during their dispatch.
    cancelled: Vec<SubscriptionId>,
}

impl GroupIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity. Returns `false` if it was already present.
    ///
    /// Fires the added listeners when the entity is new.
    pub fn add(&mut self, entity: Entity) -> bool {
        if !self.insert(entity) {
            return false;
        }
        for (_, listener) in &mut self.added_listeners {
            listener(entity);
        }
        true
    }

    /// Removes an entity with swap-remove. Returns `false` if it was absent.
    ///
    /// Fires the removed listeners when the entity was present.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if !self.evict(entity) {
            return false;
        }
        for (_, listener) in &mut self.removed_listeners {
            listener(entity);
        }
        true
    }

    /// [`add`](Self::add) on a shared index, firing the listeners with no
    /// borrow held.
    pub(crate) fn add_shared(cell: &RefCell<Self>, entity: Entity) -> bool {
        let added = cell.borrow_mut().insert(entity);
        if added {
            Self::dispatch(cell, Transition::Added, entity);
        }
        added
    }

    /// [`remove`](Self::remove) on a shared index, firing the listeners with
    /// no borrow held.
    pub(crate) fn remove_shared(cell: &RefCell<Self>, entity: Entity) -> bool {
        let removed = cell.borrow_mut().evict(entity);
        if removed {
            Self::dispatch(cell, Transition::Removed, entity);
        }
        removed
    }

    fn insert(&mut self, entity: Entity) -> bool {
        if self.positions.contains_key(&entity) {
            return false;
        }
        self.positions.insert(entity, self.entities.len());
        self.entities.push(entity);
        true
    }

    fn evict(&mut self, entity: Entity) -> bool {
        let Some(index) = self.positions.remove(&entity) else {
            return false;
        };

        self.entities.swap_remove(index);
        // The former last entity now sits at `index`, unless we removed the last one
        if let Some(&moved) = self.entities.get(index) {
            self.positions.insert(moved, index);
        }
        true
    }

    fn listeners_mut(&mut self, transition: Transition) -> &mut Vec<(SubscriptionId, Listener)> {
        match transition {
            Transition::Added => &mut self.added_listeners,
            Transition::Removed => &mut self.removed_listeners,
        }
    }

    /// Calls the listeners of `transition` outside the borrow.
    ///
    /// Subscriptions made during the calls are kept after the existing ones;
    /// listeners unsubscribed during the calls are dropped.
    fn dispatch(cell: &RefCell<Self>, transition: Transition, entity: Entity) {
        let mut listeners = {
            let mut index = cell.borrow_mut();
            let taken = std::mem::take(index.listeners_mut(transition));
            if taken.is_empty() {
                return;
            }
            index.in_flight.extend(taken.iter().map(|(id, _)| *id));
            taken
        };

        for (_, listener) in &mut listeners {
            listener(entity);
        }

        let mut index = cell.borrow_mut();
        let cancelled = std::mem::take(&mut index.cancelled);
        index.in_flight.clear();
        listeners.retain(|(id, _)| !cancelled.contains(id));
        let subscribed_meanwhile = std::mem::replace(index.listeners_mut(transition), listeners);
        index.listeners_mut(transition).extend(subscribed_meanwhile);
    }

    /// Checks membership in O(1).
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.positions.contains_key(&entity)
    }

    /// Returns the number of members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Checks if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns the members in their current (unstable) order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    /// Registers a callback fired after an entity enters the group.
    pub fn on_added<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(Entity) + 'static,
    {
        let id = self.next_subscription_id();
        self.added_listeners.push((id, Box::new(listener)));
        id
    }

    /// Registers a callback fired after an entity leaves the group.
    pub fn on_removed<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(Entity) + 'static,
    {
        let id = self.next_subscription_id();
        self.removed_listeners.push((id, Box::new(listener)));
        id
    }

    /// Drops a callback. Returns `false` if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.added_listeners.len() + self.removed_listeners.len();
        self.added_listeners.retain(|(sub, _)| *sub != id);
        self.removed_listeners.retain(|(sub, _)| *sub != id);
        if before != self.added_listeners.len() + self.removed_listeners.len() {
            return true;
        }
        if self.in_flight.contains(&id) && !self.cancelled.contains(&id) {
            self.cancelled.push(id);
            return true;
        }
        false
    }

    fn next_subscription_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        id
    }
}

impl fmt::Debug for GroupIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupIndex")
            .field("entities", &self.entities)
            .field("added_listeners", &self.added_listeners.len())
            .field("removed_listeners", &self.removed_listeners.len())
            .finish_non_exhaustive()
    }
}
