//! # Group Views
//!
//! A [`GroupView`] pairs a shared [`GroupIndex`] with the stores of the
//! component types it was requested with. It is the handle systems keep
//! between frames: the registry updates the index in place, so the view never
//! needs to be re-acquired.
//!
//! ```text
//! GroupView<(Position, Velocity)>
//!   index ──> [E3, E7, E1]          (shared with GroupView<(Velocity, Position)>)
//!   stores ─> (Position store, Velocity store)
//!
//! each(f): for E in index → f(E, &mut pos[E], &mut vel[E])
//! ```
//!
//! The index and the stores are borrowed for the whole of `each`. Attaching,
//! detaching or destroying in a way that changes the iterated group's
//! membership from inside the visitor panics; use
//! [`EntityRegistry::destroy`] and flush afterwards.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::component::{Component, ComponentTypeId};
use super::entity::Entity;
use super::group::{GroupIndex, SubscriptionId};
use super::registry::EntityRegistry;
use super::storage::SharedStore;

/// A tuple of component types that can be requested as a group.
///
/// Implemented for `(A,)` through `(A, B, C, D, E, F)`.
pub trait GroupQuery: 'static {
    /// The shared stores, one per component type, in query order.
    type Stores: Clone;

    /// Registers every component type of the query and fetches its store.
    ///
    /// The ids come back in query order, duplicates included.
    fn acquire(registry: &mut EntityRegistry) -> (Vec<ComponentTypeId>, Self::Stores);
}

/// Live view over the entities holding every component of `Q`.
pub struct GroupView<Q: GroupQuery> {
    index: Rc<RefCell<GroupIndex>>,
    stores: Q::Stores,
}

impl<Q: GroupQuery> GroupView<Q> {
    pub(crate) fn new(index: Rc<RefCell<GroupIndex>>, stores: Q::Stores) -> Self {
        Self { index, stores }
    }

    /// Returns the number of entities currently in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.borrow().len()
    }

    /// Checks if the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.borrow().is_empty()
    }

    /// Checks if an entity is in the group.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index.borrow().contains(entity)
    }

    /// Copies out the current members, in iteration order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.index.borrow().as_slice().to_vec()
    }

    /// Checks if two views are backed by the same index.
    ///
    /// Views requested with the same component types in any order are.
    #[must_use]
    pub fn same_group<R: GroupQuery>(&self, other: &GroupView<R>) -> bool {
        Rc::ptr_eq(&self.index, &other.index)
    }

    /// Registers a callback fired after an entity enters the group.
    ///
    /// The callback runs once the index is updated and may read this view
    /// or unsubscribe.
    pub fn on_added<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(Entity) + 'static,
    {
        self.index.borrow_mut().on_added(listener)
    }

    /// Registers a callback fired after an entity leaves the group.
    pub fn on_removed<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(Entity) + 'static,
    {
        self.index.borrow_mut().on_removed(listener)
    }

    /// Drops a callback registered on this group.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.index.borrow_mut().unsubscribe(id)
    }
}

impl<Q: GroupQuery> Clone for GroupView<Q> {
    fn clone(&self) -> Self {
        Self {
            index: Rc::clone(&self.index),
            stores: self.stores.clone(),
        }
    }
}

impl<Q: GroupQuery> fmt::Debug for GroupView<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupView")
            .field("query", &std::any::type_name::<Q>())
            .field("entities", &self.index.borrow().as_slice())
            .finish()
    }
}

macro_rules! impl_group_query {
    ($($T:ident => $idx:tt / $store:ident),+) => {
        impl<$($T: Component),+> GroupQuery for ($($T,)+) {
            type Stores = ($(SharedStore<$T>,)+);

            fn acquire(registry: &mut EntityRegistry) -> (Vec<ComponentTypeId>, Self::Stores) {
                let ids = vec![$(registry.component_id::<$T>()),+];
                let stores = ($(registry.component_store::<$T>(),)+);
                (ids, stores)
            }
        }

        impl<$($T: Component),+> GroupView<($($T,)+)> {
            /// Visits every member with mutable access to its components.
            ///
            /// Visiting order is the index order, which is unstable across
            /// removals.
            ///
            /// # Panics
            ///
            /// Panics if the visitor changes this group's membership or
            /// borrows one of the iterated stores.
            pub fn each<Visit>(&self, mut visit: Visit)
            where
                Visit: FnMut(Entity, $(&mut $T),+),
            {
                let index = self.index.borrow();
                $(let mut $store = self.stores.$idx.borrow_mut();)+
                for &entity in index.as_slice() {
                    let slot = entity.index();
                    visit(entity, $($store.slot_mut(slot)),+);
                }
            }

            /// Mutable access to one entity's components, without checking
            /// that the entity is a member.
            ///
            /// Reading a non-member yields whatever the slots hold, typically
            /// default values.
            ///
            /// # Panics
            ///
            /// Panics if a store was never grown to cover `entity`.
            pub fn one<Visit, Out>(&self, entity: Entity, visit: Visit) -> Out
            where
                Visit: FnOnce($(&mut $T),+) -> Out,
            {
                $(let mut $store = self.stores.$idx.borrow_mut();)+
                let slot = entity.index();
                visit($($store.slot_mut(slot)),+)
            }
        }
    };
}

impl_group_query!(A => 0 / a);
impl_group_query!(A => 0 / a, B => 1 / b);
impl_group_query!(A => 0 / a, B => 1 / b, C => 2 / c);
impl_group_query!(A => 0 / a, B => 1 / b, C => 2 / c, D => 3 / d);
impl_group_query!(A => 0 / a, B => 1 / b, C => 2 / c, D => 3 / d, E => 4 / e);
impl_group_query!(A => 0 / a, B => 1 / b, C => 2 / c, D => 3 / d, E => 4 / e, F => 5 / f);

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::{Pod, Zeroable};

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Counter(u32);
    impl Component for Counter {}

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Step(u32);
    impl Component for Step {}

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Tag(u8);
    impl Component for Tag {}

    #[test]
    fn test_each_mutates_in_place() {
        let mut registry = EntityRegistry::new();
        let entity = registry.create_bundle((Counter(1), Step(2))).unwrap();
        let lone = registry.create_bundle((Counter(50),)).unwrap();

        let view = registry.group::<(Counter, Step)>().unwrap();
        view.each(|_, counter, step| counter.0 += step.0);
        view.each(|_, counter, step| counter.0 += step.0);

        assert_eq!(registry.get::<Counter>(entity).unwrap(), Counter(5));
        assert_eq!(registry.get::<Counter>(lone).unwrap(), Counter(50));
    }

    #[test]
    fn test_each_visits_members_once() {
        let mut registry = EntityRegistry::new();
        for i in 0..10 {
            registry.create_bundle((Counter(i),)).unwrap();
        }
        let view = registry.group::<(Counter,)>().unwrap();

        let mut seen = Vec::new();
        view.each(|entity, _| seen.push(entity));
        seen.sort();
        assert_eq!(seen.len(), 10);
        seen.dedup();
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn test_one_reads_and_writes() {
        let mut registry = EntityRegistry::new();
        let entity = registry.create_bundle((Counter(3), Step(4))).unwrap();
        let view = registry.group::<(Step, Counter)>().unwrap();

        let sum = view.one(entity, |step, counter| {
            counter.0 = 10;
            step.0 + counter.0
        });
        assert_eq!(sum, 14);
        assert_eq!(registry.get::<Counter>(entity).unwrap(), Counter(10));
    }

    #[test]
    fn test_one_on_non_member_sees_defaults() {
        let mut registry = EntityRegistry::new();
        let bare = registry.create();
        let view = registry.group::<(Counter,)>().unwrap();
        assert_eq!(view.one(bare, |counter| *counter), Counter(0));
    }

    #[test]
    fn test_view_stays_live() {
        let mut registry = EntityRegistry::new();
        let view = registry.group::<(Counter, Tag)>().unwrap();
        assert!(view.is_empty());

        let entity = registry.create_bundle((Counter(0), Tag(1))).unwrap();
        assert_eq!(view.entities(), vec![entity]);

        registry.detach::<Tag>(entity);
        assert!(view.is_empty());
    }

    #[test]
    fn test_destroy_during_iteration_is_deferred() {
        let mut registry = EntityRegistry::new();
        for i in 0..6 {
            registry.create_bundle((Counter(i),)).unwrap();
        }
        let view = registry.group::<(Counter,)>().unwrap();

        let mut doomed = Vec::new();
        view.each(|entity, counter| {
            if counter.0 % 2 == 0 {
                doomed.push(entity);
            }
        });
        for entity in doomed {
            registry.destroy(entity);
        }
        assert_eq!(view.len(), 6);

        registry.flush_destroyed();
        assert_eq!(view.len(), 3);
        view.each(|_, counter| assert_eq!(counter.0 % 2, 1));
    }

    #[test]
    fn test_notifications_from_view() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = EntityRegistry::new();
        let view = registry.group::<(Tag,)>().unwrap();

        let added = Rc::clone(&log);
        let sub = view.on_added(move |entity| added.borrow_mut().push(entity));

        let entity = registry.create_bundle((Tag(1),)).unwrap();
        assert_eq!(*log.borrow(), vec![entity]);

        assert!(view.unsubscribe(sub));
        registry.create_bundle((Tag(2),)).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_six_component_view() {
        #[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
        #[repr(C)]
        struct Wide(u16);
        impl Component for Wide {}

        #[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
        #[repr(C)]
        struct Bytes([u8; 8]);
        impl Component for Bytes {}

        #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
        #[repr(C)]
        struct Total(u32);
        impl Component for Total {}

        let mut registry = EntityRegistry::new();
        let entity = registry.create();
        registry
            .attach_bundle(entity, (Counter(1), Step(2), Tag(3), Wide(4)))
            .unwrap();
        registry.attach(entity, Bytes([5; 8])).unwrap();
        registry.attach(entity, Total(0)).unwrap();

        let view = registry
            .group::<(Counter, Step, Tag, Wide, Bytes, Total)>()
            .unwrap();
        assert!(view.contains(entity));
        view.each(|_, a, b, c, d, e, total| {
            total.0 = a.0 + b.0 + u32::from(c.0) + u32::from(d.0) + u32::from(e.0[0]);
        });
        assert_eq!(registry.get::<Total>(entity).unwrap(), Total(15));
    }

    #[test]
    fn test_listeners_read_their_own_group() {
        let mut registry = EntityRegistry::new();
        let view = registry.group::<(Tag,)>().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let (group, log) = (view.clone(), Rc::clone(&seen));
        view.on_added(move |entity| {
            log.borrow_mut()
                .push(("added", group.len(), group.contains(entity)));
        });
        let (group, log) = (view.clone(), Rc::clone(&seen));
        view.on_removed(move |entity| {
            log.borrow_mut()
                .push(("removed", group.len(), group.contains(entity)));
        });

        let first = registry.create();
        registry.attach(first, Tag(1)).unwrap();
        let second = registry.create_bundle((Tag(2),)).unwrap();
        registry.detach::<Tag>(first);
        registry.destroy(second);
        registry.flush_destroyed();

        assert_eq!(
            *seen.borrow(),
            vec![
                ("added", 1, true),
                ("added", 2, true),
                ("removed", 1, false),
                ("removed", 0, false),
            ]
        );
    }

    #[test]
    fn test_listener_unsubscribes_itself() {
        let mut registry = EntityRegistry::new();
        let view = registry.group::<(Counter,)>().unwrap();
        let fired = Rc::new(RefCell::new(Vec::new()));

        let own_id: Rc<RefCell<Option<SubscriptionId>>> = Rc::new(RefCell::new(None));
        let (group, log, slot) = (view.clone(), Rc::clone(&fired), Rc::clone(&own_id));
        let id = view.on_added(move |entity| {
            log.borrow_mut().push(entity);
            if let Some(id) = slot.borrow_mut().take() {
                assert!(group.unsubscribe(id));
            }
        });
        *own_id.borrow_mut() = Some(id);

        let first = registry.create_bundle((Counter(1),)).unwrap();
        registry.create_bundle((Counter(2),)).unwrap();
        assert_eq!(*fired.borrow(), vec![first]);
        assert!(!view.unsubscribe(id));
    }
}
