//! # Entity Registry
//!
//! The central container for entities, component stores and groups. Every
//! component mutation flows through here so the groups never go stale.
//!
//! ## Group Maintenance
//!
//! ```text
//! attach / detach / destroy(E)
//!   └─ for every registered group K:
//!        typeSet(E) ⊇ K ?  ── yes ──> add E (no-op if present)
//!                         └─ no ───> remove E (no-op if absent)
//! ```
//!
//! This costs O(G) per mutation, G being the number of distinct groups,
//! which is fixed by the set of systems rather than by the entity count.
//!
//! ## Deferred Destruction
//!
//! `destroy` only queues the entity. It stays fully indexed until
//! `flush_destroyed`, so destroying from inside a group iteration is safe.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, error, trace};

use super::bundle::{ComponentBundle, ComponentKind};
use super::component::{Component, ComponentMask, ComponentTypeId, ComponentTypes};
use super::entity::{Entity, EntityAllocator};
use super::group::{GroupIndex, GroupKey};
use super::storage::{ComponentStore, ErasedStore, SharedStore};
use super::system::ComponentSystem;
use super::view::{GroupQuery, GroupView};
use crate::config::RegistryConfig;
use crate::error::{EcsError, EcsResult};

/// A registered group: its key, the key's mask, and the shared index.
struct GroupSlot {
    key: GroupKey,
    mask: ComponentMask,
    index: Rc<RefCell<GroupIndex>>,
}

/// Owner of all entities, component stores and group indices.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = EntityRegistry::new();
/// let entity = registry.create();
/// registry.attach(entity, Position::new(0.0, 0.0))?;
/// registry.attach(entity, Velocity::new(1.0, 0.0))?;
///
/// let bodies = registry.group::<(Position, Velocity)>()?;
/// bodies.each(|_, pos, vel| pos.x += vel.x);
/// ```
pub struct EntityRegistry {
    config: RegistryConfig,
    ids: EntityAllocator,
    /// Live entity -> attached component types. Presence here is liveness.
    entities: HashMap<Entity, ComponentMask>,
    types: ComponentTypes,
    /// One store per component type, indexed by `ComponentTypeId`.
    stores: Vec<Box<dyn ErasedStore>>,
    groups: Vec<GroupSlot>,
    group_lookup: HashMap<GroupKey, usize>,
    /// Entities queued by `destroy`, in queue order.
    pending_destroy: Vec<Entity>,
    pending_lookup: HashSet<Entity>,
}

impl EntityRegistry {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(RegistryConfig::default())
    }

    /// Creates an empty registry with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the configuration is rejected.
    pub fn with_config(config: RegistryConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RegistryConfig) -> Self {
        Self {
            ids: EntityAllocator::new(config.max_entity_id),
            config,
            entities: HashMap::new(),
            types: ComponentTypes::default(),
            stores: Vec::new(),
            groups: Vec::new(),
            group_lookup: HashMap::new(),
            pending_destroy: Vec::new(),
            pending_lookup: HashSet::new(),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Creates an entity with no components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityIdsExhausted`] once `max_entity_id` ids have
    /// been handed out. Ids are never recycled.
    pub fn try_create(&mut self) -> EcsResult<Entity> {
        let entity = self.ids.allocate().ok_or(EcsError::EntityIdsExhausted {
            limit: self.ids.limit(),
        })?;
        self.entities.insert(entity, ComponentMask::new());
        Ok(entity)
    }

    /// Creates an entity with no components.
    ///
    /// # Panics
    ///
    /// Panics when the entity id space is exhausted. That is a fatal
    /// condition; use [`try_create`](Self::try_create) to observe it.
    pub fn create(&mut self) -> Entity {
        match self.try_create() {
            Ok(entity) => entity,
            Err(err) => {
                error!("entity creation failed: {}", err);
                panic!("{err}");
            }
        }
    }

    /// Creates an entity and attaches each component in turn.
    ///
    /// Groups are re-evaluated once per attached component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityIdsExhausted`] if no id is left.
    pub fn create_with<K, I>(&mut self, components: I) -> EcsResult<Entity>
    where
        K: ComponentKind,
        I: IntoIterator<Item = K>,
    {
        let entity = self.try_create()?;
        self.attach_all(entity, components)?;
        Ok(entity)
    }

    /// Creates an entity from a tuple of components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityIdsExhausted`] if no id is left.
    pub fn create_bundle<B: ComponentBundle>(&mut self, bundle: B) -> EcsResult<Entity> {
        let entity = self.try_create()?;
        bundle.attach_to(self, entity)?;
        Ok(entity)
    }

    /// Queues an entity for destruction at the next [`flush_destroyed`](Self::flush_destroyed).
    ///
    /// No-op if the entity is not alive or already queued. Storage and groups
    /// are untouched until the flush.
    pub fn destroy(&mut self, entity: Entity) {
        if self.entities.contains_key(&entity) && self.pending_lookup.insert(entity) {
            self.pending_destroy.push(entity);
        }
    }

    /// Destroys an entity right away.
    ///
    /// The entity leaves every group and each of its component slots is reset
    /// to the default value. No-op if the entity is not alive.
    pub fn destroy_immediate(&mut self, entity: Entity) {
        let Some(types) = self.entities.remove(&entity) else {
            return;
        };
        self.pending_lookup.remove(&entity);

        for group in &self.groups {
            if group.index.borrow().contains(entity) {
                GroupIndex::remove_shared(&group.index, entity);
                self.log_group_change("removed", entity, &group.key);
            }
        }

        for id in types.iter() {
            self.stores[id.index()].reset_slot(entity.index());
        }
    }

    /// Destroys every entity queued by [`destroy`](Self::destroy).
    ///
    /// Call once per frame boundary when using deferred destruction.
    /// Returns the number of entities destroyed.
    pub fn flush_destroyed(&mut self) -> usize {
        let queued = std::mem::take(&mut self.pending_destroy);
        let mut destroyed = 0;
        for entity in queued {
            if self.entities.contains_key(&entity) {
                self.destroy_immediate(entity);
                destroyed += 1;
            }
        }
        self.pending_lookup.clear();

        if destroyed > 0 {
            debug!("flushed {} destroyed entities", destroyed);
        }
        destroyed
    }

    /// Checks if an entity exists (queued entities still count as alive).
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Checks if an entity is queued for destruction.
    ///
    /// Queued entities are logically dead but still indexed until the flush.
    #[inline]
    #[must_use]
    pub fn is_pending_destroy(&self, entity: Entity) -> bool {
        self.pending_lookup.contains(&entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the number of entities waiting for the next flush.
    #[must_use]
    pub fn pending_destroy_count(&self) -> usize {
        self.pending_lookup.len()
    }

    /// Iterates over the live entities in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys().copied()
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches a component.
    ///
    /// If the entity already has a component of this type, nothing happens:
    /// the first write wins. Otherwise the value is stored and the entity
    /// joins every group it now satisfies.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive.
    pub fn attach<C: Component>(&mut self, entity: Entity, component: C) -> EcsResult<()> {
        if !self.entities.contains_key(&entity) {
            return Err(EcsError::EntityNotFound(entity));
        }

        let id = self.component_id::<C>();
        let Some(types) = self.entities.get_mut(&entity) else {
            return Err(EcsError::EntityNotFound(entity));
        };
        if !types.insert(id) {
            return Ok(());
        }

        self.typed_store::<C>(id)
            .borrow_mut()
            .set(entity.index(), component);
        self.refresh_groups(entity);
        Ok(())
    }

    /// Attaches several components given as [`ComponentKind`] values.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive.
    pub fn attach_all<K, I>(&mut self, entity: Entity, components: I) -> EcsResult<()>
    where
        K: ComponentKind,
        I: IntoIterator<Item = K>,
    {
        if !self.entities.contains_key(&entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        for component in components {
            component.attach_to(self, entity)?;
        }
        Ok(())
    }

    /// Attaches a tuple of components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive.
    pub fn attach_bundle<B: ComponentBundle>(&mut self, entity: Entity, bundle: B) -> EcsResult<()> {
        bundle.attach_to(self, entity)
    }

    /// Detaches a component, resetting its slot and leaving every group whose
    /// key included it.
    ///
    /// Returns `false` (and does nothing) if the entity is unknown or lacks
    /// the component.
    pub fn detach<C: Component>(&mut self, entity: Entity) -> bool {
        let Some(id) = self.types.get::<C>() else {
            return false;
        };
        let Some(types) = self.entities.get_mut(&entity) else {
            return false;
        };
        if !types.remove(id) {
            return false;
        }

        self.stores[id.index()].reset_slot(entity.index());
        self.refresh_groups(entity);
        true
    }

    /// Checks if an entity has a component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist, so
    /// "no such component" and "no such entity" stay distinguishable.
    pub fn has<C: Component>(&self, entity: Entity) -> EcsResult<bool> {
        let types = self.types_of(entity)?;
        Ok(self.types.get::<C>().is_some_and(|id| types.contains(id)))
    }

    /// Returns a copy of a component.
    ///
    /// Use group iteration for in-place mutation.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotFound`].
    pub fn get<C: Component>(&self, entity: Entity) -> EcsResult<C> {
        let id = self.require::<C>(entity)?;
        let value = self.typed_store::<C>(id).borrow().get(entity.index()).copied();
        value.ok_or(EcsError::ComponentNotFound {
            entity,
            component: std::any::type_name::<C>(),
        })
    }

    /// Overwrites an attached component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotFound`].
    /// `set` never attaches; use [`attach`](Self::attach) for that.
    pub fn set<C: Component>(&mut self, entity: Entity, component: C) -> EcsResult<()> {
        let id = self.require::<C>(entity)?;
        self.typed_store::<C>(id)
            .borrow_mut()
            .set(entity.index(), component);
        Ok(())
    }

    /// Snapshot of every component on an entity that `K` can represent.
    ///
    /// Components come back in the variant order of `K`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn components_of<K: ComponentKind>(&self, entity: Entity) -> EcsResult<Vec<K>> {
        self.types_of(entity)?;
        K::collect_from(self, entity)
    }

    /// Returns the set of component types attached to an entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn types_of(&self, entity: Entity) -> EcsResult<&ComponentMask> {
        self.entities
            .get(&entity)
            .ok_or(EcsError::EntityNotFound(entity))
    }

    // =========================================================================
    // Stores and groups
    // =========================================================================

    /// Returns the store for `C`, creating it on first use.
    pub fn component_store<C: Component>(&mut self) -> SharedStore<C> {
        let id = self.component_id::<C>();
        Rc::clone(self.typed_store::<C>(id))
    }

    /// Returns the registry-local id of `C`, creating its store on first use.
    pub fn component_id<C: Component>(&mut self) -> ComponentTypeId {
        let (id, is_new) = self.types.register::<C>();
        if is_new {
            let capacity = self.config.store_capacity();
            let store: SharedStore<C> = Rc::new(RefCell::new(ComponentStore::new(capacity)));
            self.stores.push(Box::new(store));
            debug!(
                "created component store for {} with capacity {}",
                std::any::type_name::<C>(),
                capacity
            );
        }
        id
    }

    /// Returns the view over every entity that has all components of `Q`.
    ///
    /// The underlying index is built on first request (seeded with every
    /// matching entity) and shared by all later requests for the same type
    /// combination, in any order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponentType`] if `Q` names a type twice.
    pub fn group<Q: GroupQuery>(&mut self) -> EcsResult<GroupView<Q>> {
        let (ids, stores) = Q::acquire(self);

        let key = GroupKey::new(ids.clone());
        if key.len() != ids.len() {
            let duplicate = ids
                .iter()
                .enumerate()
                .find(|&(i, id)| ids[..i].contains(id))
                .map_or("<unknown>", |(_, id)| self.types.name(*id));
            return Err(EcsError::DuplicateComponentType(duplicate));
        }

        let index = self.group_index(key);
        Ok(GroupView::new(index, stores))
    }

    /// Builds the system and lets it acquire its stores and groups.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by the system's setup.
    pub fn add_system<S: ComponentSystem>(&mut self) -> EcsResult<S> {
        S::setup(self)
    }

    /// Returns the number of registered groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the number of component types seen so far.
    #[must_use]
    pub fn component_type_count(&self) -> usize {
        self.types.len()
    }

    fn group_index(&mut self, key: GroupKey) -> Rc<RefCell<GroupIndex>> {
        if let Some(&slot) = self.group_lookup.get(&key) {
            return Rc::clone(&self.groups[slot].index);
        }

        let mask = key.to_mask();
        let mut matching: Vec<Entity> = self
            .entities
            .iter()
            .filter(|(_, types)| types.is_superset(&mask))
            .map(|(&entity, _)| entity)
            .collect();
        matching.sort_unstable();

        let mut index = GroupIndex::new();
        for &entity in &matching {
            index.add(entity);
        }

        let names: Vec<&str> = key.types().iter().map(|&id| self.types.name(id)).collect();
        debug!("created group {:?} seeded with {} entities", names, matching.len());

        let index = Rc::new(RefCell::new(index));
        self.group_lookup.insert(key.clone(), self.groups.len());
        self.groups.push(GroupSlot {
            key,
            mask,
            index: Rc::clone(&index),
        });
        index
    }

    /// Re-evaluates every group against the entity's current type set.
    fn refresh_groups(&self, entity: Entity) {
        let Some(types) = self.entities.get(&entity) else {
            return;
        };

        for group in &self.groups {
            let matches = types.is_superset(&group.mask);
            let present = group.index.borrow().contains(entity);
            if matches && !present {
                GroupIndex::add_shared(&group.index, entity);
                self.log_group_change("added", entity, &group.key);
            } else if !matches && present {
                GroupIndex::remove_shared(&group.index, entity);
                self.log_group_change("removed", entity, &group.key);
            }
        }
    }

    fn log_group_change(&self, change: &str, entity: Entity, key: &GroupKey) {
        if self.config.log_group_changes {
            trace!("{} {} group {:?}", entity, change, key.types());
        }
    }

    /// Resolves `C` for an entity that must have it.
    fn require<C: Component>(&self, entity: Entity) -> EcsResult<ComponentTypeId> {
        let types = self.types_of(entity)?;
        self.types
            .get::<C>()
            .filter(|&id| types.contains(id))
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: std::any::type_name::<C>(),
            })
    }

    fn typed_store<C: Component>(&self, id: ComponentTypeId) -> &SharedStore<C> {
        self.stores[id.index()]
            .as_any()
            .downcast_ref::<SharedStore<C>>()
            .expect("the store at a type id is always the SharedStore of that type")
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("alive", &self.entities.len())
            .field("pending_destroy", &self.pending_destroy.len())
            .field("component_types", &self.types.len())
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}
