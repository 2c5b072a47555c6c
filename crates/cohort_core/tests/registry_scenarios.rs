//! # Registry Scenarios
//!
//! End-to-end flows through the public API: group lifecycle, deferred
//! destruction, idempotent no-ops, system wiring and configuration.

use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use cohort_core::{
    component_kind, Component, ComponentSystem, EcsError, EcsResult, Entity, EntityRegistry,
    GroupView, RegistryConfig, SharedStore,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
}
impl Component for Velocity {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
struct Health(i32);
impl Component for Health {}

component_kind! {
    #[derive(PartialEq)]
    enum Archetypal {
        Position(Position),
        Velocity(Velocity),
        Health(Health),
    }
}

#[test]
fn test_position_velocity_lifecycle() {
    let mut registry = EntityRegistry::new();
    let entity = registry.create();
    registry.attach(entity, Position { x: 1.0, y: 1.0 }).unwrap();
    registry.attach(entity, Velocity { x: 0.5, y: 0.0 }).unwrap();

    let moving = registry.group::<(Position, Velocity)>().unwrap();
    assert!(moving.contains(entity));

    registry.detach::<Velocity>(entity);
    let placed = registry.group::<(Position,)>().unwrap();
    assert!(!moving.contains(entity));
    assert!(placed.contains(entity));

    registry.destroy(entity);
    registry.flush_destroyed();
    assert!(!moving.contains(entity));
    assert!(!placed.contains(entity));
    assert_eq!(
        registry.has::<Position>(entity),
        Err(EcsError::EntityNotFound(entity))
    );
}

#[test]
fn test_even_ids_group() {
    let mut registry = EntityRegistry::new();
    for _ in 0..1000 {
        let entity = registry.create();
        if entity.id() % 2 == 0 {
            registry.attach(entity, Position::default()).unwrap();
        }
    }

    let placed = registry.group::<(Position,)>().unwrap();
    assert_eq!(placed.len(), 500);
    assert!(placed.entities().iter().all(|entity| entity.id() % 2 == 0));
}

#[test]
fn test_attach_detach_restores_type_set() {
    let mut registry = EntityRegistry::new();
    let entity = registry.create();
    registry.attach(entity, Health(5)).unwrap();
    let before = registry.types_of(entity).unwrap().clone();

    registry.attach(entity, Velocity::default()).unwrap();
    registry.detach::<Velocity>(entity);

    assert_eq!(registry.types_of(entity).unwrap(), &before);
    assert!(!registry.has::<Velocity>(entity).unwrap());
    assert_eq!(registry.get::<Health>(entity).unwrap(), Health(5));
}

#[test]
fn test_deferred_destroy_keeps_entity_indexed() {
    let mut registry = EntityRegistry::new();
    let living = registry.group::<(Health,)>().unwrap();
    let entity = registry.create_bundle((Health(9), Position::default())).unwrap();

    registry.destroy(entity);
    assert!(living.contains(entity));
    assert!(registry.has::<Health>(entity).unwrap());
    assert_eq!(registry.get::<Health>(entity).unwrap(), Health(9));

    registry.flush_destroyed();
    assert!(!living.contains(entity));
    assert!(!registry.is_alive(entity));

    let health = registry.component_store::<Health>();
    let position = registry.component_store::<Position>();
    assert_eq!(health.borrow().get(entity.index()), Some(&Health::default()));
    assert_eq!(position.borrow().get(entity.index()), Some(&Position::default()));
}

#[test]
fn test_destroy_while_iterating() {
    let mut registry = EntityRegistry::new();
    for i in 0..10 {
        registry.create_bundle((Health(i),)).unwrap();
    }
    let living = registry.group::<(Health,)>().unwrap();

    let mut dying = Vec::new();
    living.each(|entity, health| {
        health.0 -= 5;
        if health.0 <= 0 {
            dying.push(entity);
        }
    });
    for entity in dying {
        registry.destroy(entity);
    }

    assert_eq!(registry.flush_destroyed(), 6);
    assert_eq!(living.len(), 4);
    living.each(|_, health| assert!(health.0 > 0));
}

#[test]
fn test_idempotent_operations() {
    let mut registry = EntityRegistry::new();
    let group = registry.group::<(Health,)>().unwrap();
    let entity = registry.create();

    registry.attach(entity, Health(1)).unwrap();
    registry.attach(entity, Health(2)).unwrap();
    assert_eq!(group.len(), 1);
    assert_eq!(registry.get::<Health>(entity).unwrap(), Health(1));

    let ghost = Entity::from_raw(4_000);
    assert!(!registry.detach::<Health>(ghost));
    assert!(!registry.detach::<Velocity>(entity));
    registry.destroy(ghost);
    registry.destroy_immediate(ghost);
    assert_eq!(registry.pending_destroy_count(), 0);
    assert_eq!(registry.alive_count(), 1);
    assert_eq!(group.entities(), vec![entity]);
}

#[test]
fn test_untyped_create_and_snapshot() {
    let mut registry = EntityRegistry::new();
    let moving = registry.group::<(Position, Velocity)>().unwrap();

    let entity = registry
        .create_with([
            Archetypal::from(Health(3)),
            Archetypal::from(Velocity { x: 1.0, y: 0.0 }),
            Archetypal::from(Position { x: 0.0, y: 2.0 }),
        ])
        .unwrap();
    assert!(moving.contains(entity));

    let snapshot = registry.components_of::<Archetypal>(entity).unwrap();
    assert_eq!(
        snapshot,
        vec![
            Archetypal::Position(Position { x: 0.0, y: 2.0 }),
            Archetypal::Velocity(Velocity { x: 1.0, y: 0.0 }),
            Archetypal::Health(Health(3)),
        ]
    );
}

struct Integrator {
    bodies: GroupView<(Position, Velocity)>,
    health: SharedStore<Health>,
}

impl ComponentSystem for Integrator {
    fn setup(registry: &mut EntityRegistry) -> EcsResult<Self> {
        Ok(Self {
            bodies: registry.group()?,
            health: registry.component_store(),
        })
    }
}

impl Integrator {
    fn step(&self, dt: f32) {
        self.bodies.each(|_, pos, vel| {
            pos.x += vel.x * dt;
            pos.y += vel.y * dt;
        });
    }
}

#[test]
fn test_system_binds_once() {
    let mut registry = EntityRegistry::new();
    let integrator = registry.add_system::<Integrator>().unwrap();
    assert_eq!(registry.group_count(), 1);
    assert_eq!(registry.component_type_count(), 3);

    let ship = registry
        .create_bundle((Position::default(), Velocity { x: 2.0, y: -1.0 }))
        .unwrap();
    let rock = registry.create_bundle((Position { x: 9.0, y: 9.0 },)).unwrap();

    integrator.step(0.5);
    integrator.step(0.5);

    assert_eq!(
        registry.get::<Position>(ship).unwrap(),
        Position { x: 2.0, y: -1.0 }
    );
    assert_eq!(
        registry.get::<Position>(rock).unwrap(),
        Position { x: 9.0, y: 9.0 }
    );
    assert_eq!(integrator.health.borrow().capacity(), 64);
}

#[test]
fn test_group_notifications() {
    let mut registry = EntityRegistry::new();
    let moving = registry.group::<(Position, Velocity)>().unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let added = Rc::clone(&events);
    moving.on_added(move |entity| added.borrow_mut().push(("enter", entity)));
    let removed = Rc::clone(&events);
    moving.on_removed(move |entity| removed.borrow_mut().push(("leave", entity)));

    let entity = registry.create();
    registry.attach(entity, Position::default()).unwrap();
    assert!(events.borrow().is_empty());

    registry.attach(entity, Velocity::default()).unwrap();
    registry.detach::<Position>(entity);
    registry.attach(entity, Position::default()).unwrap();
    registry.destroy_immediate(entity);

    assert_eq!(
        *events.borrow(),
        vec![
            ("enter", entity),
            ("leave", entity),
            ("enter", entity),
            ("leave", entity),
        ]
    );
}

#[test]
fn test_config_from_toml() {
    let config = RegistryConfig::from_toml_str(
        r#"
        initial_store_capacity = 10
        max_entity_id = 3
        log_group_changes = true
        "#,
    )
    .unwrap();

    let mut registry = EntityRegistry::with_config(config).unwrap();
    assert!(registry.config().log_group_changes);
    assert_eq!(registry.component_store::<Health>().borrow().capacity(), 16);

    for _ in 0..3 {
        registry.try_create().unwrap();
    }
    assert_eq!(
        registry.try_create(),
        Err(EcsError::EntityIdsExhausted { limit: 3 })
    );
}

#[test]
fn test_invalid_config_rejected() {
    let config = RegistryConfig {
        initial_store_capacity: 0,
        ..RegistryConfig::default()
    };
    assert!(matches!(
        EntityRegistry::with_config(config),
        Err(EcsError::InvalidConfig(_))
    ));
}
