//! # ECS World
//!
//! The central container for all entities and components.
//!
//! The world owns the [`EntityAllocator`] and the [`ComponentRegistry`].
//! Entities have no record of their own beyond the allocator slot: which
//! components an entity has is answered by probing each registered array.

use crate::config::WorldConfig;
use crate::error::{ConfigError, EcsError, EcsResult};

use super::allocator::EntityAllocator;
use super::component::Component;
use super::entity::EntityId;
use super::query::{Query, QueryData};
use super::registry::ComponentRegistry;
use super::storage::{ComponentArray, ComponentsMut, Cursor};

/// The ECS World - container for all game state.
///
/// Every per-entity operation checks the handle against the allocator first,
/// so a stale handle always fails with [`EcsError::StaleHandle`] instead of
/// reading another entity's data.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Position, World};
///
/// let mut world = World::new();
/// world.register_component::<Position>().unwrap();
///
/// let entity = world.create_entity().unwrap();
/// world.add_component(entity, Position::new(1.0, 2.0, 3.0)).unwrap();
/// assert!(world.has_component::<Position>(entity).unwrap());
///
/// world.destroy_entity(entity).unwrap();
/// assert!(world.has_component::<Position>(entity).is_err());
/// ```
pub struct World {
    /// Entity handle allocator.
    entities: EntityAllocator,
    /// Component arrays, one per registered type.
    components: ComponentRegistry,
    /// Sizing used to build this world.
    config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Creates a world from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the config fails validation.
    pub fn with_config(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WorldConfig) -> Self {
        tracing::debug!(
            max_entities = config.max_entities,
            initial_entities = config.initial_entities,
            "world created"
        );
        Self {
            entities: EntityAllocator::from_config(&config),
            components: ComponentRegistry::new(config.initial_components),
            config,
        }
    }

    /// Returns the configuration this world was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the entity allocator.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &EntityAllocator {
        &self.entities
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_live(entity)
    }

    #[inline]
    fn ensure_alive(&self, entity: EntityId) -> EcsResult<()> {
        if self.entities.is_live(entity) {
            Ok(())
        } else {
            Err(EcsError::StaleHandle(entity))
        }
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Creates a new entity with no components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AllocatorExhausted`] at capacity.
    #[inline]
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        self.entities.create()
    }

    /// Destroys an entity and every component attached to it.
    ///
    /// The sweep visits every registered array before the handle is
    /// recycled, so no caller can observe a half-destroyed entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleHandle`] if `entity` is not alive.
    pub fn destroy_entity(&mut self, entity: EntityId) -> EcsResult<()> {
        self.ensure_alive(entity)?;
        for array in self.components.iter_mut() {
            array.remove_entity(entity);
        }
        self.entities.destroy(entity)
    }

    /// Spawns `count` entities, each with a component built by `init`.
    ///
    /// All or nothing: on failure every entity spawned by this call is
    /// destroyed again before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`] if `C` is not registered, or
    /// [`EcsError::AllocatorExhausted`] if capacity runs out.
    pub fn spawn_batch<C, F>(&mut self, count: usize, mut init: F) -> EcsResult<Vec<EntityId>>
    where
        C: Component,
        F: FnMut(usize) -> C,
    {
        // Fail before allocating anything if the type is missing.
        self.components.get::<C>()?;

        let mut spawned = Vec::with_capacity(count);
        for i in 0..count {
            let entity = match self.entities.create() {
                Ok(entity) => entity,
                Err(err) => {
                    self.rollback(&spawned);
                    return Err(err);
                }
            };
            spawned.push(entity);
            if let Err(err) = self.add_component(entity, init(i)) {
                self.rollback(&spawned);
                return Err(err);
            }
        }
        Ok(spawned)
    }

    /// Destroys entities created by a failed batch.
    fn rollback(&mut self, spawned: &[EntityId]) {
        for &entity in spawned {
            let destroyed = self.destroy_entity(entity);
            debug_assert!(destroyed.is_ok(), "batch entity {entity} died before rollback");
        }
        tracing::debug!(count = spawned.len(), "spawn batch rolled back");
    }

    /// Destroys every live entity. Registrations are kept.
    pub fn clear(&mut self) {
        for array in self.components.iter_mut() {
            array.clear();
        }
        let live: Vec<EntityId> = self.entities.iter_alive().collect();
        for entity in live {
            let destroyed = self.entities.destroy(entity);
            debug_assert!(destroyed.is_ok(), "iter_alive yielded dead handle {entity}");
        }
    }

    /// Releases unused capacity in every component array.
    ///
    /// Maintenance operation; do not call it from the per-frame hot path.
    pub fn shrink_to_fit(&mut self) {
        for array in self.components.iter_mut() {
            array.shrink_to_fit();
        }
        tracing::debug!(arrays = self.components.len(), "component arrays compacted");
    }

    // =========================================================================
    // Component registration
    // =========================================================================

    /// Registers component type `C`, creating its empty array.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeAlreadyRegistered`] on a second call for the
    /// same type, [`EcsError::ComponentIdConflict`] if another type owns
    /// `C::ID`, or [`EcsError::ComponentIdOutOfRange`].
    #[inline]
    pub fn register_component<C: Component>(&mut self) -> EcsResult<()> {
        self.components.register::<C>()
    }

    /// Checks whether component type `C` is registered.
    #[inline]
    #[must_use]
    pub fn is_registered<C: Component>(&self) -> bool {
        self.components.is_registered::<C>()
    }

    /// Returns the array storing `C`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`] if `C` is not registered.
    #[inline]
    pub fn storage<C: Component>(&self) -> EcsResult<&ComponentArray<C>> {
        self.components.get::<C>()
    }

    /// Returns write access to the values stored for `C`.
    ///
    /// The view cannot insert or remove; use [`World::add_component`] and
    /// [`World::remove_component`], which check the handle first.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`] if `C` is not registered.
    #[inline]
    pub fn storage_mut<C: Component>(&mut self) -> EcsResult<ComponentsMut<'_, C>> {
        self.components.get_mut::<C>().map(ComponentsMut::new)
    }

    // =========================================================================
    // Per-entity component operations
    // =========================================================================

    /// Attaches `component` to `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleHandle`], [`EcsError::UnregisteredType`], or
    /// [`EcsError::DuplicateComponent`] if `entity` already has a `C`.
    pub fn add_component<C: Component>(&mut self, entity: EntityId, component: C) -> EcsResult<()> {
        self.ensure_alive(entity)?;
        self.components.get_mut::<C>()?.insert(entity, component)
    }

    /// Detaches and returns the `C` of `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleHandle`], [`EcsError::UnregisteredType`], or
    /// [`EcsError::ComponentNotFound`].
    pub fn remove_component<C: Component>(&mut self, entity: EntityId) -> EcsResult<C> {
        self.ensure_alive(entity)?;
        self.components.get_mut::<C>()?.remove(entity)
    }

    /// Gets the `C` of `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleHandle`], [`EcsError::UnregisteredType`], or
    /// [`EcsError::ComponentNotFound`].
    pub fn get_component<C: Component>(&self, entity: EntityId) -> EcsResult<&C> {
        self.ensure_alive(entity)?;
        self.components
            .get::<C>()?
            .get(entity)
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: C::type_name(),
            })
    }

    /// Gets the `C` of `entity` mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleHandle`], [`EcsError::UnregisteredType`], or
    /// [`EcsError::ComponentNotFound`].
    pub fn get_component_mut<C: Component>(&mut self, entity: EntityId) -> EcsResult<&mut C> {
        self.ensure_alive(entity)?;
        self.components
            .get_mut::<C>()?
            .get_mut(entity)
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: C::type_name(),
            })
    }

    /// Checks whether `entity` has a `C`.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleHandle`] or [`EcsError::UnregisteredType`]. A dead
    /// entity is an error, never a silent `false`.
    pub fn has_component<C: Component>(&self, entity: EntityId) -> EcsResult<bool> {
        self.ensure_alive(entity)?;
        Ok(self.components.get::<C>()?.contains(entity))
    }

    /// Names of every component type attached to `entity`, in id order.
    ///
    /// Probes each registered array: O(registered types).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleHandle`] if `entity` is not alive.
    pub fn component_names(&self, entity: EntityId) -> EcsResult<Vec<&'static str>> {
        self.ensure_alive(entity)?;
        Ok(self
            .components
            .iter()
            .filter(|array| array.contains(entity))
            .map(|array| array.component_name())
            .collect())
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Prepares a query over the component set `Q`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`] if any type in `Q` is not
    /// registered.
    #[inline]
    pub fn query<Q: QueryData>(&self) -> EcsResult<Query<'_, Q>> {
        Query::new(&self.components)
    }

    /// Visits every entity holding `C` and all of `Q`, with mutable access to
    /// its `C`.
    ///
    /// Drives from whichever side is smaller: the `C` array or the smallest
    /// array in `Q`. Returns the number of entities visited.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ConflictingAccess`] if `Q` also names `C`
    /// - [`EcsError::UnregisteredType`] if any type is not registered
    ///
    /// # Example
    ///
    /// ```rust
    /// use tessera_core::{Position, Velocity, World};
    ///
    /// let mut world = World::new();
    /// world.register_component::<Position>().unwrap();
    /// world.register_component::<Velocity>().unwrap();
    /// let e = world.create_entity().unwrap();
    /// world.add_component(e, Position::default()).unwrap();
    /// world.add_component(e, Velocity::new(2.0, 0.0, 0.0)).unwrap();
    ///
    /// let moved = world
    ///     .for_each_mut::<Position, (Velocity,), _>(|_, pos, (vel,)| pos.integrate(vel, 0.5))
    ///     .unwrap();
    /// assert_eq!(moved, 1);
    /// assert_eq!(world.get_component::<Position>(e).unwrap().x, 1.0);
    /// ```
    pub fn for_each_mut<'w, C, Q, F>(&'w mut self, mut f: F) -> EcsResult<usize>
    where
        C: Component,
        Q: QueryData,
        F: FnMut(EntityId, &mut C, Q::Item<'w>),
    {
        if let Some(name) = Q::name_of(C::ID) {
            return Err(EcsError::ConflictingAccess(name));
        }

        let (target, rest) = self.components.split_mut::<C>()?;
        let fetch = Q::fetch(rest)?;
        let driving = Q::driving(fetch);
        let mut visited = 0;

        if target.len() <= driving.len() {
            for (entity, component) in target.iter_mut() {
                if let Some(item) = Q::probe(fetch, entity) {
                    f(entity, component, item);
                    visited += 1;
                }
            }
        } else {
            for &entity in driving {
                let Some(item) = Q::probe(fetch, entity) else {
                    continue;
                };
                if let Some(component) = target.get_mut(entity) {
                    f(entity, component, item);
                    visited += 1;
                }
            }
        }

        Ok(visited)
    }

    /// Starts a detached walk over the entities holding `C`.
    ///
    /// Use it to mutate components by handle while walking. Adding or
    /// removing `C` components during the walk is forbidden (checked in debug
    /// builds only).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`] if `C` is not registered.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tessera_core::{Position, World};
    ///
    /// let mut world = World::new();
    /// world.register_component::<Position>().unwrap();
    /// let e = world.create_entity().unwrap();
    /// world.add_component(e, Position::default()).unwrap();
    ///
    /// let mut cursor = world.cursor::<Position>().unwrap();
    /// while let Some(entity) = cursor.next_entity(world.storage::<Position>().unwrap()) {
    ///     world.get_component_mut::<Position>(entity).unwrap().y += 1.0;
    /// }
    /// assert_eq!(world.get_component::<Position>(e).unwrap().y, 1.0);
    /// ```
    #[inline]
    pub fn cursor<C: Component>(&self) -> EcsResult<Cursor> {
        Ok(self.components.get::<C>()?.cursor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecyclePolicy;
    use crate::ecs::component::{Position, Velocity};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Health(u32);

    impl Component for Health {
        const ID: u8 = 5;
    }

    fn world() -> World {
        let mut world = World::new();
        world.register_component::<Position>().unwrap();
        world.register_component::<Velocity>().unwrap();
        world.register_component::<Health>().unwrap();
        world
    }

    #[test]
    fn test_world_creation() {
        let world = World::with_config(WorldConfig::preallocated(1000)).unwrap();
        assert_eq!(world.config().max_entities, 1000);
        assert_eq!(world.alive_count(), 0);
        assert!(World::with_config(WorldConfig { max_entities: 0, ..WorldConfig::default() }).is_err());
    }

    #[test]
    fn test_create_destroy() {
        let mut world = world();

        let id1 = world.create_entity().unwrap();
        let id2 = world.create_entity().unwrap();
        assert!(world.is_alive(id1));
        assert_eq!(world.alive_count(), 2);

        world.destroy_entity(id1).unwrap();
        assert!(!world.is_alive(id1));
        assert!(world.is_alive(id2));
        assert_eq!(world.destroy_entity(id1), Err(EcsError::StaleHandle(id1)));

        // Create again - should reuse the slot
        let id3 = world.create_entity().unwrap();
        assert_eq!(id3.index(), id1.index());
        assert!(id3.generation() > id1.generation());
    }

    #[test]
    fn test_component_roundtrip() {
        let mut world = world();
        let e = world.create_entity().unwrap();

        world.add_component(e, Health(30)).unwrap();
        assert_eq!(world.get_component::<Health>(e), Ok(&Health(30)));

        world.get_component_mut::<Health>(e).unwrap().0 = 10;
        assert_eq!(world.get_component::<Health>(e).unwrap().0, 10);
        assert_eq!(world.remove_component::<Health>(e), Ok(Health(10)));
        assert_eq!(world.has_component::<Health>(e), Ok(false));
        assert!(matches!(
            world.remove_component::<Health>(e),
            Err(EcsError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_add_fails() {
        let mut world = world();
        let e = world.create_entity().unwrap();
        world.add_component(e, Health(1)).unwrap();
        assert!(matches!(
            world.add_component(e, Health(2)),
            Err(EcsError::DuplicateComponent { .. })
        ));
        assert_eq!(world.get_component::<Health>(e), Ok(&Health(1)));
    }

    #[test]
    fn test_unregistered_type() {
        struct Unknown;
        impl Component for Unknown {
            const ID: u8 = 33;
        }

        let mut world = world();
        let e = world.create_entity().unwrap();
        assert!(matches!(world.add_component(e, Unknown), Err(EcsError::UnregisteredType(_))));
        assert!(matches!(world.has_component::<Unknown>(e), Err(EcsError::UnregisteredType(_))));
        assert!(matches!(world.register_component::<Position>(), Err(EcsError::TypeAlreadyRegistered(_))));
    }

    #[test]
    fn test_stale_handle_checked_before_type() {
        struct Unknown;
        impl Component for Unknown {
            const ID: u8 = 34;
        }

        let mut world = world();
        let e = world.create_entity().unwrap();
        world.destroy_entity(e).unwrap();
        assert_eq!(world.has_component::<Unknown>(e), Err(EcsError::StaleHandle(e)));
        assert_eq!(world.add_component(e, Health(1)), Err(EcsError::StaleHandle(e)));
        assert_eq!(world.get_component::<Health>(e), Err(EcsError::StaleHandle(e)));
    }

    #[test]
    fn test_destroy_sweeps_all_arrays() {
        let mut world = world();
        let e = world.create_entity().unwrap();
        let other = world.create_entity().unwrap();
        world.add_component(e, Position::default()).unwrap();
        world.add_component(e, Health(3)).unwrap();
        world.add_component(other, Health(4)).unwrap();

        world.destroy_entity(e).unwrap();
        assert!(world.storage::<Position>().unwrap().is_empty());
        assert_eq!(world.storage::<Health>().unwrap().len(), 1);
        assert_eq!(world.get_component::<Health>(other), Ok(&Health(4)));

        // The recycled slot starts with no components.
        let reborn = world.create_entity().unwrap();
        assert_eq!(reborn.index(), e.index());
        assert_eq!(world.component_names(reborn), Ok(vec![]));
    }

    #[test]
    fn test_component_names() {
        let mut world = world();
        let e = world.create_entity().unwrap();
        world.add_component(e, Velocity::default()).unwrap();
        world.add_component(e, Health(9)).unwrap();
        let names = world.component_names(e).unwrap();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("Velocity"));
        assert!(names[1].ends_with("Health"));
    }

    #[test]
    fn test_spawn_batch() {
        let mut world = World::with_config(WorldConfig {
            max_entities: 10,
            initial_entities: 10,
            ..WorldConfig::default()
        })
        .unwrap();
        world.register_component::<Position>().unwrap();

        let spawned = world
            .spawn_batch(4, |i| Position::new(i as f32, 0.0, 0.0))
            .unwrap();
        assert_eq!(spawned.len(), 4);
        assert_eq!(world.get_component::<Position>(spawned[3]).unwrap().x, 3.0);

        assert!(matches!(
            world.spawn_batch(4, |_| Health(0)),
            Err(EcsError::UnregisteredType(_))
        ));
        assert_eq!(world.alive_count(), 4);

        assert_eq!(
            world.spawn_batch(7, |_| Position::default()),
            Err(EcsError::AllocatorExhausted { capacity: 10 })
        );
        // The failed batch is undone.
        assert_eq!(world.alive_count(), 4);
        assert_eq!(world.storage::<Position>().unwrap().len(), 4);
        assert!(world.query::<(Position,)>().unwrap().iter().all(|(id, _)| spawned.contains(&id)));

        // Room freed by the rollback is usable again.
        assert_eq!(world.spawn_batch(6, |_| Position::default()).unwrap().len(), 6);
        assert_eq!(world.alive_count(), 10);
    }

    #[test]
    fn test_storage_mut_writes_in_place() {
        let mut world = world();
        let a = world.create_entity().unwrap();
        let b = world.create_entity().unwrap();
        world.add_component(a, Position::new(1.0, 0.0, 0.0)).unwrap();
        world.add_component(b, Position::new(2.0, 0.0, 0.0)).unwrap();
        world.destroy_entity(a).unwrap();

        {
            let mut positions = world.storage_mut::<Position>().unwrap();
            positions.get_mut(b).unwrap().y = 7.0;
            for (_, pos) in positions.iter_mut() {
                pos.z = 1.0;
            }
            assert!(positions.get_mut(a).is_none());
            assert_eq!(positions.len(), 1);
        }

        assert_eq!(world.get_component::<Position>(b), Ok(&Position::new(2.0, 7.0, 1.0)));
        let reborn = world.create_entity().unwrap();
        assert_eq!(reborn.index(), a.index());
        world.add_component(reborn, Position::default()).unwrap();
        assert!(world
            .query::<(Position,)>()
            .unwrap()
            .iter()
            .all(|(id, _)| world.is_alive(id)));
    }

    #[test]
    fn test_for_each_mut_both_directions() {
        let mut world = world();
        let mut movers = Vec::new();
        for i in 0..6 {
            let e = world.create_entity().unwrap();
            world.add_component(e, Position::default()).unwrap();
            if i % 2 == 0 {
                world.add_component(e, Velocity::new(1.0, 0.0, 0.0)).unwrap();
                movers.push(e);
            }
        }

        // Velocity (3) drives: target Position (6) is larger.
        let visited = world
            .for_each_mut::<Position, (Velocity,), _>(|_, pos, (vel,)| pos.integrate(vel, 1.0))
            .unwrap();
        assert_eq!(visited, 3);

        // Target Velocity (3) drives: Position (6) is larger.
        let visited = world
            .for_each_mut::<Velocity, (Position,), _>(|_, vel, (pos,)| vel.y = pos.x)
            .unwrap();
        assert_eq!(visited, 3);

        for e in movers {
            assert_eq!(world.get_component::<Position>(e).unwrap().x, 1.0);
            assert_eq!(world.get_component::<Velocity>(e).unwrap().y, 1.0);
        }
    }

    #[test]
    fn test_for_each_mut_conflict() {
        let mut world = world();
        assert!(matches!(
            world.for_each_mut::<Position, (Velocity, Position), _>(|_, _, _| {}),
            Err(EcsError::ConflictingAccess(_))
        ));
    }

    #[test]
    fn test_clear() {
        let mut world = World::with_config(WorldConfig {
            recycle: RecyclePolicy::Fifo,
            ..WorldConfig::default()
        })
        .unwrap();
        world.register_component::<Health>().unwrap();
        let a = world.create_entity().unwrap();
        world.add_component(a, Health(1)).unwrap();

        world.clear();
        assert_eq!(world.alive_count(), 0);
        assert!(!world.is_alive(a));
        assert!(world.storage::<Health>().unwrap().is_empty());
        assert!(world.is_registered::<Health>());
    }

    #[test]
    fn test_shrink_keeps_data() {
        let mut world = world();
        let ids = world.spawn_batch(32, |i| Health(i as u32)).unwrap();
        for &id in &ids[1..] {
            world.destroy_entity(id).unwrap();
        }
        world.shrink_to_fit();
        assert_eq!(world.get_component::<Health>(ids[0]), Ok(&Health(0)));
    }
}
