//! # Component Registry
//!
//! Fixed-size table of component arrays, indexed by [`Component::ID`].
//!
//! Dispatch is a bounds-checked array index plus one `Any` downcast; there is
//! no hashing on the hot path. Arrays are stored type-erased behind
//! [`AnyComponentArray`] so the world can sweep every array when an entity
//! dies without knowing the concrete types.

use std::any::{Any, TypeId};

use crate::error::{EcsError, EcsResult};

use super::component::{Component, MAX_COMPONENT_TYPES};
use super::entity::EntityId;
use super::storage::ComponentArray;

/// Type-erased view of a [`ComponentArray`].
pub trait AnyComponentArray: Send + Sync + 'static {
    /// Upcast for downcasting to the concrete array.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete array.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// `TypeId` of the stored component type.
    fn component_type(&self) -> TypeId;

    /// Name of the stored component type.
    fn component_name(&self) -> &'static str;

    /// Number of stored components.
    fn len(&self) -> usize;

    /// Returns `true` if the array is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks whether `entity` has a component in this array.
    fn contains(&self, entity: EntityId) -> bool;

    /// Drops the component of `entity`, if present. Returns whether one was
    /// removed.
    fn remove_entity(&mut self, entity: EntityId) -> bool;

    /// Removes every component.
    fn clear(&mut self);

    /// Releases unused capacity.
    fn shrink_to_fit(&mut self);
}

impl<C: Component> AnyComponentArray for ComponentArray<C> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_type(&self) -> TypeId {
        TypeId::of::<C>()
    }

    fn component_name(&self) -> &'static str {
        C::type_name()
    }

    fn len(&self) -> usize {
        ComponentArray::len(self)
    }

    fn contains(&self, entity: EntityId) -> bool {
        ComponentArray::contains(self, entity)
    }

    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_ok()
    }

    fn clear(&mut self) {
        ComponentArray::clear(self);
    }

    fn shrink_to_fit(&mut self) {
        ComponentArray::shrink_to_fit(self);
    }
}

/// One registry slot.
type Slot = Option<Box<dyn AnyComponentArray>>;

/// Read access to registered arrays by id.
///
/// Implemented by the full registry and by the view left over after one
/// array has been split off for mutation.
pub trait StorageSource<'w>: Copy {
    /// Returns the array registered under `id`, if any is visible.
    fn array(self, id: u8) -> Option<&'w dyn AnyComponentArray>;
}

/// Looks up and downcasts the array for `C`.
pub(crate) fn downcast_array<'w, C: Component, S: StorageSource<'w>>(
    source: S,
) -> EcsResult<&'w ComponentArray<C>> {
    source
        .array(C::ID)
        .and_then(|array| array.as_any().downcast_ref::<ComponentArray<C>>())
        .ok_or(EcsError::UnregisteredType(C::type_name()))
}

/// Owns one [`ComponentArray`] per registered component type.
pub struct ComponentRegistry {
    /// `MAX_COMPONENT_TYPES` slots, indexed by `Component::ID`.
    slots: Vec<Slot>,
    /// Number of occupied slots.
    registered: usize,
    /// Dense reservation for newly registered arrays.
    initial_capacity: usize,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ComponentRegistry {
    /// Creates an empty registry. New arrays reserve `initial_capacity` slots.
    #[must_use]
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            slots: (0..MAX_COMPONENT_TYPES).map(|_| None).collect(),
            registered: 0,
            initial_capacity,
        }
    }

    /// Returns the number of registered component types.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.registered
    }

    /// Returns `true` if no component type is registered.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.registered == 0
    }

    /// Validates `C::ID` and returns its slot index.
    fn slot_index<C: Component>() -> EcsResult<usize> {
        let index = usize::from(C::ID);
        if index >= MAX_COMPONENT_TYPES {
            return Err(EcsError::ComponentIdOutOfRange {
                id: C::ID,
                limit: MAX_COMPONENT_TYPES,
            });
        }
        Ok(index)
    }

    /// Creates the array for `C`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::TypeAlreadyRegistered`] if `C` is already registered
    /// - [`EcsError::ComponentIdConflict`] if another type owns `C::ID`
    /// - [`EcsError::ComponentIdOutOfRange`] if `C::ID` does not fit
    pub fn register<C: Component>(&mut self) -> EcsResult<()> {
        let index = Self::slot_index::<C>()?;
        if let Some(existing) = &self.slots[index] {
            return Err(if existing.component_type() == TypeId::of::<C>() {
                EcsError::TypeAlreadyRegistered(C::type_name())
            } else {
                EcsError::ComponentIdConflict {
                    id: C::ID,
                    existing: existing.component_name(),
                    requested: C::type_name(),
                }
            });
        }

        self.slots[index] = Some(Box::new(ComponentArray::<C>::with_capacity(self.initial_capacity)));
        self.registered += 1;
        tracing::debug!(component = C::type_name(), id = C::ID, "component type registered");
        Ok(())
    }

    /// Checks whether `C` is registered.
    #[inline]
    #[must_use]
    pub fn is_registered<C: Component>(&self) -> bool {
        self.get::<C>().is_ok()
    }

    /// Returns the array for `C`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`] if `C` was never registered.
    #[inline]
    pub fn get<C: Component>(&self) -> EcsResult<&ComponentArray<C>> {
        downcast_array::<C, _>(self)
    }

    /// Returns the array for `C` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`] if `C` was never registered.
    #[inline]
    pub fn get_mut<C: Component>(&mut self) -> EcsResult<&mut ComponentArray<C>> {
        self.slots
            .get_mut(usize::from(C::ID))
            .and_then(Option::as_mut)
            .and_then(|array| array.as_any_mut().downcast_mut::<ComponentArray<C>>())
            .ok_or(EcsError::UnregisteredType(C::type_name()))
    }

    /// Splits the registry into the array for `C` (mutable) and a read-only
    /// view of every other array.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`] if `C` was never registered.
    pub fn split_mut<C: Component>(&mut self) -> EcsResult<(&mut ComponentArray<C>, RegistryView<'_>)> {
        let index = Self::slot_index::<C>().map_err(|_| EcsError::UnregisteredType(C::type_name()))?;
        let (before, rest) = self.slots.split_at_mut(index);
        let (target, after) = rest.split_first_mut().ok_or(EcsError::UnregisteredType(C::type_name()))?;

        let target = target
            .as_mut()
            .and_then(|array| array.as_any_mut().downcast_mut::<ComponentArray<C>>())
            .ok_or(EcsError::UnregisteredType(C::type_name()))?;

        let view = RegistryView {
            before,
            after,
            hole: index,
        };
        Ok((target, view))
    }

    /// Iterates over every registered array.
    pub fn iter(&self) -> impl Iterator<Item = &dyn AnyComponentArray> + '_ {
        self.slots.iter().filter_map(|slot| slot.as_deref())
    }

    /// Iterates mutably over every registered array.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn AnyComponentArray + 'static)> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.as_deref_mut())
    }
}

impl<'w> StorageSource<'w> for &'w ComponentRegistry {
    #[inline]
    fn array(self, id: u8) -> Option<&'w dyn AnyComponentArray> {
        self.slots.get(usize::from(id))?.as_deref()
    }
}

/// Read-only view of a registry with one slot carved out.
#[derive(Clone, Copy)]
pub struct RegistryView<'w> {
    /// Slots below the carved-out id.
    before: &'w [Slot],
    /// Slots above the carved-out id.
    after: &'w [Slot],
    /// The carved-out id.
    hole: usize,
}

impl<'w> StorageSource<'w> for RegistryView<'w> {
    #[inline]
    fn array(self, id: u8) -> Option<&'w dyn AnyComponentArray> {
        let id = usize::from(id);
        let slot = match id.cmp(&self.hole) {
            std::cmp::Ordering::Less => self.before.get(id)?,
            std::cmp::Ordering::Equal => return None,
            std::cmp::Ordering::Greater => self.after.get(id - self.hole - 1)?,
        };
        slot.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Position, Velocity};

    struct Impostor;

    impl Component for Impostor {
        const ID: u8 = Position::ID;
    }

    struct OutOfRange;

    impl Component for OutOfRange {
        const ID: u8 = 200;
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ComponentRegistry::new(16);
        registry.register::<Position>().unwrap();

        assert!(registry.is_registered::<Position>());
        assert!(!registry.is_registered::<Velocity>());
        assert_eq!(registry.len(), 1);
        assert!(registry.get::<Position>().unwrap().is_empty());
        assert!(matches!(registry.get::<Velocity>(), Err(EcsError::UnregisteredType(_))));
    }

    #[test]
    fn test_double_registration() {
        let mut registry = ComponentRegistry::default();
        registry.register::<Position>().unwrap();
        assert!(matches!(
            registry.register::<Position>(),
            Err(EcsError::TypeAlreadyRegistered(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_id_conflict() {
        let mut registry = ComponentRegistry::default();
        registry.register::<Position>().unwrap();
        assert!(matches!(
            registry.register::<Impostor>(),
            Err(EcsError::ComponentIdConflict { id: 0, .. })
        ));
        // The impostor must not be able to read the position array.
        assert!(registry.get::<Impostor>().is_err());
    }

    #[test]
    fn test_id_out_of_range() {
        let mut registry = ComponentRegistry::default();
        assert_eq!(
            registry.register::<OutOfRange>(),
            Err(EcsError::ComponentIdOutOfRange { id: 200, limit: MAX_COMPONENT_TYPES })
        );
        assert!(registry.get::<OutOfRange>().is_err());
    }

    #[test]
    fn test_split_mut_hides_target() {
        let mut registry = ComponentRegistry::default();
        registry.register::<Position>().unwrap();
        registry.register::<Velocity>().unwrap();

        let (velocities, view) = registry.split_mut::<Velocity>().unwrap();
        velocities.insert(EntityId::new(0, 0), Velocity::default()).unwrap();
        assert!(view.array(Velocity::ID).is_none());
        assert!(view.array(Position::ID).is_some());
        assert!(downcast_array::<Position, _>(view).is_ok());
        assert!(downcast_array::<Velocity, _>(view).is_err());
    }

    #[test]
    fn test_erased_sweep() {
        let mut registry = ComponentRegistry::default();
        registry.register::<Position>().unwrap();
        registry.register::<Velocity>().unwrap();
        let entity = EntityId::new(2, 0);
        registry.get_mut::<Position>().unwrap().insert(entity, Position::default()).unwrap();

        let removed: usize = registry
            .iter_mut()
            .map(|array| usize::from(array.remove_entity(entity)))
            .sum();
        assert_eq!(removed, 1);
        assert!(registry.iter().all(|array| !array.contains(entity)));
    }
}
