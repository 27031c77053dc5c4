//! # Component Storage
//!
//! Sparse-set storage for a single component type.
//!
//! ```text
//! sparse:   [ 1, -, 0, -, 2 ]      indexed by entity index
//!             │     │     │
//! entities: [ e2v0, e0v3, e4v1 ]   dense slot -> owning entity
//! dense:    [ C2,   C0,   C4   ]   packed payloads, no gaps
//! ```
//!
//! - Insert appends to the dense tables: O(1) amortized
//! - Remove swaps the target with the last dense slot, then shrinks: O(1)
//! - Lookup goes through `sparse`: O(1)
//! - Iteration walks `dense` directly, no indirection per element
//!
//! Removal moves the last element, so dense positions are not stable across
//! structural changes. Borrowed references cannot outlive a structural change
//! (it needs `&mut self`); detached [`Cursor`]s are checked against the
//! array's version in debug builds.

use std::ops::Deref;

use bytemuck::Pod;

use crate::error::{EcsError, EcsResult};

use super::component::Component;
use super::entity::EntityId;

/// Sparse-table sentinel for "no component".
const ABSENT: u32 = u32::MAX;

/// Sparse-set storage for a single component type.
///
/// # Invariants
///
/// - `dense.len() == entities.len()`
/// - `sparse[entities[i].index()] == i` for every dense slot `i`
/// - every other `sparse` entry is `ABSENT`
///
/// # Example
///
/// ```rust
/// use tessera_core::{ComponentArray, EntityId, Position};
///
/// let mut positions: ComponentArray<Position> = ComponentArray::new();
/// let entity = EntityId::new(0, 0);
/// positions.insert(entity, Position::new(1.0, 2.0, 3.0)).unwrap();
/// assert_eq!(positions.get(entity), Some(&Position::new(1.0, 2.0, 3.0)));
/// ```
#[derive(Debug)]
pub struct ComponentArray<C: Component> {
    /// Packed component payloads.
    dense: Vec<C>,
    /// Owning entity of each dense slot.
    entities: Vec<EntityId>,
    /// Entity index -> dense slot.
    sparse: Vec<u32>,
    /// Bumped by every structural mutation.
    version: u64,
}

impl<C: Component> Default for ComponentArray<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Component> ComponentArray<C> {
    /// Creates an empty array.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dense: Vec::new(),
            entities: Vec::new(),
            sparse: Vec::new(),
            version: 0,
        }
    }

    /// Creates an empty array with room for `capacity` components.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dense: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
            sparse: Vec::with_capacity(capacity),
            version: 0,
        }
    }

    /// Returns the number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` if no entity has this component.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Returns the structural version (bumped by insert, remove and clear).
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Dense slot of `entity`, if it has a component here.
    #[inline]
    fn slot_of(&self, entity: EntityId) -> Option<usize> {
        let slot = *self.sparse.get(entity.index() as usize)?;
        if slot == ABSENT {
            return None;
        }
        let slot = slot as usize;
        // A different generation at the same index is a different entity.
        (self.entities[slot] == entity).then_some(slot)
    }

    /// Checks whether `entity` has a component in this array.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.slot_of(entity).is_some()
    }

    /// Gets the component of `entity`.
    ///
    /// The reference is valid until the next structural mutation of this
    /// array, which the borrow checker enforces.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&C> {
        self.slot_of(entity).map(|slot| &self.dense[slot])
    }

    /// Gets the component of `entity` mutably.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut C> {
        self.slot_of(entity).map(|slot| &mut self.dense[slot])
    }

    /// Attaches `component` to `entity`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponent`] if `entity` already has one
    ///   (remove it first; this array never upserts)
    /// - [`EcsError::StaleHandle`] naming the occupant if the index is still
    ///   held by another generation of the same slot
    /// - [`EcsError::StaleHandle`] for [`EntityId::NULL`]
    pub fn insert(&mut self, entity: EntityId, component: C) -> EcsResult<()> {
        if entity.is_null() {
            return Err(EcsError::StaleHandle(entity));
        }
        let index = entity.index() as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, ABSENT);
        }

        let occupied = self.sparse[index];
        if occupied != ABSENT {
            let occupant = self.entities[occupied as usize];
            return Err(if occupant == entity {
                EcsError::DuplicateComponent {
                    entity,
                    component: C::type_name(),
                }
            } else {
                EcsError::StaleHandle(occupant)
            });
        }

        // Dense length is bounded by the number of distinct indices (< u32::MAX).
        self.sparse[index] = self.dense.len() as u32;
        self.dense.push(component);
        self.entities.push(entity);
        self.version += 1;
        Ok(())
    }

    /// Detaches and returns the component of `entity`.
    ///
    /// The last dense element is moved into the freed slot, so dense
    /// positions observed before this call are invalid afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if `entity` has no component.
    pub fn remove(&mut self, entity: EntityId) -> EcsResult<C> {
        let Some(slot) = self.slot_of(entity) else {
            return Err(EcsError::ComponentNotFound {
                entity,
                component: C::type_name(),
            });
        };

        let component = self.dense.swap_remove(slot);
        self.entities.swap_remove(slot);

        // Re-point the element that moved into `slot` (none if it was last).
        if let Some(moved) = self.entities.get(slot) {
            self.sparse[moved.index() as usize] = slot as u32;
        }
        self.sparse[entity.index() as usize] = ABSENT;

        self.version += 1;
        Ok(component)
    }

    /// Returns the owning entities in dense order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Returns a slice of all components in dense order.
    ///
    /// Useful for batch processing.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.dense
    }

    /// Returns a mutable slice of all components in dense order.
    ///
    /// Writing through the slice is not a structural mutation.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        &mut self.dense
    }

    /// Iterates over `(entity, component)` pairs in dense order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (EntityId, &C)> + '_ {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    /// Iterates mutably over `(entity, component)` pairs in dense order.
    #[inline]
    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (EntityId, &mut C)> + '_ {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    /// Starts a detached walk over this array's entities.
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor {
            position: 0,
            version: self.version,
        }
    }

    /// Removes every component.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.entities.clear();
        self.sparse.clear();
        self.version += 1;
    }

    /// Releases unused capacity.
    ///
    /// Maintenance operation, not meant for the per-frame hot path.
    pub fn shrink_to_fit(&mut self) {
        let used = self
            .entities
            .iter()
            .map(|entity| entity.index() as usize + 1)
            .max()
            .unwrap_or(0);
        self.sparse.truncate(used);
        self.sparse.shrink_to_fit();
        self.dense.shrink_to_fit();
        self.entities.shrink_to_fit();
    }
}

impl<C: Component + Pod> ComponentArray<C> {
    /// Returns the dense storage as raw bytes, e.g. for a GPU buffer upload.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.dense)
    }
}

/// Write access to the payloads of a [`ComponentArray`] without structural
/// access.
///
/// Handed out by [`World::storage_mut`](crate::World::storage_mut). Values can
/// be changed in place, but inserting and removing go through the world so
/// every stored entity stays live.
#[derive(Debug)]
pub struct ComponentsMut<'a, C: Component> {
    array: &'a mut ComponentArray<C>,
}

impl<'a, C: Component> ComponentsMut<'a, C> {
    #[inline]
    pub(crate) fn new(array: &'a mut ComponentArray<C>) -> Self {
        Self { array }
    }

    /// Gets the component of `entity` mutably.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut C> {
        self.array.get_mut(entity)
    }

    /// Returns a mutable slice of all components in dense order.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        self.array.as_mut_slice()
    }

    /// Iterates mutably over `(entity, component)` pairs in dense order.
    #[inline]
    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (EntityId, &mut C)> + '_ {
        self.array.iter_mut()
    }
}

impl<C: Component> Deref for ComponentsMut<'_, C> {
    type Target = ComponentArray<C>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.array
    }
}

/// Detached position in a [`ComponentArray`]'s dense order.
///
/// Unlike [`ComponentArray::iter`], a cursor holds no borrow, so a caller can
/// interleave non-structural writes (through the owning world) with the walk.
/// Structurally mutating the array while a cursor is in use is forbidden:
/// debug builds panic on the next step, release builds skip the check and
/// may skip or repeat entities.
#[derive(Clone, Copy, Debug)]
pub struct Cursor {
    /// Next dense slot to visit.
    position: usize,
    /// Array version observed at creation.
    version: u64,
}

impl Cursor {
    /// Advances to the next entity.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `array` was structurally mutated since the
    /// cursor was created.
    #[inline]
    pub fn next_entity<C: Component>(&mut self, array: &ComponentArray<C>) -> Option<EntityId> {
        debug_assert_eq!(
            self.version, array.version,
            "component array {} structurally mutated while a cursor was outstanding",
            C::type_name()
        );
        let entity = array.entities.get(self.position).copied()?;
        self.position += 1;
        Some(entity)
    }

    /// Returns the number of entities already visited.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}
