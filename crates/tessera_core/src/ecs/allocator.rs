//! # Entity Allocator
//!
//! Issues and recycles entity handles.
//!
//! Every slot ever handed out keeps its generation counter forever. Destroying
//! an entity bumps the slot's generation and pushes the index onto the free
//! list, so any copy of the old handle stops comparing live.

use std::collections::VecDeque;

use crate::config::{RecyclePolicy, WorldConfig};
use crate::error::{EcsError, EcsResult};

use super::entity::EntityId;

/// Per-slot bookkeeping.
#[derive(Clone, Copy, Debug)]
struct Slot {
    /// Current generation. Only ever increases.
    generation: u32,
    /// Whether the slot is bound to a live handle.
    alive: bool,
}

/// Generational index allocator.
///
/// A slot index is either on the free list, bound to exactly one live
/// handle, or retired (its generation is exhausted and it is never reissued).
///
/// # Thread Safety
///
/// Mutation requires `&mut self`; share it behind the world's write phase.
#[derive(Debug)]
pub struct EntityAllocator {
    /// One entry per slot ever allocated.
    slots: Vec<Slot>,
    /// Reclaimed indices.
    free: VecDeque<u32>,
    /// Order in which `free` is drained.
    policy: RecyclePolicy,
    /// Hard limit on `slots.len()`.
    max_entities: u32,
    /// Number of live handles.
    alive_count: usize,
    /// Number of slots taken out of circulation.
    retired_count: usize,
}

impl EntityAllocator {
    /// Creates an allocator with the given capacity and LIFO recycling.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or `u32::MAX`.
    #[must_use]
    pub fn new(max_entities: u32) -> Self {
        assert!(max_entities > 0, "Capacity must be greater than zero");
        assert!(max_entities < u32::MAX, "Capacity must be below u32::MAX");
        Self::from_config(&WorldConfig {
            max_entities,
            initial_entities: 0,
            ..WorldConfig::default()
        })
    }

    /// Creates an allocator sized from a validated config.
    #[must_use]
    pub fn from_config(config: &WorldConfig) -> Self {
        let reserve = config.initial_entities as usize;
        Self {
            slots: Vec::with_capacity(reserve),
            free: VecDeque::with_capacity(reserve),
            policy: config.recycle,
            max_entities: config.max_entities,
            alive_count: 0,
            retired_count: 0,
        }
    }

    /// Returns the maximum number of slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.max_entities
    }

    /// Returns the number of live handles.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Returns the number of slots ever allocated.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of indices waiting to be recycled.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Returns the number of retired slots.
    #[inline]
    #[must_use]
    pub const fn retired_count(&self) -> usize {
        self.retired_count
    }

    /// Returns the recycling policy.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> RecyclePolicy {
        self.policy
    }

    /// Allocates a handle, reusing a freed index when one is available.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AllocatorExhausted`] when the free list is empty
    /// and the slot table is at capacity.
    pub fn create(&mut self) -> EcsResult<EntityId> {
        let recycled = match self.policy {
            RecyclePolicy::Lifo => self.free.pop_back(),
            RecyclePolicy::Fifo => self.free.pop_front(),
        };

        let index = if let Some(index) = recycled {
            index
        } else {
            if self.slots.len() >= self.max_entities as usize {
                tracing::error!(capacity = self.max_entities, "entity allocator exhausted");
                return Err(EcsError::AllocatorExhausted { capacity: self.max_entities });
            }
            self.slots.push(Slot { generation: 0, alive: false });
            // Bounded by max_entities < u32::MAX.
            (self.slots.len() - 1) as u32
        };

        let slot = &mut self.slots[index as usize];
        slot.alive = true;
        self.alive_count += 1;

        let id = EntityId::new(index, slot.generation);
        tracing::trace!(entity = %id, "entity created");
        Ok(id)
    }

    /// Releases a handle and recycles its index.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleHandle`] if `id` is not live.
    pub fn destroy(&mut self, id: EntityId) -> EcsResult<()> {
        if !self.is_live(id) {
            return Err(EcsError::StaleHandle(id));
        }

        let slot = &mut self.slots[id.index() as usize];
        slot.alive = false;
        self.alive_count -= 1;

        if slot.generation == u32::MAX {
            // Wrapping would let an ancient handle compare live again.
            self.retired_count += 1;
            tracing::warn!(index = id.index(), "entity slot generation exhausted, retiring slot");
        } else {
            slot.generation += 1;
            self.free.push_back(id.index());
        }

        tracing::trace!(entity = %id, "entity destroyed");
        Ok(())
    }

    /// Checks whether `id` refers to a currently-live entity.
    #[inline]
    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.slots
            .get(id.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == id.generation())
    }

    /// Returns the live handle occupying `index`, if any.
    #[inline]
    #[must_use]
    pub fn current(&self, index: u32) -> Option<EntityId> {
        self.slots
            .get(index as usize)
            .filter(|slot| slot.alive)
            .map(|slot| EntityId::new(index, slot.generation))
    }

    /// Iterates over all live handles in slot order.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| EntityId::new(index as u32, slot.generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_destroy() {
        let mut alloc = EntityAllocator::new(100);

        let a = alloc.create().unwrap();
        let b = alloc.create().unwrap();
        assert_ne!(a, b);
        assert!(alloc.is_live(a));
        assert_eq!(alloc.alive_count(), 2);

        alloc.destroy(a).unwrap();
        assert!(!alloc.is_live(a));
        assert!(alloc.is_live(b));
        assert_eq!(alloc.alive_count(), 1);
        assert_eq!(alloc.free_count(), 1);
    }

    #[test]
    fn test_recycled_slot_has_newer_generation() {
        let mut alloc = EntityAllocator::new(100);

        let old = alloc.create().unwrap();
        alloc.destroy(old).unwrap();

        let new = alloc.create().unwrap();
        assert_eq!(new.index(), old.index()); // Same slot
        assert!(new.generation() > old.generation());
        assert!(!alloc.is_live(old));
    }

    #[test]
    fn test_double_destroy_is_stale() {
        let mut alloc = EntityAllocator::new(4);
        let id = alloc.create().unwrap();
        alloc.destroy(id).unwrap();
        assert_eq!(alloc.destroy(id), Err(EcsError::StaleHandle(id)));
    }

    #[test]
    fn test_unissued_handles_are_not_live() {
        let mut alloc = EntityAllocator::new(4);
        let id = alloc.create().unwrap();
        alloc.destroy(id).unwrap();

        // Free slot's current generation was never issued.
        assert!(!alloc.is_live(EntityId::new(id.index(), id.generation() + 1)));
        assert!(!alloc.is_live(EntityId::new(3, 0)));
        assert!(!alloc.is_live(EntityId::NULL));
    }

    #[test]
    fn test_exhaustion() {
        let mut alloc = EntityAllocator::new(2);
        let a = alloc.create().unwrap();
        let _ = alloc.create().unwrap();
        assert_eq!(alloc.create(), Err(EcsError::AllocatorExhausted { capacity: 2 }));

        // Freeing a slot makes room again.
        alloc.destroy(a).unwrap();
        assert!(alloc.create().is_ok());
    }

    #[test]
    fn test_lifo_and_fifo_order() {
        let mut lifo = EntityAllocator::new(8);
        let ids: Vec<_> = (0..3).map(|_| lifo.create().unwrap()).collect();
        lifo.destroy(ids[0]).unwrap();
        lifo.destroy(ids[1]).unwrap();
        assert_eq!(lifo.create().unwrap().index(), ids[1].index());

        let mut fifo = EntityAllocator::from_config(&WorldConfig {
            max_entities: 8,
            recycle: RecyclePolicy::Fifo,
            ..WorldConfig::default()
        });
        let ids: Vec<_> = (0..3).map(|_| fifo.create().unwrap()).collect();
        fifo.destroy(ids[0]).unwrap();
        fifo.destroy(ids[1]).unwrap();
        assert_eq!(fifo.create().unwrap().index(), ids[0].index());
    }

    #[test]
    fn test_exhausted_generation_retires_slot() {
        let mut alloc = EntityAllocator::new(4);
        let id = alloc.create().unwrap();
        alloc.slots[id.index() as usize].generation = u32::MAX;
        let last = EntityId::new(id.index(), u32::MAX);

        alloc.destroy(last).unwrap();
        assert_eq!(alloc.retired_count(), 1);
        assert_eq!(alloc.free_count(), 0);

        // The retired index is never handed out again.
        let next = alloc.create().unwrap();
        assert_ne!(next.index(), id.index());
    }

    #[test]
    fn test_current_and_iter_alive() {
        let mut alloc = EntityAllocator::new(8);
        let a = alloc.create().unwrap();
        let b = alloc.create().unwrap();
        let c = alloc.create().unwrap();
        alloc.destroy(b).unwrap();

        assert_eq!(alloc.current(a.index()), Some(a));
        assert_eq!(alloc.current(b.index()), None);
        assert_eq!(alloc.iter_alive().collect::<Vec<_>>(), vec![a, c]);
    }
}
