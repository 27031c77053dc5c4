//! # Shared World
//!
//! A [`World`] behind a `parking_lot::RwLock`, handed out per frame phase.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ecs::World;

/// A world shared between a simulation thread and reader threads.
///
/// ## Usage
///
/// ```rust
/// use tessera_core::{Position, SharedWorld, World};
///
/// let shared = SharedWorld::new(World::new());
///
/// // Mutation phase: one writer.
/// {
///     let mut world = shared.write_handle();
///     world.register_component::<Position>().unwrap();
///     let e = world.create_entity().unwrap();
///     world.add_component(e, Position::new(1.0, 0.0, 0.0)).unwrap();
/// }
///
/// // Read phase: any number of readers, possibly on other threads.
/// std::thread::scope(|scope| {
///     for _ in 0..2 {
///         scope.spawn(|| {
///             let world = shared.read_handle();
///             assert_eq!(world.query::<(Position,)>().unwrap().iter().count(), 1);
///         });
///     }
/// });
///
/// shared.end_frame();
/// ```
///
/// ## Deadlocks
///
/// Acquiring a write handle while the same thread holds a read handle
/// deadlocks. Drop every handle before the next phase.
pub struct SharedWorld {
    /// The world.
    world: RwLock<World>,
    /// Completed frames.
    frame_count: AtomicU64,
}

impl SharedWorld {
    /// Wraps a world for phased sharing.
    #[must_use]
    pub fn new(world: World) -> Arc<Self> {
        Arc::new(Self {
            world: RwLock::new(world),
            frame_count: AtomicU64::new(0),
        })
    }

    /// Returns the number of completed frames.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Acquire)
    }

    /// Returns whether a write handle is currently held.
    #[inline]
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.world.is_locked_exclusive()
    }

    /// Enters the mutation phase, blocking until all readers are gone.
    #[must_use]
    pub fn write_handle(&self) -> WorldWriteHandle<'_> {
        WorldWriteHandle {
            guard: self.world.write(),
            frame: self.frame_count(),
        }
    }

    /// Enters the mutation phase if no other handle is held.
    #[must_use]
    pub fn try_write_handle(&self) -> Option<WorldWriteHandle<'_>> {
        let guard = self.world.try_write()?;
        Some(WorldWriteHandle {
            guard,
            frame: self.frame_count(),
        })
    }

    /// Enters the read phase, blocking while a writer is active.
    #[must_use]
    pub fn read_handle(&self) -> WorldReadHandle<'_> {
        WorldReadHandle {
            guard: self.world.read(),
            frame: self.frame_count(),
        }
    }

    /// Marks the end of a frame and returns the new frame count.
    ///
    /// # Panics
    ///
    /// Panics if a write handle is still active.
    pub fn end_frame(&self) -> u64 {
        assert!(
            !self.is_write_locked(),
            "Cannot end frame while a write handle is active"
        );
        self.frame_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Unwraps the world once every other owner is gone.
    ///
    /// # Errors
    ///
    /// Returns the `Arc` unchanged if it is still shared.
    pub fn try_into_inner(this: Arc<Self>) -> Result<World, Arc<Self>> {
        Arc::try_unwrap(this).map(|shared| shared.world.into_inner())
    }
}

/// Exclusive access to the world for one mutation phase.
pub struct WorldWriteHandle<'a> {
    guard: RwLockWriteGuard<'a, World>,
    frame: u64,
}

impl WorldWriteHandle<'_> {
    /// Frame during which this handle was acquired.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }
}

impl Deref for WorldWriteHandle<'_> {
    type Target = World;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for WorldWriteHandle<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

/// Shared access to the world for one read phase.
pub struct WorldReadHandle<'a> {
    guard: RwLockReadGuard<'a, World>,
    frame: u64,
}

impl WorldReadHandle<'_> {
    /// Frame during which this handle was acquired.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }
}

impl Deref for WorldReadHandle<'_> {
    type Target = World;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}
