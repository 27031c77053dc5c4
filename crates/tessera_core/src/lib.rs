//! # TESSERA Core
//!
//! Sparse-set Entity Component System (ECS) storage core:
//! - Generational entity handles with stale-handle detection
//! - One packed array per component type, O(1) add/remove/lookup
//! - Multi-component queries driven by the smallest array
//!
//! ## Architecture Rules
//!
//! 1. **Packed storage** - Components live in contiguous arrays, no holes
//! 2. **Checked handles** - Every operation validates the entity generation first
//! 3. **Borrow-checked iteration** - Structural mutation during a query does not compile
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{Position, Velocity, World};
//!
//! let mut world = World::new();
//! world.register_component::<Position>().unwrap();
//! world.register_component::<Velocity>().unwrap();
//!
//! let e = world.create_entity().unwrap();
//! world.add_component(e, Position::new(0.0, 0.0, 0.0)).unwrap();
//! world.add_component(e, Velocity::new(1.0, 0.0, 0.0)).unwrap();
//!
//! world
//!     .for_each_mut::<Position, (Velocity,), _>(|_, pos, (vel,)| pos.integrate(vel, 0.5))
//!     .unwrap();
//! assert_eq!(world.get_component::<Position>(e).unwrap().x, 0.5);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod sync;

pub use config::{RecyclePolicy, WorldConfig};
pub use ecs::{
    AnyComponentArray, Component, ComponentArray, ComponentRegistry, ComponentsMut, Cursor, EntityAllocator,
    EntityId, Query, QueryData, QueryIter, RegistryView, StorageSource, World, MAX_COMPONENT_TYPES,
    Position, Velocity,
};
pub use error::{ConfigError, EcsError, EcsResult};
pub use sync::{SharedWorld, WorldReadHandle, WorldWriteHandle};
