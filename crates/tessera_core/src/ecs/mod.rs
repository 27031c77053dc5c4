//! # Entity Component System
//!
//! Sparse-set ECS storage core.
//!
//! ## Design Philosophy
//!
//! - Entities are generational handles; stale handles are rejected, never aliased
//! - Each component type lives in its own packed array with O(1) add/remove/lookup
//! - Queries walk the smallest array and probe the rest
//! - No dynamic dispatch in hot paths beyond one downcast per array

mod allocator;
mod component;
mod entity;
mod query;
mod registry;
mod storage;
mod world;

pub use allocator::EntityAllocator;
pub use component::{Component, Position, Velocity, MAX_COMPONENT_TYPES};
pub use entity::EntityId;
pub use query::{Query, QueryData, QueryIter};
pub use registry::{AnyComponentArray, ComponentRegistry, RegistryView, StorageSource};
pub use storage::{ComponentArray, ComponentsMut, Cursor};
pub use world::World;
