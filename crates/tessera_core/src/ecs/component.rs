//! # Component System
//!
//! Components are plain data blocks owned by exactly one entity at a time.
//! Each component type carries a small, process-wide stable id that keys the
//! world's registry table.

use bytemuck::{Pod, Zeroable};

/// Number of slots in the component registry. Valid ids are `0..64`.
pub const MAX_COMPONENT_TYPES: usize = 64;

/// Marker trait for ECS components.
///
/// Components must be `Send + Sync + 'static` so a world can be shared
/// between a writer phase and concurrent reader phases.
///
/// Ids `0` and `1` are taken by the built-in [`Position`] and [`Velocity`].
///
/// # Example
///
/// ```rust
/// use tessera_core::Component;
///
/// struct Health(u32);
///
/// impl Component for Health {
///     const ID: u8 = 8;
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// Unique identifier for this component type (`0..MAX_COMPONENT_TYPES`).
    ///
    /// Registering two distinct types with the same id is rejected.
    const ID: u8;

    /// Human-readable name used in errors and logs.
    #[must_use]
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Position component for entities.
///
/// Represents a 3D position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// X coordinate in world space.
    pub x: f32,
    /// Y coordinate in world space.
    pub y: f32,
    /// Z coordinate in world space.
    pub z: f32,
    /// Padding for alignment (ensures 16-byte stride for GPU upload).
    pub _padding: f32,
}

impl Component for Position {
    const ID: u8 = 0;
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            _padding: 0.0,
        }
    }

    /// Advances this position by `velocity` over `delta_time` seconds.
    #[inline]
    pub fn integrate(&mut self, velocity: &Velocity, delta_time: f32) {
        self.x += velocity.x * delta_time;
        self.y += velocity.y * delta_time;
        self.z += velocity.z * delta_time;
    }
}

/// Velocity component for entities.
///
/// Represents movement speed in world units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    /// X velocity component.
    pub x: f32,
    /// Y velocity component.
    pub y: f32,
    /// Z velocity component.
    pub z: f32,
    /// Padding for alignment.
    pub _padding: f32,
}

impl Component for Velocity {
    const ID: u8 = 1;
}

impl Velocity {
    /// Creates a new velocity.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            _padding: 0.0,
        }
    }
}
