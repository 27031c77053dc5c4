//! # ECS Error Types
//!
//! All errors that can occur in the entity/component storage core.
//!
//! Every variant is a caller logic error (stale handle reuse, double
//! registration, ...) rather than an environmental failure, so none of them
//! are retryable: they are surfaced immediately to the caller.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur in the ECS core.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// The handle does not refer to a currently-live entity.
    #[error("stale entity handle {0}")]
    StaleHandle(EntityId),

    /// The entity has no component of the requested type.
    #[error("entity {entity} has no {component} component")]
    ComponentNotFound {
        /// The entity that was probed.
        entity: EntityId,
        /// Type name of the missing component.
        component: &'static str,
    },

    /// The entity already has a component of this type.
    #[error("entity {entity} already has a {component} component")]
    DuplicateComponent {
        /// The entity that already holds the component.
        entity: EntityId,
        /// Type name of the duplicated component.
        component: &'static str,
    },

    /// The component type was never registered with the world.
    #[error("component type {0} is not registered")]
    UnregisteredType(&'static str),

    /// The component type was registered twice.
    #[error("component type {0} is already registered")]
    TypeAlreadyRegistered(&'static str),

    /// Two distinct component types declare the same id.
    #[error("component id {id} is claimed by both {existing} and {requested}")]
    ComponentIdConflict {
        /// The contested id.
        id: u8,
        /// Type currently registered under the id.
        existing: &'static str,
        /// Type that attempted to register.
        requested: &'static str,
    },

    /// The component id does not fit in the registry table.
    #[error("component id {id} exceeds the registry limit of {limit}")]
    ComponentIdOutOfRange {
        /// The offending id.
        id: u8,
        /// Number of slots in the registry.
        limit: usize,
    },

    /// No entity index is left at the configured capacity.
    #[error("entity allocator exhausted at capacity {capacity}")]
    AllocatorExhausted {
        /// The configured maximum number of entity slots.
        capacity: u32,
    },

    /// A query asked for mutable and shared access to the same component type.
    #[error("component {0} is accessed both mutably and immutably")]
    ConflictingAccess(&'static str),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors raised while loading a [`WorldConfig`](crate::WorldConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for a world config.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but its values are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let id = EntityId::new(7, 2);
        assert_eq!(EcsError::StaleHandle(id).to_string(), "stale entity handle 7v2");
        assert_eq!(
            EcsError::ComponentNotFound { entity: id, component: "Position" }.to_string(),
            "entity 7v2 has no Position component"
        );
        assert_eq!(
            EcsError::AllocatorExhausted { capacity: 16 }.to_string(),
            "entity allocator exhausted at capacity 16"
        );
    }

    #[test]
    fn test_config_error_from_toml() {
        let err = toml::from_str::<toml::Table>("max_entities = ").unwrap_err();
        let err = ConfigError::from(err);
        assert!(err.to_string().starts_with("failed to parse configuration"));
    }
}
