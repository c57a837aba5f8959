//! Error types for the collision world.

use thiserror::Error;

/// Collision world errors.
///
/// Queries never fail at runtime; these errors surface when shapes or
/// bodies are constructed from authored data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollisionError {
    /// A shape dimension is negative, zero where it must be positive, or not finite.
    #[error("invalid shape dimension `{name}`: {value}")]
    InvalidDimension {
        /// Name of the offending dimension
        name: &'static str,
        /// The rejected value
        value: f32,
    },

    /// Two bodies were registered for the same entity.
    #[error("entity {0} already owns a body")]
    DuplicateEntity(u64),
}

/// Result type for collision world construction.
pub type Result<T> = std::result::Result<T, CollisionError>;
