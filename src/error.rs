//! Error types for the stacking engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, PackingError>;

/// Errors that can occur while validating a request or evaluating a packing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackingError {
    /// A block or container extent is not a positive finite number.
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    /// The request contains no blocks.
    #[error("Request contains no blocks")]
    EmptyRequest,

    /// Request parameters are inconsistent (e.g. a block wider than the container).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A rotation about an axis the block does not permit.
    #[error("Block '{block}' may not be rotated about the {axis:?} axis")]
    RotationNotAllowed { block: String, axis: crate::types::Axis },

    /// No supported free cell exists at all. The container walls guarantee
    /// one for every block that fits the footprint, so this is an internal
    /// consistency failure and aborts the evaluation.
    #[error("No stable point found for block '{block}'")]
    NoStablePointFound { block: String },
}

impl PackingError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PackingError::InvalidDimension(_) => "invalid_dimension",
            PackingError::EmptyRequest => "empty_request",
            PackingError::InvalidConfiguration(_) => "invalid_configuration",
            PackingError::RotationNotAllowed { .. } => "rotation_not_allowed",
            PackingError::NoStablePointFound { .. } => "no_stable_point_found",
        }
    }

    /// Whether the error is caused by the caller's input rather than an
    /// engine inconsistency.
    pub fn is_validation(&self) -> bool {
        !matches!(self, PackingError::NoStablePointFound { .. })
    }
}
