//! Error types for the AgriSense core.
//!
//! This module provides the error taxonomy shared by every crate in the
//! workspace, built on [`thiserror`] for automatic `Display` and `Error`
//! implementations.
//!
//! # Error Hierarchy
//!
//! - [`CoreError`]: top-level error type unifying all subsystem errors
//! - [`ConfigError`]: malformed farm configuration
//! - [`GraphError`]: structural precondition violations on a hypergraph
//! - [`DeserializeError`]: corrupt or incomplete serialized graph state
//! - [`NumericError`]: failures of the numeric routines (e.g. a singular
//!   ridge system)
//! - [`BackendError`]: explicit failure to run a kernel on a backend
//!
//! Missing optional layers, unknown vertex ids inside edge definitions, and
//! near-zero variance guards are *not* errors; those degrade locally per
//! the propagation policy. Only structural violations surface here.
//!
//! # Example
//!
//! ```rust
//! use agrisense_core::error::{CoreError, GraphError};
//!
//! fn lookup() -> Result<(), CoreError> {
//!     Err(GraphError::LayerNotFound {
//!         layer: "vision".into(),
//!         available: vec!["soil".into(), "weather".into()],
//!     }
//!     .into())
//! }
//! ```

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Top-level error type for the AgriSense core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Farm configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Hypergraph structural error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Serialized state reconstruction error
    #[error("Deserialize error: {0}")]
    Deserialize(#[from] DeserializeError),

    /// Numeric routine failure
    #[error("Numeric error: {0}")]
    Numeric(#[from] NumericError),

    /// Kernel launch failure
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors raised while validating a farm configuration.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// Farm type outside the supported set
    #[error("Unknown farm type '{value}' (expected open_field, greenhouse, or hybrid)")]
    UnknownFarmType {
        /// The rejected farm type token
        value: String,
    },

    /// Layer tag outside the supported set in `active_layers`
    #[error("Unknown layer tag '{layer}' in active_layers")]
    UnknownLayer {
        /// The rejected layer tag
        layer: String,
    },

    /// Zone definitions inconsistent with the farm type
    #[error("Inconsistent zone definition: {message}")]
    ZoneMismatch {
        /// What was inconsistent
        message: String,
    },

    /// A required configuration field is absent
    #[error("Missing configuration field '{field}'")]
    MissingField {
        /// Name of the absent field
        field: &'static str,
    },
}

impl ConfigError {
    /// Creates a zone-mismatch error.
    #[must_use]
    pub fn zone_mismatch(message: impl Into<String>) -> Self {
        Self::ZoneMismatch {
            message: message.into(),
        }
    }
}

/// Structural errors on hypergraph operations.
///
/// These fire only where absence is a precondition violation: cross-layer
/// queries, feature updates through the external contract, and duplicate
/// vertex insertion. Read paths that tolerate absence return error records
/// instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GraphError {
    /// Referenced layer is not materialised in this graph
    #[error("Layer '{layer}' not found (available: {})", available.join(", "))]
    LayerNotFound {
        /// The missing layer tag
        layer: String,
        /// Layers present in the graph
        available: Vec<String>,
    },

    /// Referenced vertex id is not in the global index
    #[error("Vertex '{vertex_id}' not found in layer '{layer}'")]
    VertexNotFound {
        /// The missing vertex id
        vertex_id: String,
        /// Layer the lookup targeted
        layer: String,
    },

    /// Vertex id already present in the global index
    #[error("Vertex '{vertex_id}' is already indexed")]
    DuplicateVertex {
        /// The duplicated vertex id
        vertex_id: String,
    },
}

/// Errors raised while rehydrating a serialized graph state.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DeserializeError {
    /// A required top-level key is absent
    #[error("Serialized graph state is missing top-level key '{key}'")]
    MissingKey {
        /// The absent key
        key: &'static str,
    },

    /// A per-layer reconstruction failed; the message carries the layer name
    #[error("Layer '{layer}': {reason}")]
    Layer {
        /// Layer whose reconstruction failed
        layer: String,
        /// Underlying failure description
        reason: String,
    },

    /// The state is structurally malformed beyond a single layer
    #[error("Malformed graph state: {message}")]
    Malformed {
        /// Description of the corruption
        message: String,
    },
}

impl DeserializeError {
    /// Wraps a per-layer failure with the layer name.
    #[must_use]
    pub fn layer(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Layer {
            layer: layer.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed-state error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Failures of the numeric routines.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NumericError {
    /// The ridge normal equations are singular below working precision
    #[error("Singular linear system of size {size}x{size}")]
    SingularSystem {
        /// Dimension of the system
        size: usize,
    },

    /// Operand shapes do not agree
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension description
        expected: String,
        /// Actual dimension description
        actual: String,
    },
}

/// Explicit kernel launch failures.
///
/// Backend *absence* is never an error; detection silently degrades to the
/// host lane. This type exists for operations a backend genuinely cannot
/// perform.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BackendError {
    /// The requested operation is not supported on this backend
    #[error("Operation '{operation}' is not supported on the {backend} backend")]
    Unsupported {
        /// Name of the rejected operation
        operation: &'static str,
        /// Backend that rejected it
        backend: &'static str,
    },
}
