//! # AgriSense Core
//!
//! Foundational types and utilities for the AgriSense layered hypergraph
//! engine.
//!
//! This crate provides the building blocks shared by the rest of the
//! workspace:
//!
//! - **Backend dispatch**: [`Backend`] selection between the parallel lane
//!   and sequential host execution, the unified [`launch`] kernel wrapper,
//!   and the [`Residency`] tag driving code-path dispatch.
//!
//! - **Array types**: residency-tagged dense tensors ([`Tensor2`],
//!   [`Tensor3`]) and the compressed-sparse-column incidence matrix
//!   ([`CscMatrix`]) with the two products the engine needs.
//!
//! - **Error taxonomy**: [`CoreError`] and its per-subsystem variants via
//!   the [`error`] module.
//!
//! - **Runtime knobs**: [`RuntimeKnobs`] read once from the environment
//!   (`FORCE_HOST_BACKEND`, `HISTORY_SIZE`).
//!
//! ## Example
//!
//! ```rust
//! use agrisense_core::{Backend, CscMatrix};
//!
//! let incidence = CscMatrix::from_triplets(3, 1, &[(0, 0, 1.0), (2, 0, 1.0)]);
//! assert_eq!(incidence.col_degrees(), vec![2.0]);
//! assert!(matches!(Backend::detect(), Backend::Parallel | Backend::Host));
//! ```

#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod knobs;
pub mod sparse;
pub mod tensor;

pub use backend::{launch, Backend, Residency, WORKGROUP_SIZE};
pub use error::{
    BackendError, ConfigError, CoreError, CoreResult, DeserializeError, GraphError, NumericError,
};
pub use knobs::{
    RuntimeKnobs, DEFAULT_CADENCE_MINUTES, DEFAULT_DROPOUT_RATE, DEFAULT_HISTORY_SIZE,
};
pub use sparse::CscMatrix;
pub use tensor::{Tensor2, Tensor3};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
///
/// ```rust
/// use agrisense_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backend::{launch, Backend, Residency};
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::knobs::RuntimeKnobs;
    pub use crate::sparse::CscMatrix;
    pub use crate::tensor::{Tensor2, Tensor3};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_valid() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_detect_is_stable() {
        // Detection is cached; repeated probes must agree.
        assert_eq!(Backend::detect(), Backend::detect());
    }
}
