//! Shared types and error definitions used across the gridcast workspace.
//!
//! ## Submodules
//!
//! - [`error`] - Centralized error type used by the broker, the workers, and
//!   the codec.
//! - [`types`] - Cell representation and halo constants.
//!
//! These definitions are not tied to any specific layer and are imported
//! throughout the workspace for error propagation and wire encoding.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
