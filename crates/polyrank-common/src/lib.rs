//! polyrank-common — Shared types, errors and configuration used across all polyrank crates.

pub mod error;
pub mod config;
pub mod triple;
pub mod table;

// Re-export commonly used types
pub use error::{PolyrankError, Result};
pub use config::{DuplicatePolicy, ScalingConfig};
pub use triple::{ResultTriple, StudentId, SubjectId};
