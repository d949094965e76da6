//! trialfinder-common — Shared types, errors, and helpers used across all trialfinder crates.

pub mod error;
pub mod diagnosis;
pub mod sandbox;

// Re-export commonly used types
pub use diagnosis::{Diagnosis, DiseaseSetting};
pub use error::{Result, TrialFinderError};
