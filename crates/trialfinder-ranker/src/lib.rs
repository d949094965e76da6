//! trialfinder-ranker — Trial relevance scoring and ranking.
//! - Patient factors and weight vector
//! - Data-driven scoring rules with human-readable reasons
//! - Deterministic ranking
//! - The end-to-end search pipeline

pub mod patient;
pub mod ranking;
pub mod rules;
pub mod scorer;
pub mod search;
pub mod weights;

pub use patient::PatientFactors;
pub use ranking::{rank, top_n};
pub use scorer::{score, ScoredTrial, Scorer};
pub use search::{SearchOutcome, TrialSearch};
pub use weights::WeightVector;
