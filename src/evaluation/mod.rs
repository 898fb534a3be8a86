//! # Evaluation Engine
//!
//! Runs every configured reference/compressed pair through the metrics
//! pipeline and gathers the per-pair results into an [`EvaluationReport`].

pub mod engine;

pub use engine::{evaluate_pair, EvaluationReport, Evaluator, PairOutcome, PairReport, SkippedPair};
