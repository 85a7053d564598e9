//! Glue between the collaborators and the pure engine pipeline.

pub mod analyzer;

pub use analyzer::{AnalysisError, Analyzer};
