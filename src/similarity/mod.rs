//! Similarity scoring over many candidates

pub mod bulk;

pub use bulk::{first_pass_estimate, BulkSimilarityCalculator, FirstPass};
