//! Duplicate detection across a task list

pub mod cluster;

pub use cluster::{build_similarity_matrix, find_duplicate_groups, group_by_matrix, DuplicateGroup};
