//! taskmatch - fuzzy matching and deduplication for task trackers
//!
//! Finds tasks with similar titles, pulls structured filters out of
//! free-text queries and clusters near-duplicate tasks. Everything runs
//! in-process and in memory; task storage and rendering belong to the caller.
//!
//! Entry point for most callers is [`MatchEngine`], which owns the caches.
//! The text primitives are also exported directly:
//!
//! ```
//! use taskmatch::{fuzzy_score, tokenize_and_normalize};
//!
//! assert_eq!(tokenize_and_normalize("Running, Tests!"), vec!["run", "test"]);
//! assert_eq!(fuzzy_score("login", "login"), 1.0);
//! ```

pub mod cache;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod query;
pub mod similarity;
pub mod task;
pub mod text;

pub use cache::{pair_key, CacheEntry, CacheStats, SimilarityCache};
pub use config::{load_config, ClassifierKind, MatchConfig};
pub use dedup::{find_duplicate_groups, DuplicateGroup};
pub use engine::{MatchEngine, SimilarTask};
pub use error::{MatchError, Result};
pub use query::{
    strip_extracted_terms, Classification, Classifier, ExtractedSearchFilters, ProcessedQuery, QueryProcessor,
};
pub use task::Task;
pub use text::{
    expand_with_synonyms, fuzzy_score, get_synonyms, jaccard_similarity, levenshtein_distance, stem_word,
    tokenize, tokenize_and_normalize,
};
