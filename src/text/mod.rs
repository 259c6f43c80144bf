//! Text primitives: normalization, metrics and synonym expansion

pub mod metrics;
pub mod normalize;
pub mod synonyms;

pub use metrics::{fuzzy_score, jaccard_similarity, levenshtein_distance};
pub use normalize::{normalize_text, stem_word, tokenize, tokenize_and_normalize};
pub use synonyms::{canonical_term, expand_with_synonyms, get_synonyms};
