//! Query understanding on top of an injected classifier

pub mod classifier;
pub mod processor;

pub use classifier::{
    build_classifier, Classification, Classifier, Entity, IntentScore, KeywordClassifier, MockClassifier,
};
pub use processor::{strip_extracted_terms, ExtractedSearchFilters, ProcessedQuery, QueryProcessor};
