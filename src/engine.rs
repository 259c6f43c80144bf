//! Matching engine: the cached entry point for callers
//!
//! Owns one query processor and three independent caches (processed
//! queries, pair scores, search filters). Nothing is global: each engine
//! instance carries its own state and `clear_caches` resets it.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{pair_key, CacheStats, SimilarityCache};
use crate::config::MatchConfig;
use crate::dedup::{group_by_matrix, DuplicateGroup};
use crate::error::Result;
use crate::query::{Classifier, ExtractedSearchFilters, ProcessedQuery, QueryProcessor};
use crate::similarity::BulkSimilarityCalculator;
use crate::task::Task;
use crate::text::{fuzzy_score, normalize_text};

/// A task that matched a title search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarTask {
    pub id: String,
    pub title: String,
    pub similarity: f64,
}

/// Stats for each of the engine's caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EngineCacheStats {
    pub queries: CacheStats,
    pub similarities: CacheStats,
    pub filters: CacheStats,
}

pub struct MatchEngine {
    config: MatchConfig,
    processor: QueryProcessor,
    query_cache: SimilarityCache<ProcessedQuery>,
    similarity_cache: SimilarityCache<f64>,
    filters_cache: SimilarityCache<ExtractedSearchFilters>,
}

impl MatchEngine {
    /// Build an engine with the classifier named in `config`
    pub fn new(config: MatchConfig) -> Self {
        let processor = QueryProcessor::from_config(&config);
        Self::with_processor(config, processor)
    }

    /// Build an engine around a caller-supplied classifier
    pub fn with_classifier(config: MatchConfig, classifier: Arc<dyn Classifier>) -> Self {
        let processor = QueryProcessor::new(classifier, config.locale.clone(), config.classifier_timeout());
        Self::with_processor(config, processor)
    }

    fn with_processor(config: MatchConfig, processor: QueryProcessor) -> Self {
        Self {
            query_cache: SimilarityCache::from_config(&config.cache),
            similarity_cache: SimilarityCache::from_config(&config.cache),
            filters_cache: SimilarityCache::from_config(&config.cache),
            processor,
            config,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Analyze a query, cached by its normalized text
    pub async fn process_query(&self, query: &str) -> Result<ProcessedQuery> {
        let key = normalize_text(query);
        if let Some(hit) = self.query_cache.get(&key) {
            return Ok(hit);
        }

        let processed = self.processor.process_query(query).await?;
        self.query_cache.set(key, processed.clone());
        Ok(processed)
    }

    /// Blended similarity of two texts, cached per unordered pair
    pub async fn get_similarity(&self, text1: &str, text2: &str) -> Result<f64> {
        let key = pair_key(text1, text2);
        if let Some(score) = self.similarity_cache.get(&key) {
            return Ok(score);
        }

        let score = self.processor.calculate_similarity(text1, text2).await?;
        self.similarity_cache.set(key, score);
        Ok(score)
    }

    /// Search filters for a query, cached by its normalized text
    pub async fn extract_search_filters(&self, query: &str) -> Result<ExtractedSearchFilters> {
        let key = normalize_text(query);
        if let Some(hit) = self.filters_cache.get(&key) {
            return Ok(hit);
        }

        let filters = self.processor.extract_search_filters(query).await?;
        self.filters_cache.set(key, filters.clone());
        Ok(filters)
    }

    /// Two-pass bulk scoring; `(index, score)` pairs, highest first
    pub async fn bulk_calculate_similarity<S: AsRef<str>>(
        &self,
        target: &str,
        candidates: &[S],
        threshold: f64,
    ) -> Result<Vec<(usize, f64)>> {
        BulkSimilarityCalculator::new(&self.processor, &self.similarity_cache)
            .calculate(target, candidates, threshold)
            .await
    }

    /// Tasks whose title resembles `title`, highest similarity first
    ///
    /// With `use_fuzzy`, an edit-distance pass also runs over every title.
    /// A task found by both passes appears once with its higher score.
    pub async fn find_similar_tasks(
        &self,
        tasks: &[Task],
        title: &str,
        threshold: f64,
        use_fuzzy: bool,
    ) -> Result<Vec<SimilarTask>> {
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        let matches = self.bulk_calculate_similarity(title, &titles, threshold).await?;

        // id -> (first index seen, best score)
        let mut best: HashMap<&str, (usize, f64)> = HashMap::new();
        let mut record = |index: usize, score: f64| {
            best.entry(tasks[index].id.as_str())
                .and_modify(|(_, s)| *s = s.max(score))
                .or_insert((index, score));
        };

        for (index, score) in matches {
            record(index, score);
        }

        if use_fuzzy {
            for (index, candidate) in titles.iter().enumerate() {
                let score = fuzzy_score(title, candidate);
                if score >= threshold {
                    record(index, score);
                }
            }
        }

        let mut results: Vec<(usize, SimilarTask)> = best
            .into_iter()
            .map(|(_, (index, similarity))| {
                (
                    index,
                    SimilarTask {
                        id: tasks[index].id.clone(),
                        title: tasks[index].title.clone(),
                        similarity,
                    },
                )
            })
            .collect();

        results.sort_by(|a, b| {
            b.1.similarity
                .partial_cmp(&a.1.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        debug!("Found {} tasks similar to '{}'", results.len(), title);
        Ok(results.into_iter().map(|(_, task)| task).collect())
    }

    /// Group near-duplicate tasks by title similarity
    ///
    /// Groups come back in scan order; sorting them is up to the caller.
    pub async fn find_duplicate_groups(&self, tasks: &[Task], threshold: f64) -> Result<Vec<DuplicateGroup>> {
        let n = tasks.len();
        if n <= 1 {
            return Ok(Vec::new());
        }

        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            matrix[i][i] = 1.0;
            for j in (i + 1)..n {
                let score = self.get_similarity(&tasks[i].title, &tasks[j].title).await?;
                matrix[i][j] = score;
                matrix[j][i] = score;
            }
        }

        let groups = group_by_matrix(tasks, &matrix, threshold);
        info!("Found {} duplicate groups among {} tasks", groups.len(), n);
        Ok(groups)
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            queries: self.query_cache.stats(),
            similarities: self.similarity_cache.stats(),
            filters: self.filters_cache.stats(),
        }
    }

    /// Drop every cached value
    pub fn clear_caches(&self) {
        self.query_cache.clear();
        self.similarity_cache.clear();
        self.filters_cache.clear();
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierKind;
    use crate::query::Classification;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    #[derive(Default)]
    struct CountingClassifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Classifier for CountingClassifier {
        async fn process(&self, _locale: &str, _text: &str) -> anyhow::Result<Classification> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Classification::default())
        }
    }

    fn tasks(titles: &[&str]) -> Vec<Task> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| Task::new(format!("t{i}"), *t))
            .collect()
    }

    fn keyword_engine() -> MatchEngine {
        MatchEngine::new(MatchConfig {
            classifier: ClassifierKind::Keyword,
            ..MatchConfig::default()
        })
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MatchEngine>();
    }

    #[tokio::test]
    async fn test_similarity_cache_is_symmetric() {
        let classifier = Arc::new(CountingClassifier::default());
        let engine = MatchEngine::with_classifier(MatchConfig::default(), classifier.clone());

        let ab = engine.get_similarity("Fix login bug", "login bug fix later").await.unwrap();
        let calls = classifier.calls.load(AtomicOrdering::SeqCst);
        assert_eq!(calls, 2);

        let ba = engine.get_similarity("login bug fix later", "Fix login bug").await.unwrap();
        assert_eq!(ab, ba);
        assert_eq!(classifier.calls.load(AtomicOrdering::SeqCst), calls);
        assert_eq!(engine.cache_stats().similarities.hits, 1);
    }

    #[tokio::test]
    async fn test_clear_caches_forces_recompute() {
        let classifier = Arc::new(CountingClassifier::default());
        let engine = MatchEngine::with_classifier(MatchConfig::default(), classifier.clone());

        engine.get_similarity("write docs", "update docs").await.unwrap();
        engine.clear_caches();
        engine.get_similarity("write docs", "update docs").await.unwrap();
        assert_eq!(classifier.calls.load(AtomicOrdering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_process_query_cached_by_normalized_text() {
        let classifier = Arc::new(CountingClassifier::default());
        let engine = MatchEngine::with_classifier(MatchConfig::default(), classifier.clone());

        let first = engine.process_query("Show  DONE tasks").await.unwrap();
        let second = engine.process_query("show done tasks").await.unwrap();
        assert_eq!(first.normalized, second.normalized);
        assert_eq!(classifier.calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(engine.cache_stats().queries.hits, 1);
    }

    #[tokio::test]
    async fn test_extract_search_filters_cached() {
        let engine = keyword_engine();
        let first = engine.extract_search_filters("list ready tasks #backend").await.unwrap();
        assert_eq!(first.readiness.as_deref(), Some("ready"));
        assert_eq!(first.action_types, vec!["list"]);

        let second = engine.extract_search_filters("List ready tasks #backend").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.cache_stats().filters.hits, 1);
    }

    #[tokio::test]
    async fn test_duplicate_groups_example() {
        let engine = MatchEngine::default();
        let tasks = tasks(&["Fix login bug", "Fix login bug urgent", "Add dark mode"]);
        let groups = engine.find_duplicate_groups(&tasks, 0.5).await.unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].tasks.len(), 2);
        assert_eq!(groups[0].tasks[0].title, "Fix login bug");
        assert_eq!(groups[0].tasks[1].title, "Fix login bug urgent");
        assert_eq!(groups[0].similarity_matrix[0][0], 1.0);
        assert_eq!(groups[0].similarity_matrix[0][1], groups[0].similarity_matrix[1][0]);
    }

    #[tokio::test]
    async fn test_duplicate_groups_with_keyword_classifier() {
        let engine = keyword_engine();
        let tasks = tasks(&["Fix login bug", "Fix login bug urgent", "Add dark mode"]);
        let groups = engine.find_duplicate_groups(&tasks, 0.5).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert!((groups[0].max_similarity - 0.875).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_duplicate_groups_full_threshold() {
        let engine = MatchEngine::default();
        let tasks = tasks(&["Fix login bug", "Login bug fix", "Add dark mode"]);
        assert!(engine.find_duplicate_groups(&tasks, 1.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_similar_tasks() {
        let engine = MatchEngine::default();
        let tasks = tasks(&["Fix login bug", "Add dark mode", "Fix login bug urgent", "Fix lgoin bug"]);

        let lexical = engine.find_similar_tasks(&tasks, "Fix login bug", 0.55, false).await.unwrap();
        let ids: Vec<&str> = lexical.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t2"]);

        // The typo only shows up through the edit-distance pass
        let fuzzy = engine.find_similar_tasks(&tasks, "Fix login bug", 0.55, true).await.unwrap();
        let ids: Vec<&str> = fuzzy.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t3", "t2"]);
        assert_eq!(fuzzy[0].similarity, 1.0);
        for pair in fuzzy.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[tokio::test]
    async fn test_find_similar_tasks_dedups_ids() {
        let engine = MatchEngine::default();
        let tasks = tasks(&["Fix login bug"]);
        let found = engine.find_similar_tasks(&tasks, "fix login bug", 0.5, true).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].similarity, 1.0);
    }

    #[tokio::test]
    async fn test_bulk_through_engine() {
        let engine = MatchEngine::default();
        let results = engine
            .bulk_calculate_similarity("fix login bug", &["fix login bug", "unrelated work item"], 0.5)
            .await
            .unwrap();
        assert_eq!(results, vec![(0, 1.0)]);
    }
}
