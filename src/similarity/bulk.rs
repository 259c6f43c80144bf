//! Two-pass similarity scoring of one target against many candidates
//!
//! The first pass is cheap: cache lookups, trivial short-circuits, a
//! length-ratio gate and a stem-set Jaccard estimate. Only candidates whose
//! estimate clears a relaxed cutoff go on to the full blended score.

use std::cmp::Ordering;

use tracing::debug;

use crate::cache::{pair_key, SimilarityCache};
use crate::error::Result;
use crate::query::QueryProcessor;
use crate::text::{jaccard_similarity, normalize_text, tokenize_and_normalize};

/// Below this shorter/longer length ratio two texts cannot be close
pub const LENGTH_RATIO_GATE: f64 = 0.3;

/// First-pass survivors need `estimate >= threshold * PREFILTER_FACTOR`
pub const PREFILTER_FACTOR: f64 = 0.7;

/// Estimates above this are accepted without the full score
pub const ACCEPT_ESTIMATE_ABOVE: f64 = 0.8;

/// Outcome of the cheap pass for one candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FirstPass {
    /// Already the final score (cached, trivial or length-gated)
    Final(f64),
    /// Jaccard estimate that may still need the full score
    Estimate(f64),
}

impl FirstPass {
    pub fn score(self) -> f64 {
        match self {
            FirstPass::Final(s) | FirstPass::Estimate(s) => s,
        }
    }
}

/// Cheap score for two texts, without the cache or the classifier
pub fn first_pass_estimate(a: &str, b: &str) -> FirstPass {
    let a = normalize_text(a);
    let b = normalize_text(b);

    if a.is_empty() || b.is_empty() {
        return FirstPass::Final(0.0);
    }
    if a == b {
        return FirstPass::Final(1.0);
    }

    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    let ratio = len_a.min(len_b) as f64 / len_a.max(len_b) as f64;
    if ratio < LENGTH_RATIO_GATE {
        return FirstPass::Final(ratio * 0.5);
    }

    FirstPass::Estimate(jaccard_similarity(tokenize_and_normalize(&a), tokenize_and_normalize(&b)))
}

/// Bulk scorer backed by a shared pair-score cache
pub struct BulkSimilarityCalculator<'a> {
    processor: &'a QueryProcessor,
    cache: &'a SimilarityCache<f64>,
}

impl<'a> BulkSimilarityCalculator<'a> {
    pub fn new(processor: &'a QueryProcessor, cache: &'a SimilarityCache<f64>) -> Self {
        Self { processor, cache }
    }

    /// Score every candidate against `target`
    ///
    /// Returns `(candidate index, score)` for scores `>= threshold`, highest
    /// first. Ties keep candidate order.
    pub async fn calculate<S: AsRef<str>>(
        &self,
        target: &str,
        candidates: &[S],
        threshold: f64,
    ) -> Result<Vec<(usize, f64)>> {
        // Pass 1
        let mut survivors: Vec<(usize, FirstPass)> = Vec::new();
        let cutoff = threshold * PREFILTER_FACTOR;

        for (index, candidate) in candidates.iter().enumerate() {
            let candidate = candidate.as_ref();
            let key = pair_key(target, candidate);

            let pass = match self.cache.get(&key) {
                Some(score) => FirstPass::Final(score),
                None => {
                    let pass = first_pass_estimate(target, candidate);
                    if let FirstPass::Final(score) = pass {
                        self.cache.set(key, score);
                    }
                    pass
                }
            };

            if pass.score() >= cutoff {
                survivors.push((index, pass));
            }
        }

        survivors.sort_by(|a, b| by_score_desc((a.0, a.1.score()), (b.0, b.1.score())));
        debug!(
            "Bulk similarity: {} of {} candidates survived the first pass (cutoff {:.2})",
            survivors.len(),
            candidates.len(),
            cutoff
        );

        // Pass 2
        let mut results: Vec<(usize, f64)> = Vec::with_capacity(survivors.len());
        let mut rescored = 0usize;

        for (index, pass) in survivors {
            let score = match pass {
                FirstPass::Final(score) => score,
                FirstPass::Estimate(score) if score > ACCEPT_ESTIMATE_ABOVE => {
                    self.cache.set(pair_key(target, candidates[index].as_ref()), score);
                    score
                }
                FirstPass::Estimate(_) => {
                    let candidate = candidates[index].as_ref();
                    let score = self.processor.calculate_similarity(target, candidate).await?;
                    self.cache.set(pair_key(target, candidate), score);
                    rescored += 1;
                    score
                }
            };

            if score >= threshold {
                results.push((index, score));
            }
        }

        results.sort_by(|a, b| by_score_desc(*a, *b));
        debug!("Bulk similarity: {} full rescores, {} matches", rescored, results.len());
        Ok(results)
    }
}

fn by_score_desc(a: (usize, f64), b: (usize, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Classification, Classifier, MockClassifier};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    /// Counts how many texts reach the classifier, i.e. full rescores
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

    #[test]
    fn test_first_pass_short_circuits() {
        assert_eq!(first_pass_estimate("", "abc"), FirstPass::Final(0.0));
        assert_eq!(first_pass_estimate("Fix Bug", "fix  bug"), FirstPass::Final(1.0));
    }

    #[test]
    fn test_first_pass_length_gate() {
        // 3 vs 20 chars: ratio 0.15 < 0.3
        match first_pass_estimate("fix", "fix the whole parser") {
            FirstPass::Final(score) => assert!((score - 0.075).abs() < 1e-9),
            other => panic!("expected gated score, got {:?}", other),
        }
    }

    #[test]
    fn test_first_pass_estimate_is_jaccard() {
        assert_eq!(
            first_pass_estimate("fix login bug", "fix login page"),
            FirstPass::Estimate(0.5)
        );
    }

    #[tokio::test]
    async fn test_results_sorted_and_thresholded() {
        let processor = QueryProcessor::new(Arc::new(MockClassifier), "en", None);
        let cache = SimilarityCache::default();
        let calc = BulkSimilarityCalculator::new(&processor, &cache);

        let candidates = vec![
            "Add dark mode",
            "Fix login bug urgent",
            "fix login bug",
            "Login bug",
            "",
        ];
        let results = calc.calculate("Fix login bug", &candidates, 0.5).await.unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0], (2, 1.0));
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert!(results.iter().all(|(_, s)| *s >= 0.5));
        assert!(!results.iter().any(|(i, _)| *i == 0 || *i == 4));
    }

    #[tokio::test]
    async fn test_high_estimate_skips_rescore() {
        let classifier = Arc::new(CountingClassifier::default());
        let processor = QueryProcessor::new(classifier.clone(), "en", None);
        let cache = SimilarityCache::default();
        let calc = BulkSimilarityCalculator::new(&processor, &cache);

        // Same stems, different surface text: estimate 1.0 > 0.8
        let results = calc.calculate("fixing bugs", &["fixes bug"], 0.5).await.unwrap();
        assert_eq!(results, vec![(0, 1.0)]);
        assert_eq!(classifier.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prefilter_cutoff() {
        let classifier = Arc::new(CountingClassifier::default());
        let processor = QueryProcessor::new(classifier.clone(), "en", None);
        let cache = SimilarityCache::default();
        let calc = BulkSimilarityCalculator::new(&processor, &cache);

        let target = "alpha beta gamma";
        // Threshold 0.5 gives a cutoff of 0.35
        let above = "alpha beta delta epsilon";
        let below = "alpha beta delta epsilon zeta";
        assert_eq!(first_pass_estimate(target, above), FirstPass::Estimate(0.4));
        match first_pass_estimate(target, below) {
            FirstPass::Estimate(score) => assert!((score - 1.0 / 3.0).abs() < 1e-9),
            other => panic!("expected estimate, got {:?}", other),
        }

        let results = calc.calculate(target, &[above, below], 0.5).await.unwrap();

        // Only the survivor is rescored: one classifier call per side.
        // Its full score is 0.4 * 0.8 = 0.32, under the threshold.
        assert!(results.is_empty());
        assert_eq!(classifier.calls.load(AtomicOrdering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&pair_key(target, above)).is_some());
        assert!(cache.get(&pair_key(target, below)).is_none());
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let classifier = Arc::new(CountingClassifier::default());
        let processor = QueryProcessor::new(classifier.clone(), "en", None);
        let cache = SimilarityCache::default();
        let calc = BulkSimilarityCalculator::new(&processor, &cache);

        let candidates = ["fix login page", "review login page"];
        let first = calc.calculate("fix login bug", &candidates, 0.3).await.unwrap();
        let calls = classifier.calls.load(AtomicOrdering::SeqCst);
        assert!(calls > 0);

        let second = calc.calculate("fix login bug", &candidates, 0.3).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(classifier.calls.load(AtomicOrdering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let processor = QueryProcessor::new(Arc::new(MockClassifier), "en", None);
        let cache = SimilarityCache::default();
        let calc = BulkSimilarityCalculator::new(&processor, &cache);
        let none: [&str; 0] = [];
        assert!(calc.calculate("anything", &none, 0.1).await.unwrap().is_empty());
    }
}
