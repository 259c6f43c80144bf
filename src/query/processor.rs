//! Query processing: structured queries, blended similarity and filters
//!
//! Every operation here may suspend on the classifier, and that call is
//! the only place a deadline applies. A classifier error is logged and
//! treated as "nothing found", so scoring falls back to the lexical signal.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::classifier::{build_classifier, Classification, Classifier, IntentScore};
use crate::config::MatchConfig;
use crate::error::{MatchError, Result};
use crate::text::{jaccard_similarity, normalize_text, stem_word, tokenize, tokenize_and_normalize};

/// Lexical weight when both texts carry intents
const BLENDED_LEXICAL_WEIGHT: f64 = 0.5;
/// Lexical weight when at least one side has no intent signal
const LEXICAL_ONLY_WEIGHT: f64 = 0.8;

/// Intent prefix that marks a search verb
const SEARCH_ACTION_PREFIX: &str = "search.action.";

/// Vocabulary removed from the residual query, keyed by `type:value`
const TERMS_TO_REMOVE: &[(&str, &[&str])] = &[
    ("status:todo", &["todo", "to do", "to-do", "pending", "backlog"]),
    ("status:in-progress", &["in-progress", "in progress", "doing", "wip", "active", "started"]),
    ("status:done", &["done", "completed", "complete", "finished", "closed", "resolved"]),
    ("readiness:draft", &["draft", "drafts"]),
    ("readiness:ready", &["ready", "actionable"]),
    ("readiness:blocked", &["blocked", "stuck", "waiting"]),
    ("priority:high", &["high priority", "high", "urgent", "critical", "asap"]),
    ("priority:medium", &["medium priority", "medium", "normal"]),
    ("priority:low", &["low priority", "low", "minor", "trivial"]),
];

/// A query analyzed once into tokens, stems, intents and entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedQuery {
    pub original: String,
    pub normalized: String,
    pub tokens: Vec<String>,
    pub stems: Vec<String>,
    /// Highest-scoring intent, if any
    pub intent: Option<String>,
    pub intents: Vec<IntentScore>,
    /// Entity values grouped by entity type
    pub entities: BTreeMap<String, Vec<String>>,
    pub tags: Vec<String>,
    pub status: Option<String>,
    pub readiness: Option<String>,
}

/// Structured search filters pulled out of a free-text query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedSearchFilters {
    /// Residual free text
    pub query: String,
    pub status: Option<String>,
    pub readiness: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub action_types: Vec<String>,
    /// Every `type:value` pair consumed while building the filters
    pub extracted_terms: Vec<String>,
}

/// Query processor over an injected classifier
pub struct QueryProcessor {
    classifier: Arc<dyn Classifier>,
    locale: String,
    timeout: Option<Duration>,
}

impl QueryProcessor {
    pub fn new(classifier: Arc<dyn Classifier>, locale: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            classifier,
            locale: locale.into(),
            timeout,
        }
    }

    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(
            build_classifier(config.classifier),
            config.locale.clone(),
            config.classifier_timeout(),
        )
    }

    /// Analyze a query into a [`ProcessedQuery`]
    pub async fn process_query(&self, query: &str) -> Result<ProcessedQuery> {
        let normalized = normalize_text(query);
        let tokens = tokenize(&normalized);
        let stems: Vec<String> = tokens
            .iter()
            .filter(|t| t.chars().count() > 2)
            .map(|t| stem_word(t))
            .collect();

        let classification = if normalized.is_empty() {
            Classification::default()
        } else {
            self.classify(&normalized).await?
        };

        let mut entities: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entity in classification.entities {
            let values = entities.entry(entity.kind).or_default();
            if !values.contains(&entity.value) {
                values.push(entity.value);
            }
        }

        let first = |kind: &str| entities.get(kind).and_then(|v| v.first()).cloned();
        let status = first("status");
        let readiness = first("readiness");
        let tags = entities.get("tag").cloned().unwrap_or_default();

        Ok(ProcessedQuery {
            original: query.to_string(),
            normalized,
            tokens,
            stems,
            intent: classification.intents.first().map(|i| i.name.clone()),
            intents: classification.intents,
            entities,
            tags,
            status,
            readiness,
        })
    }

    /// Blended lexical + intent similarity in `[0, 1]`
    pub async fn calculate_similarity(&self, text1: &str, text2: &str) -> Result<f64> {
        let a = normalize_text(text1);
        let b = normalize_text(text2);

        if a.is_empty() || b.is_empty() {
            return Ok(0.0);
        }
        if a == b {
            return Ok(1.0);
        }

        let lexical = jaccard_similarity(tokenize_and_normalize(&a), tokenize_and_normalize(&b));

        let (left, right) = tokio::try_join!(self.classify(&a), self.classify(&b))?;
        let left: HashSet<&str> = left.intents.iter().map(|i| i.name.as_str()).collect();
        let right: HashSet<&str> = right.intents.iter().map(|i| i.name.as_str()).collect();

        let both_have_intents = !left.is_empty() && !right.is_empty();
        let intent_similarity = if both_have_intents {
            jaccard_similarity(left, right)
        } else {
            0.0
        };

        let weight = if both_have_intents {
            BLENDED_LEXICAL_WEIGHT
        } else {
            LEXICAL_ONLY_WEIGHT
        };

        Ok((lexical * weight + intent_similarity * (1.0 - weight)).clamp(0.0, 1.0))
    }

    /// Pull status, readiness, priority, tags and search verbs out of a query
    ///
    /// The residual `query` is the normalized text; vocabulary removal is a
    /// separate step, see [`strip_extracted_terms`].
    pub async fn extract_search_filters(&self, query: &str) -> Result<ExtractedSearchFilters> {
        let processed = self.process_query(query).await?;
        let mut filters = ExtractedSearchFilters {
            query: normalize_text(&processed.normalized),
            ..Default::default()
        };

        if let Some(status) = &processed.status {
            filters.extracted_terms.push(format!("status:{status}"));
            filters.status = Some(status.clone());
        }
        if let Some(readiness) = &processed.readiness {
            filters.extracted_terms.push(format!("readiness:{readiness}"));
            filters.readiness = Some(readiness.clone());
        }
        if let Some(priority) = processed.entities.get("priority").and_then(|v| v.first()) {
            filters.extracted_terms.push(format!("priority:{priority}"));
            filters.priority = Some(priority.clone());
        }
        for tag in &processed.tags {
            filters.extracted_terms.push(format!("tag:{tag}"));
            filters.tags.push(tag.clone());
        }

        if let Some(verb) = processed
            .intent
            .as_deref()
            .and_then(|intent| intent.strip_prefix(SEARCH_ACTION_PREFIX))
            .filter(|verb| !verb.is_empty())
        {
            filters.action_types.push(verb.to_string());
        }

        debug!("Extracted {} filter terms from '{}'", filters.extracted_terms.len(), filters.query);
        Ok(filters)
    }

    /// Run the classifier under the configured deadline
    async fn classify(&self, text: &str) -> Result<Classification> {
        let call = self.classifier.process(&self.locale, text);

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                MatchError::ClassifierTimeout {
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                }
            })?,
            None => call.await,
        };

        match outcome {
            Ok(classification) => Ok(sanitize(classification)),
            Err(e) => {
                warn!("Classifier failed, falling back to lexical scoring: {}", e);
                Ok(Classification::default())
            }
        }
    }
}

/// Drop nameless intents, empty entities and out-of-range scores
fn sanitize(mut classification: Classification) -> Classification {
    classification.intents.retain(|i| !i.name.trim().is_empty());
    for intent in &mut classification.intents {
        intent.score = if intent.score.is_finite() {
            intent.score.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
    // Highest score first; stable, so ties keep the classifier's order
    classification
        .intents
        .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    classification
        .entities
        .retain(|e| !e.kind.trim().is_empty() && !e.value.trim().is_empty());
    classification
}

/// Residual query with the vocabulary behind `extracted_terms` removed
///
/// Matching is case-insensitive and whole-word. Tags that have no table
/// entry remove their own value (with or without a leading `#`).
pub fn strip_extracted_terms(filters: &ExtractedSearchFilters) -> String {
    let mut words: Vec<String> = Vec::new();
    for term in &filters.extracted_terms {
        match TERMS_TO_REMOVE.iter().find(|(key, _)| *key == term.as_str()) {
            Some((_, list)) => words.extend(list.iter().map(|w| w.to_string())),
            None => {
                if let Some(tag) = term.strip_prefix("tag:") {
                    words.push(tag.to_string());
                }
            }
        }
    }

    if words.is_empty() {
        return normalize_text(&filters.query);
    }

    // Longest first so "high priority" wins over "high"
    words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    words.dedup();

    let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    let pattern = format!(r"#?\b(?:{})\b", alternatives.join("|"));

    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => normalize_text(&re.replace_all(&filters.query, " ")),
        Err(e) => {
            warn!("Could not build term-removal pattern: {}", e);
            normalize_text(&filters.query)
        }
    }
}
