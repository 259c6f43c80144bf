//! Intent/entity classifier capability
//!
//! The query processor only depends on the [`Classifier`] trait. Which
//! implementation backs it is chosen explicitly from configuration via
//! [`build_classifier`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierKind;
use crate::text::{canonical_term, tokenize};

/// A scored intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    #[serde(alias = "intent")]
    pub name: String,
    #[serde(default)]
    pub score: f64,
}

/// A named entity, e.g. `status = done`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type", alias = "entity")]
    pub kind: String,
    #[serde(alias = "option")]
    pub value: String,
}

impl Entity {
    pub fn new(kind: &str, value: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: value.to_string(),
        }
    }
}

/// Classifier output; missing fields deserialize as empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub intents: Vec<IntentScore>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty() && self.entities.is_empty()
    }
}

/// Intent and entity extraction for a piece of text
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn process(&self, locale: &str, text: &str) -> anyhow::Result<Classification>;
}

/// Build the classifier named by configuration
pub fn build_classifier(kind: ClassifierKind) -> Arc<dyn Classifier> {
    match kind {
        ClassifierKind::Mock => Arc::new(MockClassifier),
        ClassifierKind::Keyword => Arc::new(KeywordClassifier),
    }
}

/// Classifier that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct MockClassifier;

#[async_trait]
impl Classifier for MockClassifier {
    async fn process(&self, _locale: &str, _text: &str) -> anyhow::Result<Classification> {
        Ok(Classification::default())
    }
}

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([\w-]+)").unwrap());

const STATUS_TERMS: &[&str] = &["todo", "in-progress", "done"];
const READINESS_TERMS: &[&str] = &["draft", "ready", "blocked"];
const TASK_ACTIONS: &[&str] = &["create", "update", "remove", "fix", "review"];

/// Deterministic classifier driven by the task vocabulary
///
/// Intents come from action verbs; status, readiness, priority and
/// `#tag` entities come from fixed word lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn classify(&self, text: &str) -> Classification {
        let lower = text.to_lowercase();
        let tokens = tokenize(&lower);

        let mut intent_hits: HashMap<String, usize> = HashMap::new();
        let mut entities: Vec<Entity> = Vec::new();
        let mut push_entity = |entity: Entity| {
            if !entities.contains(&entity) {
                entities.push(entity);
            }
        };

        if lower.contains("in progress") || lower.contains("in-progress") {
            push_entity(Entity::new("status", "in-progress"));
        }

        for token in &tokens {
            if let Some(action) = search_action(token) {
                *intent_hits.entry(format!("search.action.{action}")).or_default() += 1;
            }

            if let Some(term) = canonical_term(token) {
                if TASK_ACTIONS.contains(&term) {
                    *intent_hits.entry(format!("task.{term}")).or_default() += 1;
                } else if STATUS_TERMS.contains(&term) {
                    push_entity(Entity::new("status", term));
                } else if READINESS_TERMS.contains(&term) {
                    push_entity(Entity::new("readiness", term));
                }
            }

            if let Some(level) = priority_level(token) {
                push_entity(Entity::new("priority", level));
            }
        }

        for caps in TAG_PATTERN.captures_iter(&lower) {
            push_entity(Entity::new("tag", &caps[1]));
        }

        let total: usize = intent_hits.values().sum();
        let mut intents: Vec<IntentScore> = intent_hits
            .into_iter()
            .map(|(name, hits)| IntentScore {
                name,
                score: hits as f64 / total as f64,
            })
            .collect();
        intents.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        Classification { intents, entities }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn process(&self, _locale: &str, text: &str) -> anyhow::Result<Classification> {
        Ok(self.classify(text))
    }
}

fn search_action(token: &str) -> Option<&'static str> {
    match token {
        "find" | "search" | "look" | "locate" => Some("find"),
        "show" | "list" | "display" => Some("list"),
        _ => None,
    }
}

fn priority_level(token: &str) -> Option<&'static str> {
    match token {
        "high" | "urgent" | "critical" | "asap" => Some("high"),
        "medium" | "normal" => Some("medium"),
        "low" | "minor" | "trivial" => Some("low"),
        _ => None,
    }
}
