//! Synonym expansion for task vocabulary
//!
//! Static canonical-term map covering task status, readiness and the
//! common action verbs used in task titles and search queries.

use std::collections::HashSet;

/// Query terms shorter than this are not expanded or echoed
const MIN_TERM_CHARS: usize = 3;

/// Canonical term -> synonyms
pub const SYNONYMS: &[(&str, &[&str])] = &[
    // Status
    ("todo", &["pending", "new", "backlog", "later", "upcoming"]),
    ("in-progress", &["doing", "active", "started", "wip", "ongoing", "working"]),
    ("done", &["completed", "finished", "closed", "resolved", "complete"]),
    // Readiness
    ("draft", &["rough", "unfinished", "sketch", "proposal", "idea"]),
    ("ready", &["prepared", "actionable", "groomed", "unblocked"]),
    ("blocked", &["stuck", "waiting", "impeded", "onhold", "stalled"]),
    // Actions
    ("create", &["add", "make", "build", "implement", "introduce"]),
    ("update", &["modify", "change", "edit", "revise", "adjust"]),
    ("remove", &["delete", "drop", "eliminate", "purge", "erase"]),
    ("fix", &["repair", "correct", "patch", "debug", "bug"]),
    ("review", &["check", "inspect", "examine", "audit", "verify"]),
];

/// Synonyms of a word, case-insensitive
///
/// A canonical key yields its synonym list. A synonym yields the canonical
/// key followed by the other synonyms of its group. Anything else yields
/// an empty list.
pub fn get_synonyms(word: &str) -> Vec<String> {
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        return Vec::new();
    }

    for (key, synonyms) in SYNONYMS {
        if *key == word {
            return synonyms.iter().map(|s| s.to_string()).collect();
        }
    }

    for (key, synonyms) in SYNONYMS {
        if synonyms.contains(&word.as_str()) {
            let mut result = vec![key.to_string()];
            result.extend(synonyms.iter().filter(|s| **s != word).map(|s| s.to_string()));
            return result;
        }
    }

    Vec::new()
}

/// Find the canonical key for a word that is either a key or a synonym
pub fn canonical_term(word: &str) -> Option<&'static str> {
    let word = word.trim().to_lowercase();
    SYNONYMS
        .iter()
        .find(|(key, synonyms)| *key == word || synonyms.contains(&word.as_str()))
        .map(|(key, _)| *key)
}

/// Expand a query with every synonym group one of its terms belongs to
///
/// The query's own terms come first, followed by the expansions, with
/// duplicates removed.
pub fn expand_with_synonyms(query: &str) -> Vec<String> {
    let terms = expansion_terms(query);
    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Vec::new();

    let mut push = |term: &str, result: &mut Vec<String>| {
        if seen.insert(term.to_string()) {
            result.push(term.to_string());
        }
    };

    for term in &terms {
        push(term.as_str(), &mut result);
    }

    for term in &terms {
        for (key, synonyms) in SYNONYMS {
            if term.as_str() == *key || synonyms.contains(&term.as_str()) {
                push(*key, &mut result);
                for synonym in *synonyms {
                    push(*synonym, &mut result);
                }
            }
        }
    }

    result
}

/// Lowercased whitespace terms with surrounding punctuation trimmed and
/// terms under three characters dropped
///
/// Hyphens inside a term are kept so "in-progress" survives intact.
fn expansion_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .map(|t| t.trim_matches('-'))
        .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_string)
        .collect()
}
