//! Distance and similarity metrics
//!
//! Pure functions over characters and token sets. All scores are in
//! `[0.0, 1.0]` and symmetric in their arguments.

use std::collections::HashSet;
use std::hash::Hash;

/// Classic Levenshtein edit distance over Unicode scalar values
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Full (|a|+1) x (|b|+1) table
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        dp[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }

    dp[a.len()][b.len()]
}

/// Normalized edit similarity: `1 - distance / max_len`
///
/// Inputs are trimmed and lowercased first. Empty on either side scores 0.
pub fn fuzzy_score(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let max_len = a.chars().count().max(b.chars().count());
    let distance = levenshtein_distance(&a, &b);
    1.0 - distance as f64 / max_len as f64
}

/// Jaccard similarity over de-duplicated sets
///
/// Returns an explicit 0.0 when either side is empty.
pub fn jaccard_similarity<T, A, B>(a: A, b: B) -> f64
where
    T: Eq + Hash,
    A: IntoIterator<Item = T>,
    B: IntoIterator<Item = T>,
{
    let a: HashSet<T> = a.into_iter().collect();
    let b: HashSet<T> = b.into_iter().collect();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();

    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_levenshtein_known_values() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("flaw", "lawn"), 2);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abcd", ""), 4);
        assert_eq!(levenshtein_distance("", ""), 0);
    }

    #[test]
    fn test_levenshtein_counts_chars_not_bytes() {
        assert_eq!(levenshtein_distance("café", "cafe"), 1);
    }

    #[test]
    fn test_fuzzy_score_identity_and_empty() {
        assert_eq!(fuzzy_score("Fix login", "fix login  "), 1.0);
        assert_eq!(fuzzy_score("", "x"), 0.0);
        assert_eq!(fuzzy_score("x", "   "), 0.0);
    }

    #[test]
    fn test_fuzzy_score_partial() {
        let score = fuzzy_score("kitten", "sitting");
        assert!((score - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_jaccard_identity_and_empty() {
        assert_eq!(jaccard_similarity(["a", "b"], ["b", "a"]), 1.0);
        let empty: [&str; 0] = [];
        assert_eq!(jaccard_similarity(empty, empty), 0.0);
        assert_eq!(jaccard_similarity(["a"], empty), 0.0);
    }

    #[test]
    fn test_jaccard_dedups_inputs() {
        // {fix, login} vs {fix, bug}: 1 / 3
        let score = jaccard_similarity(["fix", "fix", "login"], ["fix", "bug"]);
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_levenshtein_symmetric(a in "[a-z ]{0,12}", b in "[a-z ]{0,12}") {
            prop_assert_eq!(levenshtein_distance(&a, &b), levenshtein_distance(&b, &a));
        }

        #[test]
        fn prop_fuzzy_score_bounded_and_symmetric(a in "\\PC{0,10}", b in "\\PC{0,10}") {
            let ab = fuzzy_score(&a, &b);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert_eq!(ab, fuzzy_score(&b, &a));
        }

        #[test]
        fn prop_fuzzy_score_self_is_one(s in "[a-z]{1,10}") {
            prop_assert_eq!(fuzzy_score(&s, &s), 1.0);
        }
    }
}
