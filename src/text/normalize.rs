//! Text normalization: tokenizing and rule-based stemming
//!
//! Everything here is dictionary-free and deterministic, so two runs over
//! the same title always produce the same token set.
//!
//! The stemmer is conservative: `-es` only comes off after a
//! sibilant (`fixes` -> `fix`, `updates` -> `update`), and `-ing`/`-ed`
//! only when a vowel is left behind (`doing` stays `doing`).

use std::collections::HashSet;

/// Minimum token length (in characters) kept for similarity scoring
const MIN_TOKEN_CHARS: usize = 3;

/// Lowercase, trim and collapse internal whitespace to single spaces
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Raw tokenization: lowercase, non-word characters become separators
///
/// No length filter and no stemming; use [`tokenize_and_normalize`] for
/// a similarity-ready token set.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !is_word_char(c))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Similarity-ready tokens: tokenized, short tokens dropped, stemmed, de-duplicated
///
/// Order of first appearance is preserved.
pub fn tokenize_and_normalize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(|t| stem_word(&t))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Basic stemming - strip common English suffixes
pub fn stem_word(word: &str) -> String {
    let word = word.trim().to_lowercase();

    if word.chars().count() <= 3 {
        return word;
    }

    // Plurals: stories -> story
    if word.ends_with("ies") && word.len() > 4 {
        return format!("{}y", &word[..word.len() - 3]);
    }

    // Sibilant plurals: fixes -> fix, pushes -> push
    if word.ends_with("es") && word.len() > 4 {
        let base = &word[..word.len() - 2];
        if base.ends_with(['s', 'x', 'z']) || base.ends_with("ch") || base.ends_with("sh") {
            return base.to_string();
        }
    }

    // Plain plurals, but not "class" or "progress"
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }

    // running -> run, editing -> edit
    if word.ends_with("ing") && word.len() > 5 {
        let stem = &word[..word.len() - 3];
        if has_vowel(stem) {
            return undouble(stem);
        }
    }

    // planned -> plan, blocked -> block
    if word.ends_with("ed") && word.len() > 4 {
        let stem = &word[..word.len() - 2];
        if has_vowel(stem) {
            return undouble(stem);
        }
    }

    if word.ends_with("ly") && word.len() > 4 {
        return word[..word.len() - 2].to_string();
    }

    word
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn has_vowel(s: &str) -> bool {
    s.chars().any(|c| is_vowel(c) || c == 'y')
}

/// Drop a doubled final consonant (runn -> run) except for l, s and z
fn undouble(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    if chars.len() > 2 {
        let last = chars[chars.len() - 1];
        let prev = chars[chars.len() - 2];
        if last == prev && last.is_alphabetic() && !is_vowel(last) && !matches!(last, 'l' | 's' | 'z') {
            return chars[..chars.len() - 1].iter().collect();
        }
    }
    stem.to_string()
}
