//! Regex compilation for shield categories.
//!
//! Every trigger word is escaped and the whole category is folded into a
//! single case-insensitive alternation anchored on word boundaries, so
//! `dumb` matches `Dumb!` but never the `dumb` inside `dumbbell`.

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// Compile one pattern matching any of `words` as a whole-word unit.
///
/// Words are expected to be trimmed and non-empty. Alternation order follows
/// `words`, so when one trigger is a prefix of another the earlier entry wins.
pub fn category_pattern(category: &str, words: &[String]) -> Result<Regex> {
    let joined = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");

    build(&joined).map_err(|e| {
        Error::Config(format!(
            "failed to compile shield pattern for category '{}': {}",
            category, e
        ))
    })
}

/// Compile a pattern for a single word (used for replacement probing).
pub fn whole_word(word: &str) -> Result<Regex> {
    build(&regex::escape(word))
        .map_err(|e| Error::Config(format!("failed to compile pattern for '{}': {}", word, e)))
}

fn build(alternation: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
        .case_insensitive(true)
        .build()
}
