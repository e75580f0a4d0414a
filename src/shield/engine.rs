//! The shield scan: mask every configured trigger word and report what was hit.

use indexmap::IndexMap;
use regex::Captures;
use serde::Serialize;

use super::config::ShieldConfig;

/// One masked occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShieldMatch {
    /// Category whose pattern matched.
    pub category: String,
    /// The literal text that was matched, in its original casing.
    pub word: String,
    /// The replacement inserted for it.
    pub replacement: String,
}

/// Outcome of shielding one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShieldResult {
    /// Text with every match replaced.
    pub sanitized_text: String,
    /// Sum of all per-category counts.
    pub total_matches: usize,
    /// Match count for every active category, zero counts included.
    pub matches_by_category: IndexMap<String, usize>,
    /// Matches in the order they were encountered.
    pub matched_words: Vec<ShieldMatch>,
}

impl ShieldResult {
    /// True if nothing was masked.
    pub fn is_clean(&self) -> bool {
        self.total_matches == 0
    }

    /// Number of categories with at least one match.
    pub fn flagged_categories(&self) -> usize {
        self.matches_by_category.values().filter(|c| **c > 0).count()
    }

    /// The literal matched words, in scan order.
    pub fn blocked_words(&self) -> Vec<&str> {
        self.matched_words.iter().map(|m| m.word.as_str()).collect()
    }
}

/// Shield `text` with every category of `config`.
///
/// Categories run one after another in configuration order, each against the
/// output of the previous pass. Text already replaced by an earlier category
/// is therefore never counted again by a later one.
pub fn shield(text: &str, config: &ShieldConfig) -> ShieldResult {
    let replacement = config.replacement();
    let mut sanitized = text.to_string();
    let mut matches_by_category = IndexMap::with_capacity(config.len());
    let mut matched_words = Vec::new();

    for category in config.categories() {
        let mut count = 0usize;
        let next = category
            .pattern()
            .replace_all(&sanitized, |caps: &Captures<'_>| {
                let word = &caps[0];
                let masked = replacement.for_match(word);
                matched_words.push(ShieldMatch {
                    category: category.name().to_string(),
                    word: word.to_string(),
                    replacement: masked.clone(),
                });
                count += 1;
                masked
            })
            .into_owned();
        sanitized = next;
        matches_by_category.insert(category.name().to_string(), count);
    }

    let total_matches = matches_by_category.values().sum();
    tracing::debug!(
        total = total_matches,
        categories = matches_by_category.len(),
        "Shielded text"
    );

    ShieldResult {
        sanitized_text: sanitized,
        total_matches,
        matches_by_category,
        matched_words,
    }
}

impl ShieldConfig {
    /// Shield `text` with this configuration.
    pub fn shield(&self, text: &str) -> ShieldResult {
        shield(text, self)
    }
}
