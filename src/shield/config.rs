//! Shield configuration: category word lists and the replacement style.
//!
//! A [`ShieldConfig`] is validated and compiled once at construction and is
//! immutable afterwards. Per-request narrowing via
//! [`ShieldConfig::build_active_config`] produces a new, equally immutable
//! configuration that reuses the already-compiled category patterns.

use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::patterns;
use crate::error::{Error, Result};

/// Default replacement token inserted in place of each match.
pub const DEFAULT_REPLACEMENT: &str = "🛡️";

/// Name of the synthetic category built from ad hoc custom words.
pub const CUSTOM_CATEGORY: &str = "custom";

const BUILTIN_CATEGORIES: &str = include_str!("../../data/shield_filter_words.json");

/// How a matched word is replaced in the sanitized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Replacement {
    /// A fixed token regardless of match length.
    Token(String),
    /// A glyph repeated once per character of the match.
    Mask(char),
}

impl Replacement {
    /// Replacement text for one matched occurrence.
    pub fn for_match(&self, matched: &str) -> String {
        match self {
            Replacement::Token(token) => token.clone(),
            Replacement::Mask(glyph) => {
                std::iter::repeat(*glyph).take(matched.chars().count()).collect()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Replacement::Token(token) if token.trim().is_empty() => Err(Error::Config(
                "shield replacement token must not be empty".into(),
            )),
            Replacement::Mask(glyph) if glyph.is_whitespace() => Err(Error::Config(
                "shield mask glyph must not be whitespace".into(),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for Replacement {
    fn default() -> Self {
        Replacement::Token(DEFAULT_REPLACEMENT.into())
    }
}

/// A named group of trigger words with its compiled matcher.
#[derive(Debug, Clone)]
pub struct ShieldCategory {
    name: String,
    words: Vec<String>,
    pattern: Regex,
}

impl ShieldCategory {
    /// Category name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed trigger words, in configuration order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub(crate) fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

/// Validated category -> word-list configuration plus replacement style.
#[derive(Debug, Clone)]
pub struct ShieldConfig {
    categories: IndexMap<String, ShieldCategory>,
    replacement: Replacement,
}

impl ShieldConfig {
    /// Build a configuration from raw category word lists.
    ///
    /// Words are trimmed and empty ones dropped. A word that its own
    /// replacement would match again is dropped too, so that shielding
    /// already-shielded text finds nothing. Categories left without words
    /// are dropped; if none remain the configuration is rejected.
    pub fn new(categories: IndexMap<String, Vec<String>>, replacement: Replacement) -> Result<Self> {
        replacement.validate()?;

        let mut compiled = IndexMap::with_capacity(categories.len());
        for (name, raw_words) in categories {
            let mut words = Vec::with_capacity(raw_words.len());
            for word in raw_words {
                let word = word.trim();
                if word.is_empty() {
                    continue;
                }
                if patterns::whole_word(word)?.is_match(&replacement.for_match(word)) {
                    tracing::warn!(
                        category = %name,
                        word = %word,
                        "Dropping trigger word that matches its own replacement"
                    );
                    continue;
                }
                words.push(word.to_string());
            }

            if words.is_empty() {
                tracing::debug!(category = %name, "Dropping shield category with no words");
                continue;
            }

            let pattern = patterns::category_pattern(&name, &words)?;
            compiled.insert(
                name.clone(),
                ShieldCategory {
                    name,
                    words,
                    pattern,
                },
            );
        }

        if compiled.is_empty() {
            return Err(Error::Config(
                "shield configuration must define at least one category with words".into(),
            ));
        }

        Ok(Self {
            categories: compiled,
            replacement,
        })
    }

    /// Parse a JSON object mapping category names to lists of strings.
    pub fn from_json_str(json: &str) -> Result<Self> {
        // Deserializing straight into an IndexMap keeps the source key order.
        let raw: IndexMap<String, serde_json::Value> =
            serde_json::from_str(json).map_err(|e| {
                if e.is_data() {
                    Error::Config(
                        "shield configuration must be an object mapping categories to words"
                            .into(),
                    )
                } else {
                    Error::Config(format!("shield configuration is not valid JSON: {}", e))
                }
            })?;

        let mut categories = IndexMap::with_capacity(raw.len());
        for (name, value) in raw {
            let items = value.as_array().ok_or_else(|| {
                Error::Config(format!(
                    "shield category '{}' must be a list of strings",
                    name
                ))
            })?;
            let mut words = Vec::with_capacity(items.len());
            for item in items {
                let word = item.as_str().ok_or_else(|| {
                    Error::Config(format!(
                        "invalid word for category '{}': only strings are allowed",
                        name
                    ))
                })?;
                words.push(word.to_string());
            }
            categories.insert(name, words);
        }

        Self::new(categories, Replacement::default())
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::Config(format!(
                "shield configuration not found: {}",
                path.display()
            )),
            _ => Error::Config(format!(
                "unable to read shield configuration {}: {}",
                path.display(),
                e
            )),
        })?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            categories = config.categories.len(),
            "Loaded shield configuration"
        );
        Ok(config)
    }

    /// The bundled default category list.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATEGORIES)
    }

    /// Same categories with a different replacement style.
    pub fn with_replacement(self, replacement: Replacement) -> Result<Self> {
        if replacement == self.replacement {
            return Ok(self);
        }
        Self::new(self.words_by_category(), replacement)
    }

    /// Derive the configuration for a single request.
    ///
    /// Keeps the `selected` categories that exist (in selection order,
    /// unknown names ignored) and appends a synthetic [`CUSTOM_CATEGORY`]
    /// built from `custom_words`, trimmed, deduplicated and sorted. Custom
    /// words are merged into an existing selected category of the same
    /// name. When nothing is active the full base configuration is returned.
    pub fn build_active_config<S, W>(&self, selected: &[S], custom_words: &[W]) -> Result<Self>
    where
        S: AsRef<str>,
        W: AsRef<str>,
    {
        let mut active: IndexMap<String, ShieldCategory> = IndexMap::new();
        for name in selected {
            let name = name.as_ref();
            match self.categories.get(name) {
                Some(category) => {
                    active
                        .entry(name.to_string())
                        .or_insert_with(|| category.clone());
                }
                None => tracing::debug!(category = %name, "Ignoring unknown shield category"),
            }
        }

        let custom: BTreeSet<&str> = custom_words
            .iter()
            .map(|w| w.as_ref().trim())
            .filter(|w| !w.is_empty())
            .collect();

        if !custom.is_empty() {
            let mut words: Vec<String> = active
                .get(CUSTOM_CATEGORY)
                .map(|c| c.words.clone())
                .unwrap_or_default();
            for word in custom {
                if !words.iter().any(|w| w == word) {
                    words.push(word.to_string());
                }
            }

            let mut extra = IndexMap::new();
            extra.insert(CUSTOM_CATEGORY.to_string(), words);
            // Reuse validation so custom words get the same trimming and
            // replacement probing as configured ones.
            match Self::new(extra, self.replacement.clone()) {
                Ok(mut built) => {
                    if let Some(category) = built.categories.swap_remove(CUSTOM_CATEGORY) {
                        active.insert(CUSTOM_CATEGORY.to_string(), category);
                    }
                }
                Err(Error::Config(_)) => {
                    tracing::warn!("All custom shield words were rejected");
                }
                Err(e) => return Err(e),
            }
        }

        if active.is_empty() {
            tracing::debug!("No active shield categories, using the full base configuration");
            return Ok(self.clone());
        }

        Ok(Self {
            categories: active,
            replacement: self.replacement.clone(),
        })
    }

    /// Categories in configuration order.
    pub fn categories(&self) -> impl Iterator<Item = &ShieldCategory> {
        self.categories.values()
    }

    /// Look up a category by name.
    pub fn category(&self, name: &str) -> Option<&ShieldCategory> {
        self.categories.get(name)
    }

    /// Category names in configuration order.
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// True if there are no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// The replacement style.
    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    /// Plain category -> words view of this configuration.
    pub fn words_by_category(&self) -> IndexMap<String, Vec<String>> {
        self.categories
            .iter()
            .map(|(name, c)| (name.clone(), c.words.clone()))
            .collect()
    }
}

/// Load a shield configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<ShieldConfig> {
    ShieldConfig::load(path)
}

/// Split free-form custom word input on commas, semicolons and newlines.
pub fn parse_custom_words(raw: &str) -> Vec<String> {
    raw.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{"kindness": ["mean", "dumb"], "anger": ["hate"]}"#;

    #[test]
    fn test_from_json_keeps_order() {
        let config = ShieldConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.category_names(), vec!["kindness", "anger"]);
        assert_eq!(config.category("kindness").unwrap().words(), ["mean", "dumb"]);
        assert_eq!(config.len(), 2);
        assert!(!config.is_empty());
    }

    #[test]
    fn test_words_are_trimmed_and_empty_categories_dropped() {
        let json = r#"{"a": ["  mean ", "", "   "], "b": [], "c": ["  "]}"#;
        let config = ShieldConfig::from_json_str(json).unwrap();
        assert_eq!(config.category_names(), vec!["a"]);
        assert_eq!(config.category("a").unwrap().words(), ["mean"]);
    }

    #[test]
    fn test_all_empty_lists_rejected() {
        let err = ShieldConfig::from_json_str(r#"{"a": [], "b": ["", " "]}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_structural_violations_rejected() {
        for json in [
            "not json",
            "[\"mean\"]",
            r#"{"a": "mean"}"#,
            r#"{"a": ["mean", 3]}"#,
            "{}",
        ] {
            let err = ShieldConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "expected config error for {json}");
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = ShieldConfig::load(Path::new("/definitely/not/here/shield.json")).unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("not found")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = ShieldConfig::load(file.path()).unwrap();
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn test_builtin_loads() {
        let config = ShieldConfig::builtin().unwrap();
        assert!(config.category("anger").is_some());
        assert_eq!(config.replacement(), &Replacement::default());
    }

    #[test]
    fn test_word_matching_replacement_is_dropped() {
        let mut categories = IndexMap::new();
        categories.insert("a".to_string(), vec!["redacted".to_string(), "mean".to_string()]);
        let config = ShieldConfig::new(categories, Replacement::Token("[redacted]".into())).unwrap();
        assert_eq!(config.category("a").unwrap().words(), ["mean"]);
    }

    #[test]
    fn test_empty_token_rejected() {
        let mut categories = IndexMap::new();
        categories.insert("a".to_string(), vec!["mean".to_string()]);
        assert!(ShieldConfig::new(categories, Replacement::Token("  ".into())).is_err());
    }

    #[test]
    fn test_active_config_subset_and_custom() {
        let base = ShieldConfig::from_json_str(SAMPLE).unwrap();
        let active = base
            .build_active_config(&["anger", "unknown"], &[" jerk ", "bully", "jerk", ""])
            .unwrap();
        assert_eq!(active.category_names(), vec!["anger", "custom"]);
        assert_eq!(active.category("custom").unwrap().words(), ["bully", "jerk"]);
    }

    #[test]
    fn test_custom_words_are_case_sensitive_for_dedup() {
        let base = ShieldConfig::from_json_str(SAMPLE).unwrap();
        let active = base
            .build_active_config::<&str, &str>(&[], &["Jerk", "jerk"])
            .unwrap();
        assert_eq!(active.category("custom").unwrap().words(), ["Jerk", "jerk"]);
    }

    #[test]
    fn test_empty_selection_falls_back_to_base() {
        let base = ShieldConfig::from_json_str(SAMPLE).unwrap();
        let active = base.build_active_config::<&str, &str>(&[], &[]).unwrap();
        assert_eq!(active.category_names(), base.category_names());

        let active = base.build_active_config(&["nope"], &["   "]).unwrap();
        assert_eq!(active.category_names(), base.category_names());
    }

    #[test]
    fn test_with_replacement_mask() {
        let base = ShieldConfig::from_json_str(SAMPLE).unwrap();
        let masked = base.with_replacement(Replacement::Mask('▆')).unwrap();
        assert_eq!(masked.replacement(), &Replacement::Mask('▆'));
        assert_eq!(masked.replacement().for_match("hate"), "▆▆▆▆");
    }

    #[test]
    fn test_parse_custom_words() {
        let words = parse_custom_words("jerk, bully;\n  snob \n,,");
        assert_eq!(words, vec!["jerk", "bully", "snob"]);
        assert!(parse_custom_words("").is_empty());
    }
}
