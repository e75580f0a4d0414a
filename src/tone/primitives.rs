//! Reusable text transforms the tone profiles are built from.
//!
//! Substitution tables are compiled once on first use via `OnceLock`.
//! Each entry is a whole-word, case-insensitive pattern and the phrase that
//! replaces it; entries run in table order and each sees the previous output.

use std::sync::OnceLock;

use regex::{NoExpand, Regex, RegexBuilder};

/// Softening substitutions: harsh words and phrases to gentler ones.
const SOFTEN: &[(&str, &str)] = &[
    (r"\bcan't\b", "may not be able to"),
    (r"\bwon't\b", "might not"),
    (r"\bshouldn't\b", "may want to avoid"),
    (r"\bhate\b", "really dislike"),
    (r"\bidiot\b", "person"),
    (r"\bshut up\b", "let's pause"),
    (r"\bdumb\b", "not helpful"),
    (r"\bkill\b", "stop"),
    (r"\bstupid\b", "unhelpful"),
];

/// Politeness substitutions layered after softening for workplace tone.
const POLITE: &[(&str, &str)] = &[
    (r"\bhey\b", "hello"),
    (r"\bhi\b", "hello"),
    (r"\bthanks\b", "thank you"),
    (r"\bplease\b", "please"),
    (r"\bsorry\b", "I apologize"),
];

/// Compiled softening table.
pub fn soften_table() -> &'static [(Regex, &'static str)] {
    static TABLE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| compile_table(SOFTEN))
}

/// Compiled softening table followed by the politeness table.
pub fn polite_table() -> &'static [(Regex, &'static str)] {
    static TABLE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = compile_table(SOFTEN);
        table.extend(compile_table(POLITE));
        table
    })
}

/// Apply each substitution in order.
pub fn apply_replacements(text: &str, table: &[(Regex, &str)]) -> String {
    table.iter().fold(text.to_string(), |acc, (pattern, phrase)| {
        pattern.replace_all(&acc, NoExpand(*phrase)).into_owned()
    })
}

/// Collapse runs of whitespace to a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase the first character.
pub fn sentence_case(text: &str) -> String {
    let text = text.trim();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Append a period unless the text already ends in `.`, `!` or `?`.
pub fn ensure_terminal_punctuation(text: &str) -> String {
    match text.chars().last() {
        None => String::new(),
        Some('.' | '!' | '?') => text.to_string(),
        Some(_) => format!("{}.", text),
    }
}

/// Whitespace, sentence case and closing punctuation, in that order.
pub fn tidy(text: &str) -> String {
    ensure_terminal_punctuation(&sentence_case(&normalize_whitespace(text)))
}

fn compile_table(entries: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    entries
        .iter()
        .filter_map(|(pattern, phrase)| {
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => Some((re, *phrase)),
                Err(e) => {
                    tracing::warn!("Failed to compile tone pattern '{}': {}", pattern, e);
                    None
                }
            }
        })
        .collect()
}
