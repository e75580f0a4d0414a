//! The fixed catalogue of tone profiles.

use std::fmt;

use serde::Serialize;

use super::primitives;
use crate::error::{Error, Result};

/// Which substitution table a tone softens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Substitutions {
    /// No phrase substitution, only tidying.
    Plain,
    /// Harsh words to gentler phrasing.
    Soften,
    /// Softening followed by workplace courtesies.
    SoftenPolite,
}

/// A named deterministic rewriting style.
///
/// The transform is pure: substitute phrases, normalize whitespace,
/// sentence-case, close punctuation, then wrap the result in the tone's
/// framing sentence.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToneProfile {
    /// Unique, human-readable name.
    pub name: &'static str,
    /// Short description for pickers.
    pub description: &'static str,
    /// Alternative lookup keys, matched case-insensitively.
    pub aliases: &'static [&'static str],
    /// Substitution table applied first.
    pub substitutions: Substitutions,
    /// Sentence placed before the transformed text.
    pub prefix: &'static str,
    /// Optional sentence placed after it.
    pub suffix: Option<&'static str>,
    /// Instruction used when a generative service does the rewrite.
    pub instruction: &'static str,
}

impl ToneProfile {
    /// Apply this tone to `text`.
    pub fn transform(&self, text: &str) -> String {
        let core = match self.substitutions {
            Substitutions::Plain => text.to_string(),
            Substitutions::Soften => {
                primitives::apply_replacements(text, primitives::soften_table())
            }
            Substitutions::SoftenPolite => {
                primitives::apply_replacements(text, primitives::polite_table())
            }
        };
        let core = primitives::tidy(&core);

        match self.suffix {
            Some(suffix) => format!("{}{} {}", self.prefix, core, suffix),
            None => format!("{}{}", self.prefix, core),
        }
    }

    /// True if `key` names this tone or one of its aliases.
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        self.name.eq_ignore_ascii_case(key)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(key))
    }
}

impl PartialEq for ToneProfile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ToneProfile {}

impl fmt::Display for ToneProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

static CATALOGUE: [ToneProfile; 4] = [
    ToneProfile {
        name: "Gentle & Kind",
        description: "Softens the language and adds a gentle introduction.",
        aliases: &["gentle", "kind", "grace"],
        substitutions: Substitutions::Soften,
        prefix: "I want to share this gently: ",
        suffix: None,
        instruction: "Rewrite the following message with kindness, care, and gentleness.",
    },
    ToneProfile {
        name: "Professional",
        description: "Adds polish suitable for workplace conversations.",
        aliases: &["work", "polished"],
        substitutions: Substitutions::SoftenPolite,
        prefix: "For clarity, ",
        suffix: Some("I appreciate your attention to this matter."),
        instruction: "Rewrite the following message to be polished, courteous, and suitable for the workplace.",
    },
    ToneProfile {
        name: "Empathetic",
        description: "Centers care and emotional validation.",
        aliases: &["empathy", "calm"],
        substitutions: Substitutions::Soften,
        prefix: "I hear how important this is and I want to respond with care: ",
        suffix: Some("I'm here with you and open to continuing the conversation."),
        instruction: "Rewrite the following message in a peaceful and soft tone, with no harshness or aggression.",
    },
    ToneProfile {
        name: "Calm & Direct",
        description: "Keeps the core message while removing sharp edges.",
        aliases: &["direct", "truth"],
        substitutions: Substitutions::Plain,
        prefix: "Here's the message in a clear, calm tone: ",
        suffix: None,
        instruction: "Rewrite the following message to be honest, clear, and respectful.",
    },
];

/// All tone profiles, in presentation order.
pub fn catalogue() -> &'static [ToneProfile] {
    &CATALOGUE
}

/// The first catalogue entry, used when a tone name is unknown.
pub fn default_tone() -> &'static ToneProfile {
    &CATALOGUE[0]
}

/// Find a tone by name or alias.
pub fn find(key: &str) -> Option<&'static ToneProfile> {
    CATALOGUE.iter().find(|t| t.matches(key))
}

/// Find a tone, falling back to [`default_tone`] for unknown keys.
pub fn resolve(key: &str) -> &'static ToneProfile {
    find(key).unwrap_or_else(|| {
        let fallback = default_tone();
        tracing::warn!(requested = %key, fallback = %fallback, "Unknown tone, using fallback");
        fallback
    })
}

/// Find a tone, rejecting unknown keys.
pub fn resolve_strict(key: &str) -> Result<&'static ToneProfile> {
    find(key).ok_or_else(|| {
        let names: Vec<&str> = CATALOGUE.iter().map(|t| t.name).collect();
        Error::Validation(format!(
            "unknown tone '{}', choose one of: {}",
            key,
            names.join(", ")
        ))
    })
}
