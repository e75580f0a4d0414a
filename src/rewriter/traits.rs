//! The rewrite strategy seam shared by local and external rewriters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;
use crate::tone::ToneProfile;

/// Available rewrite backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriterKind {
    /// Deterministic local tone templates.
    #[default]
    Local,
    /// OpenAI REST API.
    #[serde(rename = "openai")]
    OpenAi,
    /// Hosted Text Angel JSON API.
    Hosted,
}

impl RewriterKind {
    /// Get the backend name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            RewriterKind::Local => "local",
            RewriterKind::OpenAi => "openai",
            RewriterKind::Hosted => "hosted",
        }
    }

    /// Whether calls leave the process.
    pub fn is_remote(&self) -> bool {
        !matches!(self, RewriterKind::Local)
    }

    /// Parse a backend from string (use parse() method instead for FromStr trait).
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" | "templates" => Some(RewriterKind::Local),
            "openai" | "gpt" => Some(RewriterKind::OpenAi),
            "hosted" | "api" => Some(RewriterKind::Hosted),
            _ => None,
        }
    }
}

impl std::str::FromStr for RewriterKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_string(s).ok_or_else(|| format!("Unknown rewrite backend: {}", s))
    }
}

impl std::fmt::Display for RewriterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A (tone, text) -> text rewrite strategy.
///
/// The local engine and every external service implement this trait, so
/// they are interchangeable at the call site. Provider-specific request and
/// response shapes stay inside the implementation.
#[async_trait]
pub trait ToneRewriter: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> RewriterKind;

    /// Human-readable note attached to results from this backend.
    fn guidance(&self) -> &str;

    /// Rewrite already-shielded `text` in `tone`.
    async fn rewrite(&self, tone: &ToneProfile, text: &str) -> ServiceResult<String>;
}
