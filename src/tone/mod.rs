//! Tone rewrite engine: deterministic local rewriting into a named tone.
//!
//! - [`primitives`] - substitution tables and tidying transforms
//! - [`catalogue`] - the fixed, ordered set of [`ToneProfile`]s
//!
//! Unknown tone names fall back to the first catalogue entry through
//! [`resolve`]; [`resolve_strict`] is available for callers that prefer a
//! validation error.

pub mod catalogue;
pub mod primitives;

use serde::Serialize;

pub use catalogue::{
    catalogue, default_tone, find, resolve, resolve_strict, Substitutions, ToneProfile,
};

/// Guidance attached to every local rewrite.
pub const LOCAL_GUIDANCE: &str = "This rewrite uses Text Angel's local tone templates. \
     Connect a rewrite service for generative rewrites.";

/// Result of rewriting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteResult {
    /// The tone applied.
    pub tone: ToneProfile,
    /// The rewritten message.
    pub rewritten_text: String,
    /// Human-readable note about how the rewrite was produced.
    pub guidance: String,
}

/// Rewrite `text` locally with `tone`.
pub fn rewrite(text: &str, tone: &ToneProfile) -> RewriteResult {
    RewriteResult {
        tone: *tone,
        rewritten_text: tone.transform(text),
        guidance: LOCAL_GUIDANCE.to_string(),
    }
}
