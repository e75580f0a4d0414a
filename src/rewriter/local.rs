//! The local tone engine behind the [`ToneRewriter`] seam.

use async_trait::async_trait;

use super::traits::{RewriterKind, ToneRewriter};
use crate::error::ServiceResult;
use crate::tone::{self, ToneProfile};

/// Deterministic rewriter using the built-in tone templates. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRewriter;

impl LocalRewriter {
    /// Create a local rewriter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToneRewriter for LocalRewriter {
    fn kind(&self) -> RewriterKind {
        RewriterKind::Local
    }

    fn guidance(&self) -> &str {
        tone::LOCAL_GUIDANCE
    }

    async fn rewrite(&self, tone: &ToneProfile, text: &str) -> ServiceResult<String> {
        Ok(tone.transform(text))
    }
}
