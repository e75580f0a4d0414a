//! Rewrite strategies: the local tone engine and external generative services.

mod traits;

#[cfg(any(feature = "openai", feature = "hosted"))]
mod http;
#[cfg(feature = "hosted")]
pub mod hosted;
pub mod local;
#[cfg(feature = "openai")]
pub mod openai;

use std::sync::Arc;

pub use local::LocalRewriter;
pub use traits::{RewriterKind, ToneRewriter};

#[cfg(feature = "hosted")]
pub use hosted::HostedRewriter;
#[cfg(feature = "openai")]
pub use openai::OpenAiRewriter;

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

/// Build the rewriter selected by `config.backend`.
pub fn from_config(config: &ServiceConfig) -> ServiceResult<Arc<dyn ToneRewriter>> {
    match config.backend {
        RewriterKind::Local => Ok(Arc::new(LocalRewriter::new())),
        #[cfg(feature = "openai")]
        RewriterKind::OpenAi => Ok(Arc::new(OpenAiRewriter::new(config)?)),
        #[cfg(feature = "hosted")]
        RewriterKind::Hosted => Ok(Arc::new(HostedRewriter::new(config)?)),
        #[allow(unreachable_patterns)]
        other => Err(ServiceError::NotConfigured(format!(
            "backend '{}' is not compiled in",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_is_local() {
        let rewriter = from_config(&ServiceConfig::default()).unwrap();
        assert_eq!(rewriter.kind(), RewriterKind::Local);
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_openai_backend_without_key_fails() {
        let config = ServiceConfig {
            backend: RewriterKind::OpenAi,
            ..Default::default()
        };
        assert!(from_config(&config).is_err());
    }
}
