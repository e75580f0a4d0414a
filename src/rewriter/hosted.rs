//! Rewrites through a hosted Text Angel JSON API.
//!
//! `POST {base}/rewrite` with `{"tone": ..., "message": ...}` answers
//! `{"rewritten": ..., "tone": ...}`; `GET {base}/ping` reports liveness.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http;
use super::traits::{RewriterKind, ToneRewriter};
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::tone::ToneProfile;

const GUIDANCE: &str = "This rewrite was produced by the hosted Text Angel service.";

/// Tone keys the hosted API understands; anything else is sent by name.
const HOSTED_TONE_KEYS: &[&str] = &["grace", "truth", "calm"];

#[derive(Debug, Serialize)]
struct RewriteRequest<'a> {
    tone: String,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct RewriteResponse {
    rewritten: String,
}

#[derive(Debug, Deserialize)]
struct PingResponse {
    status: String,
}

/// Hosted-API-backed rewriter.
#[derive(Clone)]
pub struct HostedRewriter {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HostedRewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedRewriter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HostedRewriter {
    /// Create a rewriter from service settings. Requires a base URL.
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                ServiceError::NotConfigured("hosted backend needs a base_url".into())
            })?
            .to_string();

        Ok(Self {
            http: http::client(config.timeout)?,
            base_url,
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }

    /// Check that the service is reachable and alive.
    pub async fn ping(&self) -> ServiceResult<bool> {
        let url = format!("{}/ping", self.base_url);
        let body = http::get(&self.http, &url, RewriterKind::Hosted.name(), self.timeout).await?;
        let ping: PingResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
        Ok(ping.status == "alive")
    }
}

#[async_trait]
impl ToneRewriter for HostedRewriter {
    fn kind(&self) -> RewriterKind {
        RewriterKind::Hosted
    }

    fn guidance(&self) -> &str {
        GUIDANCE
    }

    async fn rewrite(&self, tone: &ToneProfile, text: &str) -> ServiceResult<String> {
        let request = RewriteRequest {
            tone: tone_key(tone),
            message: text,
        };
        let url = format!("{}/rewrite", self.base_url);
        let body = http::post_json(
            &self.http,
            &url,
            self.api_key.as_deref(),
            &request,
            RewriterKind::Hosted.name(),
            self.timeout,
        )
        .await?;
        parse_rewrite_response(&body)
    }
}

/// The hosted API's key for `tone`.
fn tone_key(tone: &ToneProfile) -> String {
    tone.aliases
        .iter()
        .find(|a| HOSTED_TONE_KEYS.contains(*a))
        .map(|a| a.to_uppercase())
        .unwrap_or_else(|| tone.name.to_string())
}

fn parse_rewrite_response(body: &str) -> ServiceResult<String> {
    let response: RewriteResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
    let rewritten = response.rewritten.trim();
    if rewritten.is_empty() {
        return Err(ServiceError::MalformedResponse("empty rewrite".into()));
    }
    Ok(rewritten.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone;

    #[test]
    fn test_requires_base_url() {
        let err = HostedRewriter::new(&ServiceConfig::default()).unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured(_)));
    }

    #[test]
    fn test_tone_keys() {
        assert_eq!(tone_key(tone::find("Gentle & Kind").unwrap()), "GRACE");
        assert_eq!(tone_key(tone::find("Calm & Direct").unwrap()), "TRUTH");
        assert_eq!(tone_key(tone::find("Empathetic").unwrap()), "CALM");
        assert_eq!(tone_key(tone::find("Professional").unwrap()), "Professional");
    }

    #[test]
    fn test_parse_rewrite_response() {
        let body = r#"{"rewritten": " Let's talk calmly. ", "tone": "CALM"}"#;
        assert_eq!(parse_rewrite_response(body).unwrap(), "Let's talk calmly.");
        assert!(matches!(
            parse_rewrite_response(r#"{"shielded": "x"}"#),
            Err(ServiceError::MalformedResponse(_))
        ));
    }
}
