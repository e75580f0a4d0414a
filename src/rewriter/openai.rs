//! Generative rewrites through the OpenAI REST API.
//!
//! Two request/response shapes are supported behind [`ApiStyle`]:
//!
//! - `Chat`: `POST /chat/completions` with a system + user message list,
//!   answer in `choices[0].message.content`
//! - `Legacy`: `POST /completions` with a single prompt string,
//!   answer in `choices[0].text`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http;
use super::traits::{RewriterKind, ToneRewriter};
use crate::config::{ApiStyle, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::tone::ToneProfile;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const GUIDANCE: &str = "This rewrite was generated by an OpenAI model from the shielded message.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct LegacyRequest<'a> {
    model: &'a str,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyResponse {
    choices: Vec<LegacyChoice>,
}

#[derive(Debug, Deserialize)]
struct LegacyChoice {
    text: String,
}

/// OpenAI-backed rewriter.
#[derive(Clone)]
pub struct OpenAiRewriter {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    api_style: ApiStyle,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiRewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiRewriter")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_style", &self.api_style)
            .finish_non_exhaustive()
    }
}

impl OpenAiRewriter {
    /// Create a rewriter from service settings. Requires an API key.
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ServiceError::Authentication {
                backend: RewriterKind::OpenAi.name().into(),
                reason: "no API key configured".into(),
            })?;

        Ok(Self {
            http: http::client(config.timeout)?,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model().to_string(),
            api_style: config.api_style,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
            timeout: config.timeout,
        })
    }

    /// The request shape in use.
    pub fn api_style(&self) -> ApiStyle {
        self.api_style
    }

    async fn chat(&self, prompt: &str) -> ServiceResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let body = http::post_json(
            &self.http,
            &url,
            Some(&self.api_key),
            &request,
            RewriterKind::OpenAi.name(),
            self.timeout,
        )
        .await?;
        parse_chat_response(&body)
    }

    async fn legacy(&self, prompt: &str) -> ServiceResult<String> {
        let request = LegacyRequest {
            model: &self.model,
            prompt: format!("{}\n\n{}", self.system_prompt, prompt),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let url = format!("{}/completions", self.base_url);
        let body = http::post_json(
            &self.http,
            &url,
            Some(&self.api_key),
            &request,
            RewriterKind::OpenAi.name(),
            self.timeout,
        )
        .await?;
        parse_legacy_response(&body)
    }
}

#[async_trait]
impl ToneRewriter for OpenAiRewriter {
    fn kind(&self) -> RewriterKind {
        RewriterKind::OpenAi
    }

    fn guidance(&self) -> &str {
        GUIDANCE
    }

    async fn rewrite(&self, tone: &ToneProfile, text: &str) -> ServiceResult<String> {
        let prompt = build_prompt(tone, text);
        let start = std::time::Instant::now();
        let rewritten = match self.api_style {
            ApiStyle::Chat => self.chat(&prompt).await?,
            ApiStyle::Legacy => self.legacy(&prompt).await?,
        };
        tracing::debug!(
            model = %self.model,
            tone = %tone,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI rewrite"
        );
        Ok(rewritten)
    }
}

/// The user prompt sent for `tone`.
pub(crate) fn build_prompt(tone: &ToneProfile, text: &str) -> String {
    format!("{}\n\nMessage: {}", tone.instruction, text)
}

fn parse_chat_response(body: &str) -> ServiceResult<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ServiceError::MalformedResponse("no choices in response".into()))?;
    non_empty(content)
}

fn parse_legacy_response(body: &str) -> ServiceResult<String> {
    let response: LegacyResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
    let text = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.text)
        .ok_or_else(|| ServiceError::MalformedResponse("no choices in response".into()))?;
    non_empty(text)
}

fn non_empty(text: String) -> ServiceResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::MalformedResponse("empty rewrite".into()));
    }
    Ok(trimmed.to_string())
}
