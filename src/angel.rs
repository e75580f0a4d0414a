//! TextAngel - the orchestrator every presentation surface goes through.
//!
//! Outgoing messages are shielded, rewritten into a tone and journaled.
//! Incoming messages are only shielded and journaled.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result, ServiceError};
use crate::journal::{FileJournal, JournalEntry, MessageJournal, SHIELD_TONE};
use crate::ratelimit::RateLimiter;
use crate::rewriter::{self, RewriterKind, ToneRewriter};
use crate::shield::{ShieldConfig, ShieldResult};
use crate::tone::{self, RewriteResult, ToneProfile};

/// User name recorded when a request names nobody.
pub const ANONYMOUS_USER: &str = "anonymous";

/// A message to shield and rewrite.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Sender, for the journal.
    pub user: String,
    /// The message text.
    pub message: String,
    /// Tone name or alias (configured default if None).
    pub tone: Option<String>,
    /// Shield categories to use (every configured category if None).
    pub categories: Option<Vec<String>>,
    /// Extra trigger words for this request only.
    pub custom_words: Vec<String>,
}

impl ProcessRequest {
    /// Create a new request.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user: ANONYMOUS_USER.to_string(),
            message: message.into(),
            tone: None,
            categories: None,
            custom_words: Vec::new(),
        }
    }

    /// Set the sender.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Select a tone.
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    /// Restrict shielding to these categories.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// Add request-specific trigger words.
    pub fn with_custom_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_words.extend(words.into_iter().map(Into::into));
        self
    }
}

/// Where the rewritten text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewriteSource {
    /// The local tone engine was the configured backend.
    Local,
    /// An external service produced the rewrite.
    External {
        /// The backend used.
        backend: RewriterKind,
    },
    /// The external service failed and the local engine stood in.
    LocalFallback {
        /// The backend that failed.
        backend: RewriterKind,
        /// Why it failed.
        reason: String,
    },
}

impl RewriteSource {
    /// True if the configured backend did not produce the rewrite.
    pub fn is_fallback(&self) -> bool {
        matches!(self, RewriteSource::LocalFallback { .. })
    }
}

impl fmt::Display for RewriteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteSource::Local => write!(f, "local"),
            RewriteSource::External { backend } => write!(f, "{}", backend),
            RewriteSource::LocalFallback { backend, reason } => {
                write!(f, "local (fallback after {} failed: {})", backend, reason)
            }
        }
    }
}

/// Result of processing an outgoing message.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    /// Shield report for the original message.
    pub shield: ShieldResult,
    /// Rewrite of the shielded text.
    pub rewrite: RewriteResult,
    /// Which strategy produced the rewrite.
    pub source: RewriteSource,
    /// Whether the journal accepted the entry.
    pub journaled: bool,
}

/// Result of shielding an incoming message.
#[derive(Debug, Clone, Serialize)]
pub struct ShieldOutcome {
    /// Shield report.
    pub shield: ShieldResult,
    /// Whether the journal accepted the entry.
    pub journaled: bool,
}

/// Main TextAngel orchestrator.
///
/// Shielding and local rewriting are pure. Only the external rewrite call
/// blocks, and it is bounded by the configured timeout and rate limiter.
pub struct TextAngel {
    shield: Arc<ShieldConfig>,
    rewriter: Arc<dyn ToneRewriter>,
    journal: Option<Arc<dyn MessageJournal>>,
    rate_limiter: Arc<RateLimiter>,
    default_tone: &'static ToneProfile,
    strict_tones: bool,
    timeout: Duration,
    fallback_to_local: bool,
}

impl fmt::Debug for TextAngel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextAngel")
            .field("categories", &self.shield.category_names())
            .field("backend", &self.rewriter.kind())
            .field("default_tone", &self.default_tone.name)
            .field("journal", &self.journal.is_some())
            .finish_non_exhaustive()
    }
}

impl TextAngel {
    /// Create a new TextAngel builder.
    pub fn builder() -> TextAngelBuilder {
        TextAngelBuilder::default()
    }

    /// Build from a configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    /// The base shield configuration.
    pub fn shield_config(&self) -> &ShieldConfig {
        &self.shield
    }

    /// The configured rewrite backend.
    pub fn backend(&self) -> RewriterKind {
        self.rewriter.kind()
    }

    /// Tone used when a request names none.
    pub fn default_tone(&self) -> &'static ToneProfile {
        self.default_tone
    }

    /// Shield, rewrite and journal an outgoing message.
    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessOutcome> {
        ensure_not_empty(&request.message)?;

        let config = self.active_config(request.categories.as_deref(), &request.custom_words)?;
        let shield = config.shield(&request.message);
        let tone = self.resolve_tone(request.tone.as_deref())?;

        let (rewrite, source) = self.rewrite(tone, &shield.sanitized_text).await?;

        let journaled = self.journal(
            &request.user,
            tone.name,
            &request.message,
            &rewrite.rewritten_text,
            shield.total_matches,
        )
        .await;

        tracing::info!(
            user = %request.user,
            tone = %tone,
            matches = shield.total_matches,
            source = %source,
            "Processed message"
        );

        Ok(ProcessOutcome {
            shield,
            rewrite,
            source,
            journaled,
        })
    }

    /// Shield a received message with every configured category.
    pub async fn shield_incoming(&self, user: &str, message: &str) -> Result<ShieldOutcome> {
        ensure_not_empty(message)?;

        let shield = self.shield.shield(message);
        let journaled = self.journal(
            user,
            SHIELD_TONE,
            message,
            &shield.sanitized_text,
            shield.total_matches,
        )
        .await;

        tracing::info!(
            user = %user,
            matches = shield.total_matches,
            "Shielded incoming message"
        );

        Ok(ShieldOutcome { shield, journaled })
    }

    fn active_config(
        &self,
        categories: Option<&[String]>,
        custom_words: &[String],
    ) -> Result<Arc<ShieldConfig>> {
        let derived = match categories {
            Some(selected) => self.shield.build_active_config(selected, custom_words)?,
            None if custom_words.is_empty() => return Ok(Arc::clone(&self.shield)),
            None => {
                let all = self.shield.category_names();
                self.shield.build_active_config(&all, custom_words)?
            }
        };
        Ok(Arc::new(derived))
    }

    fn resolve_tone(&self, requested: Option<&str>) -> Result<&'static ToneProfile> {
        match requested.map(str::trim).filter(|t| !t.is_empty()) {
            None => Ok(self.default_tone),
            Some(key) if self.strict_tones => tone::resolve_strict(key),
            Some(key) => Ok(tone::resolve(key)),
        }
    }

    async fn rewrite(
        &self,
        tone: &'static ToneProfile,
        text: &str,
    ) -> Result<(RewriteResult, RewriteSource)> {
        let backend = self.rewriter.kind();

        // The rate limit wait counts against the call's time budget
        let start = Instant::now();
        let call = async {
            self.rate_limiter.wait(backend).await;
            self.rewriter.rewrite(tone, text).await
        };
        let attempt = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(self.timeout.as_millis() as u64)),
        };

        match attempt {
            Ok(rewritten_text) => {
                tracing::debug!(
                    backend = %backend,
                    tone = %tone,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Rewrite complete"
                );
                let source = if backend.is_remote() {
                    RewriteSource::External { backend }
                } else {
                    RewriteSource::Local
                };
                let rewrite = RewriteResult {
                    tone: *tone,
                    rewritten_text,
                    guidance: self.rewriter.guidance().to_string(),
                };
                Ok((rewrite, source))
            }
            Err(e) if self.fallback_to_local => {
                tracing::warn!(
                    backend = %backend,
                    error = %e,
                    "Rewrite service failed, using local tone engine"
                );
                let source = RewriteSource::LocalFallback {
                    backend,
                    reason: e.to_string(),
                };
                Ok((tone::rewrite(text, tone), source))
            }
            Err(e) => Err(Error::Service(e)),
        }
    }

    /// Append to the journal on the blocking pool.
    async fn journal(
        &self,
        user: &str,
        tone: &str,
        original: &str,
        result: &str,
        shielded_count: usize,
    ) -> bool {
        let Some(journal) = self.journal.clone() else {
            return false;
        };
        let entry = JournalEntry::new(user, tone, original, result, shielded_count);
        match tokio::task::spawn_blocking(move || journal.append(&entry)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to write journal entry");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Journal task failed");
                false
            }
        }
    }
}

fn ensure_not_empty(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(Error::Validation("message is empty".into()));
    }
    Ok(())
}

/// Builder for TextAngel.
#[derive(Default)]
pub struct TextAngelBuilder {
    config: Option<Config>,
    shield: Option<ShieldConfig>,
    rewriter: Option<Arc<dyn ToneRewriter>>,
    journal: Option<Arc<dyn MessageJournal>>,
}

impl TextAngelBuilder {
    /// Set custom configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an already loaded shield configuration instead of `config.shield`.
    pub fn with_shield(mut self, shield: ShieldConfig) -> Self {
        self.shield = Some(shield);
        self
    }

    /// Use a specific rewriter instead of the one `config.service` selects.
    pub fn with_rewriter(mut self, rewriter: Arc<dyn ToneRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Use a specific journal instead of the file `config.journal` names.
    pub fn with_journal(mut self, journal: Arc<dyn MessageJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Build the TextAngel instance.
    pub fn build(self) -> Result<TextAngel> {
        let config = self.config.unwrap_or_default();

        let shield = match self.shield {
            Some(shield) => shield,
            None => config.shield.load()?,
        };

        let rewriter = match self.rewriter {
            Some(rewriter) => rewriter,
            None => rewriter::from_config(&config.service)?,
        };

        let journal = match self.journal {
            Some(journal) => Some(journal),
            None if config.journal.enabled => {
                let path = config.journal.resolved_path();
                Some(Arc::new(FileJournal::new(path)) as Arc<dyn MessageJournal>)
            }
            None => None,
        };

        let default_tone = if config.tone.strict {
            tone::resolve_strict(&config.tone.default_tone)
                .map_err(|e| Error::Config(format!("default tone: {}", e)))?
        } else {
            tone::resolve(&config.tone.default_tone)
        };

        tracing::debug!(
            categories = shield.len(),
            backend = %rewriter.kind(),
            default_tone = %default_tone,
            "TextAngel ready"
        );

        Ok(TextAngel {
            shield: Arc::new(shield),
            rewriter,
            journal,
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            default_tone,
            strict_tones: config.tone.strict,
            timeout: config.service.timeout,
            fallback_to_local: config.service.fallback_to_local,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::error::ServiceResult;
    use crate::journal::MemoryJournal;
    use async_trait::async_trait;

    const SAMPLE: &str = r#"{"kindness": ["mean", "dumb"], "anger": ["hate"]}"#;

    struct EchoRewriter;

    #[async_trait]
    impl ToneRewriter for EchoRewriter {
        fn kind(&self) -> RewriterKind {
            RewriterKind::Hosted
        }

        fn guidance(&self) -> &str {
            "echo"
        }

        async fn rewrite(&self, tone: &ToneProfile, text: &str) -> ServiceResult<String> {
            Ok(format!("[{}] {}", tone.name, text))
        }
    }

    struct FailingRewriter(ServiceError);

    #[async_trait]
    impl ToneRewriter for FailingRewriter {
        fn kind(&self) -> RewriterKind {
            RewriterKind::OpenAi
        }

        fn guidance(&self) -> &str {
            "never used"
        }

        async fn rewrite(&self, _tone: &ToneProfile, _text: &str) -> ServiceResult<String> {
            Err(self.0.clone())
        }
    }

    struct SlowRewriter;

    #[async_trait]
    impl ToneRewriter for SlowRewriter {
        fn kind(&self) -> RewriterKind {
            RewriterKind::OpenAi
        }

        fn guidance(&self) -> &str {
            "slow"
        }

        async fn rewrite(&self, _tone: &ToneProfile, text: &str) -> ServiceResult<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(text.to_string())
        }
    }

    fn test_config() -> Config {
        let mut config = Config::builder()
            .no_journal()
            .timeout(Duration::from_millis(100))
            .build();
        config.rate_limit = RateLimitConfig {
            min_delay: Duration::ZERO,
            requests_per_minute: 0,
        };
        config
    }

    fn angel(
        config: Config,
        rewriter: Option<Arc<dyn ToneRewriter>>,
        journal: Option<Arc<MemoryJournal>>,
    ) -> TextAngel {
        let mut builder = TextAngel::builder()
            .with_config(config)
            .with_shield(ShieldConfig::from_json_str(SAMPLE).unwrap());
        if let Some(rewriter) = rewriter {
            builder = builder.with_rewriter(rewriter);
        }
        if let Some(journal) = journal {
            builder = builder.with_journal(journal);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_process_local() {
        let journal = Arc::new(MemoryJournal::new());
        let angel = angel(test_config(), None, Some(journal.clone()));

        let outcome = angel
            .process(
                ProcessRequest::new("I hate being mean")
                    .with_user("dana")
                    .with_tone("Gentle & Kind"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.shield.total_matches, 2);
        assert_eq!(outcome.source, RewriteSource::Local);
        assert_eq!(outcome.rewrite.tone.name, "Gentle & Kind");
        assert!(!outcome.rewrite.rewritten_text.contains("hate"));
        assert!(outcome.journaled);

        let entries = journal.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user, "dana");
        assert_eq!(entries[0].original, "I hate being mean");
        assert_eq!(entries[0].shielded_count, 2);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let angel = angel(test_config(), None, None);
        let err = angel.process(ProcessRequest::new("   \n")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(matches!(
            angel.shield_incoming("dana", "").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_external_rewriter_receives_shielded_text() {
        let angel = angel(test_config(), Some(Arc::new(EchoRewriter)), None);
        let outcome = angel
            .process(ProcessRequest::new("you are dumb").with_tone("calm"))
            .await
            .unwrap();

        assert_eq!(
            outcome.source,
            RewriteSource::External {
                backend: RewriterKind::Hosted
            }
        );
        assert_eq!(outcome.rewrite.rewritten_text, "[Empathetic] you are 🛡️");
        assert_eq!(outcome.rewrite.guidance, "echo");
        assert!(!outcome.journaled);
    }

    #[tokio::test]
    async fn test_service_failure_falls_back() {
        let failing = FailingRewriter(ServiceError::Network("connection refused".into()));
        let angel = angel(test_config(), Some(Arc::new(failing)), None);

        let outcome = angel
            .process(ProcessRequest::new("I hate this"))
            .await
            .unwrap();

        assert!(outcome.source.is_fallback());
        match &outcome.source {
            RewriteSource::LocalFallback { backend, reason } => {
                assert_eq!(*backend, RewriterKind::OpenAi);
                assert!(reason.contains("connection refused"));
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert_eq!(outcome.rewrite.guidance, tone::LOCAL_GUIDANCE);
    }

    #[tokio::test]
    async fn test_service_failure_without_fallback() {
        let mut config = test_config();
        config.service.fallback_to_local = false;
        let failing = FailingRewriter(ServiceError::RateLimited {
            retry_after_secs: 20,
        });
        let angel = angel(config, Some(Arc::new(failing)), None);

        let err = angel
            .process(ProcessRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay_secs(), Some(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_service_times_out() {
        let mut config = test_config();
        config.service.fallback_to_local = false;
        let angel = angel(config, Some(Arc::new(SlowRewriter)), None);

        let err = angel
            .process(ProcessRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Service(ServiceError::Timeout(100))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_wait_counts_against_timeout() {
        let mut config = test_config();
        config.rate_limit.requests_per_minute = 1;
        let angel = angel(config, Some(Arc::new(EchoRewriter)), None);

        let first = angel.process(ProcessRequest::new("hello")).await.unwrap();
        assert_eq!(
            first.source,
            RewriteSource::External {
                backend: RewriterKind::Hosted
            }
        );

        // The next slot is a minute away, far past the 100ms budget
        let start = tokio::time::Instant::now();
        let second = angel
            .process(ProcessRequest::new("hello again"))
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        match &second.source {
            RewriteSource::LocalFallback { backend, reason } => {
                assert_eq!(*backend, RewriterKind::Hosted);
                assert!(reason.contains("timeout"), "{}", reason);
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    struct ThreadJournal(parking_lot::Mutex<Vec<std::thread::ThreadId>>);

    impl MessageJournal for ThreadJournal {
        fn append(&self, _entry: &JournalEntry) -> Result<()> {
            self.0.lock().push(std::thread::current().id());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_journal_writes_off_the_runtime_thread() {
        let journal = Arc::new(ThreadJournal(Default::default()));
        let angel = TextAngel::builder()
            .with_config(test_config())
            .with_shield(ShieldConfig::from_json_str(SAMPLE).unwrap())
            .with_journal(journal.clone())
            .build()
            .unwrap();

        let outcome = angel.process(ProcessRequest::new("hello")).await.unwrap();
        assert!(outcome.journaled);

        let threads = journal.0.lock().clone();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
    }

    #[tokio::test]
    async fn test_unknown_tone_policy() {
        let lenient = angel(test_config(), None, None);
        let outcome = lenient
            .process(ProcessRequest::new("hello").with_tone("Sarcastic"))
            .await
            .unwrap();
        assert_eq!(outcome.rewrite.tone.name, tone::catalogue()[0].name);

        let strict = angel(
            Config {
                tone: crate::config::ToneSettings {
                    strict: true,
                    ..Default::default()
                },
                ..test_config()
            },
            None,
            None,
        );
        let err = strict
            .process(ProcessRequest::new("hello").with_tone("Sarcastic"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_strict_unknown_default_tone_fails_build() {
        let config = Config::builder()
            .no_journal()
            .strict_tones(true)
            .default_tone("Sarcastic")
            .build();
        let err = TextAngel::builder()
            .with_config(config)
            .with_shield(ShieldConfig::from_json_str(SAMPLE).unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_category_selection_and_custom_words() {
        let angel = angel(test_config(), None, None);

        let outcome = angel
            .process(ProcessRequest::new("I hate being mean").with_categories(["anger"]))
            .await
            .unwrap();
        assert_eq!(outcome.shield.total_matches, 1);
        assert_eq!(outcome.shield.matches_by_category.len(), 1);

        let outcome = angel
            .process(ProcessRequest::new("such a jerk, so mean").with_custom_words(["jerk"]))
            .await
            .unwrap();
        assert_eq!(outcome.shield.total_matches, 2);
        assert_eq!(outcome.shield.matches_by_category["custom"], 1);
        assert_eq!(outcome.shield.matches_by_category["anger"], 0);

        // Nothing selected falls back to every base category
        let outcome = angel
            .process(ProcessRequest::new("I hate being mean").with_categories(Vec::<String>::new()))
            .await
            .unwrap();
        assert_eq!(outcome.shield.total_matches, 2);
    }

    #[tokio::test]
    async fn test_shield_incoming_journals_as_shield() {
        let journal = Arc::new(MemoryJournal::new());
        let angel = angel(test_config(), None, Some(journal.clone()));

        let outcome = angel.shield_incoming("sam", "you are so dumb").await.unwrap();
        assert_eq!(outcome.shield.sanitized_text, "you are so 🛡️");
        assert!(outcome.journaled);

        let entries = journal.entries();
        assert_eq!(entries[0].tone, SHIELD_TONE);
        assert_eq!(entries[0].result, "you are so 🛡️");
    }

    #[tokio::test]
    async fn test_journal_failure_does_not_fail_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let angel = TextAngel::builder()
            .with_config(test_config())
            .with_shield(ShieldConfig::from_json_str(SAMPLE).unwrap())
            .with_journal(Arc::new(FileJournal::new(dir.path())))
            .build()
            .unwrap();

        let outcome = angel.process(ProcessRequest::new("hello")).await.unwrap();
        assert!(!outcome.journaled);
        assert!(outcome.rewrite.rewritten_text.contains("Hello."));
    }
}
