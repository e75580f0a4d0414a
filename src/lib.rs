//! # textangel
//!
//! Protects people from sending or receiving harsh language.
//!
//! Two composable engines do the work:
//!
//! - **Shield**: masks configured trigger words and phrases, grouped into
//!   named categories, and reports what was hit per category
//! - **Tone**: rewrites text deterministically into one of a fixed catalogue
//!   of gentler tones
//!
//! Rewriting can also be delegated to an external generative service through
//! the [`ToneRewriter`] seam. The [`TextAngel`] orchestrator ties shielding,
//! rewriting, rate limiting and the message journal together so every front
//! end stays a thin adapter.
//!
//! ## Features
//!
//! - **Whole-word matching**: case-insensitive, regex metacharacters escaped,
//!   no substring hits ("dumb" never matches "dumbbell")
//! - **Sequential categories**: each category scans the output of the
//!   previous one, so masked text is never counted twice
//! - **Replacement styles**: a fixed token (default `🛡️`) or a glyph repeated
//!   to the match length
//! - **Backends**: local templates, OpenAI (`openai` feature), hosted Text
//!   Angel API (`hosted` feature), with local fallback on service failure
//!
//! ## Example
//!
//! ```rust,ignore
//! use textangel::{Config, ProcessRequest, TextAngel};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let angel = TextAngel::from_config(Config::default())?;
//!
//!     let outcome = angel
//!         .process(ProcessRequest::new("I hate this, you are dumb").with_tone("Professional"))
//!         .await?;
//!
//!     println!("{} word(s) shielded", outcome.shield.total_matches);
//!     println!("{}", outcome.rewrite.rewritten_text);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod angel;
pub mod config;
pub mod error;
pub mod journal;
pub mod ratelimit;
pub mod rewriter;
pub mod shield;
pub mod tone;

pub use angel::{
    ProcessOutcome, ProcessRequest, RewriteSource, ShieldOutcome, TextAngel, TextAngelBuilder,
};
pub use config::Config;
pub use error::{Error, Result, ServiceError, ServiceResult};
pub use journal::{FileJournal, JournalEntry, MemoryJournal, MessageJournal};
pub use ratelimit::RateLimiter;
pub use rewriter::{LocalRewriter, RewriterKind, ToneRewriter};
pub use shield::{shield, Replacement, ShieldConfig, ShieldMatch, ShieldResult};
pub use tone::{rewrite, RewriteResult, ToneProfile};
