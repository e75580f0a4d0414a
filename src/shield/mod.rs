//! Shield engine: category-based word/phrase matching and masking.
//!
//! # Flow
//!
//! ```text
//! JSON source ──► ShieldConfig::load ──► ShieldConfig (compiled, immutable)
//!                                              │
//!                     build_active_config(selected, custom words)
//!                                              │
//! text ─────────────────────────────────► shield ──► ShieldResult
//! ```
//!
//! # Modules
//!
//! - [`config`] - configuration loading, validation and narrowing
//! - [`patterns`] - whole-word, case-insensitive category patterns
//! - [`engine`] - the sequential per-category scan

pub mod config;
pub mod engine;
pub mod patterns;

pub use config::{
    load_config, parse_custom_words, Replacement, ShieldCategory, ShieldConfig, CUSTOM_CATEGORY,
    DEFAULT_REPLACEMENT,
};
pub use engine::{shield, ShieldMatch, ShieldResult};
