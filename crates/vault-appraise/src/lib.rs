//! AI identification & appraisal pipeline for Vault AI.
//!
//! Takes a photo plus a vault category and produces a draft
//! [`vault_core::CollectibleItem`] by chaining three remote calls: vision
//! identification, search-grounded market research, and schema-constrained
//! structuring. Transient rate limits are absorbed by a shared
//! retry-with-backoff combinator; when the grounded route stays unavailable
//! the scan degrades to a clearly-marked basic mode. Re-evaluation of an
//! existing item reuses the research/structure tail and yields a field-scoped
//! patch.
//!
//! This crate performs no storage writes; persistence is the caller's job
//! through `vault-core`.

pub mod client;
pub mod config;
pub mod pipeline;
pub mod profiles;
pub mod retry;
pub mod structuring;
pub mod types;

pub use client::{GeminiClient, ModelClient};
pub use config::{ImageConfig, ModelSelection, PipelineConfig, RetryConfig};
pub use pipeline::{AppraisalPipeline, PipelineStage, ScanError, ScanOutcome};
pub use retry::{with_backoff, RetryPolicy};
pub use structuring::AppraisalRecord;
pub use types::{AppraiseError, GroundedAnswer};
