//! The ask pipeline for Rulegate.
//!
//! - `Orchestrator`: rewrite, retrieve, confidence gate, generate, sanitize
//! - `RateLimiter`: per-client token buckets consulted before any backend work

pub mod orchestrator;
pub mod rate_limit;

pub use orchestrator::{AskOutcome, AskSettings, Orchestrator, StageTimings};
pub use rate_limit::{client_identity, RateLimiter};
