//! Opt-in retry support for callers.
//!
//! Throttling is routine with MWS; wrap calls in [`retry_with_backoff`] to ride it out.

mod retry;

pub use retry::{RetryPolicy, is_retryable, retry_with_backoff};
