//! Exponential backoff retry for throttled and transient failures.
//!
//! The dispatcher never retries on its own. Callers that want retries wrap their calls in
//! [`retry_with_backoff`], usually with [`is_retryable`] as the predicate.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::MwsError;

/// Service error codes that signal throttling.
const THROTTLING_CODES: &[&str] = &["RequestThrottled", "QuotaExceeded"];

/// Backoff schedule for [`retry_with_backoff`].
///
/// Retry `n` (zero-based) waits `initial_delay * backoff_multiplier^n`, never longer than
/// `max_delay`.
///
/// ```
/// use std::time::Duration;
///
/// use mws_client::reliability::RetryPolicy;
///
/// // Report requests restore slowly; wait longer between tries.
/// let reports = RetryPolicy {
///     max_attempts: 6,
///     initial_delay: Duration::from_secs(5),
///     ..RetryPolicy::default()
/// };
/// assert_eq!(reports.max_delay, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total tries, the first included. Zero behaves like one.
    pub max_attempts: u32,
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for every wait.
    pub max_delay: Duration,
    /// Growth factor between consecutive waits.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Same as [`RetryPolicy::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default schedule with a different attempt budget.
    ///
    /// ```
    /// use mws_client::reliability::RetryPolicy;
    ///
    /// assert_eq!(RetryPolicy::with_max_attempts(5).max_attempts, 5);
    /// ```
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    fn delay_for_attempt(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Runs `operation` until it succeeds, `should_retry` rejects its error, or the policy's
/// attempts are spent. Sleeps between tries on the tokio timer.
///
/// ```
/// use std::{
///     sync::atomic::{AtomicU32, Ordering},
///     time::Duration,
/// };
///
/// use mws_client::reliability::{RetryPolicy, retry_with_backoff};
///
/// # async fn example() -> Result<(), String> {
/// let policy = RetryPolicy { initial_delay: Duration::from_millis(1), ..RetryPolicy::default() };
/// let counter = AtomicU32::new(0);
/// let tries = &counter;
///
/// let status = retry_with_backoff(&policy, |_: &String| true, || async move {
///     match tries.fetch_add(1, Ordering::Relaxed) {
///         0 => Err("RequestThrottled".to_owned()),
///         _ => Ok("GREEN"),
///     }
/// })
/// .await?;
///
/// assert_eq!(status, "GREEN");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// The error that ended the loop: either one `should_retry` declined or the one from the final
/// attempt.
pub async fn retry_with_backoff<F, Fut, P, T, E>(
    policy: &RetryPolicy,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let budget = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "call recovered");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if attempt == budget || !should_retry(&error) {
            warn!(attempt, budget, %error, "call failed for good");
            return Err(error);
        }

        let pause = policy.delay_for_attempt(attempt - 1);
        info!(attempt, budget, pause_ms = pause.as_millis(), %error, "call failed, backing off");
        tokio::time::sleep(pause).await;
        attempt += 1;
    }
}

/// Whether another try could succeed.
///
/// Throttling codes, 5xx answers, timeouts and refused connections are transient. Anything
/// wrong with the request itself is not.
///
/// ```
/// use mws_client::{MwsError, reliability::is_retryable};
///
/// assert!(!is_retryable(&MwsError::InvalidMarketplace("ZZ".to_owned())));
/// ```
#[must_use]
pub fn is_retryable(error: &MwsError) -> bool {
    match error {
        MwsError::HttpError(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        MwsError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        MwsError::Domain(domain) => {
            THROTTLING_CODES.contains(&domain.code.as_str()) || (500..600).contains(&domain.status)
        }
        MwsError::InvalidMarketplace(_)
        | MwsError::ParameterConversion { .. }
        | MwsError::InvalidParameter(_)
        | MwsError::XmlError(_)
        | MwsError::FlatFileError(_)
        | MwsError::ConfigError(_)
        | MwsError::TransportError(_)
        | MwsError::UnknownOperation(_) => false,
    }
}
