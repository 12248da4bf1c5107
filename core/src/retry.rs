// basket/src/retry.rs

//! Bounded retry with a backoff schedule.
//!
//! Used at startup around store and broker handle construction (fixed delay),
//! and by the consumer to pick a redelivery delay for messages whose
//! mutation could not be persisted (exponential, capped).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
  /// Total attempts, including the first one. Never less than 1.
  pub max_attempts: u32,
  /// Delay after the first failure.
  pub base_delay: Duration,
  /// Growth factor between consecutive delays; 1.0 gives a fixed delay.
  pub multiplier: f64,
  pub max_delay: Duration,
}

impl RetryPolicy {
  pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      base_delay: delay,
      multiplier: 1.0,
      max_delay: delay,
    }
  }

  pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      base_delay,
      multiplier: 2.0,
      max_delay,
    }
  }

  /// Delay to wait after attempt number `attempt` (1-indexed) failed:
  /// `base_delay * multiplier^(attempt - 1)`, capped at `max_delay`.
  pub fn next_delay(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
    if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
      return self.max_delay;
    }
    Duration::from_secs_f64(secs)
  }

  /// Whether a failure on attempt `attempt` (1-indexed) still leaves room for another try.
  pub fn has_attempts_left(&self, attempt: u32) -> bool {
    attempt < self.max_attempts
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::fixed(5, Duration::from_secs(2))
  }
}

/// Runs `op` until it succeeds or `policy.max_attempts` is exhausted, sleeping
/// per the policy between attempts. Returns the last error on exhaustion.
pub async fn retry_async<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: Display,
{
  let mut attempt = 0u32;
  loop {
    attempt += 1;
    match op().await {
      Ok(value) => {
        if attempt > 1 {
          info!(what, attempt, "Succeeded after retry.");
        }
        return Ok(value);
      }
      Err(e) if policy.has_attempts_left(attempt) => {
        let delay = policy.next_delay(attempt);
        warn!(
          what,
          attempt,
          max_attempts = policy.max_attempts,
          delay_ms = delay.as_millis() as u64,
          error = %e,
          "Attempt failed, retrying."
        );
        tokio::time::sleep(delay).await;
      }
      Err(e) => {
        error!(what, attempts = attempt, error = %e, "Giving up after max attempts.");
        return Err(e);
      }
    }
  }
}
