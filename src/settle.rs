//! Waiting for asynchronous balance settlement
//!
//! Top-ups and cashouts may be applied by the service some time after the
//! request returns. Instead of sleeping a fixed amount, the balance endpoint is
//! polled with capped exponential backoff until a condition holds or the
//! total timeout elapses.

use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::{
  client::{ApiResponse, WalletApiClient},
  error::{HarnessError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
  pub initial_delay: Duration,
  pub max_delay: Duration,
  pub timeout: Duration,
  /// Upper bound of the random delay added to every wait
  pub jitter: Duration,
}

impl Default for SettlePolicy {
  fn default() -> Self {
    SettlePolicy {
      initial_delay: Duration::from_millis(250),
      max_delay: Duration::from_secs(2),
      timeout: Duration::from_secs(10),
      jitter: Duration::from_millis(100),
    }
  }
}

impl SettlePolicy {
  pub fn validate(&self) -> Result<()> {
    if self.initial_delay.is_zero() {
      return Err(HarnessError::Config(
        "settle-initial-delay-ms must be positive".into(),
      ));
    }
    if self.max_delay < self.initial_delay {
      return Err(HarnessError::Config(
        "settle-max-delay-ms must not be below settle-initial-delay-ms".into(),
      ));
    }
    if self.timeout < self.initial_delay {
      return Err(HarnessError::Config(
        "settle-timeout-ms must not be below settle-initial-delay-ms".into(),
      ));
    }
    Ok(())
  }

  /// Delay before the `attempt`-th retry, without jitter
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    self
      .initial_delay
      .saturating_mul(factor)
      .min(self.max_delay)
  }

  fn jittered(&self, delay: Duration) -> Duration {
    let jitter_ms = self.jitter.as_millis() as u64;
    if jitter_ms == 0 {
      return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
  }
}

/// The last balance read of a settlement wait
#[derive(Debug, Clone)]
pub struct BalanceObservation {
  pub response: ApiResponse,
  /// `availableBalance` when the read succeeded with a numeric balance
  pub balance: Option<f64>,
  pub attempts: u32,
  /// Whether the condition held before the timeout
  pub settled: bool,
}

/// Read `availableBalance` from a successful balance response
pub fn read_balance(response: &ApiResponse) -> Option<f64> {
  if !response.status.is_success() {
    return None;
  }
  response
    .json()
    .ok()
    .as_ref()
    .and_then(|body| body.get("availableBalance"))
    .and_then(Value::as_f64)
}

/// Poll the balance of `wallet_id` until `settled` accepts it or the policy times out.
///
/// Transport errors end the wait immediately. Non-success statuses and
/// missing balances count as "not settled yet".
pub async fn wait_for_balance<F>(
  client: &WalletApiClient,
  wallet_id: &str,
  policy: &SettlePolicy,
  settled: F,
) -> Result<BalanceObservation>
where
  F: Fn(f64) -> bool,
{
  let deadline = Instant::now() + policy.timeout;
  let mut attempts = 0;

  loop {
    let response = client.get_balance(wallet_id).await?;
    attempts += 1;
    let balance = read_balance(&response);
    trace!(wallet_id, attempts, ?balance, "balance poll");

    if balance.map(&settled).unwrap_or(false) {
      debug!(wallet_id, attempts, ?balance, "balance settled");
      return Ok(BalanceObservation {
        response,
        balance,
        attempts,
        settled: true,
      });
    }

    let delay = policy.jittered(policy.delay_for(attempts - 1));
    if Instant::now() + delay > deadline {
      debug!(wallet_id, attempts, ?balance, "balance did not settle in time");
      return Ok(BalanceObservation {
        response,
        balance,
        attempts,
        settled: false,
      });
    }
    sleep(delay).await;
  }
}
