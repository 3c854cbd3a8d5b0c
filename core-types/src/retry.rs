use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Jittered exponential backoff policy for async operations.
///
/// Drives compensation retries during booking rollback; a compensation
/// that keeps failing is retried up to `max_attempts` times before the
/// error is handed back to the caller.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_pct: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64, max_delay_ms: u64, jitter_pct: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay_ms.max(1),
            max_delay_ms: max_delay_ms.max(base_delay_ms.max(1)),
            jitter_pct: jitter_pct.clamp(0.0, 1.0),
        }
    }

    /// Defaults matched to in-process compensation work: short waits,
    /// bounded well under a request timeout.
    pub fn default_rollback() -> Self {
        Self::new(5, 50, 1_000, 0.2)
    }

    fn next_delay(&self, attempt: usize) -> Duration {
        let exp = 2_u64.saturating_pow(attempt as u32);
        let capped = self
            .base_delay_ms
            .saturating_mul(exp)
            .min(self.max_delay_ms);
        Duration::from_millis(apply_jitter(capped, self.jitter_pct))
    }

    pub async fn retry_async<F, Fut, T, E>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(val) => return Ok(val),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    sleep(self.next_delay(attempt - 1)).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_rollback()
    }
}

fn apply_jitter(delay_ms: u64, jitter_pct: f64) -> u64 {
    if jitter_pct <= 0.0 {
        return delay_ms;
    }
    let spread = (delay_ms as f64 * jitter_pct) as i64;
    if spread == 0 {
        return delay_ms;
    }
    let delta = rand::thread_rng().gen_range(-spread..=spread);
    delay_ms.saturating_add_signed(delta)
}
