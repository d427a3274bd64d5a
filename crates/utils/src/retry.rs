use std::{fmt::Display, future::Future, time::Duration};

use log::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fixed-delay retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// Runs `action` until it succeeds or `policy.max_attempts` is reached,
/// sleeping `policy.delay` between attempts. The attempt number (1-based) is
/// passed to `action`. Each failure is logged under `label`; the last error
/// is returned once attempts run out.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut action: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match action(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    label, attempt, max_attempts, err
                );
                if attempt >= max_attempts {
                    return Err(err);
                }
            }
        }

        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}
