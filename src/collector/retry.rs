use std::thread;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::spotify::ApiError;

/// Blocking pause between API calls. Swapped out in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Throttle-then-call with exponential backoff on rate-limit statuses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub throttle: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            throttle: Duration::from_millis(config.throttle_ms),
            retry_statuses: config.retry_statuses.clone(),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry that follows attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op`, sleeping `throttle` before every attempt. Rate-limited
    /// failures are retried until `max_attempts` is spent; anything else is
    /// returned immediately.
    pub fn run<T, S, F>(&self, sleeper: &S, mut op: F) -> Result<T, ApiError>
    where
        S: Sleeper + ?Sized,
        F: FnMut() -> Result<T, ApiError>,
    {
        let mut attempt = 0;
        loop {
            sleeper.sleep(self.throttle);
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limited(&self.retry_statuses) && attempt + 1 < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    log::warn!("Rate limit hit ({e}), waiting {} seconds...", delay.as_secs_f64());
                    sleeper.sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::time::Duration;

    use super::Sleeper;

    /// Records requested sleeps instead of sleeping.
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub slept: RefCell<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn total(&self) -> Duration {
            self.slept.borrow().iter().sum()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.slept.borrow_mut().push(duration);
        }
    }
}
