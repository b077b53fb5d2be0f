use std::time::Duration;

use rand::Rng;

/// Exponential backoff between connection attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor per retry.
    pub multiplier: f64,
    /// Each delay is randomized by up to this fraction in either direction.
    pub jitter: f64,
    /// Upper bound on the un-jittered delay.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            multiplier: 1.6,
            jitter: 0.6,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl BackoffConfig {
    /// The un-jittered delay after `retries` failed attempts.
    pub fn nominal_delay(&self, retries: u32) -> Duration {
        let max = self.max_delay.as_secs_f64();
        let mut delay = self.base_delay.as_secs_f64();
        let mut left = retries;
        while delay < max && left > 0 {
            delay *= self.multiplier;
            left -= 1;
        }
        self.clamp_secs(delay.min(max))
    }

    /// The delay to wait after `retries` failed attempts, with jitter.
    pub fn delay_for<R: Rng + ?Sized>(&self, retries: u32, rng: &mut R) -> Duration {
        if retries == 0 {
            return self.base_delay;
        }
        let nominal = self.nominal_delay(retries).as_secs_f64();
        let factor = 1.0 + self.jitter * (rng.gen::<f64>() * 2.0 - 1.0);
        self.clamp_secs((nominal * factor).max(0.0))
    }

    /// Seconds as a `Duration`, or `max_delay` when the value is NaN,
    /// negative, or too large to represent.
    fn clamp_secs(&self, secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay)
    }
}

/// Parameters for establishing a replica connection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectParams {
    pub backoff: BackoffConfig,
    /// Lower bound on the time allowed for one connection attempt.
    pub min_connect_timeout: Duration,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            min_connect_timeout: Duration::from_millis(250),
        }
    }
}

impl ConnectParams {
    /// Time allowed for the attempt made after `retries` failures.
    pub fn attempt_timeout(&self, retries: u32) -> Duration {
        self.min_connect_timeout
            .max(self.backoff.nominal_delay(retries))
    }
}
