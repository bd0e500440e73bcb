use std::time::Duration;

/// Retry policy for transient export failures.
///
/// The exporter carries this value through its configuration for the
/// transport client; it does not interpret it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Whether failed exports are retried at all.
    pub enabled: bool,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound for the delay between two retries.
    pub max_interval: Duration,
    /// Total time after which retrying gives up. Zero means no limit.
    pub max_elapsed_time: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            enabled: true,
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Duration::from_secs(60),
        }
    }
}

/// Backoff applied by the gRPC channel between connection attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Factor applied to the delay after each failure.
    pub multiplier: f64,
    /// Random fraction the delay is spread by.
    pub jitter: f64,
    /// Upper bound of the delay.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig {
            base_delay: Duration::from_secs(1),
            multiplier: 1.6,
            jitter: 0.2,
            max_delay: Duration::from_secs(120),
        }
    }
}
