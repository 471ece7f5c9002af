//! Client and session configuration.
//!
//! Plain structs with `Default` impls; the CLI populates them from flags
//! and the `LOOKOUT_ENDPOINT` environment variable.

use std::time::Duration;

/// Default detector endpoint, matching the reference deployment.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:50051";

/// Bounded retry policy for the remote inference call.
///
/// The reference behavior had none: any transport failure killed the
/// session. Retrying with exponential backoff is the deliberate redesign;
/// after `max_attempts` the failure is fatal.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retry)
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Backoff to sleep after the given failed attempt (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Configuration for the gRPC inference client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Detector gRPC endpoint
    pub endpoint: String,
    /// Deadline for a single inference call (enforced locally)
    pub request_timeout: Duration,
    /// Retry policy for failed calls
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Configuration for the per-frame session loop.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How long the display poll blocks waiting for a quit input
    pub poll_timeout: Duration,
    /// JPEG quality for frame transmission (1-100)
    pub jpeg_quality: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            // Reference behavior polls the display for 30ms per iteration
            poll_timeout: Duration::from_millis(30),
            jpeg_quality: 90,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_after(1), Duration::from_millis(250));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(500));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(1000));
    }

    #[test]
    fn test_session_defaults_match_reference() {
        let config = SessionConfig::default();
        assert_eq!(config.poll_timeout, Duration::from_millis(30));
    }
}
