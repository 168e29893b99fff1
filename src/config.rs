//! Pipeline configuration

use std::time::Duration;

/// Configuration options for sessions, signaling and annotation loops
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Total time budget for one WHEP negotiation round trip
    pub negotiation_timeout: Duration,

    /// TCP connect timeout for the signaling HTTP client
    pub connect_timeout: Duration,

    /// Target interval between annotation loop ticks
    ///
    /// The loop never overlaps detections, so the effective rate is
    /// `max(tick_interval, detect latency)`.
    pub tick_interval: Duration,

    /// Maximum reconnect attempts after a mid-session transport failure
    /// (0 = never reconnect)
    pub max_reconnect_attempts: u32,

    /// Initial backoff before the first reconnect attempt
    pub reconnect_backoff: Duration,

    /// Backoff cap; doubling stops here
    pub max_reconnect_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            tick_interval: Duration::from_millis(33), // ~30fps display cadence
            max_reconnect_attempts: 3,
            reconnect_backoff: Duration::from_millis(500),
            max_reconnect_backoff: Duration::from_secs(8),
        }
    }
}

impl PipelineConfig {
    /// Set the negotiation timeout
    pub fn negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = timeout;
        self
    }

    /// Set the HTTP connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the annotation loop tick interval
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the maximum reconnect attempts
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the initial reconnect backoff
    pub fn reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Set the reconnect backoff cap
    pub fn max_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.max_reconnect_backoff = backoff;
        self
    }

    /// Backoff delay for a given reconnect attempt (0-based), doubled per
    /// attempt and capped
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.reconnect_backoff
            .saturating_mul(factor)
            .min(self.max_reconnect_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();

        assert_eq!(config.negotiation_timeout, Duration::from_secs(10));
        assert_eq!(config.tick_interval, Duration::from_millis(33));
        assert_eq!(config.max_reconnect_attempts, 3);
    }

    #[test]
    fn test_builder_chaining() {
        let config = PipelineConfig::default()
            .negotiation_timeout(Duration::from_secs(2))
            .tick_interval(Duration::from_millis(50))
            .max_reconnect_attempts(0);

        assert_eq!(config.negotiation_timeout, Duration::from_secs(2));
        assert_eq!(config.tick_interval, Duration::from_millis(50));
        assert_eq!(config.max_reconnect_attempts, 0);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = PipelineConfig::default()
            .reconnect_backoff(Duration::from_millis(500))
            .max_reconnect_backoff(Duration::from_secs(2));

        assert_eq!(config.backoff_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.backoff_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_secs(2));
        // Capped from here on
        assert_eq!(config.backoff_for_attempt(10), Duration::from_secs(2));
    }
}
