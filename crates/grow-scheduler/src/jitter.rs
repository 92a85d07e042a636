//! Random start delay for scheduled runs.
//!
//! Every daemon instance fires the nightly jobs at the same cron tick; a
//! random delay spreads their lease attempts apart.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Upper bound of the random delay applied before each run.
///
/// ```
/// use grow_scheduler::JitterConfig;
///
/// let jitter = JitterConfig::new(60);
/// assert!(jitter.generate_jitter() < std::time::Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JitterConfig {
    /// 0 disables jitter
    pub max_jitter_secs: u64,
}

impl JitterConfig {
    pub fn new(max_jitter_secs: u64) -> Self {
        Self { max_jitter_secs }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.max_jitter_secs > 0
    }

    /// A delay in `[0, max_jitter_secs)`, millisecond resolution.
    pub fn generate_jitter(&self) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        let jitter_ms = rand::rng().random_range(0..self.max_jitter_secs * 1000);
        Duration::from_millis(jitter_ms)
    }

    /// Sleep for a fresh jitter delay. Returns false when `token` is
    /// cancelled first.
    pub async fn wait(&self, token: &CancellationToken) -> bool {
        let delay = self.generate_jitter();
        if delay.is_zero() {
            return !token.is_cancelled();
        }
        tracing::debug!(jitter_ms = delay.as_millis() as u64, "Applying jitter delay");
        tokio::select! {
            biased;
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_jitter_is_zero() {
        let config = JitterConfig::none();
        assert!(!config.is_enabled());
        assert_eq!(config.generate_jitter(), Duration::ZERO);
    }

    #[test]
    fn test_jitter_bounds_and_spread() {
        let config = JitterConfig::new(10);
        let samples: Vec<Duration> = (0..500).map(|_| config.generate_jitter()).collect();

        assert!(samples.iter().all(|s| *s < Duration::from_secs(10)));
        let distinct: std::collections::HashSet<_> = samples.iter().map(|d| d.as_millis()).collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = JitterConfig::new(60);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"max_jitter_secs":60}"#);
        assert_eq!(serde_json::from_str::<JitterConfig>(&json).unwrap(), config);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_elapses() {
        let token = CancellationToken::new();
        assert!(JitterConfig::new(2).wait(&token).await);
        assert!(JitterConfig::none().wait(&token).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(!JitterConfig::new(3600).wait(&token).await);
        assert!(!JitterConfig::none().wait(&token).await);
    }
}
