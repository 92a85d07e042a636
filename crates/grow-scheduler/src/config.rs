//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::SchedulerError;

/// Configuration for the scheduler service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA timezone cron expressions are evaluated in. Defaults to "UTC".
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    /// Seconds shutdown waits for running jobs before stopping the
    /// scheduler. Defaults to 30.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

#[cfg(feature = "jobs")]
impl From<&grow_types::SchedulerSettings> for SchedulerConfig {
    fn from(settings: &grow_types::SchedulerSettings) -> Self {
        Self {
            default_timezone: settings.timezone.clone(),
            shutdown_timeout_secs: settings.shutdown_timeout_secs,
        }
    }
}

impl SchedulerConfig {
    /// Parse the configured timezone string into a chrono_tz::Tz.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTimezone` if the timezone string
    /// is not a valid IANA timezone identifier.
    pub fn parse_timezone(&self) -> Result<chrono_tz::Tz, SchedulerError> {
        self.default_timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| SchedulerError::InvalidTimezone(self.default_timezone.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.default_timezone, "UTC");
        assert_eq!(config.shutdown_timeout_secs, 30);
    }

    #[test]
    fn test_parse_timezone_europe_berlin() {
        let config = SchedulerConfig {
            default_timezone: "Europe/Berlin".to_string(),
            ..Default::default()
        };
        let tz = config.parse_timezone().unwrap();
        assert_eq!(tz.name(), "Europe/Berlin");
    }

    #[test]
    fn test_parse_invalid_timezone() {
        let config = SchedulerConfig {
            default_timezone: "Invalid/Zone".to_string(),
            ..Default::default()
        };
        match config.parse_timezone() {
            Err(SchedulerError::InvalidTimezone(tz)) => assert_eq!(tz, "Invalid/Zone"),
            other => panic!("Expected InvalidTimezone error, got {other:?}"),
        }
    }

    #[cfg(feature = "jobs")]
    #[test]
    fn test_from_settings() {
        let settings = grow_types::SchedulerSettings {
            enabled: true,
            timezone: "Europe/Berlin".to_string(),
            shutdown_timeout_secs: 5,
        };
        let config = SchedulerConfig::from(&settings);
        assert_eq!(config.default_timezone, "Europe/Berlin");
        assert_eq!(config.shutdown_timeout_secs, 5);
    }
}
