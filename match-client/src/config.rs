//! Engine configuration.
//!
//! Every timing the protocol depends on lives here, loadable from a TOML
//! file or tuned through builder methods (tests shrink the intervals to
//! keep scenarios fast).

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use match_core::StallTimings;

/// Timing configuration for a [`MatchEngine`](crate::MatchEngine).
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Reconciliation poll interval in ms (default: 5000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long the guard lingers after a release to absorb the echo of
    /// an own write, in ms (default: 300).
    #[serde(default = "default_echo_linger_ms")]
    pub echo_linger_ms: u64,
    /// Upper bound on one guard hold before fail-open, in ms (default: 800).
    #[serde(default = "default_guard_hold_ms")]
    pub guard_hold_ms: u64,
    /// Delay after a local play-again choice before the stall ladder's
    /// first check, in ms (default: 3000).
    #[serde(default = "default_stall_arm_ms")]
    pub stall_arm_ms: u64,
    /// Delay after the ladder's explicit re-fetch before commanding a
    /// reset, in ms (default: 2000).
    #[serde(default = "default_stall_recheck_ms")]
    pub stall_recheck_ms: u64,
    /// How long a guest waits for the host to answer a force request
    /// before giving up, in ms (default: 3000).
    #[serde(default = "default_stall_host_grace_ms")]
    pub stall_host_grace_ms: u64,
    /// Delay between a win landing and the end dialog, in ms (default: 1500).
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
    /// How long a won round stays on screen before the next round starts,
    /// in ms (default: 2000).
    #[serde(default = "default_round_restart_ms")]
    pub round_restart_ms: u64,
    /// Grace between a leaving host's departure notice and the session
    /// deletion, in ms (default: 1000).
    #[serde(default = "default_leave_grace_ms")]
    pub leave_grace_ms: u64,
    /// Minimum interval between liveness pings, in ms (default: 6 hours).
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
}

// Default value functions
fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_echo_linger_ms() -> u64 {
    300
}

fn default_guard_hold_ms() -> u64 {
    800
}

fn default_stall_arm_ms() -> u64 {
    3_000
}

fn default_stall_recheck_ms() -> u64 {
    2_000
}

fn default_stall_host_grace_ms() -> u64 {
    3_000
}

fn default_reveal_delay_ms() -> u64 {
    1_500
}

fn default_round_restart_ms() -> u64 {
    2_000
}

fn default_leave_grace_ms() -> u64 {
    1_000
}

fn default_ping_interval_ms() -> u64 {
    6 * 60 * 60 * 1_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            echo_linger_ms: default_echo_linger_ms(),
            guard_hold_ms: default_guard_hold_ms(),
            stall_arm_ms: default_stall_arm_ms(),
            stall_recheck_ms: default_stall_recheck_ms(),
            stall_host_grace_ms: default_stall_host_grace_ms(),
            reveal_delay_ms: default_reveal_delay_ms(),
            round_restart_ms: default_round_restart_ms(),
            leave_grace_ms: default_leave_grace_ms(),
            ping_interval_ms: default_ping_interval_ms(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Set the reconciliation poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the reveal delay.
    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the guard's echo-linger window.
    pub fn with_echo_linger(mut self, linger: Duration) -> Self {
        self.echo_linger_ms = linger.as_millis() as u64;
        self
    }

    /// Set the round-restart delay.
    pub fn with_round_restart(mut self, delay: Duration) -> Self {
        self.round_restart_ms = delay.as_millis() as u64;
        self
    }

    /// The poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The reveal delay as a [`Duration`].
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    /// The round-restart delay as a [`Duration`].
    pub fn round_restart(&self) -> Duration {
        Duration::from_millis(self.round_restart_ms)
    }

    /// The host-leave deletion grace as a [`Duration`].
    pub fn leave_grace(&self) -> Duration {
        Duration::from_millis(self.leave_grace_ms)
    }

    /// Stall-ladder timings for the deadlock detector.
    pub fn stall_timings(&self) -> StallTimings {
        StallTimings {
            arm: Duration::from_millis(self.stall_arm_ms),
            recheck: Duration::from_millis(self.stall_recheck_ms),
            host_grace: Duration::from_millis(self.stall_host_grace_ms),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_protocol_timings() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval_ms, 5_000);
        assert_eq!(config.echo_linger_ms, 300);
        assert_eq!(config.guard_hold_ms, 800);
        assert_eq!(config.reveal_delay_ms, 1_500);
        assert_eq!(config.ping_interval_ms, 21_600_000);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
poll_interval_ms = 1000
reveal_delay_ms = 250
stall_arm_ms = 500
"#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.poll_interval_ms, 1_000);
        assert_eq!(config.reveal_delay_ms, 250);
        assert_eq!(config.stall_arm_ms, 500);
        // Missing fields use defaults
        assert_eq!(config.guard_hold_ms, 800);
    }

    #[test]
    fn builder_methods_override_timings() {
        let config = EngineConfig::default()
            .with_poll_interval(Duration::from_millis(200))
            .with_reveal_delay(Duration::from_millis(100));

        assert_eq!(config.poll_interval(), Duration::from_millis(200));
        assert_eq!(config.reveal_delay(), Duration::from_millis(100));
    }

    #[test]
    fn stall_timings_are_derived() {
        let config = EngineConfig::default();
        let timings = config.stall_timings();
        assert_eq!(timings.arm, Duration::from_secs(3));
        assert_eq!(timings.recheck, Duration::from_secs(2));
        assert_eq!(timings.host_grace, Duration::from_secs(3));
    }
}
