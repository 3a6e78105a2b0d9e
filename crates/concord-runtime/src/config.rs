//! Runtime and logging configuration

use std::time::Duration;

/// Runtime configuration
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// How long `wait_idle` waits for in-flight hand-offs to drain
    pub idle_timeout: Duration,
    /// Log every hand-off at debug level instead of trace
    pub log_hand_offs: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            log_hand_offs: false,
        }
    }
}

impl RuntimeConfig {
    /// Short timeout, verbose hand-off logging
    pub fn testing() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
            log_hand_offs: true,
        }
    }
}

/// Logging configuration for drivers.
///
/// `RUST_LOG` overrides `default_level` when set.
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub default_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            json: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn development() -> Self {
        Self {
            default_level: "debug".to_string(),
            ..Default::default()
        }
    }

    pub fn json() -> Self {
        Self {
            json: true,
            ansi: false,
            ..Default::default()
        }
    }
}
