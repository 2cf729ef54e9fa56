use chrono::Duration;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{lenient_bool, lenient_millis, max_setting_duration};

/// Idle timeout settings.
///
/// Deserializes from camelCase JSON (`warningTimeMs`, `idleTimeoutMs`,
/// `checkIntervalMs`, `enableIdleDetection`, `enableVisibilityDetection`);
/// absent or unusable fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PartialSessionConfig")]
pub struct SessionConfig {
    /// How long before the idle timeout the warning fires. Default: 5 minutes.
    pub warning_time: Duration,
    /// Inactivity that ends the session. Default: 30 minutes.
    pub idle_timeout: Duration,
    /// Period of the background check. Default: 1 minute.
    pub check_interval: Duration,
    /// Reset the idle clock on pointer, key, scroll and touch events.
    pub enable_idle_detection: bool,
    /// Record activity and re-check when the page becomes visible again.
    pub enable_visibility_detection: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warning_time: Duration::minutes(5),
            idle_timeout: Duration::minutes(30),
            check_interval: Duration::minutes(1),
            enable_idle_detection: true,
            enable_visibility_detection: true,
        }
    }
}

impl SessionConfig {
    /// The point of inactivity at which the warning becomes due.
    pub fn warning_threshold(&self) -> Duration {
        (self.idle_timeout - self.warning_time).max(Duration::zero())
    }

    /// Replaces unusable durations with the defaults and keeps the warning
    /// strictly inside the idle timeout.
    ///
    /// A non-positive or oversized duration falls back to its default. A
    /// `warning_time` that does not fit inside `idle_timeout` becomes the
    /// default when that fits, otherwise half the idle timeout.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let mut config = self;
        let usable = |d: Duration| d > Duration::zero() && d <= max_setting_duration();

        if !usable(config.idle_timeout) {
            log::warn!(target: "coopguard", "msg=\"idle_timeout out of range, using default\"");
            config.idle_timeout = defaults.idle_timeout;
        }
        if !usable(config.check_interval) {
            log::warn!(target: "coopguard", "msg=\"check_interval out of range, using default\"");
            config.check_interval = defaults.check_interval;
        }
        if !usable(config.warning_time) || config.warning_time >= config.idle_timeout {
            let fallback = if defaults.warning_time < config.idle_timeout {
                defaults.warning_time
            } else {
                config.idle_timeout / 2
            };
            log::warn!(
                target: "coopguard",
                "msg=\"warning_time must be positive and below idle_timeout\" using_secs={}",
                fallback.num_seconds()
            );
            config.warning_time = fallback;
        }

        config
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct PartialSessionConfig {
    warning_time_ms: Option<Value>,
    idle_timeout_ms: Option<Value>,
    check_interval_ms: Option<Value>,
    enable_idle_detection: Option<Value>,
    enable_visibility_detection: Option<Value>,
}

impl PartialSessionConfig {
    pub(crate) fn apply(self, base: SessionConfig) -> SessionConfig {
        SessionConfig {
            warning_time: lenient_millis(self.warning_time_ms.as_ref()).unwrap_or(base.warning_time),
            idle_timeout: lenient_millis(self.idle_timeout_ms.as_ref()).unwrap_or(base.idle_timeout),
            check_interval: lenient_millis(self.check_interval_ms.as_ref())
                .unwrap_or(base.check_interval),
            enable_idle_detection: lenient_bool(self.enable_idle_detection.as_ref())
                .unwrap_or(base.enable_idle_detection),
            enable_visibility_detection: lenient_bool(self.enable_visibility_detection.as_ref())
                .unwrap_or(base.enable_visibility_detection),
        }
    }
}

impl From<PartialSessionConfig> for SessionConfig {
    fn from(partial: PartialSessionConfig) -> Self {
        partial.apply(Self::default())
    }
}
