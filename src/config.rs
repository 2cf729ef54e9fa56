//! Configuration for the portal's authentication guards.
//!
//! Groups the three rate limiting policies and the session timeout settings.
//! Configuration is supplied as JSON by the deployment; it never fails to
//! load. Anything missing or malformed falls back to the documented default
//! and is reported through `log`.
//!
//! # Example
//!
//! ```rust
//! use coopguard::config::GuardConfig;
//! use chrono::Duration;
//!
//! let config = GuardConfig::from_json(r#"{
//!     "login": { "maxAttempts": 3 },
//!     "session": { "idleTimeoutMs": 900000 }
//! }"#);
//!
//! assert_eq!(config.login.max_attempts, 3);
//! assert_eq!(config.login.window, Duration::minutes(15));
//! assert_eq!(config.session.idle_timeout, Duration::minutes(15));
//! ```

use chrono::Duration;
use serde::Deserialize;
use serde_json::Value;

use crate::rate_limit::RateLimitConfig;
use crate::rate_limit::limit::PartialRateLimitConfig;
use crate::session::SessionConfig;
use crate::session::config::PartialSessionConfig;

/// Policies for the three rate limiters and the session clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub login: RateLimitConfig,
    pub registration: RateLimitConfig,
    pub password_reset: RateLimitConfig,
    pub session: SessionConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login: RateLimitConfig::login(),
            registration: RateLimitConfig::registration(),
            password_reset: RateLimitConfig::password_reset(),
            session: SessionConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Same as [`GuardConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Lenient limits and a long idle timeout for local work.
    pub fn development() -> Self {
        Self {
            login: RateLimitConfig::new(20, Duration::minutes(5)).block_for(Duration::minutes(1)),
            registration: RateLimitConfig::new(20, Duration::minutes(5))
                .block_for(Duration::minutes(1)),
            password_reset: RateLimitConfig::new(20, Duration::minutes(5))
                .block_for(Duration::minutes(1)),
            session: SessionConfig {
                idle_timeout: Duration::hours(8),
                ..SessionConfig::default()
            },
        }
    }

    /// Fewer attempts and a shorter idle timeout, for admin consoles.
    pub fn strict() -> Self {
        Self {
            login: RateLimitConfig::new(3, Duration::minutes(30))
                .block_for(Duration::minutes(30))
                .progressive(true),
            registration: RateLimitConfig::new(2, Duration::hours(1)).block_for(Duration::hours(2)),
            password_reset: RateLimitConfig::new(2, Duration::hours(1))
                .block_for(Duration::hours(1))
                .progressive(true),
            session: SessionConfig {
                warning_time: Duration::minutes(2),
                idle_timeout: Duration::minutes(10),
                ..SessionConfig::default()
            },
        }
    }

    /// Parses a deployment config, falling back to [`GuardConfig::default`]
    /// for anything absent. Unparseable input yields the full default.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<PartialGuardConfig>(json) {
            Ok(partial) => partial.apply(Self::default()),
            Err(e) => {
                log::warn!(
                    target: "coopguard",
                    "msg=\"invalid guard config, using defaults\" error=\"{e}\""
                );
                Self::default()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PartialGuardConfig {
    login: Option<PartialRateLimitConfig>,
    registration: Option<PartialRateLimitConfig>,
    password_reset: Option<PartialRateLimitConfig>,
    session: Option<PartialSessionConfig>,
}

impl PartialGuardConfig {
    fn apply(self, base: GuardConfig) -> GuardConfig {
        GuardConfig {
            login: apply_limit(self.login, base.login),
            registration: apply_limit(self.registration, base.registration),
            password_reset: apply_limit(self.password_reset, base.password_reset),
            session: match self.session {
                Some(partial) => partial.apply(base.session),
                None => base.session,
            },
        }
    }
}

fn apply_limit(partial: Option<PartialRateLimitConfig>, base: RateLimitConfig) -> RateLimitConfig {
    match partial {
        Some(partial) => partial.apply(base),
        None => base,
    }
}

/// Positive integer, or `None` when absent or unusable.
pub(crate) fn lenient_u32(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
}

/// Longest duration any setting may take. Larger values fall back.
pub(crate) fn max_setting_duration() -> Duration {
    Duration::days(365)
}

/// Positive millisecond count, at most [`max_setting_duration`], as a
/// [`Duration`].
pub(crate) fn lenient_millis(value: Option<&Value>) -> Option<Duration> {
    let ms = value.and_then(Value::as_u64).filter(|ms| *ms > 0)?;
    let duration = i64::try_from(ms)
        .ok()
        .map(Duration::milliseconds)
        .filter(|duration| *duration <= max_setting_duration());
    if duration.is_none() {
        log::warn!(
            target: "coopguard",
            "msg=\"duration setting too large, using default\" value_ms={ms}"
        );
    }
    duration
}

pub(crate) fn lenient_bool(value: Option<&Value>) -> Option<bool> {
    value.and_then(Value::as_bool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GuardConfig::default();

        assert_eq!(config.login.max_attempts, 5);
        assert_eq!(config.login.window, Duration::minutes(15));
        assert!(config.login.progressive_delay);
        assert_eq!(config.registration.max_attempts, 3);
        assert!(!config.registration.progressive_delay);
        assert_eq!(config.password_reset.block_duration, Duration::minutes(30));
        assert_eq!(config.session.idle_timeout, Duration::minutes(30));
        assert_eq!(config.session.warning_time, Duration::minutes(5));
    }

    #[test]
    fn test_strict_config() {
        let config = GuardConfig::strict();
        assert_eq!(config.login.max_attempts, 3);
        assert_eq!(config.session.idle_timeout, Duration::minutes(10));
    }

    #[test]
    fn test_development_config() {
        let config = GuardConfig::development();
        assert_eq!(config.login.max_attempts, 20);
        assert_eq!(config.session.idle_timeout, Duration::hours(8));
    }

    #[test]
    fn test_from_json_keeps_scenario_defaults() {
        let config = GuardConfig::from_json(r#"{ "registration": { "maxAttempts": 4 } }"#);

        assert_eq!(config.registration.max_attempts, 4);
        assert_eq!(config.registration.window, Duration::hours(1));
        assert_eq!(config.login, RateLimitConfig::login());
    }

    #[test]
    fn test_from_json_garbage_is_default() {
        assert_eq!(GuardConfig::from_json("not json"), GuardConfig::default());
        assert_eq!(GuardConfig::from_json("[1, 2]"), GuardConfig::default());
    }

    #[test]
    fn test_from_json_oversized_durations_fall_back() {
        let config = GuardConfig::from_json(
            r#"{
                "login": { "windowMs": 9007199254740991, "blockDurationMs": 9007199254740991 },
                "session": { "idleTimeoutMs": 9007199254740991 }
            }"#,
        );

        assert_eq!(config.login.window, Duration::minutes(15));
        assert_eq!(config.login.block_duration, Duration::minutes(15));
        assert_eq!(config.session.idle_timeout, Duration::minutes(30));
    }

    #[test]
    fn test_lenient_helpers() {
        assert_eq!(lenient_u32(Some(&Value::from(7))), Some(7));
        assert_eq!(lenient_u32(Some(&Value::from(0))), None);
        assert_eq!(lenient_u32(Some(&Value::from("7"))), None);
        assert_eq!(lenient_u32(None), None);
        assert_eq!(
            lenient_millis(Some(&Value::from(1500))),
            Some(Duration::milliseconds(1500))
        );
        assert_eq!(lenient_millis(Some(&Value::from(-1))), None);
        assert_eq!(lenient_millis(Some(&Value::from(9_007_199_254_740_991_u64))), None);
        assert_eq!(lenient_millis(Some(&Value::from(u64::MAX))), None);
        assert_eq!(lenient_bool(Some(&Value::from(false))), Some(false));
    }
}
