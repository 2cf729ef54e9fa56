use chrono::Duration;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{lenient_bool, lenient_millis, lenient_u32, max_setting_duration};

/// Policy for one rate limiter instance.
///
/// Deserializes from the portal's camelCase JSON
/// (`maxAttempts`, `windowMs`, `blockDurationMs`, `progressiveDelay`). Every
/// field is optional; missing, zero or malformed values fall back to
/// [`RateLimitConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PartialRateLimitConfig")]
pub struct RateLimitConfig {
    /// Attempts allowed inside one window before a block is imposed.
    pub max_attempts: u32,
    /// Tracking window, measured from the first attempt.
    pub window: Duration,
    /// Block length when `progressive_delay` is off.
    pub block_duration: Duration,
    /// Escalate blocks through the lockout schedule on repeat offences.
    pub progressive_delay: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::login()
    }
}

impl RateLimitConfig {
    /// `max_attempts` per `window`, blocking for one window, no escalation.
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            block_duration: window,
            progressive_delay: false,
        }
    }

    /// 5 attempts per 15 minutes, progressive lockout.
    #[must_use]
    pub fn login() -> Self {
        Self::new(5, Duration::minutes(15))
            .block_for(Duration::minutes(15))
            .progressive(true)
    }

    /// 3 attempts per hour, flat one hour block.
    #[must_use]
    pub fn registration() -> Self {
        Self::new(3, Duration::hours(1)).block_for(Duration::hours(1))
    }

    /// 3 attempts per hour, progressive lockout.
    #[must_use]
    pub fn password_reset() -> Self {
        Self::new(3, Duration::hours(1))
            .block_for(Duration::minutes(30))
            .progressive(true)
    }

    /// Sets the flat block length used without progressive delay.
    #[must_use]
    pub fn block_for(mut self, duration: Duration) -> Self {
        self.block_duration = duration;
        self
    }

    /// Turns escalation through the lockout schedule on or off.
    #[must_use]
    pub fn progressive(mut self, enabled: bool) -> Self {
        self.progressive_delay = enabled;
        self
    }

    /// Replaces unusable values (zero attempts, non-positive or oversized
    /// durations) with the defaults so a bad config degrades instead of
    /// failing.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let mut config = self;
        let usable = |d: Duration| d > Duration::zero() && d <= max_setting_duration();

        if config.max_attempts == 0 {
            log::warn!(target: "coopguard", "msg=\"max_attempts must be positive, using default\"");
            config.max_attempts = defaults.max_attempts;
        }
        if !usable(config.window) {
            log::warn!(target: "coopguard", "msg=\"window out of range, using default\"");
            config.window = defaults.window;
        }
        if !usable(config.block_duration) {
            log::warn!(target: "coopguard", "msg=\"block_duration out of range, using default\"");
            config.block_duration = defaults.block_duration;
        }

        config
    }
}

/// Wire shape of [`RateLimitConfig`] before defaults are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct PartialRateLimitConfig {
    max_attempts: Option<Value>,
    window_ms: Option<Value>,
    block_duration_ms: Option<Value>,
    progressive_delay: Option<Value>,
}

impl PartialRateLimitConfig {
    /// Fills the fields that were given and valid on top of `base`.
    pub(crate) fn apply(self, base: RateLimitConfig) -> RateLimitConfig {
        RateLimitConfig {
            max_attempts: lenient_u32(self.max_attempts.as_ref()).unwrap_or(base.max_attempts),
            window: lenient_millis(self.window_ms.as_ref()).unwrap_or(base.window),
            block_duration: lenient_millis(self.block_duration_ms.as_ref())
                .unwrap_or(base.block_duration),
            progressive_delay: lenient_bool(self.progressive_delay.as_ref())
                .unwrap_or(base.progressive_delay),
        }
    }
}

impl From<PartialRateLimitConfig> for RateLimitConfig {
    fn from(partial: PartialRateLimitConfig) -> Self {
        partial.apply(Self::default())
    }
}
