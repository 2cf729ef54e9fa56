use chrono::{DateTime, Duration, Utc};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutReason {
    /// No recognized activity for the whole idle timeout.
    Idle,
    /// The access token is missing or past its expiry.
    TokenExpired,
}

impl TimeoutReason {
    /// Stable name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TokenExpired => "token_expired",
        }
    }
}

/// Coarse grouping used to subscribe to part of the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTopic {
    RateLimit,
    Session,
}

/// Security events emitted by the rate limiters and the session monitor.
///
/// Events are always fired. If no listeners are registered they are dropped.
#[derive(Debug, Clone)]
pub enum SecurityEvent {
    // rate limiting
    AttemptRecorded {
        scope: String,
        identifier: String,
        count: u32,
        at: DateTime<Utc>,
    },
    RateLimited {
        scope: String,
        identifier: String,
        wait_time: Duration,
        blocked_until: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    AttemptsReset {
        scope: String,
        identifier: String,
        at: DateTime<Utc>,
    },

    // session
    SessionWarning {
        remaining: Duration,
        at: DateTime<Utc>,
    },
    SessionTimedOut {
        reason: TimeoutReason,
        at: DateTime<Utc>,
    },
}

impl SecurityEvent {
    /// Dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AttemptRecorded { .. } => "rate_limit.attempt_recorded",
            Self::RateLimited { .. } => "rate_limit.limited",
            Self::AttemptsReset { .. } => "rate_limit.reset",
            Self::SessionWarning { .. } => "session.warning",
            Self::SessionTimedOut { .. } => "session.timed_out",
        }
    }

    /// Which half of the crate fired the event.
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::AttemptRecorded { .. } | Self::RateLimited { .. } | Self::AttemptsReset { .. } => {
                EventTopic::RateLimit
            }
            Self::SessionWarning { .. } | Self::SessionTimedOut { .. } => EventTopic::Session,
        }
    }

    /// The limiter scope for rate limiting events.
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::AttemptRecorded { scope, .. }
            | Self::RateLimited { scope, .. }
            | Self::AttemptsReset { scope, .. } => Some(scope),
            Self::SessionWarning { .. } | Self::SessionTimedOut { .. } => None,
        }
    }

    /// When the event happened, by the emitting component's clock.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::AttemptRecorded { at, .. }
            | Self::RateLimited { at, .. }
            | Self::AttemptsReset { at, .. }
            | Self::SessionWarning { at, .. }
            | Self::SessionTimedOut { at, .. } => *at,
        }
    }
}
