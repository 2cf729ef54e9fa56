use std::fmt;
use std::sync::Arc;

use super::limiter::RateLimiter;
use super::store::InMemoryAttemptStore;
use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;

/// Authentication flows that get their own limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    Login,
    Registration,
    PasswordReset,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Self::Login, Self::Registration, Self::PasswordReset];

    /// Scope name used by the scenario's limiter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Registration => "registration",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One isolated limiter per [`Scenario`].
///
/// Each limiter has its own store; a lockout on login never touches
/// registration or password reset for the same identifier.
#[derive(Debug, Clone)]
pub struct AuthLimiters {
    pub login: RateLimiter,
    pub registration: RateLimiter,
    pub password_reset: RateLimiter,
}

impl AuthLimiters {
    /// Builds the three limiters on the system clock.
    pub fn new(config: &GuardConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds the three limiters sharing `clock`, each with its own store.
    pub fn with_clock(config: &GuardConfig, clock: Arc<dyn Clock>) -> Self {
        let build = |scenario: Scenario| {
            let policy = match scenario {
                Scenario::Login => config.login.clone(),
                Scenario::Registration => config.registration.clone(),
                Scenario::PasswordReset => config.password_reset.clone(),
            };
            RateLimiter::new(
                scenario.as_str(),
                policy,
                Arc::new(InMemoryAttemptStore::new()),
                Arc::clone(&clock),
            )
        };

        Self {
            login: build(Scenario::Login),
            registration: build(Scenario::Registration),
            password_reset: build(Scenario::PasswordReset),
        }
    }

    /// The limiter for `scenario`.
    pub fn get(&self, scenario: Scenario) -> &RateLimiter {
        match scenario {
            Scenario::Login => &self.login,
            Scenario::Registration => &self.registration,
            Scenario::PasswordReset => &self.password_reset,
        }
    }
}

impl Default for AuthLimiters {
    fn default() -> Self {
        Self::new(&GuardConfig::default())
    }
}
