//! Authentication hardening for the co-op education portal.
//!
//! Two independent pieces live here:
//!
//! - [`rate_limit`]: per-identifier attempt tracking with progressive lockout,
//!   one isolated limiter per scenario (login, registration, password reset).
//! - [`session`]: an idle/expiry session clock that fires warning and timeout
//!   callbacks, driven by a background [`session::SessionMonitor`].
//!
//! Both are advisory. Rate limiting state is local to the process and a
//! denied check or a timed out session is reported as a value, never as an
//! error. [`AuthError`] only covers storage faults.
//!
//! # Example
//!
//! ```rust
//! use coopguard::rate_limit::{RateLimitConfig, RateLimiter};
//!
//! # async fn run() -> Result<(), coopguard::AuthError> {
//! let limiter = RateLimiter::in_memory("login", RateLimitConfig::login());
//!
//! let check = limiter.is_allowed("student:12345678").await?;
//! if check.is_allowed() {
//!     // authenticate, then
//!     limiter.record_attempt("student:12345678").await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;

pub mod clock;
pub mod config;
pub mod events;
pub mod messages;
pub mod rate_limit;
mod secret;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GuardConfig;
pub use events::{SecurityEvent, register_event_listeners};
pub use messages::Locale;
pub use rate_limit::{AuthLimiters, RateLimitConfig, RateLimitResult, RateLimiter, Scenario};
pub use secret::SecretString;
pub use session::{SessionClock, SessionConfig, SessionMonitor, TokenExpiryGate};

/// Infrastructure faults. Policy outcomes are never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The backing attempt or token store failed (lock poisoned, I/O, bad JSON).
    StoreError(String),
    TokenInvalid,
}

impl std::error::Error for AuthError {}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::StoreError(msg) => write!(f, "Store error: {msg}"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
        }
    }
}
