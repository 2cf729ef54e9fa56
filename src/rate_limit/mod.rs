//! Attempt rate limiting with progressive lockout.

pub(crate) mod limit;
mod limiter;
mod scenarios;
mod schedule;
mod store;

pub use limit::RateLimitConfig;
pub use limiter::{AttemptOutcome, CleanupHandle, RateLimitResult, RateLimiter};
pub use scenarios::{AuthLimiters, Scenario};
pub use schedule::LockoutSchedule;
pub use store::{AttemptRecord, AttemptStore, InMemoryAttemptStore};
