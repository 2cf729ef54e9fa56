use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use super::limit::RateLimitConfig;
use super::schedule::LockoutSchedule;
use super::store::{AttemptRecord, AttemptStore, InMemoryAttemptStore};
use crate::clock::{Clock, SystemClock};
use crate::events::{SecurityEvent, dispatch};
use crate::messages::{Locale, remaining_attempts_message, wait_time_message};
use crate::AuthError;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// The attempt may proceed.
    Allowed {
        /// Attempts left in the window after this one.
        remaining_attempts: u32,
        /// When the current window closes; `None` when no window is open.
        reset_time: Option<DateTime<Utc>>,
    },
    /// The identifier is blocked.
    Limited {
        /// Time left until the block ends.
        wait_time: Duration,
        /// When the block ends.
        reset_time: DateTime<Utc>,
    },
}

impl RateLimitResult {
    /// Returns true if the attempt may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Returns true if the identifier is blocked.
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limited { .. })
    }

    /// Attempts left after this one, or `None` when blocked.
    pub fn remaining_attempts(&self) -> Option<u32> {
        match self {
            Self::Allowed {
                remaining_attempts, ..
            } => Some(*remaining_attempts),
            Self::Limited { .. } => None,
        }
    }

    /// Time left on the block, or `None` when allowed.
    pub fn wait_time(&self) -> Option<Duration> {
        match self {
            Self::Limited { wait_time, .. } => Some(*wait_time),
            Self::Allowed { .. } => None,
        }
    }

    /// When the block ends or the window closes, whichever applies.
    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Allowed { reset_time, .. } => *reset_time,
            Self::Limited { reset_time, .. } => Some(*reset_time),
        }
    }

    /// Text for the login form: remaining attempts or the lockout countdown.
    pub fn message(&self, locale: Locale) -> String {
        match self {
            Self::Allowed {
                remaining_attempts, ..
            } => remaining_attempts_message(*remaining_attempts, locale),
            Self::Limited { wait_time, .. } => wait_time_message(*wait_time, locale),
        }
    }
}

/// What happened to an action run through [`RateLimiter::attempt`].
#[derive(Debug)]
pub enum AttemptOutcome<T, E> {
    /// The action succeeded; the identifier's history was cleared.
    Succeeded(T),
    /// The action failed; the attempt was recorded.
    Failed(E),
    /// The action never ran.
    Limited(RateLimitResult),
}

/// Attempt limiter for one scenario (login, registration, password reset).
///
/// Tracks attempts per identifier in its own [`AttemptStore`] and imposes a
/// block once `max_attempts` is reached inside the window. With
/// `progressive_delay` the block grows through a [`LockoutSchedule`] for
/// every attempt past the allowance.
///
/// Checking and recording are separate calls. [`is_allowed`](Self::is_allowed)
/// never counts anything; a caller that checks but never calls
/// [`record_attempt`](Self::record_attempt) is never limited. Use
/// [`attempt`](Self::attempt) to keep the two in step.
///
/// # Example
///
/// ```rust
/// use coopguard::rate_limit::{RateLimitConfig, RateLimiter};
///
/// # async fn run() -> Result<(), coopguard::AuthError> {
/// let limiter = RateLimiter::in_memory("login", RateLimitConfig::login());
///
/// for _ in 0..5 {
///     limiter.record_attempt("student:12345678").await?;
/// }
/// assert!(limiter.is_allowed("student:12345678").await?.is_limited());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    scope: String,
    config: RateLimitConfig,
    schedule: LockoutSchedule,
    store: Arc<dyn AttemptStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a limiter over `store`. `scope` names the scenario in logs and
    /// events; `config` is [sanitized](RateLimitConfig::sanitized).
    pub fn new(
        scope: impl Into<String>,
        config: RateLimitConfig,
        store: Arc<dyn AttemptStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scope: scope.into(),
            config: config.sanitized(),
            schedule: LockoutSchedule::default(),
            store,
            clock,
        }
    }

    /// Limiter with its own in-memory store and the system clock.
    pub fn in_memory(scope: impl Into<String>, config: RateLimitConfig) -> Self {
        Self::new(
            scope,
            config,
            Arc::new(InMemoryAttemptStore::new()),
            Arc::new(SystemClock),
        )
    }

    /// Replaces the default 1/5/15/30/60 minute lockout schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: LockoutSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// The scenario name given at construction.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The policy in force, after sanitizing.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// The backing store, e.g. for snapshots.
    pub fn store(&self) -> &Arc<dyn AttemptStore> {
        &self.store
    }

    /// Decides whether `identifier` may attempt now. Does not count.
    ///
    /// Reaching the allowance imposes (and stores) a block as a side effect.
    /// Once a block runs out the identifier gets one more attempt; recording
    /// it while still over the allowance escalates the next block.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "rate_limit_check", skip(self), fields(scope = %self.scope), err)
    )]
    pub async fn is_allowed(&self, identifier: &str) -> Result<RateLimitResult, AuthError> {
        let now = self.clock.now();
        let max_attempts = self.config.max_attempts;

        let Some(mut record) = self.store.get(identifier).await? else {
            return Ok(self.fresh_window());
        };

        if let Some(until) = record.active_block(now) {
            return Ok(RateLimitResult::Limited {
                wait_time: until - now,
                reset_time: until,
            });
        }

        if record.is_stale(now, self.config.window) {
            self.store.remove(identifier).await?;
            return Ok(self.fresh_window());
        }

        if record.block_lapsed(now) {
            return Ok(RateLimitResult::Allowed {
                remaining_attempts: 0,
                reset_time: Some(record.window_end(self.config.window)),
            });
        }

        if record.count >= max_attempts {
            let duration = self.block_duration(record.count);
            let until = now
                .checked_add_signed(duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            record.blocked_until = Some(until);
            self.store.put(identifier, record).await?;

            log::warn!(
                target: "coopguard",
                "msg=\"identifier blocked\" scope={} wait_secs={}",
                self.scope,
                duration.num_seconds()
            );

            dispatch(SecurityEvent::RateLimited {
                scope: self.scope.clone(),
                identifier: identifier.to_owned(),
                wait_time: duration,
                blocked_until: until,
                at: now,
            })
            .await;

            return Ok(RateLimitResult::Limited {
                wait_time: duration,
                reset_time: until,
            });
        }

        Ok(RateLimitResult::Allowed {
            remaining_attempts: max_attempts.saturating_sub(record.count).saturating_sub(1),
            reset_time: Some(record.window_end(self.config.window)),
        })
    }

    /// Counts one attempt. Opens a fresh window when the previous one has
    /// run out.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "rate_limit_record", skip(self), fields(scope = %self.scope), err)
    )]
    pub async fn record_attempt(&self, identifier: &str) -> Result<AttemptRecord, AuthError> {
        let now = self.clock.now();

        let record = match self.store.get(identifier).await? {
            Some(mut record) if !record.is_stale(now, self.config.window) => {
                record.count = record.count.saturating_add(1);
                record.last_attempt = now;
                if record.block_lapsed(now) {
                    record.blocked_until = None;
                }
                record
            }
            _ => AttemptRecord::new(now),
        };

        self.store.put(identifier, record.clone()).await?;

        log::debug!(
            target: "coopguard",
            "msg=\"attempt recorded\" scope={} count={}",
            self.scope,
            record.count
        );

        dispatch(SecurityEvent::AttemptRecorded {
            scope: self.scope.clone(),
            identifier: identifier.to_owned(),
            count: record.count,
            at: now,
        })
        .await;

        Ok(record)
    }

    /// Forgets `identifier`. Call after a successful authentication.
    pub async fn reset_attempts(&self, identifier: &str) -> Result<(), AuthError> {
        self.store.remove(identifier).await?;

        dispatch(SecurityEvent::AttemptsReset {
            scope: self.scope.clone(),
            identifier: identifier.to_owned(),
            at: self.clock.now(),
        })
        .await;

        Ok(())
    }

    /// Attempts in the current window; 0 once the window has run out.
    pub async fn get_attempt_count(&self, identifier: &str) -> Result<u32, AuthError> {
        let now = self.clock.now();
        Ok(self
            .store
            .get(identifier)
            .await?
            .filter(|record| !record.is_stale(now, self.config.window))
            .map_or(0, |record| record.count))
    }

    /// Checks, runs `action` if allowed, records the attempt, and clears the
    /// history when the action succeeds.
    ///
    /// Every attempt that runs is counted, successful or not, so the check
    /// and the count can't drift apart.
    pub async fn attempt<T, E, F, Fut>(
        &self,
        identifier: &str,
        action: F,
    ) -> Result<AttemptOutcome<T, E>, AuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let check = self.is_allowed(identifier).await?;
        if check.is_limited() {
            return Ok(AttemptOutcome::Limited(check));
        }

        let result = action().await;
        self.record_attempt(identifier).await?;

        match result {
            Ok(value) => {
                self.reset_attempts(identifier).await?;
                Ok(AttemptOutcome::Succeeded(value))
            }
            Err(e) => Ok(AttemptOutcome::Failed(e)),
        }
    }

    /// Removes records whose window has run out. Returns how many went.
    pub async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        let pruned = self
            .store
            .prune(self.clock.now(), self.config.window)
            .await?;

        if pruned > 0 {
            log::debug!(
                target: "coopguard",
                "msg=\"pruned attempt records\" scope={} count={pruned}",
                self.scope
            );
        }

        Ok(pruned)
    }

    /// Runs [`cleanup_expired`](Self::cleanup_expired) every `every` on the
    /// current tokio runtime until the handle is stopped or dropped.
    pub fn spawn_cleanup(&self, every: Duration) -> CleanupHandle {
        let period = every
            .to_std()
            .ok()
            .filter(|period| !period.is_zero())
            .unwrap_or(std::time::Duration::from_secs(60));
        let limiter = self.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = limiter.cleanup_expired().await {
                    log::error!(
                        target: "coopguard",
                        "msg=\"attempt cleanup failed\" scope={} error=\"{e}\"",
                        limiter.scope
                    );
                }
            }
        });

        CleanupHandle {
            handle: Some(handle),
        }
    }

    fn fresh_window(&self) -> RateLimitResult {
        RateLimitResult::Allowed {
            remaining_attempts: self.config.max_attempts.saturating_sub(1),
            reset_time: None,
        }
    }

    fn block_duration(&self, count: u32) -> Duration {
        if self.config.progressive_delay {
            self.schedule
                .block_duration(count.saturating_sub(self.config.max_attempts))
        } else {
            self.config.block_duration
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("scope", &self.scope)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Owns a background cleanup sweep. Dropping it stops the sweep.
#[derive(Debug)]
pub struct CleanupHandle {
    handle: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    /// Aborts the sweep. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Returns true until the sweep has been stopped.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::GuardConfig;

    fn limiter(config: RateLimitConfig) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::starting_now();
        let limiter = RateLimiter::new(
            "login",
            config,
            Arc::new(InMemoryAttemptStore::new()),
            Arc::new(clock.clone()),
        );
        (limiter, clock)
    }

    #[tokio::test]
    async fn test_fresh_identifier_is_allowed() {
        let (limiter, _) = limiter(RateLimitConfig::login());

        let result = limiter.is_allowed("student:1").await.unwrap();
        assert_eq!(
            result,
            RateLimitResult::Allowed {
                remaining_attempts: 4,
                reset_time: None,
            }
        );
    }

    #[tokio::test]
    async fn test_remaining_attempts_count_down() {
        let (limiter, _) = limiter(RateLimitConfig::login());

        limiter.record_attempt("student:1").await.unwrap();
        limiter.record_attempt("student:1").await.unwrap();

        let result = limiter.is_allowed("student:1").await.unwrap();
        assert_eq!(result.remaining_attempts(), Some(2));
    }

    #[tokio::test]
    async fn test_blocks_after_max_attempts() {
        let (limiter, _) = limiter(RateLimitConfig::login());

        for i in 0..5 {
            let result = limiter.is_allowed("student:1").await.unwrap();
            assert!(result.is_allowed(), "attempt {} should be allowed", i + 1);
            limiter.record_attempt("student:1").await.unwrap();
        }

        let result = limiter.is_allowed("student:1").await.unwrap();
        assert!(result.is_limited());
        assert_eq!(result.wait_time(), Some(Duration::minutes(1)));
    }

    #[tokio::test]
    async fn test_block_wait_time_counts_down() {
        let (limiter, clock) = limiter(RateLimitConfig::login());
        for _ in 0..5 {
            limiter.record_attempt("student:1").await.unwrap();
        }
        limiter.is_allowed("student:1").await.unwrap();

        clock.advance(Duration::seconds(20));

        let result = limiter.is_allowed("student:1").await.unwrap();
        assert_eq!(result.wait_time(), Some(Duration::seconds(40)));
    }

    #[tokio::test]
    async fn test_flat_block_without_progressive_delay() {
        let config = RateLimitConfig::new(2, Duration::minutes(10)).block_for(Duration::minutes(7));
        let (limiter, clock) = limiter(config);

        limiter.record_attempt("x").await.unwrap();
        limiter.record_attempt("x").await.unwrap();
        let first = limiter.is_allowed("x").await.unwrap();
        assert_eq!(first.wait_time(), Some(Duration::minutes(7)));

        clock.advance(Duration::minutes(7));
        assert!(limiter.is_allowed("x").await.unwrap().is_allowed());
        limiter.record_attempt("x").await.unwrap();

        let second = limiter.is_allowed("x").await.unwrap();
        assert_eq!(second.wait_time(), Some(Duration::minutes(7)));
    }

    #[tokio::test]
    async fn test_progressive_block_escalates() {
        let (limiter, clock) = limiter(RateLimitConfig::login());
        for _ in 0..5 {
            limiter.record_attempt("student:1").await.unwrap();
        }

        let first = limiter.is_allowed("student:1").await.unwrap();
        assert_eq!(first.wait_time(), Some(Duration::minutes(1)));

        clock.advance(Duration::minutes(1));
        let after_block = limiter.is_allowed("student:1").await.unwrap();
        assert_eq!(after_block.remaining_attempts(), Some(0));

        limiter.record_attempt("student:1").await.unwrap();
        let second = limiter.is_allowed("student:1").await.unwrap();
        assert_eq!(second.wait_time(), Some(Duration::minutes(5)));
    }

    #[tokio::test]
    async fn test_reset_attempts_clears_block() {
        let (limiter, _) = limiter(RateLimitConfig::login());
        for _ in 0..5 {
            limiter.record_attempt("student:1").await.unwrap();
        }
        assert!(limiter.is_allowed("student:1").await.unwrap().is_limited());

        limiter.reset_attempts("student:1").await.unwrap();

        let result = limiter.is_allowed("student:1").await.unwrap();
        assert!(result.is_allowed());
        assert_eq!(limiter.get_attempt_count("student:1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_window_expiry_clears_history() {
        let (limiter, clock) = limiter(RateLimitConfig::login());
        limiter.record_attempt("student:1").await.unwrap();
        limiter.record_attempt("student:1").await.unwrap();
        assert_eq!(limiter.get_attempt_count("student:1").await.unwrap(), 2);

        clock.advance(Duration::minutes(15) + Duration::milliseconds(1));

        assert_eq!(limiter.get_attempt_count("student:1").await.unwrap(), 0);
        let result = limiter.is_allowed("student:1").await.unwrap();
        assert_eq!(result.remaining_attempts(), Some(4));
    }

    #[tokio::test]
    async fn test_record_after_window_starts_fresh() {
        let (limiter, clock) = limiter(RateLimitConfig::login());
        limiter.record_attempt("student:1").await.unwrap();
        limiter.record_attempt("student:1").await.unwrap();

        clock.advance(Duration::minutes(16));

        let record = limiter.record_attempt("student:1").await.unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.first_attempt, record.last_attempt);
    }

    #[tokio::test]
    async fn test_record_during_block_keeps_invariant() {
        let (limiter, clock) = limiter(RateLimitConfig::login());
        for _ in 0..5 {
            limiter.record_attempt("student:1").await.unwrap();
        }
        limiter.is_allowed("student:1").await.unwrap();
        clock.advance(Duration::seconds(10));

        let record = limiter.record_attempt("student:1").await.unwrap();
        assert_eq!(record.count, 6);
        let until = record.blocked_until.unwrap();
        assert!(until >= record.last_attempt);
    }

    #[tokio::test]
    async fn test_identifiers_are_isolated() {
        let (limiter, _) = limiter(RateLimitConfig::new(1, Duration::minutes(5)));

        limiter.record_attempt("student:1").await.unwrap();
        assert!(limiter.is_allowed("student:1").await.unwrap().is_limited());
        assert!(limiter.is_allowed("student:2").await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_attempt_success_resets() {
        let (limiter, _) = limiter(RateLimitConfig::login());
        limiter.record_attempt("student:1").await.unwrap();

        let outcome = limiter
            .attempt("student:1", || async { Ok::<_, &str>(42) })
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::Succeeded(42)));
        assert_eq!(limiter.get_attempt_count("student:1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_attempt_failure_counts_and_limits() {
        let (limiter, _) = limiter(RateLimitConfig::new(2, Duration::minutes(5)));

        for _ in 0..2 {
            let outcome = limiter
                .attempt("student:1", || async { Err::<(), _>("bad password") })
                .await
                .unwrap();
            assert!(matches!(outcome, AttemptOutcome::Failed("bad password")));
        }

        let outcome = limiter
            .attempt("student:1", || async { Ok::<_, &str>(()) })
            .await
            .unwrap();
        assert!(matches!(outcome, AttemptOutcome::Limited(_)));
        assert_eq!(limiter.get_attempt_count("student:1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let (limiter, clock) = limiter(RateLimitConfig::login());
        limiter.record_attempt("student:1").await.unwrap();
        clock.advance(Duration::minutes(10));
        limiter.record_attempt("student:2").await.unwrap();
        clock.advance(Duration::minutes(6));

        assert_eq!(limiter.cleanup_expired().await.unwrap(), 1);
        assert_eq!(limiter.get_attempt_count("student:2").await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_cleanup_sweeps_and_stops() {
        let store = Arc::new(InMemoryAttemptStore::new());
        let clock = ManualClock::starting_now();
        let limiter = RateLimiter::new(
            "login",
            RateLimitConfig::login(),
            store.clone(),
            Arc::new(clock.clone()),
        );
        limiter.record_attempt("student:1").await.unwrap();
        clock.advance(Duration::minutes(20));

        let mut handle = limiter.spawn_cleanup(Duration::seconds(30));
        tokio::time::sleep(std::time::Duration::from_secs(31)).await;

        assert!(store.is_empty());
        assert!(handle.is_running());

        handle.stop();
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_limited_message() {
        let (limiter, _) = limiter(RateLimitConfig::login());
        for _ in 0..5 {
            limiter.record_attempt("student:1").await.unwrap();
        }
        let result = limiter.is_allowed("student:1").await.unwrap();
        assert_eq!(
            result.message(Locale::English),
            "Too many attempts. Please try again in 1 minute(s)."
        );
    }

    #[tokio::test]
    async fn test_oversized_window_from_json_does_not_panic() {
        let config = GuardConfig::from_json(
            r#"{ "login": { "windowMs": 9007199254740991, "blockDurationMs": 9007199254740991 } }"#,
        );
        let limiter = RateLimiter::in_memory("login", config.login);

        limiter.record_attempt("student:1").await.unwrap();
        let result = limiter.is_allowed("student:1").await.unwrap();

        assert_eq!(result.remaining_attempts(), Some(3));
    }

    #[tokio::test]
    async fn test_huge_block_saturates() {
        let (limiter, clock) =
            limiter(RateLimitConfig::new(1, Duration::minutes(15)).progressive(true));
        let limiter = limiter.with_schedule(LockoutSchedule::custom(vec![Duration::MAX]));
        limiter.record_attempt("student:1").await.unwrap();

        let result = limiter.is_allowed("student:1").await.unwrap();

        assert_eq!(result.reset_time(), Some(DateTime::<Utc>::MAX_UTC));
        assert_eq!(result.wait_time(), Some(DateTime::<Utc>::MAX_UTC - clock.now()));
    }
}
