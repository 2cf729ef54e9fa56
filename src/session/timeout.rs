use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use super::activity::{ActivityEvent, Visibility};
use super::callbacks::SessionCallbacks;
use super::config::SessionConfig;
use super::gate::TokenExpiryGate;
use crate::clock::{Clock, SystemClock};
use crate::events::{self, SecurityEvent, TimeoutReason};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    /// The warning has fired and no activity has happened since.
    Warned,
    /// Terminal until [`SessionClock::reset`].
    TimedOut,
}

/// Snapshot of a [`SessionClock`], as returned by [`SessionClock::state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub last_activity: DateTime<Utc>,
    pub warning_shown: bool,
    pub phase: SessionPhase,
    pub visible: bool,
}

/// Result of one [`SessionClock::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// Nothing changed.
    Running { remaining: Duration },
    /// Just crossed the warning threshold; `on_warning` was called.
    Warning { remaining: Duration },
    /// Just timed out; `on_timeout` was called.
    TimedOut { reason: TimeoutReason },
    /// Already timed out earlier, or logged out.
    Closed,
}

#[derive(Debug)]
struct Inner {
    config: SessionConfig,
    state: SessionState,
    /// Warning and timeout events not yet sent to the listeners.
    pending: Vec<SecurityEvent>,
}

/// Idle and token-expiry tracking for the signed-in user.
///
/// Feed it activity with [`record_activity`](Self::record_activity) or
/// [`handle_activity`](Self::handle_activity), and call
/// [`check`](Self::check) periodically (a [`SessionMonitor`](super::SessionMonitor)
/// does this on `check_interval`). The session moves
/// `Active -> Warned -> TimedOut`; activity before the timeout returns it
/// to `Active`.
///
/// The clock is an ordinary value. Build one per signed-in session, share
/// it behind an `Arc`, and drop it on logout.
///
/// Every warning or timeout transition queues a [`SecurityEvent`], whichever
/// call caused it. [`dispatch_pending`](Self::dispatch_pending) sends the
/// queue; the monitor does so after each check.
pub struct SessionClock {
    inner: Mutex<Inner>,
    callbacks: RwLock<SessionCallbacks>,
    gate: TokenExpiryGate,
    clock: Arc<dyn Clock>,
}

impl SessionClock {
    /// Starts an `Active` session at `clock.now()`. The config is
    /// [sanitized](SessionConfig::sanitized) first.
    pub fn new(config: SessionConfig, gate: TokenExpiryGate, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            inner: Mutex::new(Inner {
                config: config.sanitized(),
                state: SessionState {
                    last_activity: now,
                    warning_shown: false,
                    phase: SessionPhase::Active,
                    visible: true,
                },
                pending: Vec::new(),
            }),
            callbacks: RwLock::new(SessionCallbacks::default()),
            gate,
            clock,
        }
    }

    /// Session clock on the system clock.
    pub fn with_system_clock(config: SessionConfig, gate: TokenExpiryGate) -> Self {
        Self::new(config, gate, Arc::new(SystemClock))
    }

    /// Registers callbacks on a freshly built clock.
    #[must_use]
    pub fn with_callbacks(self, callbacks: SessionCallbacks) -> Self {
        self.update_callbacks(callbacks);
        self
    }

    /// The config in force, after sanitizing.
    pub fn config(&self) -> SessionConfig {
        self.lock().config.clone()
    }

    /// Copy of the current state.
    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Returns the current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.lock().state.phase
    }

    /// The token gate consulted on every check.
    pub fn gate(&self) -> &TokenExpiryGate {
        &self.gate
    }

    /// Resets the idle clock. Ignored once the session has timed out.
    pub fn record_activity(&self) -> bool {
        let now = self.clock.now();
        {
            let mut inner = self.lock();
            if inner.state.phase == SessionPhase::TimedOut {
                return false;
            }
            inner.state.last_activity = now;
            inner.state.warning_shown = false;
            inner.state.phase = SessionPhase::Active;
        }

        if let Some(on_activity) = self.callbacks().on_activity {
            on_activity();
        }
        true
    }

    /// Records a user interaction when idle detection is enabled.
    pub fn handle_activity(&self, _event: ActivityEvent) -> bool {
        if !self.lock().config.enable_idle_detection {
            return false;
        }
        self.record_activity()
    }

    /// Coming back to a visible page counts as activity and forces a check,
    /// so a long stay in the background is noticed immediately.
    pub fn visibility_changed(&self, visibility: Visibility) -> Option<SessionCheck> {
        {
            let mut inner = self.lock();
            if !inner.config.enable_visibility_detection {
                return None;
            }
            inner.state.visible = visibility == Visibility::Visible;
        }

        match visibility {
            Visibility::Visible => {
                self.record_activity();
                Some(self.check())
            }
            Visibility::Hidden => None,
        }
    }

    /// Resets the idle clock and calls `on_extend` (usually a token refresh).
    pub fn extend_session(&self) -> bool {
        if !self.record_activity() {
            return false;
        }
        if let Some(on_extend) = self.callbacks().on_extend {
            on_extend();
        }
        true
    }

    /// Evaluates token expiry and idleness, firing at most one transition.
    pub fn check(&self) -> SessionCheck {
        let now = self.clock.now();
        let token_expired = self.gate.is_expired();

        let outcome = {
            let mut inner = self.lock();
            if inner.state.phase == SessionPhase::TimedOut {
                return SessionCheck::Closed;
            }

            let idle = now - inner.state.last_activity;
            if token_expired || idle >= inner.config.idle_timeout {
                inner.state.phase = SessionPhase::TimedOut;
                let reason = if token_expired {
                    TimeoutReason::TokenExpired
                } else {
                    TimeoutReason::Idle
                };
                inner
                    .pending
                    .push(SecurityEvent::SessionTimedOut { reason, at: now });
                SessionCheck::TimedOut { reason }
            } else {
                let remaining = inner.config.idle_timeout - idle;
                if remaining <= inner.config.warning_time && !inner.state.warning_shown {
                    inner.state.warning_shown = true;
                    inner.state.phase = SessionPhase::Warned;
                    inner
                        .pending
                        .push(SecurityEvent::SessionWarning { remaining, at: now });
                    SessionCheck::Warning { remaining }
                } else {
                    SessionCheck::Running { remaining }
                }
            }
        };

        match outcome {
            SessionCheck::Warning { remaining } => {
                log::info!(
                    target: "coopguard",
                    "msg=\"session idle warning\" remaining_secs={}",
                    remaining.num_seconds()
                );
                if let Some(on_warning) = self.callbacks().on_warning {
                    on_warning(remaining);
                }
            }
            SessionCheck::TimedOut { reason } => {
                log::info!(
                    target: "coopguard",
                    "msg=\"session timed out\" reason={}",
                    reason.as_str()
                );
                if let Some(on_timeout) = self.callbacks().on_timeout {
                    on_timeout(reason);
                }
            }
            SessionCheck::Running { .. } | SessionCheck::Closed => {}
        }

        outcome
    }

    /// Idle time left before the timeout, never negative.
    pub fn remaining_time(&self) -> Duration {
        let now = self.clock.now();
        let inner = self.lock();
        let idle = now - inner.state.last_activity;
        (inner.config.idle_timeout - idle).max(Duration::zero())
    }

    /// Idle time left before the warning is due, never negative.
    pub fn time_until_warning(&self) -> Duration {
        let warning_time = self.lock().config.warning_time;
        (self.remaining_time() - warning_time).max(Duration::zero())
    }

    /// Idle time remains and the access token is still live.
    pub fn is_session_active(&self) -> bool {
        self.remaining_time() > Duration::zero() && self.gate.has_live_token()
    }

    /// Returns true while the session is inside its warning window.
    pub fn should_show_warning(&self) -> bool {
        let remaining = self.remaining_time();
        remaining > Duration::zero() && remaining <= self.lock().config.warning_time
    }

    /// Starts a new session after a fresh login.
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.state.last_activity = now;
        inner.state.warning_shown = false;
        inner.state.phase = SessionPhase::Active;
    }

    /// Ends the session without firing `on_timeout` and drops the token.
    pub fn logout(&self) {
        self.lock().state.phase = SessionPhase::TimedOut;
        self.gate.clear();
    }

    /// Replaces the config, sanitized. A running [`SessionMonitor`](super::SessionMonitor)
    /// picks up a new `check_interval` after its current wait.
    pub fn update_config(&self, config: SessionConfig) {
        self.lock().config = config.sanitized();
    }

    /// Sends queued warning and timeout events to the registered listeners.
    /// Returns how many were sent.
    pub async fn dispatch_pending(&self) -> usize {
        let pending = std::mem::take(&mut self.lock().pending);
        let sent = pending.len();
        for event in pending {
            events::dispatch(event).await;
        }
        sent
    }

    /// Sets the callbacks given in `callbacks`, keeping the others.
    pub fn update_callbacks(&self, callbacks: SessionCallbacks) {
        let mut current = self
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = std::mem::take(&mut *current).merge(callbacks);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn callbacks(&self) -> SessionCallbacks {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for SessionClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClock")
            .field("state", &self.state())
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
