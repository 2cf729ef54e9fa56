use std::fmt;
use std::sync::Arc;

use chrono::Duration;

use crate::events::TimeoutReason;

/// Receives the idle time left when the warning fires.
pub type WarningCallback = Arc<dyn Fn(Duration) + Send + Sync>;
/// Receives why the session ended.
pub type TimeoutCallback = Arc<dyn Fn(TimeoutReason) + Send + Sync>;
/// Argument-less notification for extend and activity.
pub type NotifyCallback = Arc<dyn Fn() + Send + Sync>;

/// Hooks the UI layer registers on a [`SessionClock`](super::SessionClock).
///
/// Callbacks run synchronously on whichever task triggered them, after the
/// clock's internal lock has been released.
#[derive(Clone, Default)]
pub struct SessionCallbacks {
    pub(crate) on_warning: Option<WarningCallback>,
    pub(crate) on_timeout: Option<TimeoutCallback>,
    pub(crate) on_extend: Option<NotifyCallback>,
    pub(crate) on_activity: Option<NotifyCallback>,
}

impl SessionCallbacks {
    /// No callbacks set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per idle stretch with the time left before timeout.
    #[must_use]
    pub fn on_warning(mut self, f: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.on_warning = Some(Arc::new(f));
        self
    }

    /// Called at most once per session, when it times out.
    #[must_use]
    pub fn on_timeout(mut self, f: impl Fn(TimeoutReason) + Send + Sync + 'static) -> Self {
        self.on_timeout = Some(Arc::new(f));
        self
    }

    /// Called by `extend_session`, typically to refresh the token.
    #[must_use]
    pub fn on_extend(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_extend = Some(Arc::new(f));
        self
    }

    /// Called whenever activity resets the idle clock.
    #[must_use]
    pub fn on_activity(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_activity = Some(Arc::new(f));
        self
    }

    /// Overlays the callbacks set in `other`, keeping ours where it has none.
    #[must_use]
    pub fn merge(self, other: SessionCallbacks) -> Self {
        Self {
            on_warning: other.on_warning.or(self.on_warning),
            on_timeout: other.on_timeout.or(self.on_timeout),
            on_extend: other.on_extend.or(self.on_extend),
            on_activity: other.on_activity.or(self.on_activity),
        }
    }
}

impl fmt::Debug for SessionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCallbacks")
            .field("on_warning", &self.on_warning.is_some())
            .field("on_timeout", &self.on_timeout.is_some())
            .field("on_extend", &self.on_extend.is_some())
            .field("on_activity", &self.on_activity.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_callbacks() {
        let base = SessionCallbacks::new().on_warning(|_| {}).on_extend(|| {});
        let merged = base.merge(SessionCallbacks::new().on_timeout(|_| {}));

        assert!(merged.on_warning.is_some());
        assert!(merged.on_timeout.is_some());
        assert!(merged.on_extend.is_some());
        assert!(merged.on_activity.is_none());
    }

    #[test]
    fn test_debug_hides_closures() {
        let callbacks = SessionCallbacks::new().on_activity(|| {});
        let debug = format!("{callbacks:?}");
        assert!(debug.contains("on_activity: true"));
        assert!(debug.contains("on_warning: false"));
    }
}
