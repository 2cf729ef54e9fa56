use std::sync::Arc;

use tokio::task::JoinHandle;

use super::timeout::{SessionCheck, SessionClock};

/// Runs [`SessionClock::check`] every `check_interval` on a background task
/// and sends the events each check queues.
///
/// The interval is read again before every wait, so
/// [`SessionClock::update_config`] takes effect from the next check on. The
/// task stops by itself once the session times out or is logged out.
/// Dropping the monitor stops it as well.
#[derive(Debug)]
pub struct SessionMonitor {
    handle: Option<JoinHandle<()>>,
}

impl SessionMonitor {
    /// Must be called from within a tokio runtime.
    pub fn start(session: Arc<SessionClock>) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(check_period(&session)).await;

                let outcome = session.check();
                // also flushes transitions caused outside this loop
                session.dispatch_pending().await;

                if matches!(outcome, SessionCheck::TimedOut { .. } | SessionCheck::Closed) {
                    break;
                }
            }
            log::debug!(target: "coopguard", "msg=\"session monitor stopped\"");
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Returns true until the task has stopped or been destroyed.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the background checks. Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn check_period(session: &SessionClock) -> std::time::Duration {
    session
        .config()
        .check_interval
        .to_std()
        .ok()
        .filter(|period| !period.is_zero())
        .unwrap_or(std::time::Duration::from_secs(60))
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.destroy();
    }
}
