use async_trait::async_trait;

use crate::events::{Listener, SecurityEvent};

/// Emits security events as tracing events. Requires the `tracing` feature.
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &SecurityEvent) {
        tracing::info!(
            target: "coopguard::events",
            event_name = event.name(),
            ?event,
            "security event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_tracing_listener_handle() {
        let event = SecurityEvent::AttemptsReset {
            scope: "login".to_owned(),
            identifier: "student:1".to_owned(),
            at: Utc::now(),
        };

        // should not panic
        TracingListener.handle(&event).await;
    }
}
