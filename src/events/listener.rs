use async_trait::async_trait;

use super::SecurityEvent;

/// Receives every dispatched [`SecurityEvent`].
///
/// ```rust,ignore
/// use coopguard::events::{Listener, SecurityEvent};
/// use async_trait::async_trait;
///
/// struct LockoutAlert;
///
/// #[async_trait]
/// impl Listener for LockoutAlert {
///     async fn handle(&self, event: &SecurityEvent) {
///         if let SecurityEvent::RateLimited { identifier, .. } = event {
///             // notify the co-op office
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    async fn handle(&self, event: &SecurityEvent);
}
