use std::sync::OnceLock;

use super::{EventTopic, Listener, SecurityEvent};

static REGISTRY: OnceLock<EventRegistry> = OnceLock::new();

struct Subscription {
    topic: Option<EventTopic>,
    listener: Box<dyn Listener>,
}

impl Subscription {
    fn wants(&self, event: &SecurityEvent) -> bool {
        self.topic.map_or(true, |topic| topic == event.topic())
    }
}

/// Listeners registered at startup, called in registration order.
///
/// A listener either gets every event ([`listen`](Self::listen)) or only
/// one [`EventTopic`] ([`listen_to`](Self::listen_to)).
pub struct EventRegistry {
    subscriptions: Vec<Subscription>,
}

impl EventRegistry {
    fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Receives every event.
    pub fn listen(&mut self, listener: impl Listener) -> &mut Self {
        self.subscribe(None, listener)
    }

    /// Receives only events of `topic`, e.g. lockouts for an alerting hook.
    pub fn listen_to(&mut self, topic: EventTopic, listener: impl Listener) -> &mut Self {
        self.subscribe(Some(topic), listener)
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    fn subscribe(&mut self, topic: Option<EventTopic>, listener: impl Listener) -> &mut Self {
        self.subscriptions.push(Subscription {
            topic,
            listener: Box::new(listener),
        });
        self
    }

    async fn dispatch(&self, event: &SecurityEvent) -> usize {
        let mut delivered = 0;
        for subscription in self.subscriptions.iter().filter(|s| s.wants(event)) {
            subscription.listener.handle(event).await;
            delivered += 1;
        }

        log::trace!(
            target: "coopguard",
            "msg=\"event dispatched\" event={} scope={} listeners={delivered}",
            event.name(),
            event.scope().unwrap_or("session")
        );
        delivered
    }
}

/// Registers event listeners once at startup.
///
/// Only the first call takes effect; later calls are logged and ignored.
///
/// ```rust,ignore
/// use coopguard::register_event_listeners;
/// use coopguard::events::EventTopic;
/// use coopguard::events::listeners::LoggingListener;
///
/// register_event_listeners(|registry| {
///     registry
///         .listen(LoggingListener::new())
///         .listen_to(EventTopic::RateLimit, LockoutAlert);
/// });
/// ```
pub fn register_event_listeners<F>(f: F)
where
    F: FnOnce(&mut EventRegistry),
{
    let mut registry = EventRegistry::new();
    f(&mut registry);
    let count = registry.len();
    if REGISTRY.set(registry).is_err() {
        log::warn!(
            target: "coopguard",
            "msg=\"event listeners already registered, ignoring\" listeners={count}"
        );
    }
}

/// Sends an event to every interested listener. No-op before registration.
pub async fn dispatch(event: SecurityEvent) {
    if let Some(registry) = REGISTRY.get() {
        registry.dispatch(&event).await;
    }
}
