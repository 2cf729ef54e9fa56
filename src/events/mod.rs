//! Security events for lockouts and session timeouts.
//!
//! Rate limiters and the session monitor always fire events. With no
//! listeners registered they cost nothing.
//!
//! ```rust,ignore
//! use coopguard::register_event_listeners;
//! use coopguard::events::listeners::LoggingListener;
//!
//! register_event_listeners(|registry| {
//!     registry.listen(LoggingListener::new());
//! });
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::{EventTopic, SecurityEvent, TimeoutReason};
pub use listener::Listener;
pub use registry::{EventRegistry, dispatch, register_event_listeners};
