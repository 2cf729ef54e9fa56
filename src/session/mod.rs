//! Idle and token-expiry session timeout.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coopguard::session::{
//!     InMemoryTokenStore, SessionCallbacks, SessionClock, SessionConfig, SessionMonitor,
//!     TokenExpiryGate,
//! };
//!
//! let gate = TokenExpiryGate::new(Arc::new(InMemoryTokenStore::new()), Arc::new(SystemClock));
//! let session = Arc::new(
//!     SessionClock::with_system_clock(SessionConfig::default(), gate).with_callbacks(
//!         SessionCallbacks::new()
//!             .on_warning(|remaining| show_warning_dialog(remaining))
//!             .on_timeout(|_| redirect_to_login()),
//!     ),
//! );
//! let monitor = SessionMonitor::start(Arc::clone(&session));
//! ```

mod activity;
mod callbacks;
pub(crate) mod config;
mod file_store;
mod gate;
mod monitor;
mod timeout;
mod token;

pub use activity::{ActivityEvent, Visibility};
pub use callbacks::{NotifyCallback, SessionCallbacks, TimeoutCallback, WarningCallback};
pub use config::SessionConfig;
pub use file_store::FileTokenStore;
pub use gate::TokenExpiryGate;
pub use monitor::SessionMonitor;
pub use timeout::{SessionCheck, SessionClock, SessionPhase, SessionState};
pub use token::{InMemoryTokenStore, StoredToken, TokenStore, TokenType};
