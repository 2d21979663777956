//! Web session subsystem.
//!
//! # Data Flow
//! ```text
//! init(&LoginPolicy)  → adopt default expiry from sys.login.session_timeout
//! start()             → spawn sweeper (interval tick → drop expired sessions)
//! create/get/take     → DashMap<session id, SessionEntry>
//! stop()              → broadcast shutdown to sweeper
//! ```
//!
//! # Design Decisions
//! - The startup sequence only drives init/start/stop through `SessionManager`
//! - `get` refreshes expiry (sliding timeout)
//! - `stop` is idempotent and safe before `start`

pub mod store;

use thiserror::Error;

use crate::config::LoginPolicy;

pub use store::{SessionStore, SWEEP_INTERVAL};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session timeout must be non-zero")]
    ZeroTimeout,
    #[error("session manager already running")]
    AlreadyRunning,
}

/// Lifecycle hooks the startup sequence drives.
pub trait SessionManager: Send + Sync + 'static {
    fn init(&self, policy: &LoginPolicy) -> Result<(), SessionError>;

    /// Begin timeout tracking in the background.
    fn start(&self);

    fn stop(&self);
}
