//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! CommonConfig (ip, port)
//!     → listener.rs (bind, log reachable URL)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bind happens before session timeout tracking starts
//! - Bind failure is reported, never panicked on

pub mod listener;

pub use listener::{reachable_url, Listener, ListenerError};
