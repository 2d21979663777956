//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Instance (instance.rs):
//!     web_app() → init (paths, web.ini, logging) → run
//!
//! Startup (startup.rs):
//!     Core config → Database check → Mode → Session manager → Listener → Serve → Stop
//!
//! Shutdown (shutdown.rs):
//!     Broadcast to background tasks (session sweeper)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → end the serve loop
//! ```
//!
//! # Design Decisions
//! - Steps run one at a time on the calling task
//! - Listener binds last, traffic only when ready
//! - Every startup failure is a `StartupError` value with its own exit code

pub mod instance;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use instance::{web_app, DuplicateInstanceError, LifecycleState, WebApp};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{Sequencer, ServeReport, StartupError, StartupStage};
