//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → maintenance guard (503 outside the status pages in maintenance mode)
//!     → handlers.rs (status, maintenance report)
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};
