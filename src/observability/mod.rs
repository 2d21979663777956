//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, stdout + log file)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → <data>/log/tpweb.log
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
