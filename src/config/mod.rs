//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! <data>/etc/web.ini
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WebConfig
//!     → core section merged from the core service RPC
//!     → sys section merged from the database (normal mode only)
//!     → frozen into Arc<WebConfig> before serving
//! ```
//!
//! # Design Decisions
//! - Only the startup sequence writes the config; request handlers read a frozen copy
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppMode, AppPaths, CommonConfig, CoreConfig, CoreConfigUpdate, LoginPolicy, ProtocolEndpoint,
    SystemConfig, WebConfig,
};
