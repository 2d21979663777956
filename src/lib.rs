//! Web front-end bootstrap for the remote-access management server.

pub mod config;
pub mod core_rpc;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod session;

pub use config::schema::WebConfig;
pub use http::HttpServer;
pub use lifecycle::{web_app, Sequencer, Shutdown, StartupError, WebApp};
