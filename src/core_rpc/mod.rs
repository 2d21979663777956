//! Core service RPC.
//!
//! # Data Flow
//! ```text
//! {"method":"get_config","param":[]}
//!     → percent-encode → POST body to common.core-server-rpc (3s timeout)
//!     → {"data": {...}} → CoreConfig::merge
//! ```
//!
//! # Design Decisions
//! - One-shot request at startup, no retry: the core service may not be up yet
//! - Failure is a value (`CoreFetchOutcome::Unavailable`), never a startup error

pub mod client;

pub use client::{CoreClient, CoreFetchOutcome, CoreRpcError, CORE_RPC_TIMEOUT};
