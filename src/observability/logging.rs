//! Structured logging.
//!
//! Stdout always; `<data>/log/tpweb.log` as well when it can be opened.
//! `RUST_LOG` overrides the configured level.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "tpweb.log";

/// Filter directive for a configured level such as "info".
pub fn default_directive(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    format!("teleport_web={level},tower_http={level}")
}

fn open_log_file(log_dir: &Path) -> std::io::Result<(File, PathBuf)> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Initialize the global subscriber. Safe to call once per process; later
/// calls are ignored.
pub fn init_logging(level: &str, log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let mut file_error = None;
    let file_layer = match log_dir.map(open_log_file) {
        Some(Ok((file, _))) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        ),
        Some(Err(e)) => {
            file_error = Some(e);
            None
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        if let Some(e) = file_error {
            tracing::warn!(error = %e, "Log file unavailable, logging to stdout only");
        }
    }
}
