//! teleport-web
//!
//! Web front-end of the remote-access management server.
//!
//! # Startup
//!
//! ```text
//!   web.ini ──▶ WebApp::init ──▶ core RPC (best effort) ──▶ database check
//!                                                              │
//!                                   ┌──── need create/upgrade ─┴─ ready ────┐
//!                                   ▼                                       ▼
//!                            maintenance mode                 normal mode + system config
//!                                   └──────────────┬────────────────────────┘
//!                                                  ▼
//!                         session manager init ──▶ bind ──▶ sessions start
//!                                                  ──▶ serve ──▶ sessions stop
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use teleport_web::db::SqliteDatabase;
use teleport_web::lifecycle::{shutdown_signal, web_app};
use teleport_web::session::SessionStore;

#[derive(Parser)]
#[command(name = "teleport-web")]
#[command(about = "Web front-end of the remote-access management server", long_about = None)]
struct Cli {
    /// Application root holding static/, view/ and res/.
    #[arg(long, env = "TP_WEB_APP_ROOT", default_value = ".")]
    app_root: PathBuf,

    /// Data directory holding etc/web.ini, log/ and db/.
    #[arg(long, env = "TP_WEB_DATA_PATH", default_value = "./data")]
    data_path: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let app = web_app();

    if let Err(e) = app.init(&cli.app_root, &cli.data_path) {
        return ExitCode::from(e.exit_code());
    }
    let Some(config) = app.config() else {
        return ExitCode::from(2);
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        ip = %config.common.ip,
        port = config.common.port,
        "teleport-web starting"
    );

    let db = SqliteDatabase::new(&config.paths.data_path, &config.database.sqlite_file);
    let sessions = Arc::new(SessionStore::default());

    match app.run(db, sessions, shutdown_signal()).await {
        Ok(report) => {
            tracing::info!(mode = report.mode.as_str(), "Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => ExitCode::from(e.exit_code()),
    }
}
