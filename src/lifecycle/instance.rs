//! Process-wide web app instance.
//!
//! At most one `WebApp` exists per process. `web_app()` returns it, creating
//! it on first use. `WebApp::try_new` creates and registers it explicitly and
//! refuses once it exists; neither path hands out an unregistered instance.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use thiserror::Error;

use crate::config::{load_config, AppPaths, WebConfig};
use crate::db::Database;
use crate::lifecycle::startup::{Sequencer, ServeReport, StartupError};
use crate::observability::{logging, metrics};
use crate::session::SessionManager;

static INSTANCE: OnceLock<WebApp> = OnceLock::new();

#[derive(Debug, Error, PartialEq, Eq)]
#[error("WebApp instance exists, can not create more than one")]
pub struct DuplicateInstanceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Running,
    Stopped,
}

pub struct WebApp {
    state: Mutex<LifecycleState>,
    config: Mutex<Option<WebConfig>>,
}

/// The shared instance, created on first call.
pub fn web_app() -> &'static WebApp {
    INSTANCE.get_or_init(WebApp::construct)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl WebApp {
    fn construct() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Uninitialized),
            config: Mutex::new(None),
        }
    }

    /// Create and register the shared instance; fails if it already exists.
    pub fn try_new() -> Result<&'static Self, DuplicateInstanceError> {
        INSTANCE
            .set(Self::construct())
            .map_err(|_| DuplicateInstanceError)?;
        Ok(web_app())
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    fn set_state(&self, state: LifecycleState) {
        *lock(&self.state) = state;
    }

    /// Snapshot of the loaded configuration.
    pub fn config(&self) -> Option<WebConfig> {
        lock(&self.config).clone()
    }

    /// Derive paths, load `<data>/etc/web.ini` and set up logging.
    pub fn init(&self, app_root: &Path, data_path: &Path) -> Result<(), StartupError> {
        self.set_state(LifecycleState::Initializing);
        let paths = AppPaths::new(app_root, data_path);
        let config_file = paths.config_file();

        match load_config(&config_file) {
            Ok(mut config) => {
                logging::init_logging(&config.common.log_level, Some(&paths.log_path));
                tracing::info!(path = %config_file.display(), "Configuration loaded");
                config.paths = paths;
                *lock(&self.config) = Some(config);
                Ok(())
            }
            Err(e) => {
                logging::init_logging("info", None);
                tracing::error!(path = %config_file.display(), error = %e, "Can not load configuration");
                self.set_state(LifecycleState::Uninitialized);
                Err(e.into())
            }
        }
    }

    /// Run the startup sequence and serve until `shutdown` completes.
    pub async fn run<D, S, F>(
        &self,
        db: D,
        sessions: Arc<S>,
        shutdown: F,
    ) -> Result<ServeReport, StartupError>
    where
        D: Database,
        S: SessionManager,
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(config) = self.config() else {
            tracing::error!("run called before init");
            return Err(StartupError::NotInitialized);
        };

        if config.observability.metrics_enabled {
            match config.observability.metrics_address.parse() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(_) => tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        self.set_state(LifecycleState::Running);
        let mut sequencer = Sequencer::new(config, db, sessions);
        let result = sequencer.run(shutdown).await;
        self.set_state(LifecycleState::Stopped);
        result
    }
}
