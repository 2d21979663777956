//! Startup orchestration.
//!
//! # Stages
//! ```text
//! Init → CoreConfigFetched → DbChecked → NormalMode | MaintenanceMode
//!      → SessionManagerReady → ListenerBound → Serving → Stopped
//!
//! DbChecked / SessionManagerReady / ListenerBound may end in Failed instead.
//! ```
//!
//! # Failure policy
//! - Core config fetch: logged at warn, startup continues
//! - System config load in normal mode: logged at warn, defaults are used
//! - Database init, session manager init, listener bind: logged at error,
//!   startup aborts with a `StartupError`
//! - Serve loop error or panic: logged at error, shutdown continues normally
//!
//! The session manager is stopped on every path that initialized it,
//! including a bind failure before `start` was called.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{AppMode, ConfigError, WebConfig};
use crate::core_rpc::{CoreClient, CoreFetchOutcome};
use crate::db::{Database, DatabaseError, DbReadiness};
use crate::http::HttpServer;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;
use crate::session::{SessionError, SessionManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    Init,
    CoreConfigFetched,
    DbChecked,
    NormalMode,
    MaintenanceMode,
    SessionManagerReady,
    ListenerBound,
    Serving,
    Stopped,
    Failed,
}

/// Why the service did not come up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("can not load configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("web app used before init")]
    NotInitialized,
    #[error("can not initialize database interface: {0}")]
    Database(#[source] DatabaseError),
    #[error("can not initialize session manager: {0}")]
    SessionManager(#[from] SessionError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

impl StartupError {
    /// Process exit status for this failure. Serving and then stopping exits 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::Config(_) | StartupError::NotInitialized => 2,
            StartupError::Database(_) => 3,
            StartupError::SessionManager(_) => 4,
            StartupError::Listener(_) => 5,
        }
    }

    /// Short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StartupError::Config(_) => "config",
            StartupError::NotInitialized => "not_initialized",
            StartupError::Database(_) => "database",
            StartupError::SessionManager(_) => "session_manager",
            StartupError::Listener(_) => "listener",
        }
    }
}

/// What happened during a run that reached the serve loop.
#[derive(Debug)]
pub struct ServeReport {
    pub mode: AppMode,
    pub core: CoreFetchOutcome,
    pub readiness: DbReadiness,
    /// The frozen configuration the server ran with.
    pub config: Arc<WebConfig>,
    pub local_addr: SocketAddr,
    /// Set when the serve loop ended with an error or panic.
    pub serve_error: Option<String>,
}

/// Drives the startup sequence from a loaded configuration to a stopped server.
pub struct Sequencer<D, S> {
    config: WebConfig,
    core: CoreClient,
    db: D,
    sessions: Arc<S>,
    stages: Vec<StartupStage>,
}

impl<D: Database, S: SessionManager> Sequencer<D, S> {
    pub fn new(config: WebConfig, db: D, sessions: Arc<S>) -> Self {
        let core = CoreClient::new(config.common.core_server_rpc.clone());
        Self {
            config,
            core,
            db,
            sessions,
            stages: Vec::new(),
        }
    }

    /// Replace the core RPC client.
    pub fn with_core_client(mut self, core: CoreClient) -> Self {
        self.core = core;
        self
    }

    /// Current stage, `None` before `run`.
    pub fn stage(&self) -> Option<StartupStage> {
        self.stages.last().copied()
    }

    /// Every stage entered so far, in order.
    pub fn stages(&self) -> &[StartupStage] {
        &self.stages
    }

    /// Configuration as the sequence has built it so far.
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    fn enter(&mut self, stage: StartupStage) {
        tracing::debug!(stage = ?stage, "Startup stage");
        self.stages.push(stage);
    }

    fn abort(&mut self, err: StartupError) -> StartupError {
        tracing::error!(stage = ?self.stage(), reason = err.as_label(), error = %err, "Startup aborted");
        metrics::record_startup_abort(err.as_label());
        self.enter(StartupStage::Failed);
        err
    }

    /// Run the whole sequence. Returns once the serve loop has ended and the
    /// session manager has been stopped, or at the first fatal step.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<ServeReport, StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Web server starting ...");
        self.enter(StartupStage::Init);

        // 1. Core service config, best effort.
        let core = self.core.fetch_into(&mut self.config).await;
        self.enter(StartupStage::CoreConfigFetched);

        // 2. Database interface.
        if let Err(e) = self.db.init() {
            return Err(self.abort(StartupError::Database(e)));
        }
        self.enter(StartupStage::DbChecked);

        // 3. Mode decision from readiness flags only.
        let readiness = self.db.readiness();
        let mode = if readiness.needs_maintenance() {
            self.config.update_sys(None);
            AppMode::Maintenance
        } else {
            match self.db.load_system_config() {
                Ok(sys) => self.config.update_sys(Some(sys)),
                Err(e) => {
                    tracing::warn!(error = %e, "Can not load system config from database, using defaults");
                    self.config.update_sys(None);
                }
            }
            AppMode::Normal
        };
        self.config.app_mode = mode;
        metrics::record_app_mode(mode);
        match mode {
            AppMode::Normal => {
                tracing::info!("Database ready, running in normal mode");
                self.enter(StartupStage::NormalMode);
            }
            AppMode::Maintenance => {
                tracing::warn!(
                    need_create = readiness.need_create,
                    need_upgrade = readiness.need_upgrade,
                    "Database needs maintenance, running in maintenance mode"
                );
                self.enter(StartupStage::MaintenanceMode);
            }
        }

        // 4. Session manager.
        if let Err(e) = self.sessions.init(&self.config.sys.login) {
            return Err(self.abort(e.into()));
        }
        self.enter(StartupStage::SessionManagerReady);

        // 5. Listener.
        let listener = match Listener::bind(&self.config.common).await {
            Ok(listener) => listener,
            Err(e) => {
                self.sessions.stop();
                return Err(self.abort(e.into()));
            }
        };
        self.enter(StartupStage::ListenerBound);

        // 6. Session timeout tracking.
        self.sessions.start();

        // 7. Serve until shutdown. Config is frozen from here on.
        let config = Arc::new(self.config.clone());
        let local_addr = listener.local_addr();
        let server = HttpServer::new(config.clone(), readiness);
        self.enter(StartupStage::Serving);

        let serve_error = self.serve_then_stop(server.run(listener.into_inner(), shutdown)).await;

        Ok(ServeReport {
            mode,
            core,
            readiness,
            config,
            local_addr,
            serve_error,
        })
    }

    /// Steps 7 and 8: drive the serve loop to completion, then tear down.
    async fn serve_then_stop<F>(&mut self, serve: F) -> Option<String>
    where
        F: Future<Output = io::Result<()>> + Send + 'static,
    {
        let serve_error = serve_to_completion(serve).await;

        self.sessions.stop();
        self.enter(StartupStage::Stopped);
        tracing::info!("Web server stopped");
        serve_error
    }
}

/// Run the serve loop on its own task. An error returned by the server or a
/// panic inside the task is logged and reported instead of propagated.
async fn serve_to_completion<F>(serve: F) -> Option<String>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    match tokio::spawn(serve).await {
        Ok(Ok(())) => None,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Serve loop failed");
            Some(e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Serve loop panicked");
            Some(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoginPolicy, SystemConfig};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeDb {
        fail_init: bool,
        need_create: bool,
        need_upgrade: bool,
        fail_load: bool,
    }

    impl Database for FakeDb {
        fn init(&mut self) -> Result<(), DatabaseError> {
            if self.fail_init {
                return Err(DatabaseError::Open {
                    path: "fake".into(),
                    reason: "denied".into(),
                });
            }
            Ok(())
        }

        fn need_create(&self) -> bool {
            self.need_create
        }

        fn need_upgrade(&self) -> bool {
            self.need_upgrade
        }

        fn load_system_config(&self) -> Result<SystemConfig, DatabaseError> {
            if self.fail_load {
                return Err(DatabaseError::Query("boom".into()));
            }
            let mut sys = SystemConfig::default();
            sys.login.session_timeout = 20;
            Ok(sys)
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
        fail_init: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SessionManager for Recorder {
        fn init(&self, _policy: &LoginPolicy) -> Result<(), SessionError> {
            self.calls.lock().unwrap().push("init");
            if self.fail_init {
                return Err(SessionError::ZeroTimeout);
            }
            Ok(())
        }

        fn start(&self) {
            self.calls.lock().unwrap().push("start");
        }

        fn stop(&self) {
            self.calls.lock().unwrap().push("stop");
        }
    }

    fn offline_config() -> WebConfig {
        let mut config = WebConfig::default();
        config.common.ip = "127.0.0.1".into();
        config.common.core_server_rpc = "http://127.0.0.1:1/rpc".into();
        config
    }

    fn sequencer(db: FakeDb, sessions: Arc<Recorder>) -> Sequencer<FakeDb, Recorder> {
        Sequencer::new(offline_config(), db, sessions)
            .with_core_client(CoreClient::with_timeout("http://127.0.0.1:1/rpc", Duration::from_millis(500)))
    }

    #[tokio::test]
    async fn test_database_failure_aborts_before_sessions() {
        let sessions = Arc::new(Recorder::default());
        let mut seq = sequencer(FakeDb { fail_init: true, ..Default::default() }, sessions.clone());

        let err = seq.run(std::future::ready(())).await.unwrap_err();

        assert!(matches!(err, StartupError::Database(_)));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            seq.stages(),
            &[StartupStage::Init, StartupStage::CoreConfigFetched, StartupStage::Failed]
        );
        assert!(sessions.calls().is_empty());
    }

    fn free_port() -> u16 {
        let spare = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        spare.local_addr().unwrap().port()
    }

    async fn crashing_server() -> io::Result<()> {
        panic!("serve loop crashed")
    }

    async fn failing_server() -> io::Result<()> {
        Err(io::Error::other("accept failed"))
    }

    #[tokio::test]
    async fn test_system_config_failure_keeps_normal_mode() {
        let sessions = Arc::new(Recorder::default());
        let mut seq = sequencer(FakeDb { fail_load: true, ..Default::default() }, sessions.clone());
        seq.config.common.port = free_port();
        seq.config.sys.login.session_timeout = 5;

        let report = seq.run(std::future::ready(())).await.unwrap();

        assert_eq!(report.mode, AppMode::Normal);
        assert_eq!(report.config.sys, SystemConfig::default());
        assert_eq!(sessions.calls(), vec!["init", "start", "stop"]);
        assert!(seq.stages().contains(&StartupStage::Serving));
        assert_eq!(seq.stage(), Some(StartupStage::Stopped));
    }

    #[tokio::test]
    async fn test_serve_panic_still_stops_sessions() {
        let sessions = Arc::new(Recorder::default());
        let mut seq = sequencer(FakeDb::default(), sessions.clone());

        let serve_error = seq.serve_then_stop(crashing_server()).await;

        assert!(serve_error.is_some());
        assert_eq!(sessions.calls(), vec!["stop"]);
        assert_eq!(seq.stage(), Some(StartupStage::Stopped));
    }

    #[tokio::test]
    async fn test_serve_error_still_stops_sessions() {
        let sessions = Arc::new(Recorder::default());
        let mut seq = sequencer(FakeDb::default(), sessions.clone());

        let serve_error = seq.serve_then_stop(failing_server()).await;

        assert_eq!(serve_error.as_deref(), Some("accept failed"));
        assert_eq!(sessions.calls(), vec!["stop"]);
    }

    #[tokio::test]
    async fn test_maintenance_skips_system_config_load() {
        let sessions = Arc::new(Recorder { fail_init: true, ..Default::default() });
        let db = FakeDb { need_upgrade: true, fail_load: true, ..Default::default() };
        let mut seq = sequencer(db, sessions.clone());

        let err = seq.run(std::future::ready(())).await.unwrap_err();

        // load_system_config would have failed; reaching the session manager proves it was skipped
        assert!(matches!(err, StartupError::SessionManager(_)));
        assert_eq!(seq.config().app_mode, AppMode::Maintenance);
        assert_eq!(seq.config().sys, SystemConfig::default());
        assert!(seq.stages().contains(&StartupStage::MaintenanceMode));
        assert_eq!(sessions.calls(), vec!["init"]);
    }

    #[tokio::test]
    async fn test_bind_failure_stops_initialized_sessions() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let sessions = Arc::new(Recorder::default());
        let mut seq = sequencer(FakeDb::default(), sessions.clone());
        seq.config.common.port = taken.local_addr().unwrap().port();

        let err = seq.run(std::future::ready(())).await.unwrap_err();

        assert!(matches!(err, StartupError::Listener(_)));
        assert_eq!(err.exit_code(), 5);
        assert_eq!(sessions.calls(), vec!["init", "stop"]);
        assert_eq!(seq.stage(), Some(StartupStage::Failed));
    }

    #[tokio::test]
    async fn test_normal_run_serves_and_stops() {
        let sessions = Arc::new(Recorder::default());
        let mut seq = sequencer(FakeDb::default(), sessions.clone());
        seq.config.common.port = free_port();

        let report = seq.run(std::future::ready(())).await.unwrap();

        assert_eq!(report.mode, AppMode::Normal);
        assert!(!report.core.is_merged());
        assert_eq!(report.config.sys.login.session_timeout, 20);
        assert!(report.serve_error.is_none());
        assert_eq!(sessions.calls(), vec!["init", "start", "stop"]);
        assert_eq!(
            seq.stages(),
            &[
                StartupStage::Init,
                StartupStage::CoreConfigFetched,
                StartupStage::DbChecked,
                StartupStage::NormalMode,
                StartupStage::SessionManagerReady,
                StartupStage::ListenerBound,
                StartupStage::Serving,
                StartupStage::Stopped,
            ]
        );
    }
}
