//! Configuration schema definitions.
//!
//! `WebConfig` is filled in waves: the local `web.ini` file, then the `core`
//! section merged from the core service, then the `sys` section merged from
//! the database (or reset to defaults in maintenance mode).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Operating mode chosen once per run from the database readiness flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    #[default]
    Normal,
    /// The persistent store needs schema creation or upgrade.
    Maintenance,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Normal => "normal",
            AppMode::Maintenance => "maintenance",
        }
    }
}

/// Root configuration for the web server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct WebConfig {
    /// Listener and core endpoint settings.
    pub common: CommonConfig,

    /// Persistent store location.
    pub database: DatabaseConfig,

    /// Metrics exporter settings.
    pub observability: ObservabilityConfig,

    /// Values reported by the core service.
    #[serde(skip)]
    pub core: CoreConfig,

    /// System configuration persisted in the database.
    #[serde(skip)]
    pub sys: SystemConfig,

    #[serde(skip)]
    pub app_mode: AppMode,

    #[serde(skip)]
    pub paths: AppPaths,
}

impl WebConfig {
    /// Replace the system section with persisted values, or with defaults
    /// when `None` (maintenance mode).
    pub fn update_sys(&mut self, sys: Option<SystemConfig>) {
        self.sys = sys.unwrap_or_default();
    }
}

/// `[common]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CommonConfig {
    /// Bind address, e.g. "0.0.0.0".
    pub ip: String,

    /// Bind port.
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// JSON-RPC endpoint of the core service.
    pub core_server_rpc: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            port: 7190,
            log_level: "info".to_string(),
            core_server_rpc: "http://127.0.0.1:52080/rpc".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DatabaseConfig {
    /// SQLite file, relative paths resolve against the data directory.
    pub sqlite_file: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_file: "db/teleport.db".to_string(),
        }
    }
}

/// `[observability]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ObservabilityConfig {
    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9190".to_string(),
        }
    }
}

/// Filesystem layout derived from the application root and data directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AppPaths {
    pub app_path: PathBuf,
    pub static_path: PathBuf,
    pub template_path: PathBuf,
    pub res_path: PathBuf,
    pub data_path: PathBuf,
    pub cfg_path: PathBuf,
    pub log_path: PathBuf,
}

impl AppPaths {
    pub fn new(app_root: &Path, data_path: &Path) -> Self {
        Self {
            app_path: app_root.to_path_buf(),
            static_path: app_root.join("static"),
            template_path: app_root.join("view"),
            res_path: app_root.join("res"),
            data_path: data_path.to_path_buf(),
            cfg_path: data_path.join("etc"),
            log_path: data_path.join("log"),
        }
    }

    /// Location of `web.ini`.
    pub fn config_file(&self) -> PathBuf {
        self.cfg_path.join("web.ini")
    }
}

/// One protocol endpoint managed by the core service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ProtocolEndpoint {
    pub enable: bool,
    pub port: u16,
}

/// Runtime configuration owned by the core service.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CoreConfig {
    /// Set once a `get_config` response has been merged.
    pub detected: bool,
    pub ssh: ProtocolEndpoint,
    pub rdp: ProtocolEndpoint,
    pub telnet: ProtocolEndpoint,
    pub replay_path: Option<String>,
    pub web_server_rpc: Option<String>,
    pub version: Option<String>,
}

/// Partial core configuration as carried in the RPC `data` field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoreConfigUpdate {
    pub ssh: Option<ProtocolEndpoint>,
    pub rdp: Option<ProtocolEndpoint>,
    pub telnet: Option<ProtocolEndpoint>,
    pub replay_path: Option<String>,
    pub web_server_rpc: Option<String>,
    pub version: Option<String>,
}

impl CoreConfig {
    /// Overwrite the fields present in `update`, leave the rest alone.
    pub fn merge(&mut self, update: CoreConfigUpdate) {
        if let Some(ssh) = update.ssh {
            self.ssh = ssh;
        }
        if let Some(rdp) = update.rdp {
            self.rdp = rdp;
        }
        if let Some(telnet) = update.telnet {
            self.telnet = telnet;
        }
        if update.replay_path.is_some() {
            self.replay_path = update.replay_path;
        }
        if update.web_server_rpc.is_some() {
            self.web_server_rpc = update.web_server_rpc;
        }
        if update.version.is_some() {
            self.version = update.version;
        }
        self.detected = true;
    }
}

/// System configuration persisted in the database.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub login: LoginPolicy,
    pub password: PasswordPolicy,
    pub session: SessionPolicy,
    pub smtp: SmtpConfig,
    pub storage: StorageConfig,
}

/// Login and web session policy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginPolicy {
    /// Web session lifetime in minutes.
    pub session_timeout: u64,
    /// Failed attempts before lockout, 0 disables lockout.
    pub retry: u32,
    /// Lockout duration in minutes.
    pub lock_timeout: u64,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            session_timeout: 60,
            retry: 0,
            lock_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub find: bool,
    pub strong: bool,
    /// Password expiry in days, 0 = never.
    pub timeout: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            find: true,
            strong: true,
            timeout: 0,
        }
    }
}

/// Remote session policy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Idle remote sessions are disconnected after this many minutes.
    pub noop_timeout: u64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self { noop_timeout: 15 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub ssl: bool,
    pub sender: String,
}

/// Log and recording retention.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Days to keep logs, 0 = forever.
    pub keep_log: u32,
    /// Days to keep recordings, 0 = forever.
    pub keep_record: u32,
    pub cleanup_hour: u8,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            keep_log: 0,
            keep_record: 0,
            cleanup_hour: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_merge_keeps_absent_fields() {
        let mut core = CoreConfig {
            replay_path: Some("/var/replay".into()),
            ..Default::default()
        };
        core.merge(CoreConfigUpdate {
            ssh: Some(ProtocolEndpoint { enable: true, port: 52189 }),
            ..Default::default()
        });

        assert!(core.detected);
        assert_eq!(core.ssh.port, 52189);
        assert!(!core.rdp.enable);
        assert_eq!(core.replay_path.as_deref(), Some("/var/replay"));
    }

    #[test]
    fn test_update_sys_none_resets_defaults() {
        let mut config = WebConfig::default();
        config.sys.login.session_timeout = 5;
        config.update_sys(None);
        assert_eq!(config.sys, SystemConfig::default());
    }

    #[test]
    fn test_paths_layout() {
        let paths = AppPaths::new(Path::new("/opt/www"), Path::new("/opt/data"));
        assert_eq!(paths.config_file(), Path::new("/opt/data/etc/web.ini"));
        assert_eq!(paths.template_path, Path::new("/opt/www/view"));
    }
}
