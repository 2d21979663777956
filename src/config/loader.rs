//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::WebConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<WebConfig, ConfigError> {
    let config: WebConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from `web.ini`.
pub fn load_config(path: &Path) -> Result<WebConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config = parse_config(
            r#"
[common]
ip = "127.0.0.1"
port = 5180
log-level = "debug"
core-server-rpc = "http://127.0.0.1:52080/rpc"

[database]
sqlite-file = "/tmp/tp.db"
"#,
        )
        .unwrap();

        assert_eq!(config.common.port, 5180);
        assert_eq!(config.common.log_level, "debug");
        assert_eq!(config.database.sqlite_file, "/tmp/tp.db");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.common.port, 7190);
        assert_eq!(config.common.ip, "0.0.0.0");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[common]\nport = 0\nip = \"nope\"\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/etc/web.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
