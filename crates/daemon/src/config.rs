//! Daemon configuration from `QUEUELINE_*` environment variables

use anyhow::{Context, Result};
use queueline_api_rpc::server::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use queueline_api_rpc::RpcServerConfig;
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "~/.queueline/queueline.db";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080/index.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc: RpcServerConfig,
    /// Organizer page share links are built from
    pub public_url: String,
    pub log_format: LogFormat,
    /// Daily rolling log files go here when set
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("QUEUELINE_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = shellexpand::tilde(&db_path).into_owned();

        let host = lookup("QUEUELINE_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string());
        let port = match lookup("QUEUELINE_RPC_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("QUEUELINE_RPC_PORT is not a port: {}", raw))?,
            None => DEFAULT_RPC_PORT,
        };

        let public_url =
            lookup("QUEUELINE_PUBLIC_URL").unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());

        let log_format = match lookup("QUEUELINE_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let log_dir = lookup("QUEUELINE_LOG_DIR")
            .filter(|dir| !dir.is_empty())
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir).into_owned()));

        Ok(Self {
            db_path,
            rpc: RpcServerConfig { host, port },
            public_url,
            log_format,
            log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert!(config.db_path.ends_with(".queueline/queueline.db"));
        assert!(!config.db_path.starts_with('~'));
        assert_eq!(config.rpc.host, "127.0.0.1");
        assert_eq!(config.rpc.port, 9630);
        assert_eq!(config.public_url, "http://localhost:8080/index.html");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("QUEUELINE_DB_PATH", "/tmp/q.db"),
            ("QUEUELINE_RPC_PORT", "7000"),
            ("QUEUELINE_LOG_FORMAT", "json"),
            ("QUEUELINE_LOG_DIR", "/var/log/queueline"),
        ])
        .unwrap();

        assert_eq!(config.db_path, "/tmp/q.db");
        assert_eq!(config.rpc.port, 7000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/queueline")));
    }

    #[test]
    fn test_bad_port() {
        let err = config(&[("QUEUELINE_RPC_PORT", "ninety")]).unwrap_err();
        assert!(err.to_string().contains("QUEUELINE_RPC_PORT"));
    }
}
