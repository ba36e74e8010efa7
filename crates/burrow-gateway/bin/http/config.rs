use crate::cli::{LogFormat, CLI, DEFAULT_BASE_URL, DEFAULT_LISTEN_ADDR};
use anyhow::Context;
use burrow_shortener::PipelineSettings;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings read from the JSON config file.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server_address: Option<String>,
    pub base_url: Option<String>,
    pub file_storage_path: Option<PathBuf>,
    pub database_dsn: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    File(PathBuf),
    Postgres(String),
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::InMemory => write!(f, "in-memory"),
            Backend::File(_) => write!(f, "file"),
            Backend::Postgres(_) => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub base_url: String,
    pub backend: Backend,
    pub pipeline: PipelineSettings,
    pub log_format: LogFormat,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ServerConfig {
    /// Merges flags and environment with the config file.
    ///
    /// Flags and environment win; the file only fills values left unset.
    pub fn resolve(cli: CLI, file: FileConfig) -> anyhow::Result<Self> {
        let listen_addr = match cli.listen_addr {
            Some(addr) => addr,
            None => non_empty(file.server_address)
                .as_deref()
                .unwrap_or(DEFAULT_LISTEN_ADDR)
                .parse()
                .context("invalid server_address in config file")?,
        };

        let base_url = non_empty(cli.base_url)
            .or_else(|| non_empty(file.base_url))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let database_dsn = non_empty(cli.database_dsn).or_else(|| non_empty(file.database_dsn));
        let file_storage_path = cli
            .file_storage_path
            .or(file.file_storage_path)
            .filter(|path| !path.as_os_str().is_empty());

        let backend = match (database_dsn, file_storage_path) {
            (Some(dsn), _) => Backend::Postgres(dsn),
            (None, Some(path)) => Backend::File(path),
            (None, None) => Backend::InMemory,
        };

        let pipeline = PipelineSettings::builder()
            .flush_interval(Duration::from_secs(cli.flush_interval_secs.max(1)))
            .submission_capacity(cli.submission_capacity.max(1))
            .flush_on_shutdown(cli.flush_on_shutdown)
            .build();

        Ok(Self {
            listen_addr,
            base_url,
            backend,
            pipeline,
            log_format: cli.log_format,
        })
    }
}
