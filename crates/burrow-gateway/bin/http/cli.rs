use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "BURROW_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "BURROW_BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "BURROW_FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "BURROW_DATABASE_DSN";
pub const FLUSH_INTERVAL_ENV: &str = "BURROW_FLUSH_INTERVAL_SECS";
pub const SUBMISSION_CAPACITY_ENV: &str = "BURROW_SUBMISSION_CAPACITY";
pub const FLUSH_ON_SHUTDOWN_ENV: &str = "BURROW_FLUSH_ON_SHUTDOWN";
pub const LOG_FORMAT_ENV: &str = "BURROW_LOG_FORMAT";
pub const CONFIG_ENV: &str = "BURROW_CONFIG";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Command line flags. Listen address, base URL and backend settings left
/// unset here may still come from the JSON config file.
#[derive(Debug, Parser)]
#[command(name = "burrow", about = "URL shortener HTTP server")]
pub struct CLI {
    #[arg(short = 'a', long, env = LISTEN_ADDR_ENV)]
    pub listen_addr: Option<SocketAddr>,

    #[arg(short = 'b', long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    #[arg(short = 'f', long, env = FILE_STORAGE_PATH_ENV)]
    pub file_storage_path: Option<PathBuf>,

    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    #[arg(long, env = FLUSH_INTERVAL_ENV, default_value_t = 5)]
    pub flush_interval_secs: u64,

    #[arg(long, env = SUBMISSION_CAPACITY_ENV, default_value_t = 10)]
    pub submission_capacity: usize,

    #[arg(long, env = FLUSH_ON_SHUTDOWN_ENV)]
    pub flush_on_shutdown: bool,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[arg(short = 'c', long, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,
}
