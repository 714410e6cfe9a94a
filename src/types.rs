// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://rapiddns.io/api";
pub const DEFAULT_URL_PROXY: &str = "https://corsproxy.io/?";
pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    /// Real HTTP/SOCKS proxy handed to reqwest.
    pub proxy: Option<String>,
    /// Prefix proxy: the encoded target URL is appended to this string.
    pub url_proxy: String,
    pub use_url_proxy: bool,
    /// Requests per second against the API, `None` disables the limiter.
    pub rate_limit: Option<u32>,
    pub api_keys: Vec<String>,
    pub harvest: HarvestConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("rapidharvest/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
            url_proxy: DEFAULT_URL_PROXY.to_string(),
            use_url_proxy: false,
            rate_limit: Some(5),
            api_keys: Vec::new(),
            harvest: HarvestConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub max_records: usize,
    pub page_delay: Duration,
    pub deadline: Option<Duration>,
    pub extract_subdomains: bool,
    pub extract_ips: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_records: 1000,
            page_delay: Duration::from_millis(100),
            deadline: None,
            extract_subdomains: true,
            extract_ips: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<String>,
    pub subdomains_file: Option<String>,
    pub ips_file: Option<String>,
    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: None,
            subdomains_file: None,
            ips_file: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// One DNS finding as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Record {
    pub fn new(subdomain: Option<&str>, record_type: &str, value: &str) -> Self {
        Self {
            subdomain: subdomain.map(str::to_string),
            record_type: record_type.to_string(),
            value: value.to_string(),
            date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Keyword search, optionally filtered by `search_type`.
    Search,
    /// Free-form query, no type filter.
    Advanced,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Search => write!(f, "search"),
            QueryMode::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub mode: QueryMode,
    pub query: String,
    pub page: u32,
    pub page_size: usize,
    pub type_filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Unknown,
}

impl ExportStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "queued" => ExportStatus::Pending,
            "running" | "processing" => ExportStatus::Running,
            "completed" => ExportStatus::Completed,
            "failed" | "error" => ExportStatus::Failed,
            _ => ExportStatus::Unknown,
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportStatus::Pending => "pending",
            ExportStatus::Running => "running",
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
            ExportStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportJob {
    pub id: String,
    pub status: ExportStatus,
    pub progress_percent: u8,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestStats {
    pub total_records: usize,
    pub unique_subdomains: usize,
    pub unique_ips: usize,
    pub pages_fetched: u32,
    pub stop_reason: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestReport {
    pub query: String,
    pub mode: QueryMode,
    pub records: Vec<Record>,
    pub subdomains: Vec<String>,
    pub ips: Vec<String>,
    pub subnet_stats: Vec<String>,
    pub stats: HarvestStats,
    pub timestamp: String,
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("API error: {status} {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Remote error: {0}")]
    RemoteError(String),

    #[error("Empty input: {0}")]
    EmptyQuery(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}
