use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Where the recommendation cache slot is persisted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    File,
    Redis,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Recommendation cache backend
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,

    /// Root directory for the file cache backend
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Redis connection URL, used by the redis cache backend
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Gemini API key
    pub gemini_api_key: String,

    /// Gemini API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Gemini model name
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Maximum age of a cached recommendation batch, in seconds
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,

    /// Number of recommendations kept per batch
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,

    /// Number of book search results returned
    #[serde(default = "default_search_result_limit")]
    pub search_result_limit: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::File
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".clover-cache")
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_freshness_window_secs() -> u64 {
    3600
}

fn default_max_recommendations() -> usize {
    4
}

fn default_search_result_limit() -> usize {
    5
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
