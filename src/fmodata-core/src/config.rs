use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::ClientConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_port")]
    pub port: String,

    /// Per-request timeout for the service, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Shared secret for protected routes; empty disables the check
    #[serde(default)]
    pub auth_token: String,

    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    #[serde(default)]
    pub request_log: RequestLogConfig,

    /// Remote FileMaker database; OData routes are disabled without it
    #[serde(default)]
    pub odata: Option<OdataSettings>,

    // CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_port() -> String {
    "8080".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_assets_dir() -> String {
    "./assets".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestLogConfig {
    /// SQLite database file holding the request_logs table
    #[serde(default = "default_log_path")]
    pub path: String,
}

fn default_log_path() -> String {
    "./data/requests.db".to_string()
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct OdataSettings {
    pub host: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Seconds; 0 disables the client timeout
    #[serde(default = "default_odata_timeout")]
    pub timeout: u64,
}

fn default_odata_timeout() -> u64 {
    30
}

impl OdataSettings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(
            self.host.clone(),
            self.database.clone(),
            self.username.clone(),
            self.password.clone(),
        )
        .with_timeout(Duration::from_secs(self.timeout))
    }
}

impl std::fmt::Debug for OdataSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdataSettings")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_cors_enabled() -> bool {
    false
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_cors_enabled(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Write this configuration as pretty JSON, e.g. to seed a missing file
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn auth_enabled(&self) -> bool {
        !self.auth_token.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            port: default_port(),
            timeout: default_timeout(),
            auth_token: String::new(),
            assets_dir: default_assets_dir(),
            request_log: RequestLogConfig::default(),
            odata: None,
            cors: CorsConfig::default(),
        }
    }
}
