//! Configuration types for the reconforge engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// HTTP API bind settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Subprocess execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Where screenshot tools drop their artifacts
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
}

fn default_screenshot_dir() -> PathBuf {
    data_dir().join("screenshots")
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

/// Session persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_session_age")]
    pub max_session_age_days: i64,
}

fn default_db_path() -> PathBuf {
    data_dir().join("sessions.db")
}

fn default_session_age() -> i64 {
    30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_session_age_days: default_session_age(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".reconforge")
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    /// Executable path overrides, keyed by tool name
    #[serde(default)]
    pub tool_paths: BTreeMap<String, String>,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from default locations with cascade:
    /// 1. ./reconforge.toml (local override)
    /// 2. ~/.reconforge/config.toml (global defaults)
    /// 3. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(config) = Self::from_file("reconforge.toml") {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let global_path = home.join(".reconforge").join("config.toml");
            if let Ok(config) = Self::from_file(&global_path) {
                return config;
            }
        }

        Self::default()
    }
}
