//! Error types for reconforge-core

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using reconforge Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for reconforge
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(code(reconforge::config))]
    Config(String),

    #[error("Invalid target: {0}")]
    #[diagnostic(code(reconforge::target))]
    InvalidTarget(String),

    #[error(transparent)]
    #[diagnostic(code(reconforge::validation))]
    Validation(#[from] ValidationError),

    #[error("Tool not found: {0}")]
    #[diagnostic(code(reconforge::tool))]
    ToolNotFound(String),

    #[error("Preset not found: {0}")]
    #[diagnostic(code(reconforge::preset))]
    PresetNotFound(String),

    #[error("Session not found: {0}")]
    #[diagnostic(code(reconforge::session))]
    SessionNotFound(String),

    #[error("Unsupported export format: {0}")]
    #[diagnostic(code(reconforge::export))]
    UnsupportedFormat(String),

    #[error("Database error: {0}")]
    #[diagnostic(code(reconforge::database))]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(reconforge::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(reconforge::serde))]
    Serde(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    #[diagnostic(code(reconforge::toml))]
    Toml(#[from] toml::de::Error),
}

/// Rejection raised while checking a raw tool configuration against a
/// descriptor's option schema. Always produced before any subprocess runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{tool}: unknown option '{option}'")]
    UnknownOption { tool: String, option: String },

    #[error("{tool}: option '{option}' expects {expected}, got {got}")]
    InvalidOptionType {
        tool: String,
        option: String,
        expected: &'static str,
        got: String,
    },

    #[error("{tool}: option '{option}' value {value} outside [{min}, {max}]")]
    OutOfRange {
        tool: String,
        option: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{tool}: option '{option}' value '{value}' not in allowed set")]
    InvalidValue {
        tool: String,
        option: String,
        value: String,
    },
}

impl ValidationError {
    /// The tool the offending configuration was written for.
    pub fn tool(&self) -> &str {
        match self {
            Self::UnknownOption { tool, .. }
            | Self::InvalidOptionType { tool, .. }
            | Self::OutOfRange { tool, .. }
            | Self::InvalidValue { tool, .. } => tool,
        }
    }
}
