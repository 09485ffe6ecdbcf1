//! Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::intent::ResolvedIntent;
use crate::tools::{OptionSpec, ToolCategory, ToolDescriptor};

/// Body for `POST /api/v1/scan/execute`
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteScanRequest {
    pub target: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub tool_configs: HashMap<String, Map<String, Value>>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub max_parallel: Option<usize>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Body for `POST /api/v1/tools/validate-config`
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateConfigRequest {
    pub tool_name: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// Response for config validation
#[derive(Debug, Clone, Serialize)]
pub struct ValidateConfigResponse {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Body for `POST /api/v1/chat/message`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Output of the external intent classifier for this message
    pub intent: ResolvedIntent,
}

/// Descriptor plus live availability, as served to callers
#[derive(Debug, Clone, Serialize)]
pub struct ToolCapabilities {
    pub name: String,
    pub command: String,
    pub category: ToolCategory,
    pub description: String,
    pub available: bool,
    pub version: String,
    pub supported_options: std::collections::BTreeMap<String, OptionSpec>,
    pub default_config: crate::tools::ToolConfig,
}

impl ToolCapabilities {
    pub fn from_descriptor(
        descriptor: &ToolDescriptor,
        available: bool,
        version: Option<String>,
    ) -> Self {
        Self {
            name: descriptor.name.clone(),
            command: descriptor.command.clone(),
            category: descriptor.category,
            description: descriptor.description.clone(),
            available,
            version: version.unwrap_or_else(|| "unknown".to_string()),
            supported_options: descriptor.supported_options.clone(),
            default_config: descriptor.default_config(),
        }
    }
}

/// Availability row for `GET /api/v1/tools/status`
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub available: bool,
    pub version: String,
    pub path: String,
}

/// Generic error body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
