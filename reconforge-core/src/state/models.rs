//! Data models for session state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::Finding;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    UserQuery,
    SystemResponse,
    ToolExecution,
    Error,
}

impl TurnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnKind::UserQuery => "user_query",
            TurnKind::SystemResponse => "system_response",
            TurnKind::ToolExecution => "tool_execution",
            TurnKind::Error => "error",
        }
    }
}

impl std::fmt::Display for TurnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TurnKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user_query" => Ok(TurnKind::UserQuery),
            "system_response" => Ok(TurnKind::SystemResponse),
            "tool_execution" => Ok(TurnKind::ToolExecution),
            "error" => Ok(TurnKind::Error),
            _ => Err(format!("Unknown turn kind: {s}")),
        }
    }
}

/// One conversation turn within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub kind: TurnKind,
    pub content: String,
    /// Structured execution results attached to the turn, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Full session snapshot: conversation plus cumulative findings
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub turns: Vec<Turn>,
    pub findings: Vec<Finding>,
}

/// Listing entry for a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub turn_count: usize,
    pub findings_count: usize,
}
