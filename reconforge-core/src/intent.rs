//! Structured intent consumed from the natural-language classifier
//!
//! The classifier itself lives outside the engine; this is the contract its
//! output must satisfy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A classified reconnaissance request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedIntent {
    /// Domain, IP literal, or URL the request is about
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub tool_names: Vec<String>,
    /// Per-tool raw configuration, validated before planning
    #[serde(default)]
    pub raw_configs: HashMap<String, Map<String, Value>>,
    /// Named preset to expand instead of an explicit tool list
    #[serde(default)]
    pub preset_name: Option<String>,
    /// Classifier could not extract a target or action; ask, don't scan
    #[serde(default)]
    pub requires_clarification: bool,
    #[serde(default)]
    pub clarification_question: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_intent_deserializes() {
        let intent: ResolvedIntent =
            serde_json::from_str(r#"{"target": "example.com", "tool_names": ["subfinder"]}"#)
                .unwrap();
        assert_eq!(intent.target, "example.com");
        assert!(!intent.requires_clarification);
        assert!(intent.preset_name.is_none());
    }

    #[test]
    fn test_intent_with_configs() {
        let intent: ResolvedIntent = serde_json::from_str(
            r#"{
                "target": "example.com",
                "tool_names": ["nmap"],
                "raw_configs": {"nmap": {"top_ports": 100}},
                "requires_clarification": false
            }"#,
        )
        .unwrap();
        assert_eq!(intent.raw_configs["nmap"]["top_ports"], 100);
    }
}
