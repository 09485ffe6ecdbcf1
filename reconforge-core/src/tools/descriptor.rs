//! Tool descriptors and typed option schemas

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed set of option value types a tool schema may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "boolean")]
    Bool,
    #[serde(rename = "integer")]
    Int,
    #[serde(rename = "string")]
    Str,
    #[serde(rename = "list")]
    List,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Bool => "boolean",
            OptionType::Int => "integer",
            OptionType::Str => "string",
            OptionType::List => "list",
        }
    }
}

/// A typed option value, matching one of the declared [`OptionType`]s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl OptionValue {
    pub fn option_type(&self) -> OptionType {
        match self {
            OptionValue::Bool(_) => OptionType::Bool,
            OptionValue::Int(_) => OptionType::Int,
            OptionValue::Str(_) => OptionType::Str,
            OptionValue::List(_) => OptionType::List,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<OptionValue> for serde_json::Value {
    fn from(value: OptionValue) -> Self {
        match value {
            OptionValue::Bool(b) => serde_json::Value::Bool(b),
            OptionValue::Int(i) => serde_json::Value::from(i),
            OptionValue::Str(s) => serde_json::Value::String(s),
            OptionValue::List(l) => serde_json::Value::from(l),
        }
    }
}

/// Schema for a single tool option: type, default, constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSpec {
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub description: String,
    pub default: OptionValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

impl OptionSpec {
    pub fn boolean(default: bool, description: impl Into<String>) -> Self {
        Self {
            option_type: OptionType::Bool,
            description: description.into(),
            default: OptionValue::Bool(default),
            min: None,
            max: None,
            allowed_values: None,
        }
    }

    pub fn integer(default: i64, description: impl Into<String>) -> Self {
        Self {
            option_type: OptionType::Int,
            description: description.into(),
            default: OptionValue::Int(default),
            min: None,
            max: None,
            allowed_values: None,
        }
    }

    pub fn string(default: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            option_type: OptionType::Str,
            description: description.into(),
            default: OptionValue::Str(default.into()),
            min: None,
            max: None,
            allowed_values: None,
        }
    }

    pub fn list<I, S>(default: I, description: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            option_type: OptionType::List,
            description: description.into(),
            default: OptionValue::List(default.into_iter().map(Into::into).collect()),
            min: None,
            max: None,
            allowed_values: None,
        }
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Broad capability grouping, used for listing and intent mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Recon,
    PortScan,
    Screenshot,
    ContentDiscovery,
    Fuzzing,
    ParameterDiscovery,
}

/// A security tool known to the registry. Immutable after registry load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    /// Executable path or bare name resolved via PATH
    pub command: String,
    pub description: String,
    pub category: ToolCategory,
    pub supported_options: BTreeMap<String, OptionSpec>,
    /// Fallback timeout when the tool config does not imply one
    pub default_timeout_secs: u64,
    /// Tool reads its target from stdin rather than argv
    #[serde(default)]
    pub stdin_target: bool,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, category: ToolCategory) -> Self {
        let name = name.into();
        Self {
            command: name.clone(),
            name,
            description: String::new(),
            category,
            supported_options: BTreeMap::new(),
            default_timeout_secs: 300,
            stdin_target: false,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, spec: OptionSpec) -> Self {
        self.supported_options.insert(name.into(), spec);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    pub fn with_stdin_target(mut self) -> Self {
        self.stdin_target = true;
        self
    }

    /// Full default configuration derived from the option schema.
    pub fn default_config(&self) -> ToolConfig {
        ToolConfig(
            self.supported_options
                .iter()
                .map(|(name, spec)| (name.clone(), spec.default.clone()))
                .collect(),
        )
    }
}

/// A fully validated configuration for one tool invocation.
///
/// Only the validator constructs these, so holding one means every option is
/// known to the descriptor and within its declared constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig(pub(crate) BTreeMap<String, OptionValue>);

impl ToolConfig {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.0.get(name).and_then(OptionValue::as_bool).unwrap_or(false)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(OptionValue::as_int)
    }

    /// String option, with the empty string treated as unset.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(OptionValue::as_str)
            .filter(|s| !s.is_empty())
    }

    /// List option, with the empty list treated as unset.
    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        self.0
            .get(name)
            .and_then(OptionValue::as_list)
            .filter(|l| !l.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    /// Back to the raw JSON shape accepted by the validator.
    pub fn to_raw(&self) -> serde_json::Map<String, serde_json::Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(v.clone())))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let desc = ToolDescriptor::new("subfinder", ToolCategory::Recon)
            .with_description("Subdomain enumeration")
            .with_option("threads", OptionSpec::integer(10, "Thread count").with_range(1, 100))
            .with_timeout_secs(600);

        assert_eq!(desc.name, "subfinder");
        assert_eq!(desc.command, "subfinder");
        assert_eq!(desc.default_timeout_secs, 600);
        assert_eq!(desc.supported_options["threads"].min, Some(1));
    }

    #[test]
    fn test_default_config_covers_all_options() {
        let desc = ToolDescriptor::new("t", ToolCategory::Recon)
            .with_option("a", OptionSpec::boolean(true, ""))
            .with_option("b", OptionSpec::string("x", ""));

        let config = desc.default_config();
        assert_eq!(config.get_bool("a"), true);
        assert_eq!(config.get_str("b"), Some("x"));
    }

    #[test]
    fn test_empty_string_and_list_read_as_unset() {
        let desc = ToolDescriptor::new("t", ToolCategory::Recon)
            .with_option("wordlist", OptionSpec::string("", ""))
            .with_option("sources", OptionSpec::list(Vec::<String>::new(), ""));

        let config = desc.default_config();
        assert_eq!(config.get_str("wordlist"), None);
        assert_eq!(config.get_list("sources"), None);
    }

    #[test]
    fn test_option_value_types() {
        assert_eq!(OptionValue::Bool(true).option_type(), OptionType::Bool);
        assert_eq!(OptionValue::Int(5).option_type(), OptionType::Int);
        assert_eq!(OptionType::List.as_str(), "list");
    }
}
