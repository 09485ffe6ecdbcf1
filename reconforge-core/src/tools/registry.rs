//! Tool registry with cached availability probing

use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::catalog::builtin_tools;
use super::descriptor::{ToolConfig, ToolDescriptor};
use crate::{Error, Result};

/// How long a probe result stays fresh before the executable is re-checked.
/// Short enough to notice PATH changes, long enough to keep probing off the
/// per-request path.
const PROBE_TTL: Duration = Duration::from_secs(30);

/// Cap on how long a version probe may hold a subprocess
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Cached outcome of an availability probe
#[derive(Debug, Clone, Serialize)]
pub struct ProbeStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Resolves whether a tool executable is runnable on this host
#[async_trait]
pub trait Prober: Send + Sync {
    /// `Some(version line)` when the executable runs, `None` when it cannot
    /// be spawned or hangs past the probe timeout.
    async fn probe(&self, command: &str) -> Option<String>;
}

/// Probes by spawning `<command> --version` and reading the first output line.
/// Best effort: a tool that exits non-zero on `--version` still counts as
/// available, since the binary resolved and ran.
pub struct ExecProber;

#[async_trait]
impl Prober for ExecProber {
    async fn probe(&self, command: &str) -> Option<String> {
        let output = tokio::process::Command::new(command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(PROBE_TIMEOUT, output).await {
            Ok(Ok(out)) => {
                let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&out.stderr));
                let version = text.lines().map(str::trim).find(|l| !l.is_empty());
                Some(version.unwrap_or("unknown").to_string())
            }
            Ok(Err(e)) => {
                debug!("probe spawn failed for {}: {}", command, e);
                None
            }
            Err(_) => {
                debug!("probe timed out for {}", command);
                None
            }
        }
    }
}

/// Static catalogue of tool descriptors plus a TTL cache of probe results.
///
/// Descriptors are immutable after load; the probe cache is the only mutable
/// state and is written solely by the probe routine.
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDescriptor>,
    prober: Arc<dyn Prober>,
    cache: RwLock<HashMap<String, (ProbeStatus, Instant)>>,
}

impl ToolRegistry {
    /// Registry over the built-in catalogue with real executable probing.
    pub fn new() -> Self {
        Self::with_tools(builtin_tools(), Arc::new(ExecProber))
    }

    /// Registry over an explicit tool set. Tests substitute a fake prober
    /// and trimmed catalogues through this.
    pub fn with_tools(tools: Vec<ToolDescriptor>, prober: Arc<dyn Prober>) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.name.clone(), t)).collect(),
            prober,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Replace executable paths for the named tools (config overrides).
    pub fn apply_path_overrides(&mut self, overrides: &BTreeMap<String, String>) {
        for (name, path) in overrides {
            if let Some(tool) = self.tools.get_mut(name) {
                tool.command = path.clone();
            }
        }
    }

    pub fn describe(&self, name: &str) -> Result<&ToolDescriptor> {
        self.tools
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().collect()
    }

    /// Validate a raw configuration for the named tool. Pure apart from the
    /// descriptor lookup; never touches the probe cache.
    pub fn validate_config(
        &self,
        tool_name: &str,
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolConfig> {
        let descriptor = self.describe(tool_name)?;
        Ok(super::validate::validate(descriptor, raw)?)
    }

    /// Probe whether the tool's executable resolves, returning a cached
    /// result when it is still fresh.
    pub async fn probe(&self, name: &str) -> Result<ProbeStatus> {
        let descriptor = self.describe(name)?;

        {
            let cache = self.cache.read().await;
            if let Some((status, probed_at)) = cache.get(name) {
                if probed_at.elapsed() < PROBE_TTL {
                    return Ok(status.clone());
                }
            }
        }

        let version = self.prober.probe(&descriptor.command).await;
        let status = ProbeStatus {
            available: version.is_some(),
            version,
        };

        let mut cache = self.cache.write().await;
        cache.insert(name.to_string(), (status.clone(), Instant::now()));
        Ok(status)
    }

    pub async fn probe_availability(&self, name: &str) -> Result<bool> {
        Ok(self.probe(name).await?.available)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Prober that reports a fixed tool set available and counts calls
    struct FakeProber {
        available: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn probe(&self, command: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.available
                .contains(&command)
                .then(|| format!("{command} v1.0"))
        }
    }

    fn registry_with(available: Vec<&'static str>) -> (ToolRegistry, Arc<FakeProber>) {
        let prober = Arc::new(FakeProber {
            available,
            calls: AtomicUsize::new(0),
        });
        let registry = ToolRegistry::with_tools(builtin_tools(), prober.clone());
        (registry, prober)
    }

    #[test]
    fn test_describe_known_and_unknown() {
        let registry = ToolRegistry::new();
        assert!(registry.describe("subfinder").is_ok());
        assert!(matches!(
            registry.describe("nonexistent"),
            Err(Error::ToolNotFound(name)) if name == "nonexistent"
        ));
    }

    #[test]
    fn test_list_is_sorted_and_complete() {
        let registry = ToolRegistry::new();
        let names: Vec<_> = registry.list().iter().map(|t| t.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 15);
    }

    #[test]
    fn test_path_overrides() {
        let mut registry = ToolRegistry::new();
        let overrides =
            BTreeMap::from([("nmap".to_string(), "/opt/scanners/nmap".to_string())]);
        registry.apply_path_overrides(&overrides);
        assert_eq!(registry.describe("nmap").unwrap().command, "/opt/scanners/nmap");
    }

    #[tokio::test]
    async fn test_probe_caches_within_ttl() {
        let (registry, prober) = registry_with(vec!["subfinder"]);

        assert!(registry.probe_availability("subfinder").await.unwrap());
        assert!(registry.probe_availability("subfinder").await.unwrap());
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probe_missing_tool_reports_unavailable() {
        let (registry, _) = registry_with(vec![]);
        let status = registry.probe("amass").await.unwrap();
        assert!(!status.available);
        assert!(status.version.is_none());
    }

    #[tokio::test]
    async fn test_probe_unknown_tool_is_not_found() {
        let (registry, _) = registry_with(vec![]);
        assert!(matches!(
            registry.probe("nessus").await,
            Err(Error::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_validate_config_attaches_tool_lookup() {
        let registry = ToolRegistry::new();
        let raw = serde_json::Map::new();
        assert!(registry.validate_config("subfinder", &raw).is_ok());
        assert!(matches!(
            registry.validate_config("nessus", &raw),
            Err(Error::ToolNotFound(_))
        ));
    }
}
