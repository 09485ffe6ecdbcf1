//! Named scan presets
//!
//! Read-only bundles of tools and per-tool configuration for common scan
//! scenarios, loaded once at startup. Preset configs go through the same
//! validator as caller-supplied ones when a plan is built from them.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::{Error, Result};

/// A named bundle of tools and default configurations
#[derive(Debug, Clone, Serialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub tools: Vec<String>,
    pub configs: BTreeMap<String, Map<String, Value>>,
}

/// All presets, keyed by name
pub struct PresetCatalog {
    presets: BTreeMap<String, Preset>,
}

impl PresetCatalog {
    pub fn new() -> Self {
        let presets = builtin_presets()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Self { presets }
    }

    pub fn get(&self, name: &str) -> Result<&Preset> {
        self.presets
            .get(name)
            .ok_or_else(|| Error::PresetNotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<&Preset> {
        self.presets.values().collect()
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn preset(
    name: &str,
    description: &str,
    tools: &[&str],
    configs: Value,
) -> Preset {
    let configs = configs
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(tool, cfg)| {
                    cfg.as_object().map(|m| (tool.clone(), m.clone()))
                })
                .collect()
        })
        .unwrap_or_default();
    Preset {
        name: name.to_string(),
        description: description.to_string(),
        tools: tools.iter().map(|t| (*t).to_string()).collect(),
        configs,
    }
}

fn builtin_presets() -> Vec<Preset> {
    vec![
        preset(
            "quick_scan",
            "Fast reconnaissance with minimal resource usage",
            &["subfinder", "assetfinder", "httpx"],
            json!({
                "subfinder": {"max_time": 2, "threads": 5, "sources": ["shodan", "censys"]},
                "assetfinder": {"timeout": 30},
                "httpx": {"threads": 25, "timeout": 5, "ports": ["80", "443"]},
            }),
        ),
        preset(
            "comprehensive_scan",
            "Thorough reconnaissance with all core tools",
            &[
                "subfinder",
                "assetfinder",
                "amass",
                "dnsx",
                "httpx",
                "naabu",
                "waybackurls",
                "katana",
            ],
            json!({
                "subfinder": {"max_time": 10, "threads": 20, "recursive": true},
                "assetfinder": {"timeout": 60},
                "amass": {"mode": "passive", "timeout": 15, "alterations": true},
                "dnsx": {"a": true, "cname": true, "threads": 25},
                "httpx": {
                    "threads": 100,
                    "tech_detect": true,
                    "ports": ["80", "443", "8080", "8443", "3000", "5000"],
                },
                "naabu": {"top_ports": "1000", "rate": 1000, "threads": 25},
                "waybackurls": {"get_versions": true, "limit": 2000},
                "katana": {"depth": 3, "js_crawl": true, "crawl_duration": 5},
            }),
        ),
        preset(
            "stealth_scan",
            "Low-profile reconnaissance to avoid detection",
            &["subfinder", "waybackurls"],
            json!({
                "subfinder": {"max_time": 5, "threads": 3, "sources": ["dnsdumpster", "hackertarget"]},
                "waybackurls": {"limit": 500},
            }),
        ),
        preset(
            "active_scan",
            "Active reconnaissance with brute force",
            &["subfinder", "amass", "httpx", "nmap"],
            json!({
                "subfinder": {"max_time": 15, "threads": 30, "recursive": true},
                "amass": {"mode": "active", "timeout": 30, "brute_force": true, "alterations": true},
                "httpx": {
                    "threads": 150,
                    "tech_detect": true,
                    "follow_redirects": true,
                    "ports": ["80", "443", "8080", "8443", "3000", "5000", "8000", "9000"],
                },
                "nmap": {"scan_type": "syn", "top_ports": 1000, "timing": "4", "version_detection": true},
            }),
        ),
        preset(
            "content_discovery",
            "Content and directory discovery scan",
            &["gobuster", "ffuf", "katana", "paramspider"],
            json!({
                "gobuster": {
                    "mode": "dir",
                    "threads": 20,
                    "extensions": ["php", "html", "js", "txt", "xml", "asp", "aspx"],
                },
                "ffuf": {"threads": 40, "extensions": ["php", "html", "js", "txt"]},
                "katana": {"depth": 4, "js_crawl": true, "crawl_duration": 10},
                "paramspider": {"level": "high", "subs": true},
            }),
        ),
        preset(
            "screenshot_scan",
            "Visual reconnaissance with screenshots",
            &["httpx", "gowitness"],
            json!({
                "httpx": {
                    "threads": 50,
                    "tech_detect": true,
                    "title": true,
                    "ports": ["80", "443", "8080", "8443"],
                },
                "gowitness": {"threads": 10, "timeout": 15, "resolution": "1920,1080", "fullpage": true},
            }),
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;

    #[test]
    fn test_catalog_has_all_presets() {
        let catalog = PresetCatalog::new();
        for name in [
            "quick_scan",
            "comprehensive_scan",
            "stealth_scan",
            "active_scan",
            "content_discovery",
            "screenshot_scan",
        ] {
            assert!(catalog.get(name).is_ok(), "missing {name}");
        }
        assert_eq!(catalog.list().len(), 6);
    }

    #[test]
    fn test_unknown_preset() {
        let catalog = PresetCatalog::new();
        assert!(matches!(
            catalog.get("mega_scan"),
            Err(Error::PresetNotFound(name)) if name == "mega_scan"
        ));
    }

    #[test]
    fn test_preset_tools_exist_in_registry() {
        let registry = ToolRegistry::new();
        for preset in PresetCatalog::new().list() {
            for tool in &preset.tools {
                assert!(registry.describe(tool).is_ok(), "{}: {tool}", preset.name);
            }
        }
    }

    #[test]
    fn test_preset_configs_validate() {
        let registry = ToolRegistry::new();
        for preset in PresetCatalog::new().list() {
            for (tool, raw) in &preset.configs {
                registry
                    .validate_config(tool, raw)
                    .unwrap_or_else(|e| panic!("{}/{tool}: {e}", preset.name));
            }
        }
    }

    #[test]
    fn test_preset_configs_only_reference_listed_tools() {
        for preset in PresetCatalog::new().list() {
            for tool in preset.configs.keys() {
                assert!(preset.tools.contains(tool), "{}: {tool}", preset.name);
            }
        }
    }
}
