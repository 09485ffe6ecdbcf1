//! Execution plan construction
//!
//! Turns a resolved request (tool list + target + per-tool config, or a named
//! preset) into a validated, ready-to-run plan. Everything that can be
//! rejected is rejected here, before any subprocess starts.

pub mod presets;

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::targets::Target;
use crate::tools::{build_invocation, ArtifactPaths, Invocation, ToolConfig, ToolRegistry};
use crate::Result;

pub use presets::{Preset, PresetCatalog};

/// Hard cap on concurrent tool subprocesses, regardless of request
pub const MAX_PARALLELISM: usize = 4;

/// Supervisory slack added on top of the longest tool timeout
const PLAN_TIMEOUT_GRACE: Duration = Duration::from_secs(30);

/// Why a planned entry will not be launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// Executable did not resolve when the plan was built
    Unavailable,
    /// Caller cancelled the request before this entry launched
    Cancelled,
}

/// One tool invocation within a plan
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub tool: String,
    pub config: ToolConfig,
    pub invocation: Invocation,
    /// Pre-flagged skip, decided at plan time. The entry stays in the plan so
    /// the caller sees which requested tools could not run.
    pub skip: Option<SkipReason>,
}

/// A validated, immutable set of tool invocations for one request
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub id: String,
    pub target: Target,
    pub entries: Vec<PlanEntry>,
    pub max_parallel: usize,
    /// Upper bound on total plan runtime: longest entry timeout plus slack
    pub plan_timeout: Duration,
}

impl ExecutionPlan {
    pub fn runnable_count(&self) -> usize {
        self.entries.iter().filter(|e| e.skip.is_none()).count()
    }
}

/// Caller-tunable plan parameters
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub max_parallel: Option<usize>,
}

/// Builds execution plans against a registry and preset catalogue
pub struct PlanBuilder<'a> {
    registry: &'a ToolRegistry,
    presets: &'a PresetCatalog,
    paths: ArtifactPaths,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(registry: &'a ToolRegistry, presets: &'a PresetCatalog, paths: ArtifactPaths) -> Self {
        Self {
            registry,
            presets,
            paths,
        }
    }

    /// Build a plan for an explicit tool list. The target is validated before
    /// the registry is consulted; per-tool validation errors carry the tool
    /// name. Unavailable tools are planned but pre-flagged skipped.
    pub async fn build(
        &self,
        target: &str,
        tool_names: &[String],
        raw_configs: &HashMap<String, Map<String, Value>>,
        options: &PlanOptions,
    ) -> Result<ExecutionPlan> {
        let target = Target::parse(target)?;

        let mut entries = Vec::new();
        let mut seen = Vec::new();
        let empty = Map::new();

        for name in tool_names {
            if seen.contains(name) {
                continue;
            }
            seen.push(name.clone());

            let descriptor = self.registry.describe(name)?;
            let raw = raw_configs.get(name).unwrap_or(&empty);
            let config = self.registry.validate_config(name, raw)?;
            let invocation = build_invocation(descriptor, &target, &config, &self.paths);

            let available = self.registry.probe_availability(name).await?;
            if !available {
                debug!("tool {} unavailable, planning as skipped", name);
            }

            entries.push(PlanEntry {
                tool: name.clone(),
                config,
                invocation,
                skip: (!available).then_some(SkipReason::Unavailable),
            });
        }

        let distinct = entries.len();
        let max_parallel = options
            .max_parallel
            .unwrap_or(distinct)
            .clamp(1, MAX_PARALLELISM);

        let longest = entries
            .iter()
            .filter(|e| e.skip.is_none())
            .map(|e| e.invocation.timeout)
            .max()
            .unwrap_or(Duration::ZERO);

        Ok(ExecutionPlan {
            id: Uuid::new_v4().to_string(),
            target,
            entries,
            max_parallel,
            plan_timeout: longest + PLAN_TIMEOUT_GRACE,
        })
    }

    /// Build a plan from a named preset. Preset configs pass through the same
    /// validation path as caller-supplied ones.
    pub async fn build_from_preset(
        &self,
        preset_name: &str,
        target: &str,
        options: &PlanOptions,
    ) -> Result<ExecutionPlan> {
        let preset = self.presets.get(preset_name)?;
        let raw_configs: HashMap<String, Map<String, Value>> = preset
            .configs
            .iter()
            .map(|(tool, cfg)| (tool.clone(), cfg.clone()))
            .collect();
        self.build(target, &preset.tools, &raw_configs, options).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::tools::{builtin_tools, Prober, ToolRegistry};
    use crate::Error;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct AllAvailable;

    #[async_trait]
    impl Prober for AllAvailable {
        async fn probe(&self, _command: &str) -> Option<String> {
            Some("v1.0".to_string())
        }
    }

    struct NoneAvailable;

    #[async_trait]
    impl Prober for NoneAvailable {
        async fn probe(&self, _command: &str) -> Option<String> {
            None
        }
    }

    fn builder_parts(prober: Arc<dyn Prober>) -> (ToolRegistry, PresetCatalog) {
        (
            ToolRegistry::with_tools(builtin_tools(), prober),
            PresetCatalog::new(),
        )
    }

    fn tools(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_build_basic_plan() {
        let (registry, presets) = builder_parts(Arc::new(AllAvailable));
        let builder = PlanBuilder::new(&registry, &presets, ArtifactPaths::default());

        let plan = builder
            .build(
                "example.com",
                &tools(&["subfinder", "httpx"]),
                &HashMap::new(),
                &PlanOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.runnable_count(), 2);
        assert_eq!(plan.max_parallel, 2);
        assert!(plan.plan_timeout > Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_invalid_target_fails_before_registry() {
        let (registry, presets) = builder_parts(Arc::new(AllAvailable));
        let builder = PlanBuilder::new(&registry, &presets, ArtifactPaths::default());

        let err = builder
            .build(
                "not a target",
                &tools(&["no-such-tool"]),
                &HashMap::new(),
                &PlanOptions::default(),
            )
            .await
            .unwrap_err();

        // Target rejection wins even though the tool is also unknown
        assert!(matches!(err, Error::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (registry, presets) = builder_parts(Arc::new(AllAvailable));
        let builder = PlanBuilder::new(&registry, &presets, ArtifactPaths::default());

        let err = builder
            .build(
                "example.com",
                &tools(&["masscan"]),
                &HashMap::new(),
                &PlanOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ToolNotFound(name) if name == "masscan"));
    }

    #[tokio::test]
    async fn test_validation_error_names_offending_tool() {
        let (registry, presets) = builder_parts(Arc::new(AllAvailable));
        let builder = PlanBuilder::new(&registry, &presets, ArtifactPaths::default());

        let mut configs = HashMap::new();
        configs.insert(
            "subfinder".to_string(),
            json!({"threads": 5000}).as_object().unwrap().clone(),
        );

        let err = builder
            .build(
                "example.com",
                &tools(&["subfinder"]),
                &configs,
                &PlanOptions::default(),
            )
            .await
            .unwrap_err();

        match err {
            Error::Validation(v) => assert_eq!(v.tool(), "subfinder"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_tools_planned_as_skipped() {
        let (registry, presets) = builder_parts(Arc::new(NoneAvailable));
        let builder = PlanBuilder::new(&registry, &presets, ArtifactPaths::default());

        let plan = builder
            .build(
                "example.com",
                &tools(&["subfinder", "httpx"]),
                &HashMap::new(),
                &PlanOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.runnable_count(), 0);
        assert!(plan
            .entries
            .iter()
            .all(|e| e.skip == Some(SkipReason::Unavailable)));
    }

    #[tokio::test]
    async fn test_duplicate_tools_collapse() {
        let (registry, presets) = builder_parts(Arc::new(AllAvailable));
        let builder = PlanBuilder::new(&registry, &presets, ArtifactPaths::default());

        let plan = builder
            .build(
                "example.com",
                &tools(&["subfinder", "subfinder"]),
                &HashMap::new(),
                &PlanOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(plan.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_max_parallel_capped() {
        let (registry, presets) = builder_parts(Arc::new(AllAvailable));
        let builder = PlanBuilder::new(&registry, &presets, ArtifactPaths::default());

        let plan = builder
            .build(
                "example.com",
                &tools(&["subfinder", "assetfinder", "httpx", "dnsx", "amass", "naabu"]),
                &HashMap::new(),
                &PlanOptions {
                    max_parallel: Some(64),
                },
            )
            .await
            .unwrap();

        assert_eq!(plan.max_parallel, MAX_PARALLELISM);
    }

    #[tokio::test]
    async fn test_preset_plan_with_ip_target() {
        let (registry, presets) = builder_parts(Arc::new(AllAvailable));
        let builder = PlanBuilder::new(&registry, &presets, ArtifactPaths::default());

        let plan = builder
            .build_from_preset("quick_scan", "10.0.0.5", &PlanOptions::default())
            .await
            .unwrap();

        assert_eq!(plan.entries.len(), 3);
        assert_eq!(plan.target.host(), "10.0.0.5");
        // preset config reached the subfinder entry
        let subfinder = plan.entries.iter().find(|e| e.tool == "subfinder").unwrap();
        assert_eq!(subfinder.config.get_int("max_time"), Some(2));
    }

    #[tokio::test]
    async fn test_unknown_preset() {
        let (registry, presets) = builder_parts(Arc::new(AllAvailable));
        let builder = PlanBuilder::new(&registry, &presets, ArtifactPaths::default());

        let err = builder
            .build_from_preset("mega_scan", "example.com", &PlanOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PresetNotFound(_)));
    }
}
