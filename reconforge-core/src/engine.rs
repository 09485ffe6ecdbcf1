//! Engine façade: plan, execute, normalize, persist
//!
//! Ties the registry, validator, plan builder, supervisor, normalizer, and
//! session store into the request-level operations the API surface exposes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::EngineConfig;
use crate::exec::{
    CancelSignal, ExecutionResult, ExecutionStatus, ProcessRunner, ProcessSupervisor,
    TokioProcessRunner,
};
use crate::intent::ResolvedIntent;
use crate::normalize::{aggregate, Aggregated};
use crate::plan::{ExecutionPlan, PlanBuilder, PlanOptions, PresetCatalog};
use crate::state::{SessionStore, TurnKind};
use crate::tools::{ArtifactPaths, ToolRegistry};
use crate::Result;

/// One scan request, either an explicit tool list or a preset
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub target: String,
    pub tools: Vec<String>,
    pub tool_configs: HashMap<String, Map<String, Value>>,
    pub preset: Option<String>,
    pub max_parallel: Option<usize>,
    /// Existing session to append to; a fresh one is created when absent
    pub session_id: Option<String>,
}

/// Completed scan, aggregated for the caller
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub scan_id: String,
    pub target: String,
    pub session_id: String,
    pub tools_executed: Vec<String>,
    pub total_findings: usize,
    #[serde(flatten)]
    pub aggregated: Aggregated,
}

/// Result of handling one classified conversation turn
#[derive(Debug, Clone, Serialize)]
pub struct IntentOutcome {
    pub session_id: String,
    pub reply: String,
    pub requires_clarification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ScanOutcome>,
}

/// The tool orchestration and session engine
pub struct Engine {
    registry: Arc<ToolRegistry>,
    presets: Arc<PresetCatalog>,
    store: Arc<SessionStore>,
    supervisor: ProcessSupervisor,
    paths: ArtifactPaths,
    max_session_age_days: i64,
}

impl Engine {
    /// Build an engine from configuration, with real subprocess execution.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let mut registry = ToolRegistry::new();
        registry.apply_path_overrides(&config.tool_paths);

        std::fs::create_dir_all(&config.execution.screenshot_dir)?;
        let store = SessionStore::open(&config.sessions.db_path)?;

        Ok(Self::with_parts(
            Arc::new(registry),
            Arc::new(PresetCatalog::new()),
            Arc::new(store),
            Arc::new(TokioProcessRunner),
            ArtifactPaths::new(&config.execution.screenshot_dir),
            config.sessions.max_session_age_days,
        ))
    }

    /// Assemble an engine from explicit parts. Tests substitute fake
    /// registries and runners through this.
    pub fn with_parts(
        registry: Arc<ToolRegistry>,
        presets: Arc<PresetCatalog>,
        store: Arc<SessionStore>,
        runner: Arc<dyn ProcessRunner>,
        paths: ArtifactPaths,
        max_session_age_days: i64,
    ) -> Self {
        Self {
            registry,
            presets,
            store,
            supervisor: ProcessSupervisor::new(runner),
            paths,
            max_session_age_days,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Build the plan for a scan request without running it.
    pub async fn plan_scan(&self, request: &ScanRequest) -> Result<ExecutionPlan> {
        let builder = PlanBuilder::new(&self.registry, &self.presets, self.paths.clone());
        let options = PlanOptions {
            max_parallel: request.max_parallel,
        };
        match &request.preset {
            Some(preset) => {
                builder
                    .build_from_preset(preset, &request.target, &options)
                    .await
            }
            None => {
                builder
                    .build(&request.target, &request.tools, &request.tool_configs, &options)
                    .await
            }
        }
    }

    /// Plan and execute a scan, then fold the results into a session.
    ///
    /// Per-tool failures land in the execution summary; only structurally
    /// invalid requests (bad target, unknown tool or preset, bad config,
    /// unknown session id) error out of here.
    pub async fn execute_scan(
        &self,
        request: &ScanRequest,
        cancel: CancelSignal,
    ) -> Result<ScanOutcome> {
        let session_id = self.resolve_session(request.session_id.as_deref())?;
        let plan = self.plan_scan(request).await?;

        info!(
            "executing plan {} for {} ({} tools, {} runnable)",
            plan.id,
            plan.target,
            plan.entries.len(),
            plan.runnable_count()
        );

        let results = self.supervisor.execute(&plan, cancel).await;
        let outcome = self.record_results(&session_id, &plan, &results)?;
        Ok(outcome)
    }

    /// Handle one classified conversation turn: persist the message, either
    /// ask for clarification or run the scan, persist the outcome.
    pub async fn handle_intent(
        &self,
        message: &str,
        intent: &ResolvedIntent,
        session_id: Option<&str>,
        cancel: CancelSignal,
    ) -> Result<IntentOutcome> {
        let session_id = self.resolve_session(session_id)?;
        self.store
            .append_turn(&session_id, TurnKind::UserQuery, message, None)?;

        if intent.requires_clarification {
            let reply = intent
                .clarification_question
                .clone()
                .unwrap_or_else(|| "Please specify the target you want to scan.".to_string());
            self.store
                .append_turn(&session_id, TurnKind::SystemResponse, &reply, None)?;
            return Ok(IntentOutcome {
                session_id,
                reply,
                requires_clarification: true,
                results: None,
            });
        }

        let request = ScanRequest {
            target: intent.target.clone(),
            tools: intent.tool_names.clone(),
            tool_configs: intent.raw_configs.clone(),
            preset: intent.preset_name.clone(),
            max_parallel: None,
            session_id: Some(session_id.clone()),
        };

        let plan = self.plan_scan(&request).await?;
        let results = self.supervisor.execute(&plan, cancel).await;
        let outcome = self.record_results(&session_id, &plan, &results)?;

        let reply = summarize(&outcome);
        self.store
            .append_turn(&session_id, TurnKind::SystemResponse, &reply, None)?;

        Ok(IntentOutcome {
            session_id,
            reply,
            requires_clarification: false,
            results: Some(outcome),
        })
    }

    /// Drop sessions idle past the configured age.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        self.store.purge_older_than(self.max_session_age_days)
    }

    fn resolve_session(&self, session_id: Option<&str>) -> Result<String> {
        match session_id {
            Some(id) => {
                // Fail on unknown ids rather than silently forking a session
                self.store.get(id)?;
                Ok(id.to_string())
            }
            None => self.store.create(),
        }
    }

    fn record_results(
        &self,
        session_id: &str,
        plan: &ExecutionPlan,
        results: &[ExecutionResult],
    ) -> Result<ScanOutcome> {
        let aggregated = aggregate(plan.target.host(), results);

        let tools_executed: Vec<String> = plan.entries.iter().map(|e| e.tool.clone()).collect();
        let turn_body = format!(
            "Executed {} on {}",
            tools_executed.join(", "),
            plan.target
        );
        self.store.append_turn(
            session_id,
            TurnKind::ToolExecution,
            &turn_body,
            Some(&json!({
                "scan_id": &plan.id,
                "execution_summary": &aggregated.execution_summary,
                "total_findings": aggregated.total_findings(),
            })),
        )?;
        self.store.append_findings(session_id, &aggregated.findings)?;

        Ok(ScanOutcome {
            scan_id: plan.id.clone(),
            target: plan.target.raw.clone(),
            session_id: session_id.to_string(),
            tools_executed,
            total_findings: aggregated.total_findings(),
            aggregated,
        })
    }
}

fn summarize(outcome: &ScanOutcome) -> String {
    let completed = outcome
        .aggregated
        .execution_summary
        .values()
        .filter(|s| s.status == ExecutionStatus::Completed)
        .count();
    format!(
        "Ran {} tool(s) against {} ({} completed). {} finding(s) recorded.",
        outcome.tools_executed.len(),
        outcome.target,
        completed,
        outcome.total_findings
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::RunOutcome;
    use crate::tools::{builtin_tools, Invocation, Prober};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct AllAvailable;

    #[async_trait]
    impl Prober for AllAvailable {
        async fn probe(&self, _command: &str) -> Option<String> {
            Some("v1.0".to_string())
        }
    }

    /// Runner that answers each tool with canned stdout
    struct CannedRunner {
        stdout: BTreeMap<String, String>,
    }

    #[async_trait]
    impl ProcessRunner for CannedRunner {
        async fn run(&self, invocation: &Invocation, _cancel: CancelSignal) -> RunOutcome {
            RunOutcome::Exited {
                stdout: self
                    .stdout
                    .get(&invocation.program)
                    .cloned()
                    .unwrap_or_default(),
                stderr: String::new(),
                exit_code: 0,
            }
        }
    }

    fn engine(stdout: BTreeMap<String, String>) -> Engine {
        Engine::with_parts(
            Arc::new(ToolRegistry::with_tools(
                builtin_tools(),
                Arc::new(AllAvailable),
            )),
            Arc::new(PresetCatalog::new()),
            Arc::new(SessionStore::in_memory().unwrap()),
            Arc::new(CannedRunner { stdout }),
            ArtifactPaths::default(),
            30,
        )
    }

    fn idle_cancel() -> CancelSignal {
        let (handle, signal) = crate::exec::cancellation();
        std::mem::forget(handle);
        signal
    }

    #[tokio::test]
    async fn test_execute_scan_creates_session_and_stores_findings() {
        let engine = engine(BTreeMap::from([(
            "subfinder".to_string(),
            "a.example.com\nb.example.com\n".to_string(),
        )]));

        let request = ScanRequest {
            target: "example.com".to_string(),
            tools: vec!["subfinder".to_string()],
            ..ScanRequest::default()
        };
        let outcome = engine.execute_scan(&request, idle_cancel()).await.unwrap();

        assert_eq!(outcome.total_findings, 2);
        assert_eq!(outcome.tools_executed, vec!["subfinder"]);
        assert_eq!(
            outcome.aggregated.execution_summary["subfinder"].findings_count,
            2
        );

        let record = engine.store().get(&outcome.session_id).unwrap();
        assert_eq!(record.findings.len(), 2);
        assert_eq!(record.turns.len(), 1);
        assert_eq!(record.turns[0].kind, TurnKind::ToolExecution);
    }

    #[tokio::test]
    async fn test_execute_scan_unknown_session_rejected() {
        let engine = engine(BTreeMap::new());
        let request = ScanRequest {
            target: "example.com".to_string(),
            tools: vec!["subfinder".to_string()],
            session_id: Some("ghost".to_string()),
            ..ScanRequest::default()
        };
        assert!(matches!(
            engine.execute_scan(&request, idle_cancel()).await,
            Err(crate::Error::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_scan_accumulates_into_existing_session() {
        let engine = engine(BTreeMap::from([(
            "subfinder".to_string(),
            "a.example.com\n".to_string(),
        )]));

        let first = ScanRequest {
            target: "example.com".to_string(),
            tools: vec!["subfinder".to_string()],
            ..ScanRequest::default()
        };
        let outcome = engine.execute_scan(&first, idle_cancel()).await.unwrap();

        let second = ScanRequest {
            session_id: Some(outcome.session_id.clone()),
            ..first
        };
        engine.execute_scan(&second, idle_cancel()).await.unwrap();

        let record = engine.store().get(&outcome.session_id).unwrap();
        // same finding recorded twice across plans; sessions keep both
        assert_eq!(record.findings.len(), 2);
        assert_eq!(record.turns.len(), 2);
    }

    #[tokio::test]
    async fn test_preset_scan() {
        let engine = engine(BTreeMap::new());
        let request = ScanRequest {
            target: "10.0.0.5".to_string(),
            preset: Some("quick_scan".to_string()),
            ..ScanRequest::default()
        };
        let outcome = engine.execute_scan(&request, idle_cancel()).await.unwrap();

        assert_eq!(outcome.tools_executed.len(), 3);
        assert_eq!(outcome.aggregated.execution_summary.len(), 3);
    }

    #[tokio::test]
    async fn test_handle_intent_clarification_short_circuits() {
        let engine = engine(BTreeMap::new());
        let intent = ResolvedIntent {
            requires_clarification: true,
            clarification_question: Some("Which domain should I scan?".to_string()),
            ..ResolvedIntent::default()
        };

        let outcome = engine
            .handle_intent("find subdomains", &intent, None, idle_cancel())
            .await
            .unwrap();

        assert!(outcome.requires_clarification);
        assert!(outcome.results.is_none());
        assert_eq!(outcome.reply, "Which domain should I scan?");

        let record = engine.store().get(&outcome.session_id).unwrap();
        assert_eq!(record.turns.len(), 2);
        assert_eq!(record.turns[0].kind, TurnKind::UserQuery);
        assert_eq!(record.turns[1].kind, TurnKind::SystemResponse);
    }

    #[tokio::test]
    async fn test_handle_intent_runs_scan_and_replies() {
        let engine = engine(BTreeMap::from([(
            "subfinder".to_string(),
            "a.example.com\n".to_string(),
        )]));
        let intent = ResolvedIntent {
            target: "example.com".to_string(),
            tool_names: vec!["subfinder".to_string()],
            ..ResolvedIntent::default()
        };

        let outcome = engine
            .handle_intent("find subdomains for example.com", &intent, None, idle_cancel())
            .await
            .unwrap();

        assert!(!outcome.requires_clarification);
        let results = outcome.results.unwrap();
        assert_eq!(results.total_findings, 1);
        assert!(outcome.reply.contains("1 finding"));

        // user turn, tool execution turn, system reply
        let record = engine.store().get(&outcome.session_id).unwrap();
        assert_eq!(record.turns.len(), 3);
    }
}
