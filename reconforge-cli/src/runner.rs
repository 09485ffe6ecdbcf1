//! Command dispatch for the CLI

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use reconforge_core::api::ApiServer;
use reconforge_core::config::EngineConfig;
use reconforge_core::engine::{Engine, ScanRequest};
use reconforge_core::exec::cancellation;

use crate::args::{Args, Command};

pub async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::load_default(),
    };

    match args.command {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Scan {
            target,
            tool,
            preset,
            max_parallel,
            session,
            json,
        } => scan(config, target, tool, preset, max_parallel, session, json).await,
        Command::Tools => tools(config).await,
        Command::Sessions => sessions(config),
    }
}

async fn serve(mut config: EngineConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let engine = Arc::new(Engine::new(&config)?);
    let purged = engine.purge_expired_sessions()?;
    if purged > 0 {
        info!("purged {} expired session(s)", purged);
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let server = ApiServer::start(engine, addr).await?;
    println!("reconforge API listening on http://{}", server.addr());

    tokio::signal::ctrl_c().await?;
    println!("shutting down");
    server.shutdown().await;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn scan(
    config: EngineConfig,
    target: String,
    tools: Vec<String>,
    preset: Option<String>,
    max_parallel: Option<usize>,
    session: Option<String>,
    json: bool,
) -> Result<()> {
    anyhow::ensure!(
        preset.is_some() || !tools.is_empty(),
        "pass at least one --tool or a --preset"
    );

    let engine = Engine::new(&config)?;
    let request = ScanRequest {
        target,
        tools,
        tool_configs: Default::default(),
        preset,
        max_parallel,
        session_id: session,
    };

    // Ctrl-C cancels in-flight subprocesses; completed results are kept
    let (cancel_handle, signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_handle.cancel();
        }
    });

    let outcome = engine.execute_scan(&request, signal).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("scan {} against {}", outcome.scan_id, outcome.target);
    println!("session: {}", outcome.session_id);
    println!();
    for (tool, summary) in &outcome.aggregated.execution_summary {
        println!(
            "  {:<14} {:<10} {:>4} finding(s)  {}ms{}",
            tool,
            summary.status.as_str(),
            summary.findings_count,
            summary.duration_ms,
            summary
                .error
                .as_deref()
                .map(|e| format!("  ({e})"))
                .unwrap_or_default(),
        );
    }
    println!();
    println!("total findings: {}", outcome.total_findings);
    for finding in &outcome.aggregated.findings {
        println!("  [{}] {} (via {})", finding.kind, finding.value, finding.source);
    }
    Ok(())
}

async fn tools(config: EngineConfig) -> Result<()> {
    let engine = Engine::new(&config)?;
    for descriptor in engine.registry().list() {
        let status = engine.registry().probe(&descriptor.name).await?;
        println!(
            "  {:<14} {:<12} {}",
            descriptor.name,
            if status.available { "available" } else { "missing" },
            status.version.unwrap_or_default(),
        );
    }
    Ok(())
}

fn sessions(config: EngineConfig) -> Result<()> {
    let engine = Engine::new(&config)?;
    let sessions = engine.store().list()?;
    if sessions.is_empty() {
        println!("no stored sessions");
        return Ok(());
    }
    for session in sessions {
        println!(
            "  {}  {} turn(s), {} finding(s), last active {}",
            session.session_id,
            session.turn_count,
            session.findings_count,
            session.last_activity.format("%Y-%m-%d %H:%M UTC"),
        );
    }
    Ok(())
}
