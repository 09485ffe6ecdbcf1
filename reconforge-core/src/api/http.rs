//! HTTP server for the engine API
//!
//! Hand-routed over hyper. Per-tool execution failures are embedded in a 200
//! response body; only structurally invalid requests map to 4xx statuses.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::api::types::{
    ChatMessageRequest, ErrorResponse, ExecuteScanRequest, ToolCapabilities, ToolStatus,
    ValidateConfigRequest, ValidateConfigResponse,
};
use crate::engine::{Engine, ScanRequest};
use crate::exec::cancellation;
use crate::state::{export_session, ExportFormat};
use crate::{Error, Result};

/// HTTP server wrapping an [`Engine`].
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _task: JoinHandle<()>,
}

impl ApiServer {
    /// Bind and start serving. Use [`addr()`](Self::addr) for the resolved
    /// address (relevant when binding port 0).
    pub async fn start(engine: Arc<Engine>, addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("API server listening on {}", local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            Self::accept_loop(listener, engine, shutdown_rx).await;
        });

        Ok(Self {
            addr: local_addr,
            shutdown_tx: Some(shutdown_tx),
            _task: task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    async fn accept_loop(
        listener: TcpListener,
        engine: Arc<Engine>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            debug!("connection from {}", peer);
                            let engine = Arc::clone(&engine);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let engine = Arc::clone(&engine);
                                    async move { route(engine, req).await }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    error!("connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => error!("accept error: {}", e),
                    }
                }
                _ = &mut shutdown_rx => {
                    debug!("API server shutting down");
                    break;
                }
            }
        }
    }
}

type HttpResult = std::result::Result<Response<Full<Bytes>>, hyper::Error>;

async fn route(engine: Arc<Engine>, req: Request<Incoming>) -> HttpResult {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::GET, ["health"]) => {
            json_ok(&serde_json::json!({"status": "healthy", "service": "reconforge"}))
        }
        (&Method::POST, ["api", "v1", "scan", "execute"]) => {
            match read_body(req).await {
                Ok(body) => execute_scan(&engine, &body).await,
                Err(resp) => Ok(resp),
            }
        }
        (&Method::POST, ["api", "v1", "chat", "message"]) => match read_body(req).await {
            Ok(body) => chat_message(&engine, &body).await,
            Err(resp) => Ok(resp),
        },
        (&Method::GET, ["api", "v1", "tools", "capabilities"]) => all_capabilities(&engine).await,
        (&Method::GET, ["api", "v1", "tools", "capabilities", tool]) => {
            tool_capabilities(&engine, tool).await
        }
        (&Method::POST, ["api", "v1", "tools", "validate-config"]) => match read_body(req).await {
            Ok(body) => validate_config(&engine, &body),
            Err(resp) => Ok(resp),
        },
        (&Method::GET, ["api", "v1", "tools", "presets"]) => presets(&engine),
        (&Method::GET, ["api", "v1", "tools", "status"]) => tools_status(&engine).await,
        (&Method::GET, ["api", "v1", "sessions"]) => list_sessions(&engine),
        (&Method::GET, ["api", "v1", "sessions", id, "history"]) => session_history(&engine, id),
        (&Method::GET, ["api", "v1", "sessions", id, "export"]) => {
            export(&engine, id, query.as_deref())
        }
        (&Method::DELETE, ["api", "v1", "sessions", id]) => delete_session(&engine, id),
        _ => Ok(status_json(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: format!("no route for {method} {path}"),
            },
        )),
    };

    response.or_else(|e| {
        error!("handler error: {}", e);
        Ok(error_response(&e))
    })
}

async fn execute_scan(engine: &Engine, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let request: ExecuteScanRequest = parse_json(body)?;
    let scan = ScanRequest {
        target: request.target,
        tools: request.tools,
        tool_configs: request.tool_configs,
        preset: request.preset,
        max_parallel: request.max_parallel,
        session_id: request.session_id,
    };

    // The handle outlives the request only to keep the signal alive; HTTP
    // callers rely on the plan deadline rather than explicit cancellation.
    let (_cancel_handle, signal) = cancellation();
    let outcome = engine.execute_scan(&scan, signal).await?;
    json_ok(&outcome)
}

async fn chat_message(engine: &Engine, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let request: ChatMessageRequest = parse_json(body)?;
    let (_cancel_handle, signal) = cancellation();
    let outcome = engine
        .handle_intent(
            &request.message,
            &request.intent,
            request.session_id.as_deref(),
            signal,
        )
        .await?;
    json_ok(&outcome)
}

async fn all_capabilities(engine: &Engine) -> Result<Response<Full<Bytes>>> {
    let mut tools = BTreeMap::new();
    for descriptor in engine.registry().list() {
        let status = engine.registry().probe(&descriptor.name).await?;
        tools.insert(
            descriptor.name.clone(),
            ToolCapabilities::from_descriptor(descriptor, status.available, status.version),
        );
    }
    json_ok(&serde_json::json!({ "tools": tools }))
}

async fn tool_capabilities(engine: &Engine, tool: &str) -> Result<Response<Full<Bytes>>> {
    let descriptor = engine.registry().describe(tool)?;
    let status = engine.registry().probe(tool).await?;
    json_ok(&ToolCapabilities::from_descriptor(
        descriptor,
        status.available,
        status.version,
    ))
}

fn validate_config(engine: &Engine, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let request: ValidateConfigRequest = parse_json(body)?;
    // Unknown tool is a 404; a config that fails validation is a valid
    // request with valid=false, not a transport error
    engine.registry().describe(&request.tool_name)?;

    let response = match engine
        .registry()
        .validate_config(&request.tool_name, &request.config)
    {
        Ok(_) => ValidateConfigResponse {
            valid: true,
            errors: vec![],
        },
        Err(e) => ValidateConfigResponse {
            valid: false,
            errors: vec![e.to_string()],
        },
    };
    json_ok(&response)
}

fn presets(engine: &Engine) -> Result<Response<Full<Bytes>>> {
    let presets: BTreeMap<&str, &crate::plan::Preset> = engine
        .presets()
        .list()
        .into_iter()
        .map(|p| (p.name.as_str(), p))
        .collect();
    json_ok(&serde_json::json!({ "presets": presets }))
}

async fn tools_status(engine: &Engine) -> Result<Response<Full<Bytes>>> {
    let mut status = BTreeMap::new();
    for descriptor in engine.registry().list() {
        let probe = engine.registry().probe(&descriptor.name).await?;
        status.insert(
            descriptor.name.clone(),
            ToolStatus {
                available: probe.available,
                version: probe.version.unwrap_or_else(|| "unknown".to_string()),
                path: descriptor.command.clone(),
            },
        );
    }
    json_ok(&serde_json::json!({ "tools_status": status }))
}

fn list_sessions(engine: &Engine) -> Result<Response<Full<Bytes>>> {
    let sessions = engine.store().list()?;
    json_ok(&serde_json::json!({ "sessions": sessions }))
}

fn session_history(engine: &Engine, id: &str) -> Result<Response<Full<Bytes>>> {
    let record = engine.store().get(id)?;
    json_ok(&serde_json::json!({
        "session_id": record.session_id,
        "messages": record.turns,
        "findings": record.findings,
    }))
}

fn delete_session(engine: &Engine, id: &str) -> Result<Response<Full<Bytes>>> {
    engine.store().delete(id)?;
    json_ok(&serde_json::json!({ "deleted": true, "session_id": id }))
}

fn export(engine: &Engine, id: &str, query: Option<&str>) -> Result<Response<Full<Bytes>>> {
    let format = query
        .and_then(|q| {
            q.split('&')
                .find_map(|pair| pair.strip_prefix("format="))
                .map(str::to_string)
        })
        .unwrap_or_else(|| "json".to_string());
    let format: ExportFormat = format.parse()?;
    let payload = export_session(engine.store(), id, format)?;
    json_ok(&payload)
}

/// Map engine errors onto transport statuses: structural rejections are 4xx,
/// lookups are 404, everything else is a 500.
fn error_response(error: &Error) -> Response<Full<Bytes>> {
    let status = match error {
        Error::InvalidTarget(_)
        | Error::Validation(_)
        | Error::UnsupportedFormat(_)
        | Error::Serde(_) => StatusCode::BAD_REQUEST,
        Error::ToolNotFound(_) | Error::PresetNotFound(_) | Error::SessionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    status_json(
        status,
        &ErrorResponse {
            error: error.to_string(),
        },
    )
}

async fn read_body(
    req: Request<Incoming>,
) -> std::result::Result<Vec<u8>, Response<Full<Bytes>>> {
    match req.into_body().collect().await {
        Ok(collected) => Ok(collected.to_bytes().to_vec()),
        Err(e) => Err(status_json(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: format!("failed to read request body: {e}"),
            },
        )),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}

fn json_ok<T: serde::Serialize>(value: &T) -> Result<Response<Full<Bytes>>> {
    Ok(status_json(StatusCode::OK, value))
}

fn status_json<T: serde::Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{}"))))
}
