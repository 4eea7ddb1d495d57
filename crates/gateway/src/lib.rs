//! HTTP orchestrator service for Intentus.
//!
//! Accepts intentions over HTTP, runs them through the [`Agent`] and
//! returns the outbound run payload. Also exposes health, service info
//! and the registered tool list.
//!
//! Built on Axum.

use axum::extract::rejection::JsonRejection;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::{self, Next},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use intentus_agent::Agent;
use intentus_core::intention::Intention;
use intentus_core::run::RunResultPayload;
use intentus_core::tool::ToolRegistry;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<Agent>,
    pub tools: Arc<ToolRegistry>,
    /// Bearer secret; `None` disables authentication
    pub api_key: Option<String>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// `/orchestrate` and `/tools` sit behind the bearer check; `/` and
/// `/health` are always open.
pub fn build_router(state: SharedState) -> Router {
    if state.api_key.is_none() {
        warn!("No API key configured; authentication is disabled");
    }

    let protected = Router::new()
        .route("/orchestrate", post(orchestrate_handler))
        .route("/tools", get(tools_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Builds the reasoner, the enabled tools and the agent once, then serves
/// until the listener fails.
pub async fn start(config: intentus_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let reasoner = intentus_providers::build_reasoner(&config)?;
    let tools = Arc::new(intentus_tools::default_registry(&config.agent.enabled_tools));
    info!(
        engine = %config.agent.llm_engine,
        tools = ?tools.names(),
        "Orchestrator initialized"
    );

    let agent = Arc::new(Agent::new(
        Arc::new(reasoner),
        tools.clone(),
        config.agent.clone(),
    ));

    let state = Arc::new(GatewayState {
        agent,
        tools,
        api_key: config.gateway.api_key.clone(),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "intentus",
        "description": "Intention orchestrator: plans tool use with a language model and answers",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /orchestrate": "Run an intention through the agent",
            "GET /health": "Liveness check",
            "GET /tools": "Registered tools",
        },
    }))
}

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
}

async fn tools_handler(State(state): State<SharedState>) -> Json<Vec<ToolInfo>> {
    let tools = state
        .tools
        .list()
        .into_iter()
        .map(|spec| ToolInfo {
            name: spec.name,
            description: spec.description,
        })
        .collect();
    Json(tools)
}

async fn orchestrate_handler(
    State(state): State<SharedState>,
    payload: Result<Json<Intention>, JsonRejection>,
) -> (StatusCode, Json<RunResultPayload>) {
    let intention = match payload {
        Ok(Json(intention)) => intention,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected intention payload");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(RunResultPayload::rejected(rejection.body_text())),
            );
        }
    };

    if let Err(e) = intention.validate() {
        warn!(session_id = %intention.session_id, error = %e, "Invalid intention");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RunResultPayload::rejected(e.to_string())),
        );
    }

    info!(
        session_id = %intention.session_id,
        intention_type = %intention.intention_type,
        "Intention received"
    );

    match state.agent.run_intention(&intention).await {
        Ok(result) => (StatusCode::OK, Json(RunResultPayload::from(&result))),
        Err(e) => {
            error!(session_id = %intention.session_id, error = %e, "Agent refused the intention");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(RunResultPayload::rejected(e.to_string())),
            )
        }
    }
}

/// Bearer authentication for the protected routes.
///
/// Requires `Authorization: Bearer <api_key>` when a key is configured.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(next.run(req).await),
        _ => {
            warn!(path = %req.uri().path(), "Unauthorized request: missing or invalid bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
