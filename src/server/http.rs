//! HTTP boundary for the chat/UI collaborator.
//!
//! The chat front-end never touches the gatekeeper types directly; it posts
//! a candidate and gets back either a serialized execution report or a
//! rejection with a stable `reason_code`. Rejection messages are the
//! user-safe ones from [`Verdict::public_message`](crate::gatekeeper::Verdict).

use anyhow::Result;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::gatekeeper::{Gatekeeper, GatekeeperError};

pub struct Server {
    config: Config,
}

struct AppState {
    gatekeeper: Gatekeeper,
}

impl Server {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let gatekeeper = Gatekeeper::new(&self.config)?;
        let state = Arc::new(AppState { gatekeeper });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = Router::new()
            .route("/health", get(health_check))
            .route("/api/commands", post(submit_command))
            .route("/api/profiles/{os}", get(get_profile))
            .route("/api/audit/recent", get(audit_recent))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state);

        let addr: SocketAddr =
            format!("{}:{}", self.config.server.bind, self.config.server.port).parse()?;

        info!("Starting HTTP server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

// Error response type
struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
struct SubmitRequest {
    command: String,
    os: String,
    /// Generated server-side when the front-end does not supply one.
    session_id: Option<String>,
}

async fn submit_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitRequest>,
) -> Response {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("web-{}", uuid::Uuid::new_v4()));

    match state
        .gatekeeper
        .submit(&req.command, &req.os, &session_id)
        .await
    {
        Ok(submission) => match serde_json::to_value(&submission) {
            Ok(mut value) => {
                value["session_id"] = json!(session_id);
                Json(value).into_response()
            }
            Err(e) => {
                AppError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        },
        Err(err) => {
            let status = match &err {
                GatekeeperError::UnknownOs(_) => StatusCode::BAD_REQUEST,
                GatekeeperError::Spawn { .. } => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(json!({
                    "status": "error",
                    "reason_code": err.reason_code(),
                    "message": err.to_string(),
                    "session_id": session_id,
                })),
            )
                .into_response()
        }
    }
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(os): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let profile = state
        .gatekeeper
        .registry()
        .lookup(&os)
        .map_err(|e| AppError(StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(json!({
        "os": profile.os().as_str(),
        "commands": profile.command_names(),
    })))
}

#[derive(Deserialize)]
struct RecentParams {
    limit: Option<usize>,
}

async fn audit_recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let limit = params.limit.unwrap_or(50).min(500);
    let records = state
        .gatekeeper
        .audit()
        .recent(limit)
        .map_err(|e| AppError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "records": records })))
}
