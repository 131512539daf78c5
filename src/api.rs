//! REST API server for the financial query assistant
//!
//! Exposes the chat pipeline via HTTP endpoints for the frontend.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::AssistantError;
use crate::models::ChatRequest;
use crate::pipeline::ChatPipeline;
use crate::Result;

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<ChatPipeline>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "success")
}

/// =============================
/// Chat Endpoint
/// =============================

/// Every failure, including a malformed or oversized body, is reported as 500 `{"error": ...}`
async fn chat_handler(
    State(state): State<ApiState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> (StatusCode, Json<Value>) {
    let request_id = Uuid::new_v4();

    let result = run_chat(&state, body)
        .instrument(info_span!("chat", %request_id))
        .await;

    match result {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => {
            error!(%request_id, "Chat request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn run_chat(state: &ApiState, body: std::result::Result<Bytes, BytesRejection>) -> Result<Value> {
    let body = body.map_err(|e| AssistantError::InvalidRequest(e.to_string()))?;
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| AssistantError::InvalidRequest(e.to_string()))?;

    info!(chars = request.chat.len(), "Received chat message");

    state.pipeline.handle(&request.chat).await?.into_body()
}

/// =============================
/// Router
/// =============================

pub fn create_router(pipeline: Arc<ChatPipeline>) -> Router {
    let state = ApiState { pipeline };

    Router::new()
        .route("/health-check", get(health_check))
        .route("/health-check-route", get(health_check))
        .route("/chat", post(chat_handler))
        .route("/chat-route", post(chat_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    pipeline: Arc<ChatPipeline>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(pipeline);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
