//! HTTP API gateway for AgriSense.
//!
//! Exposes the REST surface for the sensor pipeline and the chat assistant:
//!
//! - `GET    /dht`                       — proxy the device's live payload
//! - `POST   /set`                       — fetch the device and persist one reading
//! - `GET    /getall`                    — list readings, newest first
//! - `DELETE /delete`                    — delete all readings
//! - `POST   /conversations`             — create a conversation
//! - `GET    /conversations`             — list conversations, latest activity first
//! - `GET    /messages/{conversationId}` — list a conversation's messages, oldest first
//! - `POST   /`                          — chat: answer a user message
//! - `DELETE /conversations`             — delete all conversations and messages
//! - `GET    /version`                   — version-check payload
//! - `GET    /health`                    — liveness probe
//!
//! Built on Axum. Every handler degrades failures to a JSON error payload;
//! the chat endpoint never surfaces a provider error at all — it always
//! answers 200 with a reply string.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use agrisense_chat::{ChatPipeline, CompletionClient};
use agrisense_config::{AppConfig, VersionConfig};
use agrisense_device::DeviceClient;
use agrisense_store::Store;

/// Shared application state for the gateway.
pub struct AppState {
    pub store: Arc<Store>,
    pub device: DeviceClient,
    pub pipeline: ChatPipeline,
    pub version: VersionConfig,
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(chat_handler))
        .route("/dht", get(dht_handler))
        .route("/set", post(set_handler))
        .route("/getall", get(getall_handler))
        .route("/delete", delete(delete_readings_handler))
        .route("/conversations", post(create_conversation_handler))
        .route("/conversations", get(list_conversations_handler))
        .route("/conversations", delete(delete_conversations_handler))
        .route("/messages/{conversationId}", get(list_messages_handler))
        .route("/version", get(version_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Builds the store, device client, and chat pipeline ONCE and shares them
/// via `Arc` across all requests — no per-request connection creation.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let store = Arc::new(Store::new(&config.database.path).await?);

    if !config.has_api_key() {
        tracing::warn!("No provider API key configured — chat requests will fail soft");
    }

    let completions = CompletionClient::new(
        &config.provider.base_url,
        config.provider.api_key.clone().unwrap_or_default(),
        &config.provider.model,
    );

    let state = Arc::new(AppState {
        store: store.clone(),
        device: DeviceClient::new(&config.device.url),
        pipeline: ChatPipeline::new(store, completions),
        version: config.version.clone(),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Error payloads ---

/// A handler failure rendered as a JSON body.
///
/// The payload key is fixed per route: the device proxy answers `{error}`,
/// everything else answers `{message}`.
pub struct ApiError {
    status: StatusCode,
    key: &'static str,
    text: &'static str,
}

impl ApiError {
    fn internal(text: &'static str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            key: "message",
            text,
        }
    }

    fn bad_request(text: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            key: "message",
            text,
        }
    }

    fn device_unavailable() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            key: "error",
            text: "Failed to send sensor data",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(self.key.into(), serde_json::Value::String(self.text.into()));
        (self.status, Json(serde_json::Value::Object(body))).into_response()
    }
}

// --- Sensor handlers ---

async fn dht_handler(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    match state.device.fetch().await {
        Ok(data) => Ok(Json(json!({ "data": data }))),
        Err(e) => {
            error!(error = %e, "Device fetch failed");
            Err(ApiError::device_unavailable())
        }
    }
}

async fn set_handler(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    let reading = state.device.fetch_reading().await.map_err(|e| {
        error!(error = %e, "Device fetch failed");
        ApiError::internal("Internal server error")
    })?;

    state.store.insert_reading(&reading).await.map_err(|e| {
        error!(error = %e, "Failed to persist reading");
        ApiError::internal("Internal server error")
    })?;

    Ok(Json(json!({ "saved": true, "data": reading })))
}

async fn getall_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<agrisense_core::SensorReading>>, ApiError> {
    let readings = state.store.list_readings().await.map_err(|e| {
        error!(error = %e, "Failed to list readings");
        ApiError::internal("Internal server error")
    })?;

    Ok(Json(readings))
}

async fn delete_readings_handler(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_readings().await.map_err(|e| {
        error!(error = %e, "Failed to delete readings");
        ApiError::internal("Internal server error")
    })?;

    Ok(Json(json!({ "message": "Deleted successfully" })))
}

// --- Conversation handlers ---

async fn create_conversation_handler(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<agrisense_core::Conversation>), ApiError> {
    let conversation = state.store.create_conversation().await.map_err(|e| {
        error!(error = %e, "Failed to create conversation");
        ApiError::internal("Failed to create conversation")
    })?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

async fn list_conversations_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<agrisense_core::Conversation>>, ApiError> {
    let conversations = state.store.list_conversations().await.map_err(|e| {
        error!(error = %e, "Failed to list conversations");
        ApiError::internal("Failed to get conversations")
    })?;

    Ok(Json(conversations))
}

async fn list_messages_handler(
    State(state): State<SharedState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<agrisense_core::StoredMessage>>, ApiError> {
    let messages = state.store.messages_for(&conversation_id).await.map_err(|e| {
        error!(error = %e, "Failed to list messages");
        ApiError::internal("Failed to get messages")
    })?;

    Ok(Json(messages))
}

async fn delete_conversations_handler(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_all_conversations().await.map_err(|e| {
        error!(error = %e, "Failed to delete conversations");
        ApiError::internal("Failed to delete conversations")
    })?;

    Ok(Json(json!({ "message": "All conversations deleted" })))
}

// --- Chat handler ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    user_message: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    message: String,
}

/// The chat endpoint: validates its two fields, then lets the pipeline do
/// the rest. Provider failures never reach this layer — the pipeline
/// always hands back a reply string, so the response is always 200.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_message = payload
        .user_message
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing fields"))?;
    let conversation_id = payload
        .conversation_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing fields"))?;

    let reply = state
        .pipeline
        .respond(&user_message, Some(&conversation_id))
        .await;

    Ok(Json(ChatResponse { message: reply }))
}

// --- Misc handlers ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionResponse {
    latest_version: String,
    download_url: String,
}

async fn version_handler(State(state): State<SharedState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        latest_version: state.version.latest.clone(),
        download_url: state.version.download_url.clone(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
