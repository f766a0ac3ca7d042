use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use directline_channels::DirectLineError;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::server::routes;
use crate::state::{ApiInfo, AppState, SendRequest, SendResponse};

/// Text returned when the bot answered with an empty message
pub const EMPTY_REPLY_TEXT: &str = "No response from the bot.";

/// Any session failure, reported as HTTP 500 with a `detail` field
pub struct ApiError(DirectLineError);

impl From<DirectLineError> for ApiError {
    fn from(e: DirectLineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Direct Line bridge!" }))
}

pub async fn send_handler(
    State(state): State<AppState>,
    Json(payload): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let trace_id = Uuid::new_v4();
    tracing::info!(%trace_id, "Sending message to bot: {}", payload.message);

    // Dropping this request (client gone) or shutting down cancels the reply poll.
    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let reply = state
        .session
        .exchange(payload.message, None, cancel)
        .await
        .map_err(|e| {
            tracing::error!(%trace_id, "Error in /send endpoint: {}", e);
            ApiError::from(e)
        })?;

    tracing::info!(%trace_id, conversation_id = %reply.conversation_id, "Bot replied");

    let bot_response = if reply.text.is_empty() {
        EMPTY_REPLY_TEXT.to_string()
    } else {
        reply.text
    };

    Ok(Json(SendResponse {
        bot_response,
        citations: reply.citation,
        conversation_id: reply.conversation_id,
        name: payload.name,
    }))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn api_info_handler(State(state): State<AppState>) -> Json<ApiInfo> {
    Json(state.info.as_ref().clone())
}

pub async fn index_handler() -> Json<Value> {
    Json(json!({ "routes": routes() }))
}
