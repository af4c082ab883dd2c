use crate::api::errors::{api_error, ApiError};
use crate::api::middleware::CorrelationId;
use crate::app::AppContext;
use crate::services::{ChatHistoryResponse, ChatMessageRequest, ChatMessageResponse};
use axum::http::StatusCode;
use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::info;

/// Runs one chat message through the pipeline
///
/// # Returns
/// * `Result<Json<ChatMessageResponse>, ApiError>` - The answer, or a 400
///   when the message is empty. Pipeline failures answer with the fallback text
#[axum::debug_handler]
pub async fn post_message(
    Extension(ctx): Extension<Arc<AppContext>>,
    Extension(CorrelationId(correlation_id)): Extension<CorrelationId>,
    Json(payload): Json<ChatMessageRequest>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "message must not be empty",
        ));
    }

    let response = ctx
        .chat
        .process_message(&payload.message, &correlation_id)
        .await?;
    Ok(Json(response))
}

/// Lists every answered message
pub async fn get_history(
    Extension(ctx): Extension<Arc<AppContext>>,
    Extension(CorrelationId(correlation_id)): Extension<CorrelationId>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let history = ctx.chat.history().await?;
    info!(
        correlation_id = %correlation_id,
        history_length = history.messages.len(),
        "Retrieving chat history"
    );
    Ok(Json(history))
}
