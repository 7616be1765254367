use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use tracing::debug;
use validator::Validate;

use crate::{
    api::{app_state::AppState, dto::chat_dto::*},
    error::AppError,
};

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Chat turn for enrollment: {}", request.enrollment_id);
    request.validate()?;

    let outcome = state
        .chat_service
        .chat(request.enrollment_id, &request.message)
        .await?;

    Ok(Json(ChatResponse {
        agent_response: outcome.reply,
        workspace_update: outcome.workspace_update,
    }))
}

pub async fn chat_history(
    State(state): State<AppState>,
    Query(params): Query<ChatHistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "Getting chat history: enrollment_id={}, limit={}",
        params.enrollment_id, params.limit
    );
    params.validate()?;

    let logs = state
        .chat_service
        .history(params.enrollment_id, params.limit)
        .await?;

    Ok(Json(ChatHistoryResponse {
        enrollment_id: params.enrollment_id,
        items: logs.into_iter().map(ChatHistoryItem::from).collect(),
    }))
}
