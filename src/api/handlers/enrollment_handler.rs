use axum::{Json, extract::State, response::IntoResponse};
use tracing::debug;

use crate::{api::app_state::AppState, error::AppError};

pub async fn list_enrollments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Listing enrollments");

    let summaries = state.enrollment_service.list_summaries().await?;
    Ok(Json(summaries))
}
