//! Enrollment Routes

use crate::api::handlers::enrollment_handler::*;
use axum::{Router, routing::get};

use crate::api::app_state::AppState;

/// 创建选课路由器
pub fn create_enrollment_router() -> Router<AppState> {
    Router::new().route("/enrollments", get(list_enrollments))
}
