//! API 模块
//!
//! 提供 REST API 支持。

#[cfg(test)]
mod api_tests;
pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;

use crate::api::app_state::AppState;
use crate::api::middleware::{cors_layer, security_headers_middleware};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn create_router(app_state: AppState) -> Router {
    let config = app_state.config.clone();

    let api = Router::new()
        .merge(routes::chat_routes::create_chat_router())
        .merge(routes::enrollment_routes::create_enrollment_router())
        .merge(routes::upload_routes::create_upload_router(
            config.uploads.max_bytes,
        ));

    let prefix = config.server.api_prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(prefix, api)
    };

    router
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
