//! Upload Routes
//!
//! 上传路由使用单独的请求体上限。

use crate::api::handlers::upload_handler::*;
use axum::{Router, extract::DefaultBodyLimit, routing::post};
use std::convert::Infallible;
use tower_http::limit::RequestBodyLimitLayer;

use crate::api::app_state::AppState;

/// multipart 边界和表单字段的额外空间
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// 创建上传路由器
pub fn create_upload_router(max_bytes: usize) -> Router<AppState> {
    Router::new().route(
        "/uploads",
        post(upload_file)
            .layer::<_, Infallible>(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(
                max_bytes.saturating_add(MULTIPART_OVERHEAD),
            )),
    )
}
