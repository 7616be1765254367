//! 可观测性模块
//!
//! 提供结构化日志初始化和健康检查端点。

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::config::LoggingConfig;
use crate::storage::factory::{StorageFactory, StorageInstance};

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<HealthCheck>,
}

/// 单个健康检查项
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
    pub latency_ms: Option<u64>,
}

/// 健康检查结果
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub name: String,
    pub healthy: bool,
    pub message: String,
    pub latency_ms: u64,
}

impl From<&HealthCheckResult> for HealthCheck {
    fn from(result: &HealthCheckResult) -> Self {
        Self {
            name: result.name.clone(),
            status: status_label(result.healthy).to_string(),
            message: Some(result.message.clone()),
            latency_ms: Some(result.latency_ms),
        }
    }
}

fn status_label(healthy: bool) -> &'static str {
    if healthy { "healthy" } else { "unhealthy" }
}

/// 可观测性状态
#[derive(Clone)]
pub struct ObservabilityState {
    pub storage: StorageInstance,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: impl Into<String>, storage: StorageInstance) -> Self {
        Self {
            storage,
            start_time: Utc::now(),
            version: version.into(),
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }

    /// 执行依赖检查
    pub async fn run_checks(&self) -> Vec<HealthCheckResult> {
        let started = Instant::now();
        let (healthy, message) = match StorageFactory::health_check(&self.storage).await {
            Ok(true) => (true, "Connected".to_string()),
            Ok(false) => (false, "Storage reported unhealthy".to_string()),
            Err(e) => (false, e.to_string()),
        };

        vec![HealthCheckResult {
            name: "storage".to_string(),
            healthy,
            message,
            latency_ms: started.elapsed().as_millis() as u64,
        }]
    }
}

// ===== Health Check Handlers =====

/// 获取完整健康状态
pub async fn health_check(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let checks = state.run_checks().await;
    let all_healthy = checks.iter().all(|c| c.healthy);

    let health_status = HealthStatus {
        status: status_label(all_healthy).to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        checks: checks.iter().map(HealthCheck::from).collect(),
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_status))
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// 就绪检查（检查依赖服务）
pub async fn readiness(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let checks = state.run_checks().await;

    if checks.iter().all(|c| c.healthy) {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
    }
}

/// 版本信息端点
pub async fn version(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Structured Logging =====

/// 构建日志过滤器，`RUST_LOG` 优先于配置
fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{level},tower_http=info")))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化结构化日志
///
/// 控制台输出始终开启；配置了 `log_dir` 时额外按天滚动写文件。
/// 返回的 guard 必须在进程生命周期内持有，否则文件日志会丢失。
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let console_layer = if config.structured {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .boxed()
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "homegrown.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let initialized = tracing_subscriber::registry()
        .with(build_env_filter(&config.level))
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if initialized.is_ok() {
        tracing::info!(
            level = %config.level,
            structured = config.structured,
            log_dir = ?config.log_dir,
            "Logging initialized"
        );
    }

    guard
}
