//! LLM 网关
//!
//! 每轮聊天最多一次外部调用，不重试、不缓存。配额/限流失败时退化为离线回复。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::config::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::models::Module;

/// 模块完成标记
pub const COMPLETION_MARKER: &str = "[MODULE_COMPLETE]";

/// 离线模式下视为“完成”的关键词
const COMPLETION_INTENTS: &[&str] = &[
    "done",
    "completed",
    "finish",
    "finished",
    "i did it",
    "module complete",
];

/// LLM 网关 trait
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// 生成导师回复；返回的文本保持原样，完成标记由调用方处理
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        current_module: &Module,
    ) -> Result<String>;
}

/// 离线回复，只依赖学生消息和当前模块
pub fn offline_reply(user_message: &str, current_module: &Module) -> String {
    let message = user_message.trim().to_lowercase();
    if COMPLETION_INTENTS.iter().any(|token| message.contains(token)) {
        return format!(
            "Nice work, you met the objective for '{}'. {}",
            current_module.title, COMPLETION_MARKER
        );
    }

    let objective = current_module.objective.trim();
    if !objective.is_empty() {
        return format!(
            "Let's focus on the objective: {} What would you like to try next?",
            objective
        );
    }

    "Tell me what you tried, and I'll guide your next step.".to_string()
}

/// 外部调用失败的描述
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayFailure {
    /// HTTP 状态码（传输层错误时为空）
    pub http_status: Option<u16>,
    /// 接口返回的错误状态，如 `RESOURCE_EXHAUSTED`
    pub api_status: Option<String>,
    pub message: String,
}

impl GatewayFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            http_status: None,
            api_status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for GatewayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.http_status, &self.api_status) {
            (Some(code), Some(status)) => write!(f, "{} {}: {}", code, status, self.message),
            (Some(code), None) => write!(f, "{}: {}", code, self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// 是否为限流/配额耗尽
///
/// 先看结构化状态，再对错误文本做 `429` / `quota` / `rate` 子串匹配。
pub fn is_rate_limited(failure: &GatewayFailure) -> bool {
    if failure.http_status == Some(429) {
        return true;
    }
    if failure
        .api_status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("RESOURCE_EXHAUSTED"))
    {
        return true;
    }

    let text = failure.message.to_lowercase();
    ["429", "quota", "rate"].iter().any(|needle| text.contains(needle))
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiCandidateContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiResponsePart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Gemini 生成接口网关
pub struct GeminiGateway {
    client: reqwest::Client,
    config: LlmConfig,
}

impl GeminiGateway {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, config })
    }

    /// 拼接发送给模型的完整提示词
    pub fn full_prompt(system_prompt: &str, user_message: &str) -> String {
        format!("{}\n\nUser: {}", system_prompt, user_message)
    }

    async fn generate(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> std::result::Result<String, GatewayFailure> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        debug!(model = %self.config.model, prompt_len = prompt.len(), "Calling generation API");

        // 错误文本会参与限流判断，去掉 URL 避免模型路径干扰匹配
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayFailure {
                http_status: e.status().map(|s| s.as_u16()),
                api_status: None,
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let (message, api_status) = match serde_json::from_str::<GeminiErrorEnvelope>(&raw) {
                Ok(envelope) => (envelope.error.message, envelope.error.status),
                Err(_) => (raw, None),
            };
            return Err(GatewayFailure {
                http_status: Some(status.as_u16()),
                api_status,
                message,
            });
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GatewayFailure::new(e.without_url().to_string()))?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GatewayFailure::new("Model returned no text candidates"));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        current_module: &Module,
    ) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Config("GEMINI_API_KEY is not configured".to_string()))?;

        let prompt = Self::full_prompt(system_prompt, user_message);
        match self.generate(api_key, &prompt).await {
            Ok(text) => Ok(text),
            Err(failure) if is_rate_limited(&failure) => {
                warn!(error = %failure, "Generation API rate limited, using offline reply");
                Ok(offline_reply(user_message, current_module))
            }
            Err(failure) => Err(AppError::Gateway(failure.to_string())),
        }
    }
}

/// 离线网关，不发起任何外部调用
pub struct OfflineGateway;

#[async_trait]
impl LlmGateway for OfflineGateway {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_message: &str,
        current_module: &Module,
    ) -> Result<String> {
        Ok(offline_reply(user_message, current_module))
    }
}

/// 根据配置创建网关
///
/// `offline_fallback` 打开时使用离线网关，否则调用 Gemini。
pub fn create_llm_gateway(config: &LlmConfig) -> Result<Box<dyn LlmGateway>> {
    if config.offline_fallback {
        return Ok(Box::new(OfflineGateway));
    }
    Ok(Box::new(GeminiGateway::new(config.clone())?))
}
