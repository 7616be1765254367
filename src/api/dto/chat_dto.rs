//! 聊天 DTO
//!
//! 定义聊天和历史记录接口的请求和响应数据结构。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{ChatLog, Sender};
use crate::services::chat::WorkspaceUpdate;

/// 历史记录默认条数
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// 聊天请求
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    /// 选课 ID
    pub enrollment_id: i64,
    /// 学生消息
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
}

/// 聊天响应
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// 导师回复（已去掉完成标记）
    pub agent_response: String,
    /// 模块解锁信息，未推进时为 `null`
    pub workspace_update: Option<WorkspaceUpdate>,
}

/// 历史记录查询参数
#[derive(Debug, Deserialize, Validate)]
pub struct ChatHistoryParams {
    pub enrollment_id: i64,
    #[serde(default = "default_history_limit")]
    #[validate(range(min = 1, max = 500, message = "limit must be between 1 and 500"))]
    pub limit: usize,
}

/// 单条历史记录
#[derive(Debug, Serialize)]
pub struct ChatHistoryItem {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatLog> for ChatHistoryItem {
    fn from(log: ChatLog) -> Self {
        Self {
            id: log.id,
            sender: log.sender,
            content: log.content,
            timestamp: log.timestamp,
        }
    }
}

/// 历史记录响应
#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub enrollment_id: i64,
    pub items: Vec<ChatHistoryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_rejects_empty_message() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"enrollment_id": 1, "message": ""}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_history_limit_defaults_and_bounds() {
        let params: ChatHistoryParams = serde_json::from_str(r#"{"enrollment_id": 2}"#).unwrap();
        assert_eq!(params.limit, DEFAULT_HISTORY_LIMIT);
        assert!(params.validate().is_ok());

        for limit in [0, 501] {
            let params = ChatHistoryParams {
                enrollment_id: 2,
                limit,
            };
            assert!(params.validate().is_err());
        }
    }
}
