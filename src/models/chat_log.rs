use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 消息发送方
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// 学生消息
    Student,
    /// 导师回复
    Agent,
    /// 系统记录（如文件上传）
    System,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sender::Student => "student",
            Sender::Agent => "agent",
            Sender::System => "system",
        };
        f.write_str(s)
    }
}

/// 聊天记录
///
/// 只追加，不修改不删除；按时间戳排序。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatLog {
    /// 记录唯一标识
    pub id: String,
    /// 所属选课记录
    pub enrollment_id: i64,
    /// 发送方
    pub sender: Sender,
    /// 消息内容
    pub content: String,
    /// 写入时间
    pub timestamp: DateTime<Utc>,
}

impl ChatLog {
    /// 创建新聊天记录
    pub fn new(enrollment_id: i64, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            enrollment_id,
            sender,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_serializes_lowercase() {
        let json = serde_json::to_string(&Sender::Student).unwrap();
        assert_eq!(json, "\"student\"");
        assert_eq!(Sender::System.to_string(), "system");
    }

    #[test]
    fn test_chat_log_new() {
        let log = ChatLog::new(7, Sender::Agent, "hello");
        assert_eq!(log.enrollment_id, 7);
        assert_eq!(log.sender, Sender::Agent);
        assert!(!log.id.is_empty());
    }
}
