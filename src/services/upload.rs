//! 文件上传服务
//!
//! 文件写入上传目录，同时在聊天记录中追加一条系统消息。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::config::UploadsConfig;
use crate::error::{AppError, Result};
use crate::models::{ChatLog, Sender};
use crate::storage::repository::{ChatLogRepository, EnrollmentRepository};

const DEFAULT_FILENAME: &str = "upload";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._ -]").expect("valid filename pattern"));

/// 待保存的上传文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// 上传结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadReceipt {
    pub ok: bool,
    pub enrollment_id: i64,
    pub filename: String,
    pub stored_name: String,
    pub content_type: String,
    pub bytes: usize,
}

/// 取客户端文件名的最后一段，并替换不安全字符
///
/// 同时处理 `/` 和 `\` 分隔符；结果为空或只剩点号时使用默认名。
pub fn sanitize_filename(raw: Option<&str>) -> String {
    let base = raw
        .unwrap_or_default()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// 存储文件名：`<选课ID>_<UTC 时间戳>_<文件名>`
pub fn stored_name(enrollment_id: i64, at: DateTime<Utc>, filename: &str) -> String {
    format!("{}_{}_{}", enrollment_id, at.format("%Y%m%dT%H%M%SZ"), filename)
}

/// 写入新文件，不覆盖已有文件
///
/// 同名文件已存在时返回冲突；写入中途失败时删除残留文件。
pub async fn write_new_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(AppError::Conflict(format!(
                "An upload named {} already exists, please retry",
                path.file_name().unwrap_or_default().to_string_lossy()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let written = match file.write_all(data).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        drop(file);
        remove_quietly(path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove upload");
    }
}

/// 上传服务 trait
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn store(&self, enrollment_id: i64, file: UploadedFile) -> Result<UploadReceipt>;
}

/// 上传服务实现
pub struct UploadServiceImpl {
    config: UploadsConfig,
    enrollments: Arc<dyn EnrollmentRepository>,
    chat_logs: Arc<dyn ChatLogRepository>,
}

impl UploadServiceImpl {
    pub fn new(
        config: UploadsConfig,
        enrollments: Arc<dyn EnrollmentRepository>,
        chat_logs: Arc<dyn ChatLogRepository>,
    ) -> Self {
        Self {
            config,
            enrollments,
            chat_logs,
        }
    }

    fn target_path(&self, stored_name: &str) -> PathBuf {
        self.config.dir.join(stored_name)
    }
}

#[async_trait]
impl UploadService for UploadServiceImpl {
    async fn store(&self, enrollment_id: i64, file: UploadedFile) -> Result<UploadReceipt> {
        self.enrollments
            .get_by_id(enrollment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Enrollment not found: {}", enrollment_id)))?;

        if file.data.len() > self.config.max_bytes {
            return Err(AppError::Validation(format!(
                "File exceeds the {} byte upload limit",
                self.config.max_bytes
            )));
        }

        let filename = sanitize_filename(file.filename.as_deref());
        let content_type = file
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let stored_name = stored_name(enrollment_id, Utc::now(), &filename);

        let path = self.target_path(&stored_name);
        tokio::fs::create_dir_all(&self.config.dir).await?;
        write_new_file(&path, &file.data).await?;

        let bytes = file.data.len();
        let logged = self
            .chat_logs
            .append(&ChatLog::new(
                enrollment_id,
                Sender::System,
                format!("[FILE_UPLOADED] {} ({}, {} bytes)", stored_name, content_type, bytes),
            ))
            .await;
        if let Err(e) = logged {
            remove_quietly(&path).await;
            return Err(e);
        }

        info!(enrollment_id, %stored_name, bytes, "File uploaded");

        Ok(UploadReceipt {
            ok: true,
            enrollment_id,
            filename,
            stored_name,
            content_type,
            bytes,
        })
    }
}

/// 创建上传服务
pub fn create_upload_service(
    config: UploadsConfig,
    enrollments: Arc<dyn EnrollmentRepository>,
    chat_logs: Arc<dyn ChatLogRepository>,
) -> Box<dyn UploadService> {
    Box::new(UploadServiceImpl::new(config, enrollments, chat_logs))
}
