//! 上传 DTO

use crate::error::AppError;
use crate::services::upload::UploadedFile;

/// multipart 表单解析结果
#[derive(Debug, Default)]
pub struct UploadForm {
    pub enrollment_id: Option<String>,
    pub file: Option<UploadedFile>,
}

impl UploadForm {
    /// 校验必填字段
    pub fn into_parts(self) -> Result<(i64, UploadedFile), AppError> {
        let raw_id = self
            .enrollment_id
            .ok_or_else(|| AppError::Validation("Missing form field: enrollment_id".to_string()))?;
        let enrollment_id = raw_id.trim().parse::<i64>().map_err(|_| {
            AppError::Validation(format!("enrollment_id must be an integer, got '{}'", raw_id))
        })?;
        let file = self
            .file
            .ok_or_else(|| AppError::Validation("Missing form field: file".to_string()))?;

        Ok((enrollment_id, file))
    }
}
