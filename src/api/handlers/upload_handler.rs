use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::upload_dto::UploadForm},
    error::AppError,
    services::upload::UploadedFile,
};

fn multipart_error(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
}

/// 读取表单中的 `enrollment_id` 和 `file` 字段，忽略其他字段
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("enrollment_id") => {
                form.enrollment_id = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (enrollment_id, file) = read_form(multipart).await?.into_parts()?;
    debug!(
        "Uploading file for enrollment {}: {:?} ({} bytes)",
        enrollment_id,
        file.filename,
        file.data.len()
    );

    let receipt = state.upload_service.store(enrollment_id, file).await?;
    Ok(Json(receipt))
}
