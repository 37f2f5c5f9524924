//! File upload handler.

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::{
    config::Config,
    error::AppError,
    middleware::auth::AuthContext,
    models::upload::UploadKind,
    services::storage_service,
};

/// Upload a document or image.
///
/// # Endpoint
///
/// `POST /api/v1/uploads` (multipart/form-data)
///
/// # Fields
///
/// - `kind`: `document` or `image`, sent before `file`
/// - `file`: the file; its part `Content-Type` decides the extension
///
/// # Response
///
/// - **201 Created**: `{ url, kind, content_type, size_bytes }`
/// - **400**: missing fields, empty or oversized file, unaccepted type
pub async fn upload_file(
    State(config): State<Arc<Config>>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut kind: Option<UploadKind> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("kind") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
                kind = Some(UploadKind::parse(&value).ok_or_else(|| {
                    AppError::InvalidRequest("kind must be 'document' or 'image'".to_string())
                })?);
            }
            Some("file") => {
                let kind = kind.ok_or_else(|| {
                    AppError::InvalidRequest("The kind field must precede file".to_string())
                })?;
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidRequest(format!("Could not read file: {}", e)))?;

                let upload =
                    storage_service::save_upload(&config, kind, &content_type, &bytes).await?;
                tracing::info!(user_id = %auth.user_id, url = %upload.url, "File uploaded");

                return Ok((StatusCode::CREATED, Json(upload)));
            }
            _ => {}
        }
    }

    Err(AppError::InvalidRequest("file field is required".to_string()))
}
