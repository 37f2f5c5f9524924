//! Local file storage for uploads.
//!
//! Files land under `{upload_dir}/{folder}/{uuid}.{ext}` and are served back
//! at `{public_base_url}/uploads/{folder}/{file}`.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::upload::{UploadKind, UploadResponse},
};

/// Check an upload against the size limit and accepted types.
///
/// Returns the file extension to store it under.
pub fn validate_upload(
    kind: UploadKind,
    content_type: &str,
    size: usize,
    max_bytes: usize,
) -> Result<&'static str, AppError> {
    if size == 0 {
        return Err(AppError::InvalidRequest("Uploaded file is empty".to_string()));
    }
    if size > max_bytes {
        return Err(AppError::InvalidRequest(format!(
            "File exceeds the {} byte limit",
            max_bytes
        )));
    }

    kind.extension_for(content_type).ok_or_else(|| {
        AppError::InvalidRequest(format!(
            "Content type '{}' is not accepted for {} uploads",
            content_type,
            kind.folder()
        ))
    })
}

fn stored_path(root: &Path, kind: UploadKind, file_name: &str) -> PathBuf {
    root.join(kind.folder()).join(file_name)
}

pub fn public_url(base_url: &str, kind: UploadKind, file_name: &str) -> String {
    format!("{}/uploads/{}/{}", base_url, kind.folder(), file_name)
}

/// Validate and write an upload, returning its public URL.
pub async fn save_upload(
    config: &Config,
    kind: UploadKind,
    content_type: &str,
    bytes: &[u8],
) -> Result<UploadResponse, AppError> {
    let extension = validate_upload(kind, content_type, bytes.len(), config.max_upload_bytes)?;
    let file_name = format!("{}.{}", Uuid::new_v4(), extension);

    let path = stored_path(Path::new(&config.upload_dir), kind, &file_name);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, bytes).await?;

    tracing::info!(
        path = %path.display(),
        size_bytes = bytes.len(),
        "Stored upload"
    );

    Ok(UploadResponse {
        url: public_url(config.base_url(), kind, &file_name),
        kind,
        content_type: content_type.to_string(),
        size_bytes: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_oversized_files() {
        assert!(validate_upload(UploadKind::Image, "image/png", 0, 10).is_err());
        assert!(validate_upload(UploadKind::Image, "image/png", 11, 10).is_err());
        assert_eq!(
            validate_upload(UploadKind::Image, "image/png", 10, 10).unwrap(),
            "png"
        );
    }

    #[test]
    fn rejects_unaccepted_types() {
        let err = validate_upload(UploadKind::Image, "application/pdf", 5, 10).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn public_url_uses_folder() {
        assert_eq!(
            public_url("http://localhost:3000", UploadKind::Document, "a.pdf"),
            "http://localhost:3000/uploads/documents/a.pdf"
        );
    }

    #[tokio::test]
    async fn save_upload_writes_file() {
        let mut config = Config::for_tests();
        config.upload_dir = std::env::temp_dir()
            .join(format!("scooter_rental_uploads_{}", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();

        let response = save_upload(&config, UploadKind::Document, "application/pdf", b"%PDF-1.4")
            .await
            .unwrap();

        assert!(
            response
                .url
                .starts_with("http://localhost:3000/uploads/documents/")
        );
        assert!(response.url.ends_with(".pdf"));
        assert_eq!(response.size_bytes, 8);

        let file_name = response.url.rsplit('/').next().unwrap();
        let path = stored_path(Path::new(&config.upload_dir), UploadKind::Document, file_name);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");

        tokio::fs::remove_dir_all(&config.upload_dir).await.unwrap();
    }
}
