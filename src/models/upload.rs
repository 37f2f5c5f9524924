//! Uploaded file models.

use serde::{Deserialize, Serialize};

/// What an upload is for; decides the storage folder and accepted types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    /// Identity documents and rental paperwork
    Document,
    /// Scooter and shop pictures
    Image,
}

impl UploadKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "document" => Some(UploadKind::Document),
            "image" => Some(UploadKind::Image),
            _ => None,
        }
    }

    /// Folder under the upload root.
    pub fn folder(self) -> &'static str {
        match self {
            UploadKind::Document => "documents",
            UploadKind::Image => "images",
        }
    }

    /// File extension for an accepted content type, `None` if not accepted.
    pub fn extension_for(self, content_type: &str) -> Option<&'static str> {
        match (self, content_type) {
            (_, "image/jpeg") => Some("jpg"),
            (_, "image/png") => Some("png"),
            (_, "image/webp") => Some("webp"),
            (UploadKind::Document, "application/pdf") => Some("pdf"),
            _ => None,
        }
    }
}

/// Response for `POST /api/v1/uploads`.
///
/// ```json
/// {
///   "url": "http://localhost:3000/uploads/documents/7f0c....pdf",
///   "kind": "document",
///   "content_type": "application/pdf",
///   "size_bytes": 183204
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub kind: UploadKind,
    pub content_type: String,
    pub size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_reject_pdf() {
        assert_eq!(UploadKind::Image.extension_for("image/png"), Some("png"));
        assert_eq!(UploadKind::Image.extension_for("application/pdf"), None);
        assert_eq!(
            UploadKind::Document.extension_for("application/pdf"),
            Some("pdf")
        );
        assert_eq!(UploadKind::Document.extension_for("text/html"), None);
    }

    #[test]
    fn parses_known_kinds_only() {
        assert_eq!(UploadKind::parse("image"), Some(UploadKind::Image));
        assert_eq!(UploadKind::parse(" document "), Some(UploadKind::Document));
        assert_eq!(UploadKind::parse("video"), None);
    }
}
