//! Upload intake: validation and storage of incoming scans.
//!
//! Files land in `UPLOAD_DIR` under a generated `<uuid>.<ext>` name; the
//! client's original filename is kept only as metadata. Validation happens
//! here, before any analysis or database work.

use std::path::{Path, PathBuf};

use actix_multipart::form::tempfile::TempFile;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Upload size cap.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Accepted file extensions, lowercased.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

/// A validated upload persisted to disk.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Generated on-disk name, `<uuid>.<ext>`.
    pub stored_name: String,
    /// Absolute or upload-dir-relative path of the stored file.
    pub path: PathBuf,
    /// The client's original filename, for display and fallback analysis.
    pub original_name: String,
    /// Lowercased extension, guaranteed to be in [`ALLOWED_EXTENSIONS`].
    pub extension: String,
}

impl StoredUpload {
    /// The serving path recorded on the mail item row.
    pub fn image_url(&self) -> String {
        format!("/uploads/{}", self.stored_name)
    }
}

/// Lowercased extension of a filename, if it has one.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

/// MIME type for a stored extension. Used when serving uploads back and
/// when attaching them to notification emails.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Validate an incoming multipart file and persist it under a generated
/// name. Rejects disallowed types with 400 and oversized files with 413.
pub async fn store(upload_dir: &Path, upload: TempFile) -> Result<StoredUpload> {
    let original_name = upload
        .file_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "upload".to_string());

    let extension = extension_of(&original_name).ok_or_else(|| {
        AppError::Validation(format!(
            "file {original_name:?} has no extension; allowed types: jpg, jpeg, png, pdf"
        ))
    })?;
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "file type .{extension} is not allowed; allowed types: jpg, jpeg, png, pdf"
        )));
    }
    if upload.size == 0 {
        return Err(AppError::Validation("uploaded file is empty".to_string()));
    }
    if upload.size > MAX_UPLOAD_BYTES {
        return Err(AppError::PayloadTooLarge(format!(
            "file is {} bytes; the limit is {} MB",
            upload.size,
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    fs::create_dir_all(upload_dir).await?;
    let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
    let path = upload_dir.join(&stored_name);
    // copy instead of rename: the temp file usually lives on another filesystem
    fs::copy(upload.file.path(), &path).await?;

    debug!(
        original = %original_name,
        stored = %stored_name,
        bytes = upload.size,
        "stored upload"
    );

    Ok(StoredUpload {
        stored_name,
        path,
        original_name,
        extension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_upload(name: &str, bytes: &[u8]) -> TempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        TempFile {
            file,
            content_type: None,
            file_name: Some(name.to_string()),
            size: bytes.len(),
        }
    }

    #[test]
    fn extension_of_lowercases_and_handles_missing() {
        assert_eq!(extension_of("Scan.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("photo.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(extension_of("no_extension"), None);
        assert_eq!(extension_of(".hidden"), None);
    }

    #[test]
    fn mime_mapping_covers_all_allowed_types() {
        for ext in ALLOWED_EXTENSIONS {
            assert_ne!(mime_for_extension(ext), "application/octet-stream");
        }
        assert_eq!(mime_for_extension("exe"), "application/octet-stream");
    }

    #[tokio::test]
    async fn store_rejects_disallowed_types() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path(), temp_upload("run.exe", b"MZ"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got: {err}");
    }

    #[tokio::test]
    async fn store_rejects_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut upload = temp_upload("big.pdf", b"%PDF-");
        upload.size = MAX_UPLOAD_BYTES + 1;
        let err = store(dir.path(), upload).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)), "got: {err}");
    }

    #[tokio::test]
    async fn store_persists_under_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store(dir.path(), temp_upload("Council Tax.pdf", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(stored.extension, "pdf");
        assert_eq!(stored.original_name, "Council Tax.pdf");
        assert!(stored.stored_name.ends_with(".pdf"));
        assert!(stored.path.exists());
        assert_eq!(stored.image_url(), format!("/uploads/{}", stored.stored_name));
    }
}
