//! Staged file attachments.
//!
//! A [`PendingAttachment`] is created when the user picks a file and lives in
//! the session until the next send consumes it or the user discards it.

use std::path::Path;

use crate::conversation::InlineData;
use crate::error::{ChatError, Result};

/// Default upper bound on attachment size (20 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 20 * 1024 * 1024;

/// A file staged for the next user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub is_image: bool,
}

impl PendingAttachment {
    /// Build an attachment from in-memory bytes.
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        let mime_type = mime_type.into();
        Self {
            file_name: file_name.into(),
            is_image: mime_type.starts_with("image/"),
            mime_type,
            data,
        }
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    ///
    /// Files larger than `max_bytes` are rejected before being read.
    pub fn from_path(path: impl AsRef<Path>, max_bytes: usize) -> Result<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|e| ChatError::Attachment {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;

        if !meta.is_file() {
            return Err(ChatError::Attachment {
                reason: format!("{} is not a regular file", path.display()),
            });
        }
        if meta.len() > max_bytes as u64 {
            return Err(ChatError::Attachment {
                reason: format!(
                    "{} is {} bytes, limit is {max_bytes}",
                    path.display(),
                    meta.len()
                ),
            });
        }

        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!(file = %file_name, bytes = data.len(), "attachment staged from disk");

        Ok(Self::new(file_name, mime_for_path(path), data))
    }

    /// Move the payload into the inline part of a turn.
    pub fn into_inline(self) -> InlineData {
        InlineData {
            mime_type: self.mime_type,
            data: self.data,
        }
    }
}

/// Guess a MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "txt" | "md" | "log" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn image_flag_follows_mime() {
        assert!(PendingAttachment::new("a.png", "image/png", vec![]).is_image);
        assert!(!PendingAttachment::new("a.pdf", "application/pdf", vec![]).is_image);
    }

    #[test]
    fn mime_inference() {
        assert_eq!(mime_for_path(Path::new("x.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("notes.csv")), "text/csv");
        assert_eq!(mime_for_path(Path::new("doc.pdf")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello")
            .unwrap();

        let att = PendingAttachment::from_path(&path, DEFAULT_MAX_ATTACHMENT_BYTES).unwrap();
        assert_eq!(att.file_name, "hello.txt");
        assert_eq!(att.mime_type, "text/plain");
        assert_eq!(att.data, b"hello");
        assert!(!att.is_image);
    }

    #[test]
    fn from_path_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 16]).unwrap();

        let err = PendingAttachment::from_path(&path, 8).unwrap_err();
        assert!(matches!(err, ChatError::Attachment { .. }));
    }

    #[test]
    fn from_path_rejects_missing_file() {
        let err = PendingAttachment::from_path("/definitely/not/here.png", 1024).unwrap_err();
        assert!(matches!(err, ChatError::Attachment { .. }));
    }
}
