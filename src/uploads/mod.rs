/// Upload storage
///
/// Disk-backed store for the files the workflow attaches to records:
/// profile photos, grade files, and signature images. Files are stored
/// under a per-kind directory with generated names; the original name
/// only contributes its extension.

use crate::error::{AppError, AppResult};
use std::path::PathBuf;
use uuid::Uuid;

/// Upload kinds accepted by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Photo,
    Grades,
    Signature,
}

impl UploadKind {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "photo" => Ok(UploadKind::Photo),
            "grades" => Ok(UploadKind::Grades),
            "signature" => Ok(UploadKind::Signature),
            _ => Err(AppError::Upload(format!("Unknown upload kind: {}", s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Photo => "photo",
            UploadKind::Grades => "grades",
            UploadKind::Signature => "signature",
        }
    }

    /// Extensions accepted for this kind
    fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Photo | UploadKind::Signature => &["png", "jpg", "jpeg", "webp"],
            UploadKind::Grades => &["pdf", "png", "jpg", "jpeg"],
        }
    }
}

/// Disk-backed upload store
#[derive(Clone)]
pub struct UploadStore {
    base_dir: PathBuf,
    max_size: usize,
}

impl UploadStore {
    pub fn new(base_dir: PathBuf, max_size: usize) -> Self {
        Self { base_dir, max_size }
    }

    /// Persist an upload and return its stored file name
    pub async fn save(
        &self,
        kind: UploadKind,
        original_name: &str,
        data: &[u8],
    ) -> AppResult<String> {
        if data.is_empty() {
            return Err(AppError::Upload("Empty upload".to_string()));
        }

        if data.len() > self.max_size {
            return Err(AppError::Upload(format!(
                "Upload exceeds limit of {} bytes",
                self.max_size
            )));
        }

        let extension = original_name
            .rsplit('.')
            .next()
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| kind.allowed_extensions().contains(&e.as_str()))
            .ok_or_else(|| {
                AppError::Upload(format!(
                    "File type not allowed for {} uploads",
                    kind.as_str()
                ))
            })?;

        let name = format!("{}.{}", Uuid::new_v4(), extension);
        let dir = self.base_dir.join(kind.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), data).await?;

        tracing::debug!(kind = kind.as_str(), name = %name, size = data.len(), "Stored upload");

        Ok(name)
    }

    /// Read a stored upload back
    pub async fn read(&self, kind: UploadKind, name: &str) -> AppResult<Vec<u8>> {
        // Generated names never contain separators; reject anything else
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(AppError::Upload("Invalid file name".to_string()));
        }

        let path = self.base_dir.join(kind.as_str()).join(name);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("File not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> UploadStore {
        UploadStore::new(dir.path().to_path_buf(), 1024)
    }

    #[tokio::test]
    async fn test_save_and_read() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let name = store
            .save(UploadKind::Photo, "me.PNG", b"image-bytes")
            .await
            .unwrap();
        assert!(name.ends_with(".png"));

        let data = store.read(UploadKind::Photo, &name).await.unwrap();
        assert_eq!(data, b"image-bytes");
    }

    #[tokio::test]
    async fn test_rejects_disallowed_extension() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let result = store.save(UploadKind::Signature, "sig.exe", b"bytes").await;
        assert!(matches!(result, Err(AppError::Upload(_))));

        // PDFs are only valid as grade files
        assert!(store.save(UploadKind::Photo, "grades.pdf", b"bytes").await.is_err());
        assert!(store.save(UploadKind::Grades, "grades.pdf", b"bytes").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_oversize_and_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store.save(UploadKind::Photo, "a.png", &[]).await.is_err());
        assert!(store
            .save(UploadKind::Photo, "a.png", &vec![0u8; 2048])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_read_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let result = store.read(UploadKind::Photo, "../secret.png").await;
        assert!(matches!(result, Err(AppError::Upload(_))));
    }
}
