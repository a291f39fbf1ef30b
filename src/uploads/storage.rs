use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

/// Largest accepted payment proof.
pub const MAX_ATTACHMENT_SIZE: usize = 10 * 1024 * 1024;

const MAX_EXTENSION_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment not found")]
    NotFound,
    #[error("attachment exceeds {MAX_ATTACHMENT_SIZE} bytes")]
    TooLarge,
    #[error("invalid attachment name")]
    InvalidName,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AttachmentError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Payment proof files, stored flat under `<data_dir>/uploads` with
/// generated names. Purchases only ever hold the generated name.
pub struct AttachmentStorage {
    base_path: PathBuf,
}

impl AttachmentStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("uploads"),
        }
    }

    /// Absolute location of a stored attachment.
    fn path(&self, name: &str) -> Result<PathBuf, AttachmentError> {
        validate_name(name)?;
        Ok(self.base_path.join(name))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join("tmp")
            .join(Uuid::new_v4().to_string())
    }

    /// Stores the bytes and returns the generated name. The extension of
    /// `original_name` is kept when it is short and alphanumeric.
    pub async fn put(
        &self,
        data: &[u8],
        original_name: Option<&str>,
    ) -> Result<String, AttachmentError> {
        if data.len() > MAX_ATTACHMENT_SIZE {
            return Err(AttachmentError::TooLarge);
        }

        let name = match original_name.and_then(sanitized_extension) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        fs::rename(&temp_path, self.base_path.join(&name)).await?;

        Ok(name)
    }

    pub async fn open(&self, name: &str) -> Result<(BufReader<File>, u64), AttachmentError> {
        let path = self.path(name)?;
        let file = File::open(&path).await.map_err(AttachmentError::from_io)?;
        let size = file.metadata().await?.len();

        Ok((BufReader::new(file), size))
    }

    /// Removes a stored attachment. Returns false if it was already gone.
    pub async fn remove(&self, name: &str) -> Result<bool, AttachmentError> {
        let path = self.path(name)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AttachmentError::Io(e)),
        }
    }
}

fn sanitized_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn validate_name(name: &str) -> Result<(), AttachmentError> {
    if name.is_empty() || name.starts_with('.') {
        return Err(AttachmentError::InvalidName);
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(AttachmentError::InvalidName);
    }

    Ok(())
}

/// MIME type for a stored attachment, derived from its extension.
#[must_use]
pub fn content_type(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_put_and_open() {
        let temp_dir = TempDir::new().unwrap();
        let storage = AttachmentStorage::new(temp_dir.path());

        let name = storage.put(b"receipt", Some("Comprovante.PNG")).await.unwrap();
        assert!(name.ends_with(".png"));
        assert!(storage.path(&name).unwrap().is_file());

        let (mut reader, size) = storage.open(&name).await.unwrap();
        assert_eq!(size, 7);

        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"receipt");
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let temp_dir = TempDir::new().unwrap();
        let storage = AttachmentStorage::new(temp_dir.path());

        let a = storage.put(b"a", Some("proof.pdf")).await.unwrap();
        let b = storage.put(b"b", Some("proof.pdf")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_suspicious_extension_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let storage = AttachmentStorage::new(temp_dir.path());

        let name = storage.put(b"x", Some("proof.p/../hp")).await.unwrap();
        assert!(!name.contains('/'));
        let name = storage.put(b"x", None).await.unwrap();
        assert!(!name.contains('.'));
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let storage = AttachmentStorage::new(temp_dir.path());

        let name = storage.put(b"x", Some("a.pdf")).await.unwrap();
        assert!(storage.remove(&name).await.unwrap());
        assert!(!storage.path(&name).unwrap().exists());
        assert!(!storage.remove(&name).await.unwrap());
    }

    #[tokio::test]
    async fn test_too_large() {
        let temp_dir = TempDir::new().unwrap();
        let storage = AttachmentStorage::new(temp_dir.path());

        let data = vec![0u8; MAX_ATTACHMENT_SIZE + 1];
        assert!(matches!(
            storage.put(&data, None).await,
            Err(AttachmentError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let storage = AttachmentStorage::new(temp_dir.path());

        for name in ["../coursegate.db", "a/b", "", ".hidden"] {
            assert!(matches!(
                storage.open(name).await,
                Err(AttachmentError::InvalidName)
            ));
        }
    }

    #[tokio::test]
    async fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = AttachmentStorage::new(temp_dir.path());

        assert!(matches!(
            storage.open("missing.png").await,
            Err(AttachmentError::NotFound)
        ));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("a.png"), "image/png");
        assert_eq!(content_type("a.jpeg"), "image/jpeg");
        assert_eq!(content_type("a"), "application/octet-stream");
    }
}
