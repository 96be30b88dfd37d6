// Document payload storage on the local filesystem.

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::db::models::DbId;
use crate::error::{AppError, Result};

/// Stores uploaded payloads under `<base>/<user_id>/<stored name>`.
///
/// Stored names are generated here, never taken from the client, so they
/// cannot escape the user's directory.
#[derive(Clone, Debug)]
pub struct StorageService {
    base_path: PathBuf,
}

impl StorageService {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create storage directory: {e}")))?;
        Ok(())
    }

    pub fn user_path(&self, user_id: DbId) -> PathBuf {
        self.base_path.join(user_id.to_string())
    }

    pub fn file_path(&self, user_id: DbId, filename: &str) -> PathBuf {
        self.user_path(user_id).join(filename)
    }

    /// A fresh stored name keeping the original extension, e.g. `<uuid>.pdf`.
    pub fn stored_name(original_name: &str) -> String {
        match file_extension(original_name) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        }
    }

    pub async fn write(&self, user_id: DbId, filename: &str, data: &[u8]) -> Result<()> {
        let path = self.file_path(user_id, filename);

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create directories: {e}")))?;
        }

        fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {e}")))?;

        Ok(())
    }

    pub async fn read(&self, user_id: DbId, filename: &str) -> Result<Vec<u8>> {
        let path = self.file_path(user_id, filename);

        if !path.exists() {
            return Err(AppError::NotFound(format!("File not found: {filename}")));
        }

        fs::read(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read file: {e}")))
    }

    pub async fn delete(&self, user_id: DbId, filename: &str) -> Result<()> {
        let path = self.file_path(user_id, filename);

        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete file: {e}")))?;
        }

        Ok(())
    }
}

/// Lowercased extension of a client file name, if it has a sane one.
pub fn file_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// The final path component of a client-supplied name.
pub fn base_name(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("upload")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_normalized() {
        assert_eq!(file_extension("Rapor.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("weird.p$f"), None);
    }

    #[test]
    fn stored_name_keeps_extension_only() {
        let name = StorageService::stored_name("../../etc/passwd.docx");
        assert!(name.ends_with(".docx"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn base_name_strips_directories() {
        assert_eq!(base_name("C:\\scans\\tutanak.pdf"), "tutanak.pdf");
        assert_eq!(base_name("a/b/c.jpg"), "c.jpg");
        assert_eq!(base_name("dir/"), "upload");
    }

    #[tokio::test]
    async fn write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path());
        storage.init().await.unwrap();

        storage.write(7, "a.txt", b"hello").await.unwrap();
        assert_eq!(storage.read(7, "a.txt").await.unwrap(), b"hello");

        storage.delete(7, "a.txt").await.unwrap();
        assert!(storage.read(7, "a.txt").await.is_err());
    }
}
