use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// Owns the attachment upload directory.
///
/// Files are stored flat under generated names; the original file name only
/// survives as metadata on the attachment record.
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, stored_name: &str) -> PathBuf {
        self.dir.join(stored_name)
    }

    /// Generated storage name: a fresh UUID keeping the original extension
    /// (lowercased, alphanumeric only) so served files keep a usable type.
    pub fn generate_name(original_name: &str) -> String {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));

        match ext {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        }
    }

    pub async fn save(&self, stored_name: &str, data: &[u8]) -> Result<()> {
        fs::write(self.file_path(stored_name), data).await?;
        Ok(())
    }

    /// Delete a stored file from disk. A file already gone is not an error.
    pub async fn delete(&self, stored_name: &str) -> Result<()> {
        match fs::remove_file(self.file_path(stored_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Stored file {} already gone", stored_name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
