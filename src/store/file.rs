// Local filesystem backend for the recommendation slot.
// One JSON file per user, replaced atomically through a temp file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{RecommendationStore, RECOMMENDATIONS_KEY};
use crate::{
    error::{AppError, AppResult},
    models::CachedRecommendationBatch,
};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Path of a user's slot: `<root>/users/<user>/homepage-recommendations.json`
    pub fn slot_path(&self, user_id: &str) -> PathBuf {
        self.root
            .join("users")
            .join(encode_user_dir(user_id))
            .join(format!("{}.json", RECOMMENDATIONS_KEY))
    }
}

#[async_trait::async_trait]
impl RecommendationStore for FileStore {
    async fn read(&self, user_id: &str) -> AppResult<Option<CachedRecommendationBatch>> {
        let path = self.slot_path(user_id);

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // A cleared slot written by an older client may hold a literal null
        let batch: Option<CachedRecommendationBatch> = serde_json::from_str(&contents)
            .map_err(|e| AppError::Internal(format!("Cache deserialization error: {}", e)))?;

        Ok(batch)
    }

    async fn write(&self, user_id: &str, batch: &CachedRecommendationBatch) -> AppResult<()> {
        let path = self.slot_path(user_id);
        let json = serde_json::to_string(batch)
            .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))?;

        write_atomically(&path, json.as_bytes()).await?;

        tracing::debug!(
            user_id = %user_id,
            books = batch.books.len(),
            path = %path.display(),
            "Recommendation batch written"
        );

        Ok(())
    }

    async fn clear(&self, user_id: &str) -> AppResult<()> {
        match fs::remove_file(self.slot_path(user_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    fs::rename(&temp_path, path).await?;

    Ok(())
}

/// Encodes a user id as a single path component.
///
/// ASCII alphanumerics and `-` pass through; every other byte becomes `_xx`
/// (lowercase hex), so distinct ids never share a directory and the result is
/// never `.` or `..`.
fn encode_user_dir(user_id: &str) -> String {
    if user_id.is_empty() {
        return "_".to_string();
    }

    let mut encoded = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("_{:02x}", byte));
        }
    }
    encoded
}
