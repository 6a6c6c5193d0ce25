use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::models::{Quote, RepositoryError, RepositoryResult};

/// Whole-quote draft persistence; each write replaces the previous draft
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn load(&self, key: &str) -> RepositoryResult<Option<Quote>>;

    async fn store(&self, key: &str, quote: &Quote) -> RepositoryResult<()>;

    /// Remove the draft; clearing a missing draft is not an error
    async fn clear(&self, key: &str) -> RepositoryResult<()>;
}

#[derive(Clone, Default)]
pub struct InMemoryDraftStore {
    drafts: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn load(&self, key: &str) -> RepositoryResult<Option<Quote>> {
        match self.drafts.read().await.get(key) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, quote: &Quote) -> RepositoryResult<()> {
        let json = serde_json::to_string(quote)?;
        self.drafts.write().await.insert(key.to_string(), json);
        Ok(())
    }

    async fn clear(&self, key: &str) -> RepositoryResult<()> {
        self.drafts.write().await.remove(key);
        Ok(())
    }
}

/// One JSON file per draft key inside `dir`
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> RepositoryResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RepositoryError::ConstraintViolation {
                message: format!("Invalid draft key: {:?}", key),
            });
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    #[instrument(skip(self))]
    async fn load(&self, key: &str) -> RepositoryResult<Option<Quote>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, quote), fields(quote_id = %quote.id))]
    async fn store(&self, key: &str, quote: &Quote) -> RepositoryResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let bytes = serde_json::to_vec_pretty(quote)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), bytes = bytes.len(), "Draft written");
        Ok(())
    }

    async fn clear(&self, key: &str) -> RepositoryResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
