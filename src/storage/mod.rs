//! Durable conversation persistence.
//!
//! Each conversation is one pretty-printed JSON document under the storage
//! root, next to an `index.json` holding the summary listing. Both writes go
//! through a write-to-temp-then-rename step so a crash never leaves a
//! half-written file behind. The document/index pair itself is still two
//! renames; the orchestrator serializes writers per conversation id so the
//! pair cannot interleave across concurrent chats.

pub mod types;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, warn};

pub use types::{
    normalize_message, ContentBlock, Conversation, ConversationIndex, ConversationMetadata,
    ConversationSummary, Message, Role,
};

/// Errors produced by the conversation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested conversation has no loadable document.
    #[error("Conversation {0} not found")]
    NotFound(String),

    /// Filesystem failure.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// A document or the index failed to serialize.
    #[error("storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Filesystem-backed store for conversation documents and their index.
#[derive(Clone, Debug)]
pub struct ConversationStore {
    root: PathBuf,
}

impl ConversationStore {
    /// File name of the summary index inside the storage root.
    const INDEX_FILE: &'static str = "index.json";

    /// Create a store rooted at `root`. The directory is created lazily on
    /// first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the conversation with `id` if given and loadable, otherwise
    /// construct a fresh empty conversation with a timestamp-derived id.
    pub async fn get_or_create(&self, id: Option<&str>) -> StoreResult<Conversation> {
        if let Some(id) = id {
            match self.load(id).await {
                Ok(conversation) => return Ok(conversation),
                Err(StoreError::NotFound(_)) => {
                    debug!(id, "conversation not found, creating a new one");
                }
                Err(err) => return Err(err),
            }
        }
        let now = Utc::now();
        Ok(Conversation::new(fresh_id(), now))
    }

    /// Persist the full conversation document, then upsert its summary in the
    /// index and re-sort the index by `updated` descending.
    pub async fn save(&self, conversation: &Conversation) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let body = serde_json::to_vec_pretty(conversation)?;
        write_atomic(&self.document_path(&conversation.id), &body).await?;

        let mut index = self.load_index().await?;
        let summary = conversation.summary();
        match index
            .conversations
            .iter_mut()
            .find(|existing| existing.id == summary.id)
        {
            Some(existing) => *existing = summary,
            None => index.conversations.push(summary),
        }
        index
            .conversations
            .sort_by(|a, b| b.updated.cmp(&a.updated));
        self.save_index(&index).await
    }

    /// Load a conversation document by id.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the document is absent or unparseable.
    pub async fn load(&self, id: &str) -> StoreResult<Conversation> {
        let path = self.document_path(id);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&content).map_err(|err| {
            warn!(id, %err, "conversation document is unparseable");
            StoreError::NotFound(id.to_string())
        })
    }

    /// Return the index contents, or an empty list when no index exists yet.
    pub async fn list(&self) -> StoreResult<Vec<ConversationSummary>> {
        Ok(self.load_index().await?.conversations)
    }

    /// Remove the conversation document and its index entry. Neither absence
    /// is treated as an error; deletion is idempotent.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        match tokio::fs::remove_file(self.document_path(id)).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let mut index = self.load_index().await?;
        let before = index.conversations.len();
        index.conversations.retain(|summary| summary.id != id);
        if index.conversations.len() != before {
            self.save_index(&index).await?;
        }
        Ok(())
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(Self::INDEX_FILE)
    }

    async fn load_index(&self) -> StoreResult<ConversationIndex> {
        match tokio::fs::read(self.index_path()).await {
            Ok(content) => Ok(serde_json::from_slice(&content).unwrap_or_default()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(ConversationIndex::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_index(&self, index: &ConversationIndex) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let body = serde_json::to_vec_pretty(index)?;
        write_atomic(&self.index_path(), &body).await
    }
}

/// Write `body` to `path` through a sibling temp file plus rename, so readers
/// never observe a partial document.
async fn write_atomic(path: &Path, body: &[u8]) -> StoreResult<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Timestamp-derived conversation id, filesystem-safe.
fn fresh_id() -> String {
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("conv_{}", stamp.replace([':', '.'], "-"))
}
