//! Persistence seam for conversation memory records
//!
//! The core never reaches into ambient host state; it loads and saves
//! records through this trait. `FileMemoryRepository` persists one JSON
//! file per conversation under a directory; unreadable or unparseable
//! files are logged and treated as absent so a corrupt record can never
//! wedge a conversation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::memory::store::ConversationMemory;

/// Load/save contract for per-conversation memory records.
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Load the record for a conversation, `None` if it has none yet.
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationMemory>>;

    /// Persist the record for a conversation.
    async fn save(&self, conversation_id: &str, memory: &ConversationMemory) -> Result<()>;
}

/// File-backed repository: one pretty-printed JSON file per conversation.
pub struct FileMemoryRepository {
    dir: PathBuf,
}

impl FileMemoryRepository {
    /// Create a repository rooted at the given directory. The directory is
    /// created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, conversation_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_id(conversation_id)))
    }
}

/// Map a conversation id to a safe file stem.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl MemoryRepository for FileMemoryRepository {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationMemory>> {
        let path = self.path_for(conversation_id);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&data) {
            Ok(memory) => Ok(Some(memory)),
            Err(e) => {
                tracing::warn!("Failed to parse memory record {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn save(&self, conversation_id: &str, memory: &ConversationMemory) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(memory)?;
        tokio::fs::write(self.path_for(conversation_id), json).await?;
        Ok(())
    }
}

/// Ephemeral repository keeping records in process memory. Useful for hosts
/// that persist the record elsewhere (via export) and for tests.
#[derive(Default)]
pub struct InMemoryRepository {
    records: RwLock<HashMap<String, ConversationMemory>>,
}

impl InMemoryRepository {
    /// Create an empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryRepository for InMemoryRepository {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationMemory>> {
        Ok(self.records.read().await.get(conversation_id).cloned())
    }

    async fn save(&self, conversation_id: &str, memory: &ConversationMemory) -> Result<()> {
        self.records
            .write()
            .await
            .insert(conversation_id.to_string(), memory.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::fact::{FactBuilder, FactType};
    use tempfile::TempDir;

    fn sample_memory() -> ConversationMemory {
        let mut memory = ConversationMemory::new();
        memory.owner_char_id = Some("char-1".to_string());
        memory.merge(vec![FactBuilder::new(FactType::PreferenceLike)
            .value("使用者喜歡：貓")
            .confidence(0.75)
            .build()]);
        memory
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let repo = FileMemoryRepository::new(dir.path());

        let memory = sample_memory();
        repo.save("conv-1", &memory).await.unwrap();

        let loaded = repo.load("conv-1").await.unwrap().unwrap();
        assert_eq!(loaded.owner_char_id.as_deref(), Some("char-1"));
        assert_eq!(loaded.facts.len(), 1);
        assert_eq!(loaded.facts[0].id, memory.facts[0].id);
        assert_eq!(loaded.facts[0].value, "使用者喜歡：貓");
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let repo = FileMemoryRepository::new(dir.path());
        assert!(repo.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let repo = FileMemoryRepository::new(dir.path());

        tokio::fs::write(dir.path().join("conv-1.json"), "{ not json")
            .await
            .unwrap();
        assert!(repo.load("conv-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hostile_ids_sanitized() {
        let dir = TempDir::new().unwrap();
        let repo = FileMemoryRepository::new(dir.path());

        let memory = sample_memory();
        repo.save("../escape/me", &memory).await.unwrap();
        assert!(repo.load("../escape/me").await.unwrap().is_some());

        // nothing was written outside the repository directory
        assert!(dir.path().join("___escape_me.json").exists());
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let repo = InMemoryRepository::new();
        assert!(repo.load("conv-1").await.unwrap().is_none());

        let memory = sample_memory();
        repo.save("conv-1", &memory).await.unwrap();
        let loaded = repo.load("conv-1").await.unwrap().unwrap();
        assert_eq!(loaded.facts.len(), 1);
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("conv-1"), "conv-1");
        assert_eq!(sanitize_id("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_id("對話一"), "___");
    }
}
