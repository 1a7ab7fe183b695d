//! Store selection and degraded operation.
//!
//! [`FallbackConversationStore`] serves every call from an optional primary
//! store and drops to an in-process store whenever the primary is missing
//! or fails, logging a warning each time.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::conversation::{Conversation, ConversationPatch, ConversationStore, Message, Role};
use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryConversationStore;
use crate::sqlite::SqliteConversationStore;

// ---------------------------------------------------------------------------
// StorageBackend
// ---------------------------------------------------------------------------

/// Configured persistence backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(StoreError::InvalidArgument(format!(
                "unknown storage backend `{other}` (expected sqlite or memory)"
            ))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        })
    }
}

// ---------------------------------------------------------------------------
// FallbackConversationStore
// ---------------------------------------------------------------------------

/// Primary store with an in-memory safety net.
pub struct FallbackConversationStore {
    primary: Option<Arc<dyn ConversationStore>>,
    memory: MemoryConversationStore,
}

impl FallbackConversationStore {
    pub fn new(primary: Option<Arc<dyn ConversationStore>>) -> Self {
        Self {
            primary,
            memory: MemoryConversationStore::new(),
        }
    }

    pub fn memory_only() -> Self {
        Self::new(None)
    }

    /// Build the store for `backend`.
    ///
    /// A SQLite database that cannot be opened leaves the store memory-only.
    pub async fn open(backend: StorageBackend, path: PathBuf) -> Self {
        match backend {
            StorageBackend::Memory => {
                info!("using in-memory conversation store");
                Self::memory_only()
            }
            StorageBackend::Sqlite => match SqliteConversationStore::open(path.clone()).await {
                Ok(store) => {
                    info!(path = %path.display(), "using sqlite conversation store");
                    Self::new(Some(Arc::new(store)))
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "sqlite unavailable, using in-memory store"
                    );
                    Self::memory_only()
                }
            },
        }
    }

    /// Whether calls are served by the primary store.
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    fn primary_failed(operation: &'static str, error: &StoreError) {
        warn!(operation, %error, "primary store failed, using in-memory store");
    }
}

#[async_trait]
impl ConversationStore for FallbackConversationStore {
    fn backend(&self) -> &'static str {
        self.primary
            .as_ref()
            .map_or(self.memory.backend(), |p| p.backend())
    }

    async fn create_conversation(&self, user_id: &str, title: &str) -> StoreResult<Conversation> {
        if let Some(primary) = &self.primary {
            match primary.create_conversation(user_id, title).await {
                Ok(v) => return Ok(v),
                Err(e) => Self::primary_failed("create_conversation", &e),
            }
        }
        self.memory.create_conversation(user_id, title).await
    }

    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>> {
        if let Some(primary) = &self.primary {
            match primary.list_conversations(user_id).await {
                Ok(v) => return Ok(v),
                Err(e) => Self::primary_failed("list_conversations", &e),
            }
        }
        self.memory.list_conversations(user_id).await
    }

    async fn update_conversation(&self, id: &str, patch: ConversationPatch) -> StoreResult<()> {
        if let Some(primary) = &self.primary {
            match primary.update_conversation(id, patch.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => Self::primary_failed("update_conversation", &e),
            }
        }
        self.memory.update_conversation(id, patch).await
    }

    async fn delete_conversation(&self, id: &str) -> StoreResult<()> {
        if let Some(primary) = &self.primary {
            match primary.delete_conversation(id).await {
                Ok(()) => return Ok(()),
                Err(e) => Self::primary_failed("delete_conversation", &e),
            }
        }
        self.memory.delete_conversation(id).await
    }

    async fn save_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> StoreResult<Message> {
        if let Some(primary) = &self.primary {
            match primary.save_message(conversation_id, role, content).await {
                Ok(v) => return Ok(v),
                Err(e) => Self::primary_failed("save_message", &e),
            }
        }
        self.memory.save_message(conversation_id, role, content).await
    }

    async fn list_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        if let Some(primary) = &self.primary {
            match primary.list_messages(conversation_id).await {
                Ok(v) => return Ok(v),
                Err(e) => Self::primary_failed("list_messages", &e),
            }
        }
        self.memory.list_messages(conversation_id).await
    }
}
