//! # rolechat-store
//!
//! Conversation and message persistence for Role Chat.
//!
//! Everything goes through the [`ConversationStore`] trait.  Two backends
//! implement it: [`SqliteConversationStore`] (WAL-mode SQLite with
//! versioned migrations) and [`MemoryConversationStore`].  The
//! [`FallbackConversationStore`] picks one from configuration and degrades
//! to memory when the database is unavailable.
//!
//! ```ignore
//! use rolechat_store::{FallbackConversationStore, StorageBackend, ConversationStore, Role};
//!
//! let store = FallbackConversationStore::open(StorageBackend::Sqlite, "data/rolechat.db".into()).await;
//! let conv = store.create_conversation("user-1", "New Chat").await?;
//! store.save_message(&conv.id, Role::User, "ประชุมทีม 10 โมง").await?;
//! ```

pub mod conversation;
pub mod db;
pub mod error;
pub mod fallback;
pub mod memory;
pub mod migration;
pub mod sqlite;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use conversation::{Conversation, ConversationPatch, ConversationStore, Message, Role, preview};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use fallback::{FallbackConversationStore, StorageBackend};
pub use memory::MemoryConversationStore;
pub use sqlite::SqliteConversationStore;
