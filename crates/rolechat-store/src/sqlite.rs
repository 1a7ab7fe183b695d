//! Durable [`ConversationStore`] on SQLite.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::conversation::{
    Conversation, ConversationPatch, ConversationStore, Message, Role, decode_time, encode_time,
    now, preview,
};
use crate::db::Database;
use crate::error::StoreResult;

const CONVERSATION_COLUMNS: &str = "id, user_id, title, created_at, updated_at, last_message";

/// Conversations and messages in a migrated [`Database`].
#[derive(Clone)]
pub struct SqliteConversationStore {
    db: Database,
}

impl SqliteConversationStore {
    /// Wrap an already migrated database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the file at `path`, migrate it, and wrap it.
    pub async fn open(path: impl AsRef<std::path::Path> + Send + 'static) -> StoreResult<Self> {
        Ok(Self::new(Database::open_and_migrate(path).await?))
    }

    /// Look up a single conversation.
    #[instrument(skip(self))]
    pub async fn get_conversation(&self, id: &str) -> StoreResult<Option<Conversation>> {
        let id = id.to_owned();
        self.db
            .execute(move |conn| {
                let row = conn
                    .query_row(
                        &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                        rusqlite::params![id],
                        ConversationRow::read,
                    )
                    .optional()?;
                row.map(ConversationRow::into_conversation).transpose()
            })
            .await
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    #[instrument(skip(self))]
    async fn create_conversation(&self, user_id: &str, title: &str) -> StoreResult<Conversation> {
        let at = now();
        let conversation = Conversation {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_owned(),
            title: title.to_owned(),
            created_at: at,
            updated_at: at,
            last_message: None,
        };

        let row = conversation.clone();
        self.db
            .execute(move |conn| {
                let stamp = encode_time(&row.created_at);
                conn.execute(
                    "INSERT INTO conversations (id, user_id, title, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    rusqlite::params![row.id, row.user_id, row.title, stamp],
                )?;
                Ok(())
            })
            .await?;

        debug!(conversation_id = %conversation.id, "conversation created");
        Ok(conversation)
    }

    #[instrument(skip(self))]
    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>> {
        let user_id = user_id.to_owned();
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations \
                     WHERE user_id = ?1 ORDER BY updated_at DESC, rowid DESC"
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![user_id], ConversationRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter()
                    .map(ConversationRow::into_conversation)
                    .collect()
            })
            .await
    }

    #[instrument(skip(self))]
    async fn update_conversation(&self, id: &str, patch: ConversationPatch) -> StoreResult<()> {
        let id = id.to_owned();
        let stamp = encode_time(&now());
        let changed = self
            .db
            .execute(move |conn| {
                Ok(conn.execute(
                    "UPDATE conversations SET \
                       title = COALESCE(?2, title), \
                       last_message = COALESCE(?3, last_message), \
                       updated_at = ?4 \
                     WHERE id = ?1",
                    rusqlite::params![id, patch.title, patch.last_message, stamp],
                )?)
            })
            .await?;
        debug!(changed, "conversation updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_conversation(&self, id: &str) -> StoreResult<()> {
        let id = id.to_owned();
        let (messages, conversations) = self
            .db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                let messages = tx.execute(
                    "DELETE FROM messages WHERE conversation_id = ?1",
                    rusqlite::params![id],
                )?;
                let conversations =
                    tx.execute("DELETE FROM conversations WHERE id = ?1", rusqlite::params![id])?;
                tx.commit()?;
                Ok((messages, conversations))
            })
            .await?;
        debug!(messages, conversations, "conversation deleted");
        Ok(())
    }

    #[instrument(skip(self, content), fields(len = content.len()))]
    async fn save_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> StoreResult<Message> {
        let message = Message {
            id: Uuid::now_v7().to_string(),
            conversation_id: conversation_id.to_owned(),
            role,
            content: content.to_owned(),
            timestamp: now(),
        };

        let row = message.clone();
        self.db
            .execute_mut(move |conn| {
                let stamp = encode_time(&row.timestamp);
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO messages (id, conversation_id, role, content, timestamp) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        row.id,
                        row.conversation_id,
                        row.role.as_str(),
                        row.content,
                        stamp
                    ],
                )?;
                tx.execute(
                    "UPDATE conversations SET last_message = ?2, updated_at = ?3 WHERE id = ?1",
                    rusqlite::params![row.conversation_id, preview(&row.content), stamp],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        debug!(message_id = %message.id, role = %message.role, "message saved");
        Ok(message)
    }

    #[instrument(skip(self))]
    async fn list_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        let conversation_id = conversation_id.to_owned();
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, conversation_id, role, content, timestamp FROM messages \
                     WHERE conversation_id = ?1 ORDER BY timestamp ASC, rowid ASC",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![conversation_id], |row| {
                        Ok(MessageRow {
                            id: row.get(0)?,
                            conversation_id: row.get(1)?,
                            role: row.get(2)?,
                            content: row.get(3)?,
                            timestamp: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter().map(MessageRow::into_message).collect()
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: String,
    user_id: String,
    title: String,
    created_at: String,
    updated_at: String,
    last_message: Option<String>,
}

impl ConversationRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            last_message: row.get(5)?,
        })
    }

    fn into_conversation(self) -> StoreResult<Conversation> {
        Ok(Conversation {
            created_at: decode_time("created_at", &self.created_at)?,
            updated_at: decode_time("updated_at", &self.updated_at)?,
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            last_message: self.last_message,
        })
    }
}

struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    timestamp: String,
}

impl MessageRow {
    fn into_message(self) -> StoreResult<Message> {
        Ok(Message {
            role: Role::parse(&self.role)?,
            timestamp: decode_time("timestamp", &self.timestamp)?,
            id: self.id,
            conversation_id: self.conversation_id,
            content: self.content,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
