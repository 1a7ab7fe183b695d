//! Transient [`ConversationStore`] kept in process memory.
//!
//! Used when no database is configured and as the safety net behind
//! [`FallbackConversationStore`](crate::FallbackConversationStore).
//! Contents vanish with the process.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::conversation::{
    Conversation, ConversationPatch, ConversationStore, Message, Role, now, preview,
};
use crate::error::StoreResult;

#[derive(Default)]
struct Inner {
    /// Newest first.
    conversations: Vec<Conversation>,
    /// Insertion order.
    messages: Vec<Message>,
}

/// In-memory conversations and messages.
#[derive(Default)]
pub struct MemoryConversationStore {
    inner: RwLock<Inner>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

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
        self.inner
            .write()
            .await
            .conversations
            .insert(0, conversation.clone());
        Ok(conversation)
    }

    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>> {
        let inner = self.inner.read().await;
        let mut list: Vec<Conversation> = inner
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        // Stable: ties keep newest-created first.
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    async fn update_conversation(&self, id: &str, patch: ConversationPatch) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(conversation) = inner.conversations.iter_mut().find(|c| c.id == id) {
            if let Some(title) = patch.title {
                conversation.title = title;
            }
            if let Some(last_message) = patch.last_message {
                conversation.last_message = Some(last_message);
            }
            conversation.updated_at = now();
        }
        Ok(())
    }

    async fn delete_conversation(&self, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.conversations.retain(|c| c.id != id);
        inner.messages.retain(|m| m.conversation_id != id);
        Ok(())
    }

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

        let mut inner = self.inner.write().await;
        inner.messages.push(message.clone());
        if let Some(conversation) = inner
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conversation.last_message = Some(preview(content));
            conversation.updated_at = message.timestamp;
        }
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut list: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(list)
    }
}
