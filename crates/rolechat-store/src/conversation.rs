//! Conversation and message types plus the [`ConversationStore`] seam.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Characters of a message kept as the conversation's preview.
pub const LAST_MESSAGE_PREVIEW_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A chat thread owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Preview of the most recent message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> StoreResult<Self> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(StoreError::Corrupt {
                column: "role",
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Fields a caller may change on a conversation.  `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub last_message: Option<String>,
}

impl ConversationPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.last_message.is_none()
    }
}

// ---------------------------------------------------------------------------
// ConversationStore
// ---------------------------------------------------------------------------

/// Persistence for conversations and their messages.
///
/// Updating or deleting an unknown conversation succeeds without effect.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Short backend label, e.g. `"sqlite"` or `"memory"`.
    fn backend(&self) -> &'static str;

    async fn create_conversation(&self, user_id: &str, title: &str) -> StoreResult<Conversation>;

    /// Conversations of `user_id`, most recently updated first.
    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>>;

    /// Apply `patch` and bump `updated_at`.
    async fn update_conversation(&self, id: &str, patch: ConversationPatch) -> StoreResult<()>;

    /// Remove a conversation together with its messages.
    async fn delete_conversation(&self, id: &str) -> StoreResult<()>;

    /// Append a message and refresh the conversation's preview.
    async fn save_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> StoreResult<Message>;

    /// Messages of a conversation, oldest first.
    async fn list_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>>;
}

// ---------------------------------------------------------------------------
// Helpers shared by the implementations
// ---------------------------------------------------------------------------

/// Current time at millisecond precision, matching the stored form.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub(crate) fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_time(column: &'static str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt {
            column,
            value: raw.to_owned(),
        })
}

/// First [`LAST_MESSAGE_PREVIEW_CHARS`] characters of `content`.
pub fn preview(content: &str) -> String {
    content.chars().take(LAST_MESSAGE_PREVIEW_CHARS).collect()
}
