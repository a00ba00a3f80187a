//! Inbox and conversation models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{json_id, json_str};

/// One row of the inbox listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub unread: bool,
    /// Last message preview.
    pub description: Option<String>,
    /// Login of the other participant.
    pub opposite_user: Option<String>,
    pub item_title: Option<String>,
    pub updated_at: Option<String>,
}

impl ConversationSummary {
    pub fn from_json(value: &Value) -> Option<Self> {
        let id = value.get("id").and_then(json_id)?;
        let unread = value
            .get("unread")
            .or_else(|| value.get("is_unread"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Some(Self {
            id,
            unread,
            description: json_str(value, "description"),
            opposite_user: value
                .get("opposite_user")
                .and_then(|u| json_str(u, "login")),
            item_title: value
                .get("item")
                .and_then(|i| json_str(i, "title"))
                .or_else(|| json_str(value, "item_title")),
            updated_at: json_str(value, "updated_at"),
        })
    }

    /// Parse an inbox response body into summaries.
    pub fn list_from_json(body: &Value) -> Vec<Self> {
        body.get("conversations")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(Self::from_json).collect())
            .unwrap_or_default()
    }
}

/// A single message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub body: String,
    pub user_id: Option<String>,
    pub created_at: Option<String>,
}

impl Message {
    /// Messages arrive either flat or wrapped in an `entity` object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let entity = value.get("entity").unwrap_or(value);
        let id = value
            .get("id")
            .and_then(json_id)
            .or_else(|| entity.get("id").and_then(json_id))?;

        Some(Self {
            id,
            body: json_str(entity, "body").unwrap_or_default(),
            user_id: entity.get("user_id").and_then(json_id),
            created_at: json_str(value, "created_at")
                .or_else(|| json_str(entity, "created_at")),
        })
    }
}

/// Conversation detail with its messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<Message>,
    pub transaction_id: Option<String>,
    pub opposite_user_id: Option<String>,
    pub opposite_user: Option<String>,
}

impl Conversation {
    /// Parse a conversation detail response (`{"conversation": {...}}`).
    pub fn from_response(body: &Value) -> Option<Self> {
        let conv = body.get("conversation").unwrap_or(body);
        let id = conv.get("id").and_then(json_id)?;

        Some(Self {
            id,
            messages: Self::messages_from(conv),
            transaction_id: conv
                .get("transaction")
                .and_then(|t| t.get("id"))
                .and_then(json_id),
            opposite_user_id: conv
                .get("opposite_user")
                .and_then(|u| u.get("id"))
                .and_then(json_id),
            opposite_user: conv
                .get("opposite_user")
                .and_then(|u| json_str(u, "login")),
        })
    }

    fn messages_from(conv: &Value) -> Vec<Message> {
        conv.get("messages")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(Message::from_json).collect())
            .unwrap_or_default()
    }

    /// Append messages from a later page, skipping ids already present.
    pub fn merge_page(&mut self, page: &Value) {
        let conv = page.get("conversation").unwrap_or(page);
        for message in Self::messages_from(conv) {
            if !self.messages.iter().any(|m| m.id == message.id) {
                self.messages.push(message);
            }
        }
    }
}
