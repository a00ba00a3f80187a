//! Inbox reads and CSRF-authorized write calls.
//!
//! Every write goes through [`MessagingClient::authorized_post`]: get a
//! token (cache, then page refetch), send, and if the server answers with
//! an authorization denial, invalidate, refetch once and retry once. A
//! second denial is terminal.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::Transport;
use crate::error::{Error, Result};
use crate::models::{Conversation, ConversationSummary};
use crate::token::TokenProvider;

pub const INBOX_PATH: &str = "/api/v2/inbox";
pub const CONVERSATIONS_PATH: &str = "/api/v2/conversations";
pub const DEFAULT_PER_PAGE: u32 = 20;

fn conversation_path(id: &str) -> String {
    format!("{}/{}", CONVERSATIONS_PATH, id)
}

/// Messaging API client.
#[derive(Clone)]
pub struct MessagingClient {
    transport: Arc<dyn Transport>,
    tokens: TokenProvider,
    inbox_per_page: u32,
    per_page: u32,
}

impl MessagingClient {
    pub fn new(transport: Arc<dyn Transport>, tokens: TokenProvider) -> Self {
        Self {
            transport,
            tokens,
            inbox_per_page: DEFAULT_PER_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Page sizes for inbox listings and conversation detail.
    pub fn with_page_sizes(mut self, inbox_per_page: u32, conversation_per_page: u32) -> Self {
        self.inbox_per_page = inbox_per_page.max(1);
        self.per_page = conversation_per_page.max(1);
        self
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// First inbox page at the configured page size.
    pub async fn latest_inbox(&self) -> Result<Vec<ConversationSummary>> {
        self.inbox(1, self.inbox_per_page).await
    }

    /// One page of the inbox.
    pub async fn inbox(&self, page: u32, per_page: u32) -> Result<Vec<ConversationSummary>> {
        let query = vec![
            ("page".to_string(), page.to_string()),
            ("per_page".to_string(), per_page.to_string()),
        ];
        let body = self.transport.get(INBOX_PATH, &query).await?.into_json()?;
        Ok(ConversationSummary::list_from_json(&body))
    }

    /// Conversation detail. When the first page is full, the second page is
    /// fetched and merged; a failure there keeps the first page only.
    pub async fn conversation(&self, id: &str) -> Result<Conversation> {
        let path = conversation_path(id);
        let first = self.conversation_page(&path, 1).await?;
        let mut conversation =
            Conversation::from_response(&first).ok_or_else(|| Error::UnexpectedResponse {
                url: path.clone(),
                reason: "missing conversation".to_string(),
            })?;

        if conversation.messages.len() >= self.per_page as usize {
            match self.conversation_page(&path, 2).await {
                Ok(second) => conversation.merge_page(&second),
                Err(e) => debug!("Second page of conversation {} unavailable: {}", id, e),
            }
        }

        Ok(conversation)
    }

    async fn conversation_page(&self, path: &str, page: u32) -> Result<Value> {
        let query = vec![
            ("page".to_string(), page.to_string()),
            ("per_page".to_string(), self.per_page.to_string()),
        ];
        self.transport.get(path, &query).await?.into_json()
    }

    /// Reply in a conversation.
    pub async fn send_message(&self, conversation_id: &str, body: &str) -> Result<Value> {
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::InvalidInput("message body is empty".to_string()));
        }
        let payload = json!({
            "reply": {
                "body": body,
                "photo_temp_uuids": null,
                "is_personal_data_sharing_check_skipped": false,
            }
        });
        self.authorized_post(&format!("{}/replies", conversation_path(conversation_id)), &payload)
            .await
    }

    /// Propose a price on a transaction.
    pub async fn send_offer_request(
        &self,
        transaction_id: &str,
        price: &str,
        currency: &str,
    ) -> Result<Value> {
        let payload = json!({
            "offer_request": {
                "price": normalize_price(price)?,
                "currency": currency.to_uppercase(),
            }
        });
        self.authorized_post(
            &format!("/api/v2/transactions/{}/offer_requests", transaction_id),
            &payload,
        )
        .await
    }

    /// Open a conversation with a seller about an item.
    pub async fn create_conversation(
        &self,
        item_id: &str,
        opposite_user_id: &str,
    ) -> Result<Conversation> {
        let payload = json!({
            "initiator": "ask_seller",
            "item_id": id_value(item_id),
            "opposite_user_id": id_value(opposite_user_id),
        });
        let body = self.authorized_post(CONVERSATIONS_PATH, &payload).await?;
        Conversation::from_response(&body).ok_or_else(|| Error::UnexpectedResponse {
            url: CONVERSATIONS_PATH.to_string(),
            reason: "missing conversation".to_string(),
        })
    }

    /// Create a transaction at `price` inside a conversation.
    pub async fn create_transaction(
        &self,
        conversation_id: &str,
        price: &str,
        currency: &str,
    ) -> Result<Value> {
        let payload = json!({
            "transaction": {
                "price": normalize_price(price)?,
                "currency": currency.to_uppercase(),
            }
        });
        self.authorized_post(
            &format!("{}/transactions", conversation_path(conversation_id)),
            &payload,
        )
        .await
    }

    /// POST with a CSRF token, refreshing it and retrying exactly once on denial.
    pub async fn authorized_post(&self, path: &str, payload: &Value) -> Result<Value> {
        let token = match self.tokens.get_token().await {
            Some(token) => token,
            None => self
                .tokens
                .refetch_token_from_page()
                .await?
                .ok_or(Error::TokenUnavailable)?,
        };

        let response = self.transport.post_json(path, payload, &token).await?;
        if !response.is_authorization_denied() {
            return response.into_json();
        }

        warn!("{} rejected the CSRF token, refreshing", path);
        self.tokens.invalidate().await;
        let fresh = self
            .tokens
            .refetch_token_from_page()
            .await?
            .ok_or(Error::TokenUnavailable)?;

        let retry = self.transport.post_json(path, payload, &fresh).await?;
        if retry.is_authorization_denied() {
            self.tokens.invalidate().await;
            return Err(Error::Authorization { url: retry.url });
        }
        retry.into_json()
    }
}

/// Validate a price and format it with two decimals.
pub fn normalize_price(price: &str) -> Result<String> {
    let value: f64 = price
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| Error::InvalidInput(format!("not a price: {}", price)))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidInput(format!("price must be positive: {}", price)));
    }
    Ok(format!("{:.2}", value))
}

/// Numeric ids go out as JSON numbers, anything else as a string.
fn id_value(id: &str) -> Value {
    id.trim()
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(id.trim()))
}
