//! Shared wiring for CLI commands.

use std::sync::Arc;

use listwatch::api::{HttpClient, Transport};
use listwatch::config::Settings;
use listwatch::messaging::MessagingClient;
use listwatch::storage::LocalStore;
use listwatch::token::TokenProvider;

/// Catalog URL on the configured host, used to rebuild saved filters.
pub fn catalog_url(settings: &Settings) -> String {
    format!("{}/catalog", settings.base_url)
}

pub fn store(settings: &Settings) -> LocalStore {
    LocalStore::new(settings.storage_path())
}

pub fn transport(settings: &Settings) -> anyhow::Result<Arc<dyn Transport>> {
    Ok(Arc::new(HttpClient::from_settings(settings)?))
}

/// Messaging client with a token cache seeded from settings when a token
/// was supplied.
pub async fn messaging(settings: &Settings) -> anyhow::Result<MessagingClient> {
    let transport = transport(settings)?;
    let tokens = TokenProvider::new(
        transport.clone(),
        settings.token_ttl(),
        settings.token_page_path.clone(),
    );
    if let Some(token) = settings.csrf_token.as_deref() {
        tokens.seed(token).await;
    }
    Ok(MessagingClient::new(transport, tokens)
        .with_page_sizes(settings.inbox_per_page, settings.conversation_per_page))
}
