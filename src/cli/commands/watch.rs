//! Catalog watch command.

use std::sync::Arc;

use console::style;

use listwatch::api::CatalogClient;
use listwatch::config::Settings;
use listwatch::monitor::Poller;

use super::helpers;
use crate::cli::output::{arrow, TerminalItems};

/// Watch a catalog URL (or saved filter) until interrupted.
pub async fn cmd_watch(
    settings: &Settings,
    url: Option<&str>,
    filter_id: Option<&str>,
) -> anyhow::Result<()> {
    let page_url = match (url, filter_id) {
        (Some(url), _) => url.to_string(),
        (None, Some(id)) => {
            let store = helpers::store(settings);
            let filter = store
                .get_filter(id)?
                .ok_or_else(|| anyhow::anyhow!("No saved filter with id {}", id))?;
            store.filter_url(&filter, &helpers::catalog_url(settings))?
        }
        (None, None) => anyhow::bail!("Give a catalog URL or --filter <id>"),
    };

    let source = Arc::new(CatalogClient::new(
        helpers::transport(settings)?,
        settings.default_brand_id.clone(),
    ));
    let poller = Poller::new(
        source,
        Arc::new(TerminalItems::new(settings.base_url.clone())),
        page_url.clone(),
        settings.poll_interval(),
        settings.max_items,
    );

    eprintln!(
        "{} Watching {} every {}s (Ctrl-C to stop)",
        arrow(),
        style(&page_url).cyan(),
        settings.poll_interval().as_secs()
    );
    poller.start().await;
    tokio::signal::ctrl_c().await?;
    poller.stop().await;

    eprintln!("{} {} item(s) seen", arrow(), poller.items().await.len());
    Ok(())
}
