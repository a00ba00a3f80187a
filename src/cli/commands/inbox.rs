//! Inbox listing and notification watch.

use std::sync::Arc;

use console::style;

use listwatch::config::Settings;
use listwatch::notify::NotificationPoller;

use super::helpers;
use crate::cli::output::{arrow, conversation_line, TerminalPopups};

pub async fn cmd_inbox(settings: &Settings, once: bool) -> anyhow::Result<()> {
    let client = helpers::messaging(settings).await?;

    if once {
        let conversations = client.latest_inbox().await?;
        if conversations.is_empty() {
            println!("{}", style("Inbox is empty").dim());
        }
        for conversation in &conversations {
            println!("{}", conversation_line(conversation));
        }
        return Ok(());
    }

    let poller = NotificationPoller::new(
        Arc::new(client),
        Arc::new(TerminalPopups),
        settings.message_poll_interval(),
        settings.show_unread_on_start,
    );
    eprintln!(
        "{} Watching inbox every {}s (Ctrl-C to stop)",
        arrow(),
        settings.message_poll_interval().as_secs()
    );
    poller.start().await;
    tokio::signal::ctrl_c().await?;
    poller.stop().await;
    Ok(())
}
