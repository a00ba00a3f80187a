//! Terminal rendering for items and notifications.

use console::style;

use listwatch::models::{Conversation, ConversationSummary, Item};
use listwatch::monitor::ItemSink;
use listwatch::notify::PopupSink;

pub fn success() -> console::StyledObject<&'static str> {
    style("✓").green()
}

pub fn error() -> console::StyledObject<&'static str> {
    style("✗").red()
}

pub fn arrow() -> console::StyledObject<&'static str> {
    style("→").dim()
}

fn item_line(item: &Item, base_url: &str) -> String {
    let price = item
        .price
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "?".to_string());
    let details: Vec<&str> = [&item.brand, &item.size, &item.condition]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect();

    let mut line = format!("{} {}", style(&price).bold(), item.title);
    if !details.is_empty() {
        line.push_str(&format!(" {}", style(format!("({})", details.join(", "))).dim()));
    }
    if let Some(link) = item.permalink(base_url) {
        line.push_str(&format!("\n    {} {}", arrow(), style(link).cyan()));
    }
    line
}

/// Prints catalog items as they arrive.
pub struct TerminalItems {
    base_url: String,
}

impl TerminalItems {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl ItemSink for TerminalItems {
    fn render_all(&self, items: &[Item]) {
        println!("{} {} item(s) on the page", style("Catalog").bold(), items.len());
        for item in items {
            println!("  {}", item_line(item, &self.base_url));
        }
    }

    fn prepend(&self, items: &[Item]) {
        for item in items {
            println!("{} {}", style("NEW").green().bold(), item_line(item, &self.base_url));
        }
    }
}

pub fn conversation_line(conversation: &ConversationSummary) -> String {
    let marker = if conversation.unread {
        style("●").yellow().to_string()
    } else {
        " ".to_string()
    };
    let who = conversation.opposite_user.as_deref().unwrap_or("?");
    let mut line = format!("{} {} {}", marker, style(&conversation.id).dim(), style(who).bold());
    if let Some(title) = &conversation.item_title {
        line.push_str(&format!(" [{}]", title));
    }
    if let Some(preview) = &conversation.description {
        line.push_str(&format!(": {}", preview));
    }
    line
}

/// Shows unread conversations as terminal lines.
pub struct TerminalPopups;

impl PopupSink for TerminalPopups {
    type Handle = String;

    fn show(&self, conversation: &ConversationSummary) -> String {
        println!("{} {}", style("MESSAGE").yellow().bold(), conversation_line(conversation));
        conversation.id.clone()
    }

    fn hide(&self, _conversation_id: &str, handle: String) {
        println!("{} {} read", arrow(), style(handle).dim());
    }
}

pub fn print_conversation(conversation: &Conversation) {
    let who = conversation.opposite_user.as_deref().unwrap_or("?");
    println!(
        "{} {} with {}",
        style("Conversation").bold(),
        conversation.id,
        style(who).bold()
    );
    if let Some(transaction) = &conversation.transaction_id {
        println!("  {} transaction {}", arrow(), transaction);
    }
    for message in &conversation.messages {
        let from = match (&message.user_id, &conversation.opposite_user_id) {
            (Some(user), Some(other)) if user == other => style(who).cyan().to_string(),
            (Some(_), _) => style("me").green().to_string(),
            (None, _) => style("system").dim().to_string(),
        };
        println!("  {}: {}", from, message.body);
    }
}
