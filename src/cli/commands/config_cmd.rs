//! Configuration display.

use console::style;

use listwatch::config::Settings;

use crate::cli::output::arrow;

fn redacted(value: &Option<String>) -> String {
    match value {
        Some(v) if v.chars().count() > 8 => format!("{}…", v.chars().take(4).collect::<String>()),
        Some(_) => "set".to_string(),
        None => style("unset").dim().to_string(),
    }
}

/// Print the effective settings after file and environment overrides.
pub fn cmd_config_show(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", style("Effective settings").bold());
    let rows: Vec<(&str, String)> = vec![
        ("base_url", settings.base_url.clone()),
        ("data_dir", settings.data_dir.display().to_string()),
        ("storage", settings.storage_path().display().to_string()),
        (
            "user_agent",
            settings.user_agent.clone().unwrap_or_else(|| "default".into()),
        ),
        ("request_timeout", format!("{}s", settings.request_timeout)),
        ("poll_interval", format!("{}s", settings.poll_interval().as_secs())),
        ("max_items", settings.max_items.to_string()),
        ("default_brand_id", settings.default_brand_id.clone()),
        ("token_ttl", format!("{}s", settings.token_ttl_secs)),
        ("token_page_path", settings.token_page_path.clone()),
        (
            "message_poll_interval",
            format!("{}s", settings.message_poll_interval().as_secs()),
        ),
        ("inbox_per_page", settings.inbox_per_page.to_string()),
        ("conversation_per_page", settings.conversation_per_page.to_string()),
        ("show_unread_on_start", settings.show_unread_on_start.to_string()),
        ("session_cookie", redacted(&settings.session_cookie)),
        ("csrf_token", redacted(&settings.csrf_token)),
    ];
    for (key, value) in rows {
        println!("  {} {:<22} {}", arrow(), key, value);
    }
    Ok(())
}
