//! Saved filter commands.

use console::style;

use listwatch::config::Settings;

use super::helpers;
use crate::cli::output::{arrow, error, success};

pub fn cmd_filter_save(settings: &Settings, name: &str, url: &str) -> anyhow::Result<()> {
    let filter = helpers::store(settings).save_filter(name, url)?;
    println!(
        "{} Saved filter {} ({} parameter(s))",
        success(),
        style(&filter.name).bold(),
        filter.params.len()
    );
    println!("  {} id {}", arrow(), filter.id);
    Ok(())
}

pub fn cmd_filter_list(settings: &Settings) -> anyhow::Result<()> {
    let filters = helpers::store(settings).list_filters()?;
    if filters.is_empty() {
        println!("{}", style("No saved filters").dim());
        return Ok(());
    }

    println!("{:<16} {:<24} {}", "ID", "NAME", "CREATED");
    for filter in filters {
        println!(
            "{:<16} {:<24} {}",
            filter.id,
            filter.name,
            filter.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub fn cmd_filter_delete(settings: &Settings, id: &str) -> anyhow::Result<()> {
    if helpers::store(settings).delete_filter(id)? {
        println!("{} Deleted filter {}", success(), id);
    } else {
        eprintln!("{} No saved filter with id {}", error(), id);
    }
    Ok(())
}

pub fn cmd_filter_url(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let store = helpers::store(settings);
    let filter = store
        .get_filter(id)?
        .ok_or_else(|| anyhow::anyhow!("No saved filter with id {}", id))?;
    println!("{}", store.filter_url(&filter, &helpers::catalog_url(settings))?);
    Ok(())
}
