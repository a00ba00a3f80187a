//! Pickup point priority commands.

use console::style;

use listwatch::config::Settings;

use super::helpers;
use crate::cli::output::success;

pub fn cmd_pickup_set(settings: &Settings, names: &[String]) -> anyhow::Result<()> {
    let store = helpers::store(settings);
    store.set_pickup_points(names)?;
    println!(
        "{} {} pickup point(s) saved",
        success(),
        store.pickup_points()?.len()
    );
    Ok(())
}

pub fn cmd_pickup_list(settings: &Settings) -> anyhow::Result<()> {
    let names = helpers::store(settings).pickup_points()?;
    if names.is_empty() {
        println!("{}", style("No pickup points set").dim());
    }
    for (rank, name) in names.iter().enumerate() {
        println!("{:>2}. {}", rank + 1, name);
    }
    Ok(())
}
