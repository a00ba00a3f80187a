//! CLI parser and dispatch.

mod config_cmd;
mod filter;
mod helpers;
mod inbox;
mod messages;
mod pickup;
mod watch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use listwatch::config::load_settings;

#[derive(Parser)]
#[command(name = "listwatch")]
#[command(about = "Marketplace catalog watcher and inbox client")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "LISTWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a catalog page and print newly listed items
    Watch {
        /// Catalog page URL to monitor
        url: Option<String>,
        /// Monitor a saved filter instead of a URL
        #[arg(short, long, conflicts_with = "url")]
        filter: Option<String>,
    },

    /// Show the inbox, or keep watching it for unread conversations
    Inbox {
        /// Print the first inbox page and exit
        #[arg(long)]
        once: bool,
    },

    /// Print a conversation
    Conversation {
        /// Conversation ID
        id: String,
    },

    /// Reply in a conversation
    Send {
        conversation_id: String,
        body: String,
    },

    /// Propose a price on a transaction
    Offer {
        transaction_id: String,
        price: String,
        #[arg(long, default_value = "EUR")]
        currency: String,
    },

    /// Open a conversation with a seller and send a first message
    Ask {
        item_id: String,
        seller_id: String,
        body: String,
    },

    /// Create a transaction at a price inside a conversation
    BuyOffer {
        conversation_id: String,
        price: String,
        #[arg(long, default_value = "EUR")]
        currency: String,
    },

    /// Manage saved catalog filters
    Filter {
        #[command(subcommand)]
        command: FilterCommands,
    },

    /// Manage prioritized pickup points for checkout
    Pickup {
        #[command(subcommand)]
        command: PickupCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum FilterCommands {
    /// Save the query of a catalog URL under a name
    Save { name: String, url: String },
    /// List saved filters
    List,
    /// Delete a saved filter
    Delete { id: String },
    /// Print the catalog URL of a saved filter
    Url { id: String },
}

#[derive(Subcommand)]
enum PickupCommands {
    /// Replace the prioritized pickup point names
    Set {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List pickup point names in priority order
    List,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show effective settings
    Show,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Watch { url, filter } => {
            watch::cmd_watch(&settings, url.as_deref(), filter.as_deref()).await
        }
        Commands::Inbox { once } => inbox::cmd_inbox(&settings, once).await,
        Commands::Conversation { id } => messages::cmd_conversation(&settings, &id).await,
        Commands::Send {
            conversation_id,
            body,
        } => messages::cmd_send(&settings, &conversation_id, &body).await,
        Commands::Offer {
            transaction_id,
            price,
            currency,
        } => messages::cmd_offer(&settings, &transaction_id, &price, &currency).await,
        Commands::Ask {
            item_id,
            seller_id,
            body,
        } => messages::cmd_ask(&settings, &item_id, &seller_id, &body).await,
        Commands::BuyOffer {
            conversation_id,
            price,
            currency,
        } => messages::cmd_buy_offer(&settings, &conversation_id, &price, &currency).await,
        Commands::Filter { command } => match command {
            FilterCommands::Save { name, url } => filter::cmd_filter_save(&settings, &name, &url),
            FilterCommands::List => filter::cmd_filter_list(&settings),
            FilterCommands::Delete { id } => filter::cmd_filter_delete(&settings, &id),
            FilterCommands::Url { id } => filter::cmd_filter_url(&settings, &id),
        },
        Commands::Pickup { command } => match command {
            PickupCommands::Set { names } => pickup::cmd_pickup_set(&settings, &names),
            PickupCommands::List => pickup::cmd_pickup_list(&settings),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&settings),
        },
    }
}
