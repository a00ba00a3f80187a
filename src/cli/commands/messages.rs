//! Conversation reads and write calls.

use console::style;

use listwatch::config::Settings;

use super::helpers;
use crate::cli::output::{arrow, print_conversation, success};

pub async fn cmd_conversation(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let client = helpers::messaging(settings).await?;
    let conversation = client.conversation(id).await?;
    print_conversation(&conversation);
    Ok(())
}

pub async fn cmd_send(settings: &Settings, conversation_id: &str, body: &str) -> anyhow::Result<()> {
    let client = helpers::messaging(settings).await?;
    client.send_message(conversation_id, body).await?;
    println!("{} Message sent to {}", success(), conversation_id);
    Ok(())
}

pub async fn cmd_offer(
    settings: &Settings,
    transaction_id: &str,
    price: &str,
    currency: &str,
) -> anyhow::Result<()> {
    let client = helpers::messaging(settings).await?;
    client
        .send_offer_request(transaction_id, price, currency)
        .await?;
    println!(
        "{} Offer of {} {} sent on transaction {}",
        success(),
        price,
        currency.to_uppercase(),
        transaction_id
    );
    Ok(())
}

/// Open a conversation about an item, then send the first message.
pub async fn cmd_ask(
    settings: &Settings,
    item_id: &str,
    seller_id: &str,
    body: &str,
) -> anyhow::Result<()> {
    let client = helpers::messaging(settings).await?;
    let conversation = client.create_conversation(item_id, seller_id).await?;
    println!("{} Conversation {} opened", success(), conversation.id);

    client.send_message(&conversation.id, body).await?;
    println!("  {} Message sent", arrow());
    Ok(())
}

pub async fn cmd_buy_offer(
    settings: &Settings,
    conversation_id: &str,
    price: &str,
    currency: &str,
) -> anyhow::Result<()> {
    let client = helpers::messaging(settings).await?;
    let response = client
        .create_transaction(conversation_id, price, currency)
        .await?;
    println!("{} Transaction created in {}", success(), conversation_id);
    if let Some(id) = response
        .get("transaction")
        .and_then(|t| t.get("id"))
        .filter(|id| !id.is_null())
    {
        println!("  {} Transaction {}", arrow(), style(id).dim());
    }
    Ok(())
}
