//! Messaging client against a scripted transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{page_with_token, Call, ScriptedTransport, PAGE_WITHOUT_TOKEN};
use listwatch::messaging::MessagingClient;
use listwatch::token::TokenProvider;
use listwatch::Error;

const TTL: Duration = Duration::from_secs(300);

async fn client(transport: &Arc<ScriptedTransport>, seed: Option<&str>) -> MessagingClient {
    let tokens = TokenProvider::new(transport.clone(), TTL, "/inbox");
    if let Some(token) = seed {
        tokens.seed(token).await;
    }
    MessagingClient::new(transport.clone(), tokens)
}

#[tokio::test]
async fn test_send_with_cached_token() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_post(200, r#"{"id": 1}"#);
    let client = client(&transport, Some("cached-token-1")).await;

    let response = client.send_message("42", " hello ").await.unwrap();
    assert_eq!(response["id"], 1);

    let posts = transport.posts();
    assert_eq!(posts.len(), 1);
    let (path, body, token) = &posts[0];
    assert_eq!(path, "/api/v2/conversations/42/replies");
    assert_eq!(token, "cached-token-1");
    assert_eq!(
        body,
        &json!({"reply": {
            "body": "hello",
            "photo_temp_uuids": null,
            "is_personal_data_sharing_check_skipped": false
        }})
    );
    assert_eq!(transport.page_fetches(), 0);
}

#[tokio::test]
async fn test_denied_then_retry_succeeds() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_post(403, r#"{"message":"forbidden"}"#)
        .push_post(200, r#"{"ok": true}"#)
        .push_page(&page_with_token("fresh-token-2"));
    let client = client(&transport, Some("stale-token-1")).await;

    let response = client.send_message("42", "hi").await.unwrap();
    assert_eq!(response["ok"], true);

    let tokens: Vec<String> = transport.posts().into_iter().map(|(_, _, t)| t).collect();
    assert_eq!(tokens, vec!["stale-token-1", "fresh-token-2"]);
    assert_eq!(transport.page_fetches(), 1);

    // The refreshed token is cached for the next call.
    client.send_message("42", "again").await.unwrap();
    assert_eq!(transport.posts()[2].2, "fresh-token-2");
    assert_eq!(transport.page_fetches(), 1);
}

#[tokio::test]
async fn test_invalid_authenticity_code_counts_as_denied() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_post(200, r#"{"code": 106, "message": "Invalid authenticity token"}"#)
        .push_post(200, r#"{"offer_request": {"id": 9}}"#)
        .push_page(&page_with_token("fresh-token-2"));
    let client = client(&transport, Some("stale-token-1")).await;

    let response = client
        .send_offer_request("777", "15", "eur")
        .await
        .unwrap();
    assert_eq!(response["offer_request"]["id"], 9);

    let posts = transport.posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].0, "/api/v2/transactions/777/offer_requests");
    assert_eq!(
        posts[1].1,
        json!({"offer_request": {"price": "15.00", "currency": "EUR"}})
    );
}

#[tokio::test]
async fn test_second_denial_is_terminal() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_post(403, "{}")
        .push_post(403, "{}")
        .push_post(200, "{}")
        .push_page(&page_with_token("fresh-token-2"));
    let client = client(&transport, Some("stale-token-1")).await;

    let err = client.send_message("42", "hi").await.unwrap_err();
    assert!(
        matches!(&err, Error::Authorization { url } if url == "/api/v2/conversations/42/replies"),
        "unexpected error: {err:?}"
    );
    assert_eq!(transport.posts().len(), 2);
    assert_eq!(transport.page_fetches(), 1);
}

#[tokio::test]
async fn test_no_token_fails_before_any_post() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_page(PAGE_WITHOUT_TOKEN);
    let client = client(&transport, None).await;

    let err = client.send_message("42", "hi").await.unwrap_err();
    assert!(matches!(err, Error::TokenUnavailable));
    assert!(transport.posts().is_empty());
}

#[tokio::test]
async fn test_refetch_without_token_after_denial() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_post(403, "{}").push_page(PAGE_WITHOUT_TOKEN);
    let client = client(&transport, Some("stale-token-1")).await;

    let err = client.send_message("42", "hi").await.unwrap_err();
    assert!(matches!(err, Error::TokenUnavailable));
    assert_eq!(transport.posts().len(), 1);
}

#[tokio::test]
async fn test_token_fetched_from_page_when_cache_empty() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_page(&page_with_token("page-token-3"));
    let client = client(&transport, None).await;

    client.send_message("42", "hi").await.unwrap();
    let calls = transport.calls();
    assert!(matches!(&calls[0], Call::Page { path } if path == "/inbox"));
    assert_eq!(transport.posts()[0].2, "page-token-3");
}

#[tokio::test]
async fn test_observed_token_used_without_page_fetch() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.set_observed_token("header-token-4");
    let client = client(&transport, None).await;

    client.send_message("42", "hi").await.unwrap();
    assert_eq!(transport.posts()[0].2, "header-token-4");
    assert_eq!(transport.page_fetches(), 0);
}

#[tokio::test]
async fn test_server_error_not_retried() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_post(500, "oops");
    let client = client(&transport, Some("cached-token-1")).await;

    let err = client.send_message("42", "hi").await.unwrap_err();
    assert!(matches!(err, Error::Network { status: 500, .. }));
    assert_eq!(transport.posts().len(), 1);
}

#[tokio::test]
async fn test_empty_message_rejected_locally() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client(&transport, Some("cached-token-1")).await;

    assert!(matches!(
        client.send_message("42", "   ").await,
        Err(Error::InvalidInput(_))
    ));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_create_conversation_and_transaction() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_post(200, r#"{"conversation": {"id": 555, "messages": []}}"#)
        .push_post(200, r#"{"transaction": {"id": 66}}"#);
    let client = client(&transport, Some("cached-token-1")).await;

    let conversation = client.create_conversation("1001", "2002").await.unwrap();
    assert_eq!(conversation.id, "555");

    client.create_transaction("555", "20,5", "EUR").await.unwrap();

    let posts = transport.posts();
    assert_eq!(posts[0].0, "/api/v2/conversations");
    assert_eq!(
        posts[0].1,
        json!({"initiator": "ask_seller", "item_id": 1001, "opposite_user_id": 2002})
    );
    assert_eq!(posts[1].0, "/api/v2/conversations/555/transactions");
    assert_eq!(
        posts[1].1,
        json!({"transaction": {"price": "20.50", "currency": "EUR"}})
    );
}

#[tokio::test]
async fn test_inbox_query() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_get(
        200,
        r#"{"conversations": [{"id": 1, "unread": true}, {"id": 2, "unread": false}]}"#,
    );
    let client = client(&transport, None).await.with_page_sizes(5, 20);

    let inbox = client.latest_inbox().await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert!(inbox[0].unread);

    match &transport.calls()[0] {
        Call::Get { path, query } => {
            assert_eq!(path, "/api/v2/inbox");
            assert!(query.contains(&("page".to_string(), "1".to_string())));
            assert!(query.contains(&("per_page".to_string(), "5".to_string())));
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn test_full_conversation_page_fetches_second_page() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_get(
            200,
            r#"{"conversation": {"id": 8, "messages": [
                {"id": 1, "body": "a"}, {"id": 2, "body": "b"}
            ]}}"#,
        )
        .push_get(
            200,
            r#"{"conversation": {"id": 8, "messages": [
                {"id": 2, "body": "b"}, {"id": 3, "body": "c"}
            ]}}"#,
        );
    let client = client(&transport, None).await.with_page_sizes(20, 2);

    let conversation = client.conversation("8").await.unwrap();
    let ids: Vec<&str> = conversation.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn test_second_page_failure_keeps_first() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_get(
            200,
            r#"{"conversation": {"id": 8, "messages": [{"id": 1, "body": "a"}]}}"#,
        )
        .push_get(500, "");
    let client = client(&transport, None).await.with_page_sizes(20, 1);

    let conversation = client.conversation("8").await.unwrap();
    assert_eq!(conversation.messages.len(), 1);
}

#[tokio::test]
async fn test_partial_conversation_page_is_not_extended() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_get(
        200,
        r#"{"conversation": {"id": 8, "messages": [{"id": 1, "body": "a"}]}}"#,
    );
    let client = client(&transport, None).await;

    client.conversation("8").await.unwrap();
    assert_eq!(transport.calls().len(), 1);
}
