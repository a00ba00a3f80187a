//! Scripted in-memory transport shared by integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use listwatch::api::{ApiResponse, Transport};
use listwatch::{Error, Result};

/// One request the transport received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get {
        path: String,
        query: Vec<(String, String)>,
    },
    Post {
        path: String,
        body: Value,
        token: String,
    },
    Page {
        path: String,
    },
}

/// Answers requests from queues, one queue per kind. An empty queue
/// answers GET/POST with `{}` and pages with a network error.
#[derive(Default)]
pub struct ScriptedTransport {
    gets: Mutex<VecDeque<ApiResponse>>,
    posts: Mutex<VecDeque<ApiResponse>>,
    pages: Mutex<VecDeque<String>>,
    observed: Mutex<Option<String>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_get(&self, status: u16, body: &str) -> &Self {
        self.gets
            .lock()
            .unwrap()
            .push_back(ApiResponse::new(status, "get", body));
        self
    }

    pub fn push_post(&self, status: u16, body: &str) -> &Self {
        self.posts
            .lock()
            .unwrap()
            .push_back(ApiResponse::new(status, "post", body));
        self
    }

    pub fn push_page(&self, html: &str) -> &Self {
        self.pages.lock().unwrap().push_back(html.to_string());
        self
    }

    pub fn set_observed_token(&self, token: &str) {
        *self.observed.lock().unwrap() = Some(token.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<(String, Value, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Post { path, body, token } => Some((path, body, token)),
                _ => None,
            })
            .collect()
    }

    pub fn page_fetches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Page { .. }))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(Call::Get {
            path: path.to_string(),
            query: query.to_vec(),
        });
        let next = self.gets.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| ApiResponse::new(200, path, "{}")))
    }

    async fn post_json(&self, path: &str, body: &Value, csrf_token: &str) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(Call::Post {
            path: path.to_string(),
            body: body.clone(),
            token: csrf_token.to_string(),
        });
        let next = self.posts.lock().unwrap().pop_front();
        Ok(next
            .map(|r| ApiResponse::new(r.status, path, r.body))
            .unwrap_or_else(|| ApiResponse::new(200, path, "{}")))
    }

    async fn get_page(&self, path: &str) -> Result<String> {
        self.calls.lock().unwrap().push(Call::Page {
            path: path.to_string(),
        });
        let next = self.pages.lock().unwrap().pop_front();
        next.ok_or_else(|| Error::Network {
            status: 404,
            url: path.to_string(),
        })
    }

    async fn observed_csrf_token(&self) -> Option<String> {
        self.observed.lock().unwrap().clone()
    }
}

/// Page carrying `token` in a meta tag.
pub fn page_with_token(token: &str) -> String {
    format!(
        r#"<html><head><meta name="csrf-token" content="{}"></head><body></body></html>"#,
        token
    )
}

pub const PAGE_WITHOUT_TOKEN: &str = "<html><body><p>Sign in</p></body></html>";
