#![doc = "HTTP implementation of the core `NotionApi` trait against the public Notion REST API."]
//
//! # Notion client (CLI <-> Core)
//!
//! Bridges the [`NotionApi`] abstraction in `notion-migrate-core` to real HTTP calls.
//!
//! - Construct [`NotionClient`] from the environment (`NOTION_TOKEN`, optional `NOTION_API_BASE`).
//! - Listing calls follow `has_more` / `next_cursor` until the result set is exhausted.
//! - Error bodies (`{"code": ..., "message": ...}`) are mapped onto [`ApiError`] variants.

use std::env;

use async_trait::async_trait;
use notion_migrate_core::block::Block;
use notion_migrate_core::contract::NotionApi;
use notion_migrate_core::error::ApiError;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};

pub const DEFAULT_API_BASE: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: usize = 100;

pub struct NotionClient {
    http: Client,
    base_url: String,
    token: String,
}

impl NotionClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        NotionClient {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn new_from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok(); // loads environment variables from .env if present
        let token = env::var("NOTION_TOKEN").map_err(|e| {
            tracing::error!(error = ?e, "NOTION_TOKEN missing in environment");
            e
        })?;
        let base_url = env::var("NOTION_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        tracing::info!(
            token_set = !token.is_empty(),
            base_url = %base_url,
            "Initialized NotionClient from environment"
        );
        Ok(NotionClient::new(base_url, token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
            let code = body.get("code").and_then(Value::as_str).unwrap_or("unknown");
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(text.as_str());
            tracing::error!(status = %status, code, message, "Notion API returned error");
            return Err(ApiError::from_response(status.as_u16(), code, message));
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Collects `results` across every page of a paginated listing.
    async fn collect_pages<F>(&self, mut request: F) -> Result<Vec<Value>, ApiError>
    where
        F: FnMut(Option<&str>) -> RequestBuilder,
    {
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let body = self.send(request(cursor.as_deref())).await?;
            let page = body
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| ApiError::Decode("response has no results array".into()))?;
            results.extend(page.iter().cloned());

            let has_more = body.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = body
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || cursor.is_none() {
                return Ok(results);
            }
        }
    }
}

fn blocks_to_api(blocks: &[Block]) -> Value {
    Value::Array(blocks.iter().map(Block::to_api).collect())
}

#[async_trait]
impl NotionApi for NotionClient {
    async fn list_children(&self, block_id: &str) -> Result<Vec<Block>, ApiError> {
        tracing::debug!(block_id, "Listing block children");
        let url = self.url(&format!("/blocks/{block_id}/children"));
        let results = self
            .collect_pages(|cursor| {
                let mut query = vec![("page_size", PAGE_SIZE.to_string())];
                if let Some(cursor) = cursor {
                    query.push(("start_cursor", cursor.to_string()));
                }
                self.http.get(&url).query(&query)
            })
            .await?;
        Ok(results.iter().map(Block::from_api).collect())
    }

    async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
        children: Vec<Block>,
    ) -> Result<String, ApiError> {
        tracing::info!(database_id, children = children.len(), "Creating page");
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties,
            "children": blocks_to_api(&children),
        });
        let created = self.send(self.http.post(self.url("/pages")).json(&body)).await?;
        created
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Decode("created page has no id".into()))
    }

    async fn append_children(&self, block_id: &str, children: Vec<Block>) -> Result<(), ApiError> {
        tracing::debug!(block_id, children = children.len(), "Appending children");
        let body = json!({ "children": blocks_to_api(&children) });
        self.send(
            self.http
                .patch(self.url(&format!("/blocks/{block_id}/children")))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn query_records(
        &self,
        database_id: &str,
        filter: Option<Value>,
    ) -> Result<Vec<Value>, ApiError> {
        tracing::debug!(database_id, filtered = filter.is_some(), "Querying database");
        let url = self.url(&format!("/databases/{database_id}/query"));
        self.collect_pages(|cursor| {
            let mut body = Map::new();
            body.insert("page_size".into(), json!(PAGE_SIZE));
            if let Some(filter) = &filter {
                body.insert("filter".into(), filter.clone());
            }
            if let Some(cursor) = cursor {
                body.insert("start_cursor".into(), json!(cursor));
            }
            self.http.post(&url).json(&Value::Object(body))
        })
        .await
    }
}
