#![allow(unused)]

//! # contract: the remote workspace seen by the migration core
//!
//! This module defines the single trait ([`NotionApi`]) through which the core talks to
//! the Notion API. The concrete HTTP client lives in the `notion-migrate` binary crate;
//! tests use the `mockall`-generated `MockNotionApi` or an in-memory fake.
//!
//! ## Contract
//! - `list_children` returns the *complete* ordered child list, following pagination
//!   cursors transparently.
//! - `create_page` is a single call that either creates the page with all initial
//!   children or fails without leaving a partial page.
//! - `append_children` is not assumed idempotent; it succeeds or fails per call.
//! - Every method fails with a typed [`ApiError`] rather than hanging. Retry policy,
//!   if any, belongs to the implementor.
//!
//! ## Mocking & Testing
//! The trait is annotated for `mockall`, exported under the default
//! `test-export-mocks` feature so integration tests outside the crate can use it.

use async_trait::async_trait;
use serde_json::Value;

use mockall::automock;

use crate::block::Block;
use crate::error::ApiError;

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait NotionApi: Send + Sync {
    /// All children of a block or page, in order, across every result page.
    async fn list_children(&self, block_id: &str) -> Result<Vec<Block>, ApiError>;

    /// Creates a page in `database_id` and returns its id.
    async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
        children: Vec<Block>,
    ) -> Result<String, ApiError>;

    /// Appends `children` after the existing children of `block_id`.
    async fn append_children(&self, block_id: &str, children: Vec<Block>) -> Result<(), ApiError>;

    /// Every record of a database matching `filter`, across every result page.
    async fn query_records(
        &self,
        database_id: &str,
        filter: Option<Value>,
    ) -> Result<Vec<Value>, ApiError>;
}
