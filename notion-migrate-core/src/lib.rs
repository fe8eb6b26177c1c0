#![doc = "notion-migrate-core: core logic library for notion-migrate."]

//! This crate contains the block model, the tree transformations that make a fetched
//! page fit the Notion API's write limits, and the create/resolve/reattach pipeline.
//! The concrete HTTP client lives in the `notion-migrate` binary crate.
//!
//! # Pipeline
//! Filter -> Splitter -> Partitioner -> Batcher produce the writes for one document;
//! after the page exists, the resolver maps structural paths to server ids and the
//! reattachment driver appends everything that was deferred.

pub mod batch;
pub mod block;
pub mod config;
pub mod contract;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod migrate;
pub mod partition;
pub mod path;
pub mod placeholder;
pub mod reattach;
pub mod records;
pub mod resolve;
pub mod sanitize;
pub mod split;
