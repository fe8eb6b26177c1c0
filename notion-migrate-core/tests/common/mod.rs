//! In-memory stand-in for a Notion workspace.
//!
//! Writes are checked against the same limits the real API enforces (batch size,
//! nesting depth, text length, containers that need children) and rejected with
//! `ApiError::Validation` atomically. Reads return blocks exactly the way the API
//! does: one level at a time, with `has_children` set and no inline children.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use notion_migrate_core::block::{Block, BlockKind};
use notion_migrate_core::config::Limits;
use notion_migrate_core::contract::NotionApi;
use notion_migrate_core::error::ApiError;
use serde_json::{json, Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Node {
    kind: BlockKind,
    payload: Map<String, Value>,
    children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPage {
    pub database_id: String,
    pub page_id: String,
    pub properties: Value,
}

#[derive(Default)]
struct State {
    nodes: HashMap<String, Node>,
    records: HashMap<String, Vec<Value>>,
    created_pages: Vec<CreatedPage>,
    append_calls: usize,
    list_calls: usize,
    failing_appends: HashSet<usize>,
    failing_lists: HashSet<String>,
    failing_creates: bool,
}

pub struct FakeWorkspace {
    limits: Limits,
    state: Mutex<State>,
}

impl Default for FakeWorkspace {
    fn default() -> Self {
        FakeWorkspace::new(Limits::default())
    }
}

impl FakeWorkspace {
    pub fn new(limits: Limits) -> Self {
        FakeWorkspace {
            limits,
            state: Mutex::new(State::default()),
        }
    }

    /// Stores `blocks` under a fresh container without any limit checks and returns its id.
    pub fn add_tree(&self, blocks: Vec<Block>) -> String {
        let mut state = self.state.lock().unwrap();
        let children = store(&mut state, blocks);
        let id = Uuid::new_v4().to_string();
        state.nodes.insert(
            id.clone(),
            Node {
                kind: BlockKind::ChildPage,
                payload: Map::new(),
                children,
            },
        );
        id
    }

    /// Adds a source page record (default property names) and its content. Returns the page id.
    pub fn add_source_page(
        &self,
        database_id: &str,
        title: &str,
        creator_email: Option<&str>,
        blocks: Vec<Block>,
    ) -> String {
        let page_id = self.add_tree(blocks);
        let created_by = match creator_email {
            Some(email) => json!({ "created_by": { "object": "user", "person": { "email": email } } }),
            None => json!({ "created_by": { "object": "user" } }),
        };
        let record = json!({
            "object": "page",
            "id": page_id,
            "properties": {
                "Name": { "title": [{ "plain_text": title }] },
                "Type": { "select": { "name": "How-to" } },
                "Created By": created_by,
            }
        });
        self.add_record(database_id, record);
        page_id
    }

    pub fn add_person(&self, database_id: &str, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.add_record(
            database_id,
            json!({
                "object": "page",
                "id": id,
                "properties": { "⚙️ Email": { "rich_text": [{ "plain_text": email }] } }
            }),
        );
        id
    }

    pub fn add_record(&self, database_id: &str, record: Value) {
        let mut state = self.state.lock().unwrap();
        state
            .records
            .entry(database_id.to_string())
            .or_default()
            .push(record);
    }

    /// Makes the `n`-th append call (1-based, counted across the workspace) fail.
    pub fn fail_append_call(&self, n: usize) {
        self.state.lock().unwrap().failing_appends.insert(n);
    }

    pub fn fail_list_children(&self, block_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_lists
            .insert(block_id.to_string());
    }

    pub fn fail_creates(&self) {
        self.state.lock().unwrap().failing_creates = true;
    }

    pub fn created_pages(&self) -> Vec<CreatedPage> {
        self.state.lock().unwrap().created_pages.clone()
    }

    pub fn append_calls(&self) -> usize {
        self.state.lock().unwrap().append_calls
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    /// Id of the `index`-th child of `block_id`.
    pub fn child_id(&self, block_id: &str, index: usize) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.nodes.get(block_id)?.children.get(index).cloned()
    }

    /// The stored tree below `block_id`, ids dropped, children inlined.
    pub fn tree(&self, block_id: &str) -> Vec<Block> {
        let state = self.state.lock().unwrap();
        rebuild(&state, block_id)
    }

    /// One line per stored block: two spaces per depth, kind, then its plain text.
    pub fn outline(&self, block_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut lines = Vec::new();
        outline_into(&state, block_id, 0, &mut lines);
        lines
    }

    fn check_write(&self, blocks: &[Block]) -> Result<(), ApiError> {
        if blocks.len() > self.limits.max_blocks_per_batch {
            return Err(ApiError::Validation(format!(
                "body.children.length should be ≤ {}, instead was {}",
                self.limits.max_blocks_per_batch,
                blocks.len()
            )));
        }
        self.check_level(blocks, 0)
    }

    fn check_level(&self, blocks: &[Block], depth: usize) -> Result<(), ApiError> {
        if !blocks.is_empty() && depth > self.limits.max_depth {
            return Err(ApiError::Validation(format!(
                "children nested {depth} levels deep"
            )));
        }
        for block in blocks {
            if matches!(block.kind, BlockKind::Unsupported | BlockKind::Other(_)) {
                return Err(ApiError::Validation(format!(
                    "block type {} cannot be created",
                    block.kind
                )));
            }
            if let Some(length) = longest_text(block) {
                if length > self.limits.max_leaf_length {
                    return Err(ApiError::Validation(format!(
                        "text.content.length should be ≤ {}, instead was {length}",
                        self.limits.max_leaf_length
                    )));
                }
            }
            let needs_children = matches!(block.kind, BlockKind::Table | BlockKind::ColumnList);
            if needs_children && block.children.as_ref().map_or(true, Vec::is_empty) {
                return Err(ApiError::Validation(format!(
                    "{} requires at least one child",
                    block.kind
                )));
            }
            if let Some(children) = &block.children {
                self.check_level(children, depth + 1)?;
            }
        }
        Ok(())
    }
}

fn store(state: &mut State, blocks: Vec<Block>) -> Vec<String> {
    blocks
        .into_iter()
        .map(|block| {
            let children = store(state, block.children.unwrap_or_default());
            let id = Uuid::new_v4().to_string();
            state.nodes.insert(
                id.clone(),
                Node {
                    kind: block.kind,
                    payload: block.payload,
                    children,
                },
            );
            id
        })
        .collect()
}

fn rebuild(state: &State, block_id: &str) -> Vec<Block> {
    let Some(node) = state.nodes.get(block_id) else {
        return Vec::new();
    };
    node.children
        .iter()
        .filter_map(|id| {
            let child = state.nodes.get(id)?;
            let block = Block::new(child.kind.clone(), child.payload.clone());
            Some(if child.children.is_empty() {
                block
            } else {
                block.with_children(rebuild(state, id))
            })
        })
        .collect()
}

fn outline_into(state: &State, block_id: &str, depth: usize, lines: &mut Vec<String>) {
    let Some(node) = state.nodes.get(block_id) else {
        return;
    };
    for id in &node.children {
        if let Some(child) = state.nodes.get(id) {
            lines.push(format!(
                "{}{}: {}",
                "  ".repeat(depth),
                child.kind,
                plain_text(&child.payload)
            ));
            outline_into(state, id, depth + 1, lines);
        }
    }
}

pub fn plain_text(payload: &Map<String, Value>) -> String {
    payload
        .get("rich_text")
        .and_then(Value::as_array)
        .map(|segments| {
            segments
                .iter()
                .filter_map(|s| s.pointer("/text/content").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn longest_text(block: &Block) -> Option<usize> {
    block
        .payload
        .get("rich_text")?
        .as_array()?
        .iter()
        .filter_map(|s| s.pointer("/text/content").and_then(Value::as_str))
        .map(|content| content.chars().count())
        .max()
}

fn email_matches(record: &Value, filter: &Value) -> bool {
    let Some(property) = filter.get("property").and_then(Value::as_str) else {
        return true;
    };
    let Some(needle) = filter.pointer("/rich_text/contains").and_then(Value::as_str) else {
        return true;
    };
    record
        .get("properties")
        .and_then(|p| p.get(property))
        .and_then(|p| p.get("rich_text"))
        .and_then(Value::as_array)
        .is_some_and(|segments| {
            segments
                .iter()
                .filter_map(|s| s.get("plain_text").and_then(Value::as_str))
                .any(|text| text.contains(needle))
        })
}

#[async_trait]
impl NotionApi for FakeWorkspace {
    async fn list_children(&self, block_id: &str) -> Result<Vec<Block>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.failing_lists.contains(block_id) {
            return Err(ApiError::Http {
                status: 502,
                code: "bad_gateway".into(),
                message: "injected".into(),
            });
        }
        let node = state
            .nodes
            .get(block_id)
            .ok_or_else(|| ApiError::ObjectNotFound(block_id.to_string()))?;
        Ok(node
            .children
            .iter()
            .filter_map(|id| {
                let child = state.nodes.get(id)?;
                let mut block = Block::new(child.kind.clone(), child.payload.clone()).with_id(id);
                block.has_children = !child.children.is_empty();
                Some(block)
            })
            .collect())
    }

    async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
        children: Vec<Block>,
    ) -> Result<String, ApiError> {
        if self.state.lock().unwrap().failing_creates {
            return Err(ApiError::RateLimited);
        }
        self.check_write(&children)?;
        let mut state = self.state.lock().unwrap();
        let child_ids = store(&mut state, children);
        let page_id = Uuid::new_v4().to_string();
        state.nodes.insert(
            page_id.clone(),
            Node {
                kind: BlockKind::ChildPage,
                payload: Map::new(),
                children: child_ids,
            },
        );
        state.created_pages.push(CreatedPage {
            database_id: database_id.to_string(),
            page_id: page_id.clone(),
            properties,
        });
        Ok(page_id)
    }

    async fn append_children(&self, block_id: &str, children: Vec<Block>) -> Result<(), ApiError> {
        let call = {
            let mut state = self.state.lock().unwrap();
            state.append_calls += 1;
            if state.failing_appends.contains(&state.append_calls) {
                return Err(ApiError::Http {
                    status: 500,
                    code: "internal_server_error".into(),
                    message: "injected".into(),
                });
            }
            state.append_calls
        };
        self.check_write(&children)?;
        let mut state = self.state.lock().unwrap();
        if !state.nodes.contains_key(block_id) {
            return Err(ApiError::ObjectNotFound(format!("{block_id} (append call {call})")));
        }
        let child_ids = store(&mut state, children);
        if let Some(node) = state.nodes.get_mut(block_id) {
            node.children.extend(child_ids);
        }
        Ok(())
    }

    async fn query_records(
        &self,
        database_id: &str,
        filter: Option<Value>,
    ) -> Result<Vec<Value>, ApiError> {
        let state = self.state.lock().unwrap();
        let records = state
            .records
            .get(database_id)
            .ok_or_else(|| ApiError::ObjectNotFound(database_id.to_string()))?;
        Ok(records
            .iter()
            .filter(|record| filter.as_ref().map_or(true, |f| email_matches(record, f)))
            .cloned()
            .collect())
    }
}
