//! # block: the generic content-tree node
//!
//! A [`Block`] mirrors one Notion block: a [`BlockKind`] tag, the kind-specific payload
//! object and an optional, separately held list of children. Keeping `children` out of
//! the payload lets the transformations distinguish "no children key" (`None`) from
//! "empty children list" (`Some(vec![])`), which matters for container kinds the API
//! refuses to create without a children attribute.
//!
//! `has_children` is independent of `children`: a block whose subtree was detached
//! still reports `has_children == true`.

use serde_json::{json, Map, Value};
use std::fmt;

/// Block type tag as used on the wire (`"type"` field).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedListItem,
    NumberedListItem,
    ToDo,
    Toggle,
    Quote,
    Callout,
    Code,
    Equation,
    Divider,
    Bookmark,
    Embed,
    Image,
    Video,
    Pdf,
    File,
    External,
    LinkPreview,
    LinkMention,
    Table,
    TableRow,
    ColumnList,
    Column,
    SyncedBlock,
    ChildPage,
    ChildDatabase,
    Unsupported,
    Other(String),
}

impl BlockKind {
    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading1 => "heading_1",
            BlockKind::Heading2 => "heading_2",
            BlockKind::Heading3 => "heading_3",
            BlockKind::BulletedListItem => "bulleted_list_item",
            BlockKind::NumberedListItem => "numbered_list_item",
            BlockKind::ToDo => "to_do",
            BlockKind::Toggle => "toggle",
            BlockKind::Quote => "quote",
            BlockKind::Callout => "callout",
            BlockKind::Code => "code",
            BlockKind::Equation => "equation",
            BlockKind::Divider => "divider",
            BlockKind::Bookmark => "bookmark",
            BlockKind::Embed => "embed",
            BlockKind::Image => "image",
            BlockKind::Video => "video",
            BlockKind::Pdf => "pdf",
            BlockKind::File => "file",
            BlockKind::External => "external",
            BlockKind::LinkPreview => "link_preview",
            BlockKind::LinkMention => "link_mention",
            BlockKind::Table => "table",
            BlockKind::TableRow => "table_row",
            BlockKind::ColumnList => "column_list",
            BlockKind::Column => "column",
            BlockKind::SyncedBlock => "synced_block",
            BlockKind::ChildPage => "child_page",
            BlockKind::ChildDatabase => "child_database",
            BlockKind::Unsupported => "unsupported",
            BlockKind::Other(other) => other.as_str(),
        }
    }

    /// Kinds whose payload is a run of rich text that the splitter may cut.
    pub fn is_text_leaf(&self) -> bool {
        matches!(
            self,
            BlockKind::Code
                | BlockKind::Paragraph
                | BlockKind::Heading1
                | BlockKind::Heading2
                | BlockKind::Heading3
                | BlockKind::Quote
                | BlockKind::Callout
                | BlockKind::Toggle
                | BlockKind::ToDo
                | BlockKind::BulletedListItem
                | BlockKind::NumberedListItem
        )
    }
}

impl From<&str> for BlockKind {
    fn from(s: &str) -> Self {
        match s {
            "paragraph" => BlockKind::Paragraph,
            "heading_1" => BlockKind::Heading1,
            "heading_2" => BlockKind::Heading2,
            "heading_3" => BlockKind::Heading3,
            "bulleted_list_item" => BlockKind::BulletedListItem,
            "numbered_list_item" => BlockKind::NumberedListItem,
            "to_do" => BlockKind::ToDo,
            "toggle" => BlockKind::Toggle,
            "quote" => BlockKind::Quote,
            "callout" => BlockKind::Callout,
            "code" => BlockKind::Code,
            "equation" => BlockKind::Equation,
            "divider" => BlockKind::Divider,
            "bookmark" => BlockKind::Bookmark,
            "embed" => BlockKind::Embed,
            "image" => BlockKind::Image,
            "video" => BlockKind::Video,
            "pdf" => BlockKind::Pdf,
            "file" => BlockKind::File,
            "external" => BlockKind::External,
            "link_preview" => BlockKind::LinkPreview,
            "link_mention" => BlockKind::LinkMention,
            "table" => BlockKind::Table,
            "table_row" => BlockKind::TableRow,
            "column_list" => BlockKind::ColumnList,
            "column" => BlockKind::Column,
            "synced_block" => BlockKind::SyncedBlock,
            "child_page" => BlockKind::ChildPage,
            "child_database" => BlockKind::ChildDatabase,
            "unsupported" => BlockKind::Unsupported,
            other => BlockKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the content tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Server-assigned id; `None` until the target system has created the block.
    pub id: Option<String>,
    pub kind: BlockKind,
    /// Kind-specific payload, never containing a `children` key.
    pub payload: Map<String, Value>,
    pub has_children: bool,
    pub children: Option<Vec<Block>>,
}

impl Block {
    pub fn new(kind: BlockKind, payload: Map<String, Value>) -> Self {
        Block {
            id: None,
            kind,
            payload,
            has_children: false,
            children: None,
        }
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.has_children = !children.is_empty();
        self.children = Some(children);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// A block of `kind` whose payload is one plain text segment.
    pub fn text_leaf(kind: BlockKind, content: &str) -> Self {
        let mut payload = Map::new();
        payload.insert("rich_text".into(), json!([text_segment(content)]));
        Block::new(kind, payload)
    }

    pub fn paragraph(content: &str) -> Self {
        Block::text_leaf(BlockKind::Paragraph, content)
    }

    pub fn code(content: &str, language: &str) -> Self {
        let mut block = Block::text_leaf(BlockKind::Code, content);
        block
            .payload
            .insert("language".into(), Value::String(language.to_string()));
        block
    }

    /// The text of a payload made of exactly one rich text segment.
    pub fn single_text(&self) -> Option<&str> {
        let segments = self.payload.get("rich_text")?.as_array()?;
        match segments.as_slice() {
            [only] => only.get("text")?.get("content")?.as_str(),
            _ => None,
        }
    }

    /// The rich text segments of the payload, if it has any.
    pub fn rich_text(&self) -> Option<&[Value]> {
        self.payload.get("rich_text")?.as_array().map(Vec::as_slice)
    }

    pub fn set_rich_text(&mut self, segments: Vec<Value>) {
        self.payload.insert("rich_text".into(), Value::Array(segments));
    }

    pub fn is_leaf(&self) -> bool {
        !self.has_children && self.children.as_ref().map_or(true, Vec::is_empty)
    }

    /// This block plus every materialised descendant.
    pub fn node_count(&self) -> usize {
        1 + self.children.as_deref().map_or(0, count_blocks)
    }

    /// Parses a block object as returned by the API (or as built for a request).
    ///
    /// Shapes that do not look like a block are kept as an `Other` kind with whatever
    /// payload could be read; nothing is rejected here.
    pub fn from_api(value: &Value) -> Block {
        let kind_name = value.get("type").and_then(Value::as_str).unwrap_or("");
        let mut payload = value
            .get(kind_name)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let children: Option<Vec<Block>> = payload
            .remove("children")
            .and_then(|c| c.as_array().map(|items| items.iter().map(Block::from_api).collect()));
        let has_children = value
            .get("has_children")
            .and_then(Value::as_bool)
            .unwrap_or(false)
            || children.as_ref().is_some_and(|c| !c.is_empty());

        Block {
            id: value.get("id").and_then(Value::as_str).map(str::to_string),
            kind: BlockKind::from(kind_name),
            payload,
            has_children,
            children,
        }
    }

    /// Request shape for create/append calls. Ids and `has_children` are never sent.
    pub fn to_api(&self) -> Value {
        let mut body = self.payload.clone();
        if let Some(children) = &self.children {
            body.insert(
                "children".into(),
                Value::Array(children.iter().map(Block::to_api).collect()),
            );
        }
        let kind = self.kind.as_str();
        let mut object = Map::new();
        object.insert("object".into(), Value::String("block".into()));
        object.insert("type".into(), Value::String(kind.to_string()));
        object.insert(kind.to_string(), Value::Object(body));
        Value::Object(object)
    }
}

/// A plain rich text segment.
pub fn text_segment(content: &str) -> Value {
    json!({ "type": "text", "text": { "content": content } })
}

/// Total nodes in a sibling list, descendants included.
pub fn count_blocks(blocks: &[Block]) -> usize {
    blocks.iter().map(Block::node_count).sum()
}
