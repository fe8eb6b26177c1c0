//! Rewrites fetched blocks the API cannot create as-is.
//!
//! - images and externally hosted media become a visible warning paragraph
//! - files without an external source become a warning paragraph
//! - `link_preview` / `link_mention` blocks become bookmarks
//! - link mentions inside rich text become plain text holding the url

use serde_json::{json, Map, Value};

use crate::block::{text_segment, Block, BlockKind};

pub const IMAGE_WARNING: &str = "⚠️ Go fetch the image from the original doc ⚠️";
pub const FILE_WARNING: &str = "⚠️ Go fetch the file from the original doc ⚠️";
pub const LINK_WARNING: &str = "⚠️ Go fetch the link from the original doc ⚠️";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeStats {
    pub media_replaced: usize,
    pub links_rewritten: usize,
}

pub fn sanitize_block(mut block: Block, stats: &mut SanitizeStats) -> Block {
    match block.kind {
        BlockKind::Image | BlockKind::External => {
            stats.media_replaced += 1;
            return warning_paragraph(IMAGE_WARNING);
        }
        BlockKind::File if !has_external_source(&block) => {
            stats.media_replaced += 1;
            return warning_paragraph(FILE_WARNING);
        }
        BlockKind::LinkPreview => {
            stats.links_rewritten += 1;
            return bookmark_or_warning(block.payload.get("url"));
        }
        BlockKind::LinkMention => {
            stats.links_rewritten += 1;
            return bookmark_or_warning(block.payload.get("href"));
        }
        _ => {}
    }
    rewrite_link_mentions(&mut block.payload, stats);
    block
}

/// Red, bold, underlined paragraph pointing the reader back at the source page.
pub fn warning_paragraph(message: &str) -> Block {
    let mut payload = Map::new();
    payload.insert(
        "rich_text".into(),
        json!([{
            "type": "text",
            "text": { "content": message },
            "annotations": {
                "bold": true,
                "italic": false,
                "strikethrough": false,
                "underline": true,
                "code": false,
                "color": "red"
            }
        }]),
    );
    Block::new(BlockKind::Paragraph, payload)
}

fn has_external_source(block: &Block) -> bool {
    block
        .payload
        .get("external")
        .is_some_and(|external| !external.is_null())
}

fn bookmark_or_warning(url: Option<&Value>) -> Block {
    match url.and_then(Value::as_str) {
        Some(url) if !url.is_empty() => {
            let mut payload = Map::new();
            payload.insert("url".into(), Value::String(url.to_string()));
            Block::new(BlockKind::Bookmark, payload)
        }
        _ => warning_paragraph(LINK_WARNING),
    }
}

fn rewrite_link_mentions(payload: &mut Map<String, Value>, stats: &mut SanitizeStats) {
    let Some(Value::Array(segments)) = payload.get_mut("rich_text") else {
        return;
    };
    for segment in segments.iter_mut() {
        if let Some(url) = mention_link(segment) {
            *segment = text_segment(&url);
            stats.links_rewritten += 1;
        }
    }
}

fn mention_link(segment: &Value) -> Option<String> {
    if segment.get("type")?.as_str()? != "mention" {
        return None;
    }
    let mention = segment.get("mention")?;
    let mention_type = mention.get("type")?.as_str()?;
    let key = match mention_type {
        "link_preview" => "url",
        "link_mention" => "href",
        _ => return None,
    };
    mention
        .get(mention_type)?
        .get(key)?
        .as_str()
        .map(str::to_string)
}
