//! Splits text leaves whose content exceeds the per-leaf length limit.
//!
//! The text of a leaf is the concatenation of its rich text segments. When that text
//! is longer than the limit, the leaf becomes `ceil(len / limit)` consecutive siblings
//! in its parent's position. Boundaries are purely positional (counted in characters);
//! no attempt is made to avoid cutting through a token or line. A segment crossing a
//! boundary is cut into pieces that each keep the segment's annotations and link.
//!
//! The first chunk keeps the original block and its attributes, later chunks are fresh
//! blocks of the same kind carrying their segments plus the secondary attributes listed
//! in [`SECONDARY_ATTRIBUTES`].

use serde_json::Value;
use tracing::debug;

use crate::block::Block;

/// Payload keys copied onto continuation chunks.
pub const SECONDARY_ATTRIBUTES: &[&str] = &["language", "color", "checked"];

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub blocks: Vec<Block>,
    /// Number of original leaves that were cut into several blocks.
    pub split_leaves: usize,
}

pub fn split_oversized(blocks: Vec<Block>, max_len: usize) -> Split {
    let mut split_leaves = 0;
    let blocks = split_level(blocks, max_len.max(1), &mut split_leaves);
    Split {
        blocks,
        split_leaves,
    }
}

/// Consecutive chunks of at most `max_len` characters.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_len.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Characters of a rich text segment that count against the limit.
///
/// Mentions and equations carry no `text.content` and count as zero.
pub fn segment_len(segment: &Value) -> usize {
    segment_content(segment).map_or(0, |content| content.chars().count())
}

fn segment_content(segment: &Value) -> Option<&str> {
    segment.get("text")?.get("content")?.as_str()
}

fn split_level(blocks: Vec<Block>, max_len: usize, split_leaves: &mut usize) -> Vec<Block> {
    let mut result = Vec::with_capacity(blocks.len());
    for mut block in blocks {
        if let Some(runs) = oversized_runs(&block, max_len) {
            *split_leaves += 1;
            debug!(
                kind = %block.kind,
                chunks = runs.len(),
                "Splitting oversized text block"
            );
            result.extend(split_block(block, runs));
            continue;
        }
        if let Some(children) = block.children.take() {
            block.children = Some(split_level(children, max_len, split_leaves));
        }
        result.push(block);
    }
    result
}

/// Segment runs of at most `max_len` characters each, or `None` if the block fits.
fn oversized_runs(block: &Block, max_len: usize) -> Option<Vec<Vec<Value>>> {
    if !block.kind.is_text_leaf() || !block.is_leaf() {
        return None;
    }
    let segments = block.rich_text()?;
    let total: usize = segments.iter().map(segment_len).sum();
    if total <= max_len {
        return None;
    }
    Some(cut_segments(segments, max_len))
}

fn cut_segments(segments: &[Value], max_len: usize) -> Vec<Vec<Value>> {
    let mut runs = Vec::new();
    let mut current: Vec<Value> = Vec::new();
    let mut current_len = 0;

    for segment in segments {
        let content: Vec<char> = match segment_content(segment) {
            Some(content) if !content.is_empty() => content.chars().collect(),
            _ => {
                current.push(segment.clone());
                continue;
            }
        };
        let mut rest = content.as_slice();
        while !rest.is_empty() {
            if current_len == max_len {
                runs.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let take = rest.len().min(max_len - current_len);
            let (piece, tail) = rest.split_at(take);
            current.push(with_content(segment, &piece.iter().collect::<String>()));
            current_len += take;
            rest = tail;
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// A copy of `segment` (annotations, link) with its text replaced.
fn with_content(segment: &Value, content: &str) -> Value {
    let mut piece = segment.clone();
    if let Some(text) = piece.get_mut("text").and_then(Value::as_object_mut) {
        text.insert("content".into(), Value::String(content.to_string()));
    }
    if let Some(object) = piece.as_object_mut() {
        if object.contains_key("plain_text") {
            object.insert("plain_text".into(), Value::String(content.to_string()));
        }
    }
    piece
}

fn split_block(original: Block, runs: Vec<Vec<Value>>) -> Vec<Block> {
    let mut runs = runs.into_iter();
    let Some(first_run) = runs.next() else {
        return vec![original];
    };

    let mut continuation_template = Block::text_leaf(original.kind.clone(), "");
    for key in SECONDARY_ATTRIBUTES {
        if let Some(value) = original.payload.get(*key) {
            continuation_template
                .payload
                .insert((*key).to_string(), value.clone());
        }
    }

    let mut first = original;
    first.set_rich_text(first_run);

    let mut blocks = vec![first];
    for run in runs {
        let mut next = continuation_template.clone();
        next.set_rich_text(run);
        blocks.push(next);
    }
    blocks
}
