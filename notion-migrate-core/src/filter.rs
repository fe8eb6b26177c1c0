//! Removes blocks the API reports as `unsupported`, at every depth.
//!
//! The removed-node tally is threaded through the recursion and returned with the
//! result, so independent calls never share a counter.

use tracing::info;

use crate::block::{Block, BlockKind};

#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub blocks: Vec<Block>,
    /// Unsupported nodes dropped, including any nested inside another dropped node.
    pub removed: usize,
}

pub fn filter_unsupported(blocks: Vec<Block>) -> Filtered {
    let mut removed = 0;
    let blocks = filter_level(blocks, &mut removed);
    if removed > 0 {
        info!(removed, "Removed unsupported block(s)");
    }
    Filtered { blocks, removed }
}

fn filter_level(blocks: Vec<Block>, removed: &mut usize) -> Vec<Block> {
    blocks
        .into_iter()
        .filter_map(|mut block| {
            if block.kind == BlockKind::Unsupported {
                *removed += count_unsupported(&block);
                return None;
            }
            if let Some(children) = block.children.take() {
                block.children = Some(filter_level(children, removed));
            }
            Some(block)
        })
        .collect()
}

fn count_unsupported(block: &Block) -> usize {
    let own = usize::from(block.kind == BlockKind::Unsupported);
    own + block
        .children
        .iter()
        .flatten()
        .map(count_unsupported)
        .sum::<usize>()
}
