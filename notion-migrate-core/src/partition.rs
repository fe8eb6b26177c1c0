//! # partition: depth-limited pruning with deferred subtrees
//!
//! The API only accepts a bounded number of nested `children` levels per write. This
//! module walks a sibling list depth-first (top-level blocks are at depth 0) and, for
//! every container whose children would land at `max_depth` or deeper, detaches those
//! children into a [`DeferredSubtrees`] map keyed by the container's
//! [`StructuralPath`]. The paths are recorded in the same pass that detaches, so they
//! describe exactly the tree that will be created.
//!
//! Containers that cannot exist without children (see [`MandatoryChildren`]) get a
//! synthesized minimal child list instead of losing the attribute. Every other
//! container loses its `children` attribute entirely but keeps `has_children`.
//!
//! Nothing deeper than the limit is ever returned in the pruned tree: deeper content
//! only lives in the deferred map until the reattachment driver appends it.

use tracing::debug;

use crate::block::Block;
use crate::path::{DeferredSubtrees, StructuralPath};
use crate::placeholder::MandatoryChildren;

#[derive(Debug, Clone, PartialEq)]
pub struct Partitioned {
    pub blocks: Vec<Block>,
    pub deferred: DeferredSubtrees,
}

impl Partitioned {
    /// Paths whose content was detached, in reattachment order.
    pub fn truncated_paths(&self) -> Vec<StructuralPath> {
        self.deferred.keys().cloned().collect()
    }
}

pub fn partition(blocks: Vec<Block>, max_depth: usize) -> Partitioned {
    let mut deferred = DeferredSubtrees::new();
    let blocks = partition_level(blocks, 0, &StructuralPath::root(), max_depth, &mut deferred);
    Partitioned { blocks, deferred }
}

/// Prunes one sibling list sitting at `depth`, whose container is at `parent_path`.
fn partition_level(
    blocks: Vec<Block>,
    depth: usize,
    parent_path: &StructuralPath,
    max_depth: usize,
    deferred: &mut DeferredSubtrees,
) -> Vec<Block> {
    if depth >= max_depth {
        if !blocks.is_empty() {
            debug!(path = %parent_path, blocks = blocks.len(), "Deferring whole level");
            deferred.insert(parent_path.clone(), blocks);
        }
        return Vec::new();
    }

    blocks
        .into_iter()
        .enumerate()
        .map(|(index, block)| {
            partition_block(block, depth, parent_path.child(index), max_depth, deferred)
        })
        .collect()
}

fn partition_block(
    mut block: Block,
    depth: usize,
    path: StructuralPath,
    max_depth: usize,
    deferred: &mut DeferredSubtrees,
) -> Block {
    let Some(children) = block.children.take() else {
        return block;
    };
    if children.is_empty() {
        block.children = Some(children);
        return block;
    }

    if depth + 1 >= max_depth {
        block.children = MandatoryChildren::for_kind(&block.kind)
            .map(|rule| rule.minimal_children(&children));
        debug!(
            path = %path,
            kind = %block.kind,
            detached = children.len(),
            placeholder = block.children.is_some(),
            "Detaching children below depth limit"
        );
        block.has_children = true;
        deferred.insert(path, children);
    } else {
        block.children = Some(partition_level(children, depth + 1, &path, max_depth, deferred));
    }
    block
}
