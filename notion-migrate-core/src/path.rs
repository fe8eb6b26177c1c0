//! Positional addressing of blocks before server ids exist.
//!
//! A [`StructuralPath`] is the list of sibling indices from the page root down to a
//! block. Paths are only meaningful within the snapshot they were computed on, so
//! the partitioner records them in the same pass that detaches content.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::block::Block;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StructuralPath(Vec<usize>);

impl StructuralPath {
    /// The page (or append target) itself.
    pub fn root() -> Self {
        StructuralPath(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        StructuralPath(indices)
    }

    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, rest)| StructuralPath(rest.to_vec()))
    }

    /// Number of indices; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Top-level sibling index, if any.
    pub fn first(&self) -> Option<usize> {
        self.0.first().copied()
    }

    /// Appends `other` below `self`.
    pub fn join(&self, other: &StructuralPath) -> Self {
        let mut indices = self.0.clone();
        indices.extend_from_slice(&other.0);
        StructuralPath(indices)
    }

    /// Replaces the first index, keeping the rest. The root is returned unchanged.
    pub fn with_first(&self, first: usize) -> Self {
        let mut indices = self.0.clone();
        if let Some(head) = indices.first_mut() {
            *head = first;
        }
        StructuralPath(indices)
    }

    /// True when `self` is an ancestor of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &StructuralPath) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for StructuralPath {
    fn from(indices: Vec<usize>) -> Self {
        StructuralPath(indices)
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Content detached by the partitioner, keyed by the path of the block that lost it.
/// Ordered so parents are reattached before their descendants.
pub type DeferredSubtrees = BTreeMap<StructuralPath, Vec<Block>>;

/// Server ids of created blocks, keyed by structural path. Scoped to one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathIndex {
    ids: HashMap<StructuralPath, String>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: StructuralPath, id: impl Into<String>) {
        self.ids.insert(path, id.into());
    }

    pub fn get(&self, path: &StructuralPath) -> Option<&str> {
        self.ids.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &StructuralPath) -> bool {
        self.ids.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of indexed direct children of the root.
    pub fn top_level_count(&self) -> usize {
        self.ids.keys().filter(|p| p.depth() == 1).count()
    }
}
