//! Minimal valid children for container kinds that cannot be created childless.
//!
//! When the partitioner detaches the children of such a container, it asks
//! [`MandatoryChildren::minimal_children`] for a stand-in instead of dropping the
//! `children` attribute. Adding a new mandatory-child kind only touches this module.

use serde_json::{Map, Value};

use crate::block::{Block, BlockKind};

/// The closed set of container kinds with a structural minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandatoryChildren {
    /// One row of empty cells; the first row fixes the table's width.
    Table,
    /// One empty column.
    ColumnList,
    /// An empty children list is already valid.
    EmptyList,
}

impl MandatoryChildren {
    pub fn for_kind(kind: &BlockKind) -> Option<Self> {
        match kind {
            BlockKind::Table => Some(MandatoryChildren::Table),
            BlockKind::ColumnList => Some(MandatoryChildren::ColumnList),
            BlockKind::Column | BlockKind::SyncedBlock => Some(MandatoryChildren::EmptyList),
            _ => None,
        }
    }

    /// Stand-in children for a container whose `original` children were detached.
    pub fn minimal_children(self, original: &[Block]) -> Vec<Block> {
        match self {
            MandatoryChildren::Table => vec![empty_table_row(table_width(original))],
            MandatoryChildren::ColumnList => {
                vec![Block::new(BlockKind::Column, Map::new()).with_children(Vec::new())]
            }
            MandatoryChildren::EmptyList => Vec::new(),
        }
    }
}

/// Cell count of the first row, or 1 when there is no usable first row.
pub fn table_width(rows: &[Block]) -> usize {
    rows.first()
        .and_then(|row| row.payload.get("cells"))
        .and_then(Value::as_array)
        .map(Vec::len)
        .filter(|width| *width > 0)
        .unwrap_or(1)
}

pub fn empty_table_row(width: usize) -> Block {
    let cells = vec![Value::Array(Vec::new()); width];
    let mut payload = Map::new();
    payload.insert("cells".into(), Value::Array(cells));
    Block::new(BlockKind::TableRow, payload)
}
