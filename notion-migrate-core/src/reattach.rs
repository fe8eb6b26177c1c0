//! # reattach: appends deferred subtrees once their parents exist
//!
//! For each deferred `(path, children)` the driver looks up the parent's server id in
//! the [`PathIndex`] and appends the children, paginated to the batch limit. A deferred
//! list can itself be deeper than one write allows, so it is re-partitioned (depth 0 =
//! the append call) before writing; whatever that detaches is resolved against the
//! container after the append and handled in a later round.
//!
//! The driver never fails as a whole. Each path ends in exactly one
//! [`ReattachOutcome`]: attached, append error, or unresolved.

use std::collections::VecDeque;

use tracing::{error, info, warn};

use crate::batch::paginate;
use crate::block::{count_blocks, Block};
use crate::config::Limits;
use crate::contract::NotionApi;
use crate::error::ApiError;
use crate::partition::{partition, Partitioned};
use crate::path::{DeferredSubtrees, PathIndex, StructuralPath};
use crate::resolve::resolve_paths_for;

/// A batch that the API rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// 1-based batch number within its append run.
    pub batch: usize,
    pub blocks: usize,
    pub error: ApiError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReattachOutcome {
    Attached {
        path: StructuralPath,
        blocks: usize,
        batches: usize,
    },
    AppendFailed {
        path: StructuralPath,
        /// Top-level blocks that did get appended from the other batches.
        attached: usize,
        failures: Vec<BatchFailure>,
    },
    /// No server id for the path: the parent was never created, or sibling order on
    /// the server did not match.
    Unresolved { path: StructuralPath, blocks: usize },
}

impl ReattachOutcome {
    pub fn path(&self) -> &StructuralPath {
        match self {
            ReattachOutcome::Attached { path, .. }
            | ReattachOutcome::AppendFailed { path, .. }
            | ReattachOutcome::Unresolved { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReattachReport {
    pub outcomes: Vec<ReattachOutcome>,
}

impl ReattachReport {
    pub fn attached(&self) -> impl Iterator<Item = &ReattachOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ReattachOutcome::Attached { .. }))
    }

    pub fn append_failures(&self) -> impl Iterator<Item = &ReattachOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ReattachOutcome::AppendFailed { .. }))
    }

    pub fn unresolved_paths(&self) -> Vec<&StructuralPath> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ReattachOutcome::Unresolved { .. }))
            .map(ReattachOutcome::path)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o, ReattachOutcome::Attached { .. }))
    }
}

/// Result of writing a sequence of batches to one container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendSummary {
    batches: Vec<(usize, Option<ApiError>)>,
}

impl AppendSummary {
    pub fn attached_blocks(&self) -> usize {
        self.batches
            .iter()
            .filter(|(_, error)| error.is_none())
            .map(|(len, _)| len)
            .sum()
    }

    pub fn attached_batches(&self) -> usize {
        self.batches.iter().filter(|(_, error)| error.is_none()).count()
    }

    pub fn failures(&self) -> Vec<BatchFailure> {
        self.batches
            .iter()
            .enumerate()
            .filter_map(|(i, (len, error))| {
                error.clone().map(|error| BatchFailure {
                    batch: i + 1,
                    blocks: *len,
                    error,
                })
            })
            .collect()
    }

    /// Position of the `index`-th submitted block among the blocks that were actually
    /// appended, or `None` when its batch failed.
    pub fn appended_position(&self, index: usize) -> Option<usize> {
        let mut start = 0;
        let mut skipped = 0;
        for (len, error) in &self.batches {
            if index < start + len {
                return match error {
                    Some(_) => None,
                    None => Some(index - skipped),
                };
            }
            if error.is_some() {
                skipped += len;
            }
            start += len;
        }
        None
    }
}

/// Appends each batch in order, continuing past failures.
pub async fn append_batches<A>(
    api: &A,
    container_id: &str,
    batches: Vec<Vec<Block>>,
    path: &StructuralPath,
) -> AppendSummary
where
    A: NotionApi + ?Sized,
{
    let mut summary = AppendSummary::default();
    for (i, batch) in batches.into_iter().enumerate() {
        let batch_number = i + 1;
        let len = batch.len();
        if len == 0 {
            continue;
        }
        info!(path = %path, batch = batch_number, blocks = len, "[APPEND] Appending batch");
        match api.append_children(container_id, batch).await {
            Ok(()) => {
                info!(path = %path, batch = batch_number, "[APPEND] Successfully appended batch");
                summary.batches.push((len, None));
            }
            Err(e) => {
                error!(path = %path, batch = batch_number, error = %e, "[APPEND][ERROR] Failed to append batch");
                summary.batches.push((len, Some(e)));
            }
        }
    }
    summary
}

struct PendingSubtree {
    path: StructuralPath,
    target: Option<String>,
    blocks: Vec<Block>,
}

/// Appends every deferred subtree under the block its path resolves to.
pub async fn reattach<A>(
    api: &A,
    deferred: DeferredSubtrees,
    index: &PathIndex,
    limits: &Limits,
) -> ReattachReport
where
    A: NotionApi + ?Sized,
{
    let mut report = ReattachReport::default();
    let mut queue: VecDeque<PendingSubtree> = deferred
        .into_iter()
        .map(|(path, blocks)| PendingSubtree {
            target: index.get(&path).map(str::to_string),
            path,
            blocks,
        })
        .collect();

    info!(pending = queue.len(), "[REATTACH] Starting reattachment");
    while let Some(pending) = queue.pop_front() {
        let Some(container_id) = pending.target else {
            warn!(path = %pending.path, "[REATTACH] No server id for path, cannot reattach");
            report.outcomes.push(ReattachOutcome::Unresolved {
                path: pending.path,
                blocks: count_blocks(&pending.blocks),
            });
            continue;
        };
        let nested = attach_subtree(
            api,
            &pending.path,
            &container_id,
            pending.blocks,
            limits,
            &mut report,
        )
        .await;
        queue.extend(nested);
    }

    info!(
        attached = report.attached().count(),
        failed = report.append_failures().count(),
        unresolved = report.unresolved_paths().len(),
        "[REATTACH] Reattachment finished"
    );
    report
}

async fn attach_subtree<A>(
    api: &A,
    path: &StructuralPath,
    container_id: &str,
    blocks: Vec<Block>,
    limits: &Limits,
    report: &mut ReattachReport,
) -> Vec<PendingSubtree>
where
    A: NotionApi + ?Sized,
{
    let Partitioned {
        blocks,
        deferred: nested,
    } = partition(blocks, limits.max_depth.max(1));
    let submitted = blocks.len();
    let batches = paginate(blocks, limits.max_blocks_per_batch).into_batches();
    let summary = append_batches(api, container_id, batches, path).await;

    let failures = summary.failures();
    if failures.is_empty() {
        report.outcomes.push(ReattachOutcome::Attached {
            path: path.clone(),
            blocks: submitted,
            batches: summary.attached_batches(),
        });
    } else {
        report.outcomes.push(ReattachOutcome::AppendFailed {
            path: path.clone(),
            attached: summary.attached_blocks(),
            failures,
        });
    }

    if nested.is_empty() {
        return Vec::new();
    }
    locate_nested(api, path, container_id, nested, &summary).await
}

/// Turns subtrees detached from an appended list into pending work addressed in the
/// container's real child list. Appended blocks follow whatever the container already
/// held (placeholders, earlier appends), so positions are shifted by that offset.
async fn locate_nested<A>(
    api: &A,
    path: &StructuralPath,
    container_id: &str,
    nested: DeferredSubtrees,
    summary: &AppendSummary,
) -> Vec<PendingSubtree>
where
    A: NotionApi + ?Sized,
{
    let offset = match api.list_children(container_id).await {
        Ok(children) => Some(children.len().saturating_sub(summary.attached_blocks())),
        Err(e) => {
            warn!(path = %path, error = %e, "[REATTACH] Could not re-read container after append");
            None
        }
    };

    let placed: Vec<(StructuralPath, Option<StructuralPath>, Vec<Block>)> = nested
        .into_iter()
        .map(|(relative, blocks)| {
            let shifted = match (offset, relative.first()) {
                (Some(offset), Some(first)) => summary
                    .appended_position(first)
                    .map(|position| relative.with_first(offset + position)),
                _ => None,
            };
            (relative, shifted, blocks)
        })
        .collect();

    let targets: Vec<StructuralPath> = placed
        .iter()
        .filter_map(|(_, shifted, _)| shifted.clone())
        .collect();
    let resolution = if targets.is_empty() {
        None
    } else {
        Some(resolve_paths_for(api, container_id, &targets).await)
    };

    placed
        .into_iter()
        .map(|(relative, shifted, blocks)| {
            let target = match (&shifted, &resolution) {
                (Some(shifted), Some(resolution)) => {
                    resolution.index.get(shifted).map(str::to_string)
                }
                _ => None,
            };
            PendingSubtree {
                path: path.join(shifted.as_ref().unwrap_or(&relative)),
                target,
                blocks,
            }
        })
        .collect()
}
