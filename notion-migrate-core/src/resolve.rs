//! Maps structural paths of a created tree to the ids the server assigned.
//!
//! Runs only after the page and all overflow batches exist. The tree is re-fetched
//! depth-first from the root with one `list_children` call per container, numbering
//! children exactly the way the partitioner numbered them. A failed fetch is recorded
//! and its subtree skipped; siblings are still resolved.
//!
//! Path correspondence assumes the server kept sibling order. Nothing guarantees
//! that, so callers must treat a missing path as a reportable outcome.

use tracing::{debug, warn};

use crate::contract::NotionApi;
use crate::error::ApiError;
use crate::path::{PathIndex, StructuralPath};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveFailure {
    pub path: StructuralPath,
    pub block_id: String,
    pub error: ApiError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub index: PathIndex,
    pub failures: Vec<ResolveFailure>,
}

/// Resolves every block reachable from `root_id`.
pub async fn resolve_paths<A>(api: &A, root_id: &str) -> Resolution
where
    A: NotionApi + ?Sized,
{
    resolve_scoped(api, root_id, |_| true).await
}

/// Resolves `targets`, fetching only the containers that lie on a path to one of them.
pub async fn resolve_paths_for<A>(api: &A, root_id: &str, targets: &[StructuralPath]) -> Resolution
where
    A: NotionApi + ?Sized,
{
    resolve_scoped(api, root_id, |path| {
        targets
            .iter()
            .any(|target| target.depth() > path.depth() && path.is_prefix_of(target))
    })
    .await
}

async fn resolve_scoped<A, F>(api: &A, root_id: &str, descend: F) -> Resolution
where
    A: NotionApi + ?Sized,
    F: Fn(&StructuralPath) -> bool,
{
    let mut resolution = Resolution::default();
    let root = StructuralPath::root();
    resolution.index.insert(root.clone(), root_id);

    let mut pending = Vec::new();
    if descend(&root) {
        pending.push((root, root_id.to_string()));
    }

    while let Some((path, block_id)) = pending.pop() {
        let children = match api.list_children(&block_id).await {
            Ok(children) => children,
            Err(error) => {
                warn!(path = %path, block_id = %block_id, error = %error, "[RESOLVE] Failed to fetch children, skipping subtree");
                resolution.failures.push(ResolveFailure {
                    path,
                    block_id,
                    error,
                });
                continue;
            }
        };

        let mut nested = Vec::new();
        for (index, child) in children.into_iter().enumerate() {
            let child_path = path.child(index);
            let Some(child_id) = child.id else {
                warn!(path = %child_path, "[RESOLVE] Fetched block has no id");
                continue;
            };
            if child.has_children && descend(&child_path) {
                nested.push((child_path.clone(), child_id.clone()));
            }
            resolution.index.insert(child_path, child_id);
        }
        // Reversed so the stack visits siblings in document order.
        pending.extend(nested.into_iter().rev());
    }

    debug!(
        resolved = resolution.index.len(),
        failures = resolution.failures.len(),
        "[RESOLVE] Path index built"
    );
    resolution
}
