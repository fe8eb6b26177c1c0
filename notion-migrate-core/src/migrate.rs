//! High-level pipeline: migrates every record of a source database into a target database.
//!
//! For each source page this module:
//!   - fetches the complete block tree (sanitising what the API cannot create)
//!   - prepares it: filter unsupported -> split oversized text -> partition by depth -> paginate
//!   - creates the target page with the initial batch, then appends overflow batches
//!   - resolves server ids for the paths whose content was deferred
//!   - reattaches the deferred subtrees
//!
//! # Error Handling
//! - Failing to query the source database aborts the run.
//! - Failing to fetch a source page or to create its target page aborts that document
//!   only; the run continues with the next record.
//! - Append, resolve and reattach failures are recorded in the [`DocumentReport`] and
//!   never abort anything.
//!
//! Documents are processed strictly one after another: resolution depends on the
//! preceding writes to the same page having committed.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::batch::{paginate, Batches};
use crate::block::{count_blocks, Block};
use crate::config::{Limits, MigrationConfig};
use crate::contract::NotionApi;
use crate::error::MigrateError;
use crate::fetch::fetch_tree;
use crate::filter::{filter_unsupported, Filtered};
use crate::partition::{partition, Partitioned};
use crate::path::{DeferredSubtrees, PathIndex, StructuralPath};
use crate::reattach::{append_batches, reattach, BatchFailure, ReattachOutcome, ReattachReport};
use crate::records::{build_properties, find_owner, SourceRecord};
use crate::resolve::{resolve_paths_for, ResolveFailure};
use crate::split::{split_oversized, Split};

/// The writes for one document, ready for the API.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBlocks {
    pub initial: Vec<Block>,
    pub overflow: Vec<Vec<Block>>,
    pub deferred: DeferredSubtrees,
    pub removed_unsupported: usize,
    pub split_leaves: usize,
}

impl PreparedBlocks {
    /// Paths whose content was cut from the initial writes.
    pub fn truncated_paths(&self) -> Vec<StructuralPath> {
        self.deferred.keys().cloned().collect()
    }

    pub fn deferred_blocks(&self) -> usize {
        self.deferred.values().map(|blocks| count_blocks(blocks)).sum()
    }
}

/// Filter -> Splitter -> Partitioner -> Batcher.
pub fn prepare_blocks(blocks: Vec<Block>, limits: &Limits) -> PreparedBlocks {
    let Filtered { blocks, removed } = filter_unsupported(blocks);
    let Split {
        blocks,
        split_leaves,
    } = split_oversized(blocks, limits.max_leaf_length);
    let Partitioned { blocks, deferred } = partition(blocks, limits.max_depth);
    let Batches { first, overflow } = paginate(blocks, limits.max_blocks_per_batch);

    if !deferred.is_empty() {
        let paths: Vec<String> = deferred.keys().map(ToString::to_string).collect();
        info!(paths = ?paths, "[PREPARE] Content below the depth limit deferred");
    }
    info!(
        initial = first.len(),
        overflow_batches = overflow.len(),
        deferred_paths = deferred.len(),
        removed_unsupported = removed,
        split_leaves,
        "[PREPARE] Blocks prepared"
    );

    PreparedBlocks {
        initial: first,
        overflow,
        deferred,
        removed_unsupported: removed,
        split_leaves,
    }
}

/// What happened to one written document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReport {
    pub page_id: String,
    pub initial_blocks: usize,
    pub overflow_batches: usize,
    pub overflow_failures: Vec<BatchFailure>,
    pub resolve_failures: Vec<ResolveFailure>,
    pub reattach: ReattachReport,
}

impl DocumentReport {
    pub fn is_complete(&self) -> bool {
        self.overflow_failures.is_empty() && self.reattach.is_complete()
    }
}

/// Creates the page, appends overflow batches, then resolves and reattaches deferred content.
pub async fn write_document<A>(
    api: &A,
    database_id: &str,
    properties: Value,
    prepared: PreparedBlocks,
    limits: &Limits,
) -> Result<DocumentReport, MigrateError>
where
    A: NotionApi + ?Sized,
{
    let PreparedBlocks {
        initial,
        overflow,
        deferred,
        ..
    } = prepared;
    let initial_blocks = initial.len();
    let overflow_batches = overflow.len();

    info!(blocks = initial_blocks, "[MIGRATE] Creating page with initial blocks");
    let page_id = api
        .create_page(database_id, properties, initial)
        .await
        .map_err(|e| {
            error!(error = %e, "[MIGRATE][ERROR] Page creation failed");
            MigrateError::CreatePage(e)
        })?;
    info!(page_id = %page_id, "[MIGRATE] Page created");

    let root = StructuralPath::root();
    if overflow_batches > 0 {
        info!(
            batches = overflow_batches,
            blocks = overflow.iter().map(Vec::len).sum::<usize>(),
            "[MIGRATE] Appending overflow batches"
        );
    }
    let overflow_summary = append_batches(api, &page_id, overflow, &root).await;
    let overflow_failures = overflow_summary.failures();

    let mut report = DocumentReport {
        page_id: page_id.clone(),
        initial_blocks,
        overflow_batches,
        overflow_failures,
        resolve_failures: Vec::new(),
        reattach: ReattachReport::default(),
    };
    if deferred.is_empty() {
        return Ok(report);
    }

    // Top-level indices past a failed overflow batch moved up on the server.
    let placed: Vec<(StructuralPath, Option<StructuralPath>)> = deferred
        .keys()
        .map(|path| {
            let shifted = path.first().and_then(|first| {
                if first < initial_blocks {
                    Some(first)
                } else {
                    overflow_summary
                        .appended_position(first - initial_blocks)
                        .map(|position| initial_blocks + position)
                }
            });
            (path.clone(), shifted.map(|first| path.with_first(first)))
        })
        .collect();
    let targets: Vec<StructuralPath> = placed
        .iter()
        .filter_map(|(_, shifted)| shifted.clone())
        .collect();

    info!(paths = targets.len(), "[MIGRATE] Resolving server ids for deferred content");
    let resolution = resolve_paths_for(api, &page_id, &targets).await;
    let mut index = PathIndex::new();
    for (path, shifted) in &placed {
        if let Some(id) = shifted.as_ref().and_then(|s| resolution.index.get(s)) {
            index.insert(path.clone(), id);
        }
    }
    report.resolve_failures = resolution.failures;
    report.reattach = reattach(api, deferred, &index, limits).await;

    Ok(report)
}

/// Fetch + prepare only; nothing is written.
pub async fn plan_document<A>(
    api: &A,
    page_id: &str,
    limits: &Limits,
) -> Result<PreparedBlocks, MigrateError>
where
    A: NotionApi + ?Sized,
{
    let fetched = fetch_tree(api, page_id).await?;
    Ok(prepare_blocks(fetched.blocks, limits))
}

/// Migrates one source record into the target database.
pub async fn migrate_document<A>(
    api: &A,
    record: &SourceRecord,
    config: &MigrationConfig,
) -> Result<DocumentReport, MigrateError>
where
    A: NotionApi + ?Sized,
{
    info!(title = %record.title, source_id = %record.id, "[MIGRATE] Migrating document");
    let fetched = fetch_tree(api, &record.id).await?;
    info!(count = fetched.blocks.len(), "[MIGRATE] Count of blocks");

    let owner = match (&config.people_database_id, &record.creator_email) {
        (Some(people_db), Some(email)) => {
            match find_owner(api, people_db, &config.mapping, email).await {
                Ok(owner) => owner,
                Err(e) => {
                    warn!(email = %email, error = %e, "[MIGRATE] Owner lookup failed, creating page without owner");
                    None
                }
            }
        }
        (_, None) => {
            info!("[MIGRATE] Original creator left the workspace, creating page without owner");
            None
        }
        (None, Some(_)) => None,
    };
    let properties = build_properties(record, owner.as_deref(), &config.mapping);

    let prepared = prepare_blocks(fetched.blocks, &config.limits);
    write_document(
        api,
        &config.target_database_id,
        properties,
        prepared,
        &config.limits,
    )
    .await
}

#[derive(Debug)]
pub struct DocumentResult {
    pub source_id: String,
    pub title: String,
    pub result: Result<DocumentReport, MigrateError>,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub documents: Vec<DocumentResult>,
    /// Records that could not be read (no id).
    pub skipped_records: usize,
}

impl MigrationReport {
    pub fn failed(&self) -> impl Iterator<Item = &DocumentResult> {
        self.documents.iter().filter(|d| d.result.is_err())
    }

    pub fn incomplete(&self) -> impl Iterator<Item = &DocumentResult> {
        self.documents
            .iter()
            .filter(|d| matches!(&d.result, Ok(report) if !report.is_complete()))
    }
}

/// Migrates every record of the source database, one document at a time.
pub async fn migrate_database<A>(
    api: &A,
    config: &MigrationConfig,
) -> Result<MigrationReport, MigrateError>
where
    A: NotionApi + ?Sized,
{
    config.validate()?;
    info!("[MIGRATE] Starting database migration");

    let records = api
        .query_records(&config.source_database_id, None)
        .await
        .map_err(|source| {
            error!(error = %source, "[MIGRATE][ERROR] Failed to query source database");
            MigrateError::SourceQuery {
                database_id: config.source_database_id.clone(),
                source,
            }
        })?;
    info!(records = records.len(), skip = config.skip, "[MIGRATE] Source records fetched");

    let mut report = MigrationReport::default();
    for raw in records.iter().skip(config.skip) {
        let Some(record) = SourceRecord::from_api(raw, &config.mapping) else {
            warn!("[MIGRATE] Skipping source record without id");
            report.skipped_records += 1;
            continue;
        };
        let result = migrate_document(api, &record, config).await;
        match &result {
            Ok(doc) => {
                for outcome in &doc.reattach.outcomes {
                    if let ReattachOutcome::Unresolved { path, blocks } = outcome {
                        warn!(title = %record.title, path = %path, blocks, "[MIGRATE] Deferred content could not be reattached");
                    }
                }
                info!(title = %record.title, page_id = %doc.page_id, complete = doc.is_complete(), "[MIGRATE] Document migrated");
            }
            Err(e) => {
                error!(title = %record.title, error = %e, "[MIGRATE][ERROR] Document failed");
            }
        }
        debug!(source_id = %record.id, "[MIGRATE] Moving to next record");
        report.documents.push(DocumentResult {
            source_id: record.id,
            title: record.title,
            result,
        });
    }
    Ok(report)
}
