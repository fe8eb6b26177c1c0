//! Retrieves a complete source tree, sanitising blocks on the way.
//!
//! Every block flagged `has_children` is descended into with its own
//! `list_children` call. Source ids are dropped once a block's children are attached
//! so nothing from the source workspace leaks into create requests. A failed fetch
//! aborts the document: a partial source tree is never migrated.

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info};

use crate::block::{count_blocks, Block};
use crate::contract::NotionApi;
use crate::error::MigrateError;
use crate::sanitize::{sanitize_block, SanitizeStats};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTree {
    pub blocks: Vec<Block>,
    pub stats: SanitizeStats,
}

pub async fn fetch_tree<A>(api: &A, block_id: &str) -> Result<FetchedTree, MigrateError>
where
    A: NotionApi + ?Sized,
{
    let mut stats = SanitizeStats::default();
    let blocks = fetch_level(api, block_id.to_string(), &mut stats).await?;
    info!(
        block_id,
        top_level = blocks.len(),
        total = count_blocks(&blocks),
        media_replaced = stats.media_replaced,
        links_rewritten = stats.links_rewritten,
        "[FETCH] Source tree fetched"
    );
    Ok(FetchedTree { blocks, stats })
}

fn fetch_level<'a, A>(
    api: &'a A,
    block_id: String,
    stats: &'a mut SanitizeStats,
) -> BoxFuture<'a, Result<Vec<Block>, MigrateError>>
where
    A: NotionApi + ?Sized,
{
    async move {
        let children = api
            .list_children(&block_id)
            .await
            .map_err(|source| MigrateError::FetchSource {
                block_id: block_id.clone(),
                source,
            })?;
        debug!(block_id = %block_id, children = children.len(), "[FETCH] Listed children");

        let mut blocks = Vec::with_capacity(children.len());
        for child in children {
            let mut block = sanitize_block(child, stats);
            if block.has_children {
                if let Some(id) = block.id.clone() {
                    block.children = Some(fetch_level(api, id, stats).await?);
                }
            }
            block.id = None;
            blocks.push(block);
        }
        Ok(blocks)
    }
    .boxed()
}
