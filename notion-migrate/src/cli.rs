///
/// This module implements the CLI interface for notion-migrate: command parsing, argument
/// validation and the async entrypoint used by `main` and the integration tests.
///
/// All business logic (block model, tree transformations, migration pipeline) lives in the
/// [`notion-migrate-core`] crate. This module is strictly CLI glue.
///
/// ## Commands
/// - `migrate --config <yaml>`: migrate every record of the source database.
/// - `plan --config <yaml> --page <id>`: fetch and prepare one source page without writing.
///
/// [`notion-migrate-core`]: ../../notion-migrate-core/
use crate::client::NotionClient;
use crate::load_config::{load_config, validate_notion_id};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use notion_migrate_core::migrate::{migrate_database, plan_document, MigrationReport};
use std::path::PathBuf;

/// CLI for notion-migrate: move the pages of one Notion database into another.
#[derive(Parser)]
#[clap(
    name = "notion-migrate",
    version,
    about = "Migrate Notion database pages, splitting oversized text and reattaching deep content"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Migrate every record of the source database into the target database
    Migrate {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Show how one source page would be written, without writing anything
    Plan {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Id of the source page to plan
        #[clap(long)]
        page: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Migrate { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "migrate", "Starting migration");
            let client = NotionClient::new_from_env()
                .map_err(|e| anyhow!("Failed to construct Notion client from env: {e}"))?;
            match migrate_database(&client, &config).await {
                Ok(report) => {
                    print_report(&report);
                    tracing::info!(
                        command = "migrate",
                        documents = report.documents.len(),
                        failed = report.failed().count(),
                        incomplete = report.incomplete().count(),
                        "Migration complete"
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "migrate", error = %e, "Migration failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::Plan { config, page } => {
            let config = load_config(config)?;
            validate_notion_id("page", &page)?;
            tracing::info!(command = "plan", page = %page, "Planning document");
            let client = NotionClient::new_from_env()
                .map_err(|e| anyhow!("Failed to construct Notion client from env: {e}"))?;
            let prepared = plan_document(&client, &page, &config.limits).await?;

            println!("Plan for page {page}");
            println!("  initial batch:        {} blocks", prepared.initial.len());
            for (i, batch) in prepared.overflow.iter().enumerate() {
                println!("  overflow batch {}:     {} blocks", i + 1, batch.len());
            }
            println!("  removed unsupported:  {}", prepared.removed_unsupported);
            println!("  split leaves:         {}", prepared.split_leaves);
            println!(
                "  deferred:             {} blocks under {} paths",
                prepared.deferred_blocks(),
                prepared.deferred.len()
            );
            for path in prepared.truncated_paths() {
                println!("    {path}");
            }
            Ok(())
        }
    }
}

fn print_report(report: &MigrationReport) {
    println!("Migrated {} documents", report.documents.len());
    for document in &report.documents {
        match &document.result {
            Ok(doc) if doc.is_complete() => {
                println!("  ok          {} -> {}", document.title, doc.page_id);
            }
            Ok(doc) => {
                println!("  incomplete  {} -> {}", document.title, doc.page_id);
                for failure in &doc.overflow_failures {
                    println!(
                        "    overflow batch {} ({} blocks): {}",
                        failure.batch, failure.blocks, failure.error
                    );
                }
                for path in doc.reattach.unresolved_paths() {
                    println!("    unresolved deferred content at {path}");
                }
                println!(
                    "    {} deferred subtrees failed to append",
                    doc.reattach.append_failures().count()
                );
            }
            Err(e) => println!("  failed      {}: {e}", document.title),
        }
    }
    if report.skipped_records > 0 {
        println!("Skipped {} records without id", report.skipped_records);
    }
}
