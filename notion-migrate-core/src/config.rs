use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Longest text content the API accepts in one rich text segment.
pub const MAX_LEAF_TEXT_LENGTH: usize = 2000;
/// Most blocks accepted by one create or append call.
pub const MAX_BLOCKS_PER_BATCH: usize = 100;
/// Levels of nested `children` arrays kept in one write.
pub const MAX_NESTING_DEPTH: usize = 2;

/// Structural limits of the target API. All three are overridable from the CLI config
/// and environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_leaf_length: usize,
    pub max_blocks_per_batch: usize,
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_leaf_length: MAX_LEAF_TEXT_LENGTH,
            max_blocks_per_batch: MAX_BLOCKS_PER_BATCH,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_leaf_length == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_leaf_length",
            });
        }
        if self.max_blocks_per_batch == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_blocks_per_batch",
            });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroLimit { field: "max_depth" });
        }
        Ok(())
    }
}

/// Names of the properties read from source records and written to target pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyMapping {
    pub source_title: String,
    pub source_label: String,
    pub source_creator: String,
    /// Email property of the people database used for owner lookup.
    pub people_email: String,
    pub target_title: String,
    pub target_label: String,
    pub target_owner: String,
    pub target_experts: String,
}

impl Default for PropertyMapping {
    fn default() -> Self {
        PropertyMapping {
            source_title: "Name".into(),
            source_label: "Type".into(),
            source_creator: "Created By".into(),
            people_email: "⚙️ Email".into(),
            target_title: "Name".into(),
            target_label: "Labels".into(),
            target_owner: "Owner".into(),
            target_experts: "Experts".into(),
        }
    }
}

/// Everything a migration run needs apart from credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub source_database_id: String,
    pub target_database_id: String,
    /// Database of people records used to resolve page owners. Owners are skipped when absent.
    #[serde(default)]
    pub people_database_id: Option<String>,
    /// Number of leading source records to skip (resuming an interrupted run).
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub mapping: PropertyMapping,
    #[serde(default)]
    pub limits: Limits,
}

impl MigrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_database_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "source_database_id",
            });
        }
        if self.target_database_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "target_database_id",
            });
        }
        self.limits.validate()
    }

    pub fn trace_loaded(&self) {
        info!(
            source_database_id = %self.source_database_id,
            target_database_id = %self.target_database_id,
            people_database = self.people_database_id.is_some(),
            skip = self.skip,
            max_leaf_length = self.limits.max_leaf_length,
            max_blocks_per_batch = self.limits.max_blocks_per_batch,
            max_depth = self.limits.max_depth,
            "Loaded MigrationConfig"
        );
        debug!(?self, "MigrationConfig loaded (full debug)");
    }
}
