/// `load_config` module: Loads a static YAML config and applies environment overrides to
/// produce the core [`MigrationConfig`].
///
/// This module is the only place where untrusted YAML is parsed.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into [`MigrationConfig`]
/// - Reject database ids that do not look like Notion ids before any request is made
/// - Apply `NOTION_MAX_LEAF_LENGTH`, `NOTION_MAX_BLOCKS_PER_BATCH` and `NOTION_MAX_DEPTH`
///   overrides on top of the file's `limits` section
///
/// Secrets (the integration token) never live in the YAML; see [`crate::client`].
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, Result};
use notion_migrate_core::config::{Limits, MigrationConfig};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const ENV_MAX_LEAF_LENGTH: &str = "NOTION_MAX_LEAF_LENGTH";
pub const ENV_MAX_BLOCKS_PER_BATCH: &str = "NOTION_MAX_BLOCKS_PER_BATCH";
pub const ENV_MAX_DEPTH: &str = "NOTION_MAX_DEPTH";

const NOTION_ID_PATTERN: &str =
    r"^[0-9a-fA-F]{8}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{12}$";

/// Loads a static YAML config file (no secrets) and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MigrationConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let mut config: MigrationConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    validate_notion_id("source_database_id", &config.source_database_id)?;
    validate_notion_id("target_database_id", &config.target_database_id)?;
    if let Some(people) = &config.people_database_id {
        validate_notion_id("people_database_id", people)?;
    }

    apply_env_overrides(&mut config.limits)?;
    config.validate().map_err(|e| {
        error!(error = %e, config_path = ?path_ref, "Config failed validation");
        anyhow!("Invalid config: {e}")
    })?;
    config.trace_loaded();
    Ok(config)
}

/// Checks that `value` has the shape of a Notion id: 32 hex digits, dashes optional.
pub fn validate_notion_id(field: &str, value: &str) -> Result<()> {
    let pattern = Regex::new(NOTION_ID_PATTERN)?;
    if pattern.is_match(value.trim()) {
        Ok(())
    } else {
        error!(field, value, "Value is not a Notion id");
        Err(anyhow!("{field} is not a valid Notion id: {value:?}"))
    }
}

/// Overrides limits from the environment. Unset variables leave the value untouched.
pub fn apply_env_overrides(limits: &mut Limits) -> Result<()> {
    if let Some(value) = env_usize(ENV_MAX_LEAF_LENGTH)? {
        limits.max_leaf_length = value;
    }
    if let Some(value) = env_usize(ENV_MAX_BLOCKS_PER_BATCH)? {
        limits.max_blocks_per_batch = value;
    }
    if let Some(value) = env_usize(ENV_MAX_DEPTH)? {
        limits.max_depth = value;
    }
    Ok(())
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw.trim().parse::<usize>().map_err(|e| {
                error!(error = ?e, variable = name, raw = %raw, "Failed to parse limit override");
                anyhow!("{name} must be a non-negative integer, got {raw:?}")
            })?;
            info!(variable = name, value, "Applying limit override from environment");
            Ok(Some(value))
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(anyhow!("{name} could not be read: {e}")),
    }
}
