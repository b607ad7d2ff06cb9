//! Configuration handling for schemift

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::migration::{MigrationOptions, TransactionMode};
use crate::output::OutputFormat;
use crate::schema::diff::DiffOptions;
use crate::schema::types::Dialect;

/// Load configuration from a TOML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let config_str = fs::read_to_string(path.as_ref())
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Represents the complete schemift configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub diff: DiffConfig,
    pub rename: RenameConfig,
    pub migration: MigrationConfig,
    pub naming: NamingConfig,
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Diff options derived from the `[diff]` and `[rename]` sections
    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            detect_column_renames: self.diff.detect_renames,
            rename: self.rename.clone(),
        }
    }

    /// Migration options derived from the `[migration]` and `[naming]` sections
    pub fn migration_options(&self) -> MigrationOptions {
        MigrationOptions::new(self.migration.dialect)
            .include_drops(self.migration.include_drops)
            .include_unsafe(self.migration.include_unsafe)
            .transaction_mode(self.migration.transaction_mode)
            .preserve_foreign_keys(self.migration.preserve_foreign_keys)
            .defer_foreign_key_check(self.migration.defer_foreign_key_check)
            .backup_prefix(&self.migration.backup_prefix)
            .naming(self.naming.clone())
    }
}

/// Diff behaviour
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DiffConfig {
    pub detect_renames: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { detect_renames: true }
    }
}

/// Rename detection threshold and evidence weights
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RenameConfig {
    pub threshold: u32,
    pub same_type: u32,
    pub shared_token: u32,
    pub first_token: u32,
    pub prefix_char: u32,
    pub prefix_cap: u32,
    pub comment: u32,
    pub generation_expression: u32,
    pub nullable: u32,
    pub default_value: u32,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            threshold: 9,
            same_type: 1,
            shared_token: 4,
            first_token: 2,
            prefix_char: 1,
            prefix_cap: 4,
            comment: 5,
            generation_expression: 5,
            nullable: 1,
            default_value: 1,
        }
    }
}

/// Migration generation settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MigrationConfig {
    pub dialect: Dialect,
    pub include_drops: bool,
    pub include_unsafe: bool,
    pub transaction_mode: TransactionMode,
    pub preserve_foreign_keys: bool,
    pub defer_foreign_key_check: bool,
    pub backup_prefix: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::MySql,
            include_drops: true,
            include_unsafe: false,
            transaction_mode: TransactionMode::Single,
            preserve_foreign_keys: true,
            defer_foreign_key_check: true,
            backup_prefix: "__smf_backup_".to_string(),
        }
    }
}

/// Naming patterns for generated constraint and index names
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NamingConfig {
    pub index_pattern: String,
    pub unique_pattern: String,
    pub foreign_key_pattern: String,
    pub check_pattern: String,
    pub primary_key_pattern: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            index_pattern: "idx_{table}_{columns}".to_string(),
            unique_pattern: "uq_{table}_{columns}".to_string(),
            foreign_key_pattern: "fk_{table}_{columns}".to_string(),
            check_pattern: "chk_{table}_{columns}".to_string(),
            primary_key_pattern: "pk_{table}".to_string(),
        }
    }
}

/// Output settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            stdout: false,
        }
    }
}
