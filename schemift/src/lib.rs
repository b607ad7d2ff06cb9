//! schemift: schema comparison and reversible migration generation
//!
//! schemift compares two snapshots of a relational schema, detects column
//! renames, classifies the risk of every change, and produces a migration
//! script with a paired rollback for MySQL, PostgreSQL or SQLite.
//!
//! The pipeline is synchronous and side-effect free; nothing here connects
//! to a database or executes SQL.

pub mod config;
pub mod error;
pub mod migration;
pub mod output;
pub mod schema;
pub mod utils;

use serde::Serialize;
use std::path::Path;

// Re-export main types for easier access
pub use config::Config;
pub use error::{Error, Result};
pub use migration::{generator_for, Migration, MigrationOptions, SqlGenerator, TransactionMode};
pub use output::OutputFormat;
pub use schema::analyzer::{BreakingChange, BreakingChangeAnalyzer, Severity};
pub use schema::diff::SchemaDiff;
pub use schema::types::{Database, Dialect};

/// Everything one comparison produces
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub diff: SchemaDiff,
    pub breaking_changes: Vec<BreakingChange>,
    pub migration: Migration,
}

/// Run the full pipeline over two prepared snapshots
pub fn compare(old: &Database, new: &Database, config: &Config) -> Result<Comparison> {
    let diff = schema::diff::diff(old, new, &config.diff_options())?;
    let breaking_changes = BreakingChangeAnalyzer::analyze(&diff);

    let options = config.migration_options();
    let migration = generator_for(options.dialect).generate_migration(&diff, &options);

    tracing::info!(
        added = diff.added_tables.len(),
        removed = diff.removed_tables.len(),
        modified = diff.modified_tables.len(),
        findings = breaking_changes.len(),
        "Comparison complete"
    );

    Ok(Comparison {
        diff,
        breaking_changes,
        migration,
    })
}

/// Load both snapshot files, then [`compare`] them
pub fn compare_files(
    old: impl AsRef<Path>,
    new: impl AsRef<Path>,
    config: &Config,
) -> Result<Comparison> {
    let old = schema::loader::load_schema(old, config)?;
    let new = schema::loader::load_schema(new, config)?;
    compare(&old, &new, config)
}
