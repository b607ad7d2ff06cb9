//! Schema module for schemift
//!
//! This module holds the schema model and the comparison pipeline that runs
//! over it: loading, validation, diffing, rename detection and risk analysis.

pub mod analyzer;
pub mod diff;
pub mod loader;
pub mod rename;
pub mod types;
pub mod validate;

// Re-export key types
pub use analyzer::{BreakingChange, BreakingChangeAnalyzer, BreakingChangeReport, Severity};
pub use diff::{diff, ColumnChange, ColumnRename, DiffOptions, FieldChange, SchemaDiff, TableDiff};
pub use loader::{load_schema, SchemaFormat};
pub use types::{Column, Constraint, ConstraintType, Database, Dialect, Index, Table};
