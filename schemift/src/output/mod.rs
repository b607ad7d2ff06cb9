//! Rendering of diffs, findings and migrations
//!
//! Text output is meant for people; JSON output carries a `formatVersion`
//! so downstream tooling can detect layout changes.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::migration::Migration;
use crate::schema::analyzer::{BreakingChange, BreakingChangeReport};
use crate::schema::diff::{constraint_label, index_label, FieldChange, SchemaDiff, TableDiff};

/// Version of the JSON document layout
pub const FORMAT_VERSION: &str = "1";

/// Output format for rendered results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(Error::InvalidInput(format!("Unknown output format: {}", other))),
        }
    }
}

/// Render a schema diff
pub fn render_diff(diff: &SchemaDiff, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(diff_text(diff)),
        OutputFormat::Json => {
            let document = json!({
                "formatVersion": FORMAT_VERSION,
                "format": "json",
                "summary": {
                    "addedTables": diff.added_tables.len(),
                    "removedTables": diff.removed_tables.len(),
                    "modifiedTables": diff.modified_tables.len(),
                },
                "diff": serde_json::to_value(diff)?,
            });
            Ok(format!("{}\n", serde_json::to_string_pretty(&document)?))
        }
    }
}

/// Render breaking-change findings
pub fn render_findings(findings: &[BreakingChange], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            if findings.is_empty() {
                return Ok("No breaking changes detected.\n".to_string());
            }
            Ok(findings.iter().map(|f| format!("{}\n", f)).collect())
        }
        OutputFormat::Json => {
            let report = BreakingChangeReport::new(findings.to_vec());
            let by_severity: BTreeMap<String, usize> = report
                .count_by_severity()
                .into_iter()
                .map(|(severity, count)| (severity.to_string(), count))
                .collect();
            let document = json!({
                "formatVersion": FORMAT_VERSION,
                "findings": findings,
                "summary": {
                    "total": findings.len(),
                    "bySeverity": by_severity,
                    "maxSeverity": report.max_severity(),
                },
            });
            Ok(format!("{}\n", serde_json::to_string_pretty(&document)?))
        }
    }
}

/// Render a migration script
pub fn render_migration(migration: &Migration, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(migration.to_string()),
        OutputFormat::Json => {
            let document = json!({
                "formatVersion": FORMAT_VERSION,
                "summary": {
                    "statements": migration.statements.len(),
                    "rollback": migration.rollback.len(),
                    "breaking": migration.breaking.len(),
                    "notes": migration.notes.len(),
                    "unresolved": migration.unresolved.len(),
                },
                "statements": migration.statements,
                "rollback": migration.rollback,
                "breaking": migration.breaking,
                "notes": migration.notes,
                "unresolved": migration.unresolved,
            });
            Ok(format!("{}\n", serde_json::to_string_pretty(&document)?))
        }
    }
}

fn diff_text(diff: &SchemaDiff) -> String {
    if diff.is_empty() && diff.warnings.is_empty() {
        return "No differences found.\n".to_string();
    }

    // Writing to a String cannot fail
    let mut out = String::from("Schema differences:\n");
    if !diff.added_tables.is_empty() {
        out.push_str("Added tables:\n");
        for table in &diff.added_tables {
            let _ = writeln!(out, "  - {}", table.name);
        }
    }
    if !diff.removed_tables.is_empty() {
        out.push_str("Removed tables:\n");
        for table in &diff.removed_tables {
            let _ = writeln!(out, "  - {}", table.name);
        }
    }
    if !diff.modified_tables.is_empty() {
        out.push_str("Modified tables:\n");
        for td in &diff.modified_tables {
            table_diff_text(&mut out, td);
        }
    }
    if !diff.warnings.is_empty() {
        out.push_str("Warnings:\n");
        for warning in &diff.warnings {
            let _ = writeln!(out, "  - {}", warning);
        }
    }
    out
}

fn field_changes_text(out: &mut String, changes: &[FieldChange]) {
    for change in changes {
        let _ = writeln!(out, "        {}: {} -> {}", change.field, change.old, change.new);
    }
}

fn table_diff_text(out: &mut String, td: &TableDiff) {
    let _ = writeln!(out, "  - {}", td.name);

    for column in &td.added_columns {
        let _ = writeln!(out, "      + column {} {}", column.name, column.type_raw);
    }
    for column in &td.removed_columns {
        let _ = writeln!(out, "      - column {}", column.name);
    }
    for rename in &td.renamed_columns {
        let _ = writeln!(
            out,
            "      > column {} -> {} (score {})",
            rename.old.name, rename.new.name, rename.score
        );
    }
    for change in &td.modified_columns {
        let _ = writeln!(out, "      ~ column {}", change.name);
        field_changes_text(out, &change.changes);
    }

    for constraint in &td.added_constraints {
        let _ = writeln!(out, "      + constraint {} ({})", constraint_label(constraint), constraint.constraint_type);
    }
    for constraint in &td.removed_constraints {
        let _ = writeln!(out, "      - constraint {} ({})", constraint_label(constraint), constraint.constraint_type);
    }
    for change in &td.modified_constraints {
        if change.rebuild_only {
            let _ = writeln!(out, "      ~ constraint {} (rebuild: {})", change.name, change.rebuild_reason);
        } else {
            let _ = writeln!(out, "      ~ constraint {}", change.name);
        }
        field_changes_text(out, &change.changes);
    }

    for index in &td.added_indexes {
        let _ = writeln!(out, "      + index {}", index_label(index));
    }
    for index in &td.removed_indexes {
        let _ = writeln!(out, "      - index {}", index_label(index));
    }
    for change in &td.modified_indexes {
        let _ = writeln!(out, "      ~ index {}", change.name);
        field_changes_text(out, &change.changes);
    }

    for option in &td.modified_options {
        let _ = writeln!(out, "      ~ option {}: {} -> {}", option.name, option.old, option.new);
    }
    for warning in &td.warnings {
        let _ = writeln!(out, "      ! {}", warning);
    }
}
