//! Breaking-change analyzer
//!
//! Walks a [`SchemaDiff`] and classifies every risky change by severity.
//! The analyzer performs no I/O; each call to [`BreakingChangeAnalyzer::analyze`]
//! starts from an empty findings list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::schema::diff::{
    column_changes, constraint_label, index_label, ColumnChange, ConstraintChange, FieldChange,
    IndexChange, SchemaDiff, TableDiff, TableOptionChange,
};
use crate::schema::types::{
    type_arguments, type_base, Column, Constraint, ConstraintType, Index, IndexVisibility,
};

/// Risk level of a finding, ordered from least to most dangerous
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Breaking,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Breaking => "BREAKING",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "breaking" => Ok(Severity::Breaking),
            "critical" => Ok(Severity::Critical),
            other => Err(Error::InvalidInput(format!("Unknown severity: {}", other))),
        }
    }
}

/// A single risk finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakingChange {
    pub table: String,
    pub object: String,
    pub description: String,
    pub severity: Severity,
}

impl BreakingChange {
    /// `table.object`, or just the table for table-level findings
    pub fn target(&self) -> String {
        if self.object.is_empty() {
            self.table.clone()
        } else {
            format!("{}.{}", self.table, self.object)
        }
    }
}

impl fmt::Display for BreakingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.target(), self.description)
    }
}

/// Breaking-change analyzer for schema diffs
#[derive(Debug, Default)]
pub struct BreakingChangeAnalyzer {
    changes: Vec<BreakingChange>,
}

impl BreakingChangeAnalyzer {
    /// Classify every change in a diff
    pub fn analyze(diff: &SchemaDiff) -> Vec<BreakingChange> {
        let mut analyzer = Self::default();

        for table in &diff.removed_tables {
            analyzer.add(
                &table.name,
                "",
                Severity::Warning,
                "Table will be dropped; back up data before applying".to_string(),
            );
        }

        for td in &diff.modified_tables {
            analyzer.analyze_table(td);
        }

        tracing::info!(findings = analyzer.changes.len(), "Breaking-change analysis complete");
        analyzer.changes
    }

    fn add(&mut self, table: &str, object: &str, severity: Severity, description: String) {
        self.changes.push(BreakingChange {
            table: table.to_string(),
            object: object.to_string(),
            description,
            severity,
        });
    }

    fn analyze_table(&mut self, td: &TableDiff) {
        for column in &td.removed_columns {
            self.add(
                &td.name,
                &column.name,
                Severity::Warning,
                "Column will be dropped; back up data before applying".to_string(),
            );
        }

        for column in &td.added_columns {
            self.analyze_added_column(&td.name, column);
        }

        for rename in &td.renamed_columns {
            self.add(
                &td.name,
                &rename.new.name,
                Severity::Warning,
                format!("Column rename detected ({} -> {})", rename.old.name, rename.new.name),
            );
            let changes = column_changes(&rename.old, &rename.new);
            self.analyze_column_changes(&td.name, &rename.new.name, &rename.old, &rename.new, &changes);
        }

        for change in &td.modified_columns {
            self.analyze_modified_column(&td.name, change);
        }

        self.analyze_removed_constraints(&td.name, &td.removed_constraints);
        self.analyze_added_constraints(&td.name, &td.added_constraints);
        self.analyze_modified_constraints(&td.name, &td.modified_constraints);

        for index in &td.removed_indexes {
            if index.unique {
                self.add(&td.name, &index_label(index), Severity::Warning, "Unique index will be dropped".to_string());
            } else {
                self.add(&td.name, &index_label(index), Severity::Info, "Index will be dropped".to_string());
            }
        }
        for index in &td.added_indexes {
            self.analyze_added_index(&td.name, index);
        }
        self.analyze_modified_indexes(&td.name, &td.modified_indexes);

        for option in &td.modified_options {
            self.analyze_option(&td.name, option);
        }
    }

    fn analyze_added_column(&mut self, table: &str, column: &Column) {
        if !column.nullable && !column.has_implicit_value() {
            self.add(
                table,
                &column.name,
                Severity::Breaking,
                "Adding NOT NULL column without default; inserts and existing rows need a value".to_string(),
            );
        }
    }

    fn analyze_modified_column(&mut self, table: &str, change: &ColumnChange) {
        self.analyze_column_changes(table, &change.name, &change.old, &change.new, &change.changes);
    }

    fn analyze_column_changes(
        &mut self,
        table: &str,
        object: &str,
        old: &Column,
        new: &Column,
        changes: &[FieldChange],
    ) {
        for change in changes {
            match change.field.as_str() {
                "type" => {
                    for (severity, description) in analyze_type_change(&old.type_raw, &new.type_raw) {
                        self.add(table, object, severity, description);
                    }
                }
                "nullable" => {
                    if old.nullable && !new.nullable {
                        self.add(
                            table,
                            object,
                            Severity::Breaking,
                            "Column becomes NOT NULL; existing NULL values will fail".to_string(),
                        );
                    } else {
                        self.add(table, object, Severity::Info, "Column becomes nullable".to_string());
                    }
                }
                "default" => self.add(
                    table,
                    object,
                    Severity::Info,
                    format!("Default value changes from {} to {}", change.old, change.new),
                ),
                "auto_increment" => {
                    if old.auto_increment {
                        self.add(table, object, Severity::Warning, "AUTO_INCREMENT is being removed".to_string());
                    } else {
                        self.add(table, object, Severity::Info, "AUTO_INCREMENT is being added".to_string());
                    }
                }
                "primary_key" => self.add(
                    table,
                    object,
                    Severity::Breaking,
                    format!("Primary key status changed (was {}, now {})", change.old, change.new),
                ),
                "charset" => self.add(
                    table,
                    object,
                    Severity::Warning,
                    format!("Character set changes from {:?} to {:?}", change.old, change.new),
                ),
                "collate" => self.add(
                    table,
                    object,
                    Severity::Warning,
                    format!("Collation changes from {:?} to {:?}", change.old, change.new),
                ),
                "generated" => self.add(
                    table,
                    object,
                    Severity::Breaking,
                    format!("Generated column status changed (was {}, now {})", change.old, change.new),
                ),
                "generation_expression" => self.add(
                    table,
                    object,
                    Severity::Warning,
                    "Generation expression changes; stored values will be recomputed".to_string(),
                ),
                "generation_storage" => self.add(
                    table,
                    object,
                    Severity::Warning,
                    format!("Generation storage changes from {} to {}", change.old, change.new),
                ),
                "on_update" => self.add(
                    table,
                    object,
                    Severity::Info,
                    format!("ON UPDATE expression changes from {} to {}", change.old, change.new),
                ),
                "identity" => self.add(
                    table,
                    object,
                    Severity::Info,
                    format!("Identity settings change from {} to {}", change.old, change.new),
                ),
                _ => {}
            }
        }
    }

    fn analyze_removed_constraints(&mut self, table: &str, constraints: &[Constraint]) {
        for constraint in constraints {
            let (severity, description) = match constraint.constraint_type {
                ConstraintType::PrimaryKey => (
                    Severity::Breaking,
                    "Primary key will be dropped; row identity is lost",
                ),
                ConstraintType::ForeignKey => (
                    Severity::Warning,
                    "Foreign key will be dropped; referential integrity is no longer enforced",
                ),
                ConstraintType::Unique => (
                    Severity::Warning,
                    "Unique constraint will be dropped; duplicates become possible",
                ),
                ConstraintType::Check => (Severity::Info, "Check constraint will be dropped"),
            };
            self.add(table, &constraint_label(constraint), severity, description.to_string());
        }
    }

    fn analyze_added_constraints(&mut self, table: &str, constraints: &[Constraint]) {
        for constraint in constraints {
            let (severity, description) = match constraint.constraint_type {
                ConstraintType::PrimaryKey => (
                    Severity::Breaking,
                    "Primary key will be added; existing rows must be unique and non-null",
                ),
                ConstraintType::ForeignKey => (
                    Severity::Warning,
                    "Foreign key will be added; existing rows must reference valid parents",
                ),
                ConstraintType::Unique => (
                    Severity::Breaking,
                    "Unique constraint will be added; existing duplicates will fail",
                ),
                ConstraintType::Check => (
                    Severity::Warning,
                    "Check constraint will be added; existing rows may violate it",
                ),
            };
            self.add(table, &constraint_label(constraint), severity, description.to_string());
        }
    }

    fn analyze_modified_constraints(&mut self, table: &str, changes: &[ConstraintChange]) {
        for change in changes {
            if change.old.is_none() || change.new.is_none() {
                continue;
            }
            if change.rebuild_only {
                let reason = if change.rebuild_reason.is_empty() {
                    "definition changed".to_string()
                } else {
                    change.rebuild_reason.clone()
                };
                self.add(
                    table,
                    &change.name,
                    Severity::Breaking,
                    format!("Constraint will be rebuilt (drop and recreate): {}", reason),
                );
            } else if !change.changes.is_empty() {
                self.add(
                    table,
                    &change.name,
                    Severity::Warning,
                    format!("Constraint changes: {}", field_list(&change.changes)),
                );
            }
        }
    }

    fn analyze_added_index(&mut self, table: &str, index: &Index) {
        if index.unique {
            self.add(
                table,
                &index_label(index),
                Severity::Warning,
                "Unique index will be added; existing duplicates will fail".to_string(),
            );
        }
    }

    fn analyze_modified_indexes(&mut self, table: &str, changes: &[IndexChange]) {
        for change in changes {
            let (Some(old), Some(new)) = (&change.old, &change.new) else {
                continue;
            };
            if change.has_change("unique") {
                self.add(
                    table,
                    &change.name,
                    Severity::Breaking,
                    format!("Index uniqueness changes (was {}, now {})", old.unique, new.unique),
                );
            } else if change.rebuild_only {
                self.add(
                    table,
                    &change.name,
                    Severity::Breaking,
                    format!("Index will be rebuilt (drop and recreate): {}", field_list(&change.changes)),
                );
            } else if new.visibility == IndexVisibility::Invisible && old.visibility != new.visibility {
                self.add(
                    table,
                    &change.name,
                    Severity::Warning,
                    "Index becomes invisible; queries relying on it may slow down".to_string(),
                );
            } else {
                self.add(
                    table,
                    &change.name,
                    Severity::Info,
                    format!("Index changes: {}", field_list(&change.changes)),
                );
            }
        }
    }

    fn analyze_option(&mut self, table: &str, option: &TableOptionChange) {
        if option.name == "ENGINE" {
            self.add(
                table,
                &option.name,
                Severity::Warning,
                format!(
                    "Storage engine changes from {:?} to {:?}; the table will be rebuilt",
                    option.old, option.new
                ),
            );
        } else {
            self.add(
                table,
                &option.name,
                Severity::Info,
                format!("Table option {} changes from {:?} to {:?}", option.name, option.old, option.new),
            );
        }
    }
}

fn field_list(changes: &[FieldChange]) -> String {
    if changes.is_empty() {
        return "definition".to_string();
    }
    changes.iter().map(|c| c.field.as_str()).collect::<Vec<_>>().join(", ")
}

/// First numeric type argument, e.g. 255 for `VARCHAR(255)`
pub fn parse_type_length(raw: &str) -> Option<u64> {
    type_arguments(raw).first()?.parse().ok()
}

fn has_length(base: &str) -> bool {
    matches!(
        base,
        "char" | "varchar" | "nchar" | "nvarchar" | "binary" | "varbinary" | "bit" | "bpchar"
    )
}

/// Findings for a raw type change, most specific rule first
pub fn analyze_type_change(old_raw: &str, new_raw: &str) -> Vec<(Severity, String)> {
    let old_base = type_base(old_raw);
    let new_base = type_base(new_raw);
    let mut findings = Vec::new();

    if old_base != new_base {
        findings.push((
            determine_type_migration_severity(&old_base, &new_base),
            format!("Type changes from {} to {}", old_raw, new_raw),
        ));
    } else if matches!(old_base.as_str(), "enum" | "set") {
        let old_values = type_arguments(old_raw);
        let new_values = type_arguments(new_raw);
        let removed: Vec<&String> = old_values.iter().filter(|v| !new_values.contains(v)).collect();
        let added: Vec<&String> = new_values.iter().filter(|v| !old_values.contains(v)).collect();

        if !removed.is_empty() {
            findings.push((
                Severity::Critical,
                format!(
                    "{} values removed ({}); rows holding them will fail",
                    old_base.to_uppercase(),
                    removed.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
                ),
            ));
        } else if !added.is_empty() {
            findings.push((
                Severity::Info,
                format!(
                    "{} values added ({})",
                    old_base.to_uppercase(),
                    added.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
                ),
            ));
        } else if old_values != new_values {
            findings.push((
                Severity::Warning,
                format!("{} value order changes", old_base.to_uppercase()),
            ));
        }
    } else if matches!(old_base.as_str(), "decimal" | "numeric" | "dec") {
        let parse = |raw: &str| -> Option<(u64, u64)> {
            let args = type_arguments(raw);
            let precision = args.first()?.parse().ok()?;
            let scale = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
            Some((precision, scale))
        };
        if let (Some((old_p, old_s)), Some((new_p, new_s))) = (parse(old_raw), parse(new_raw)) {
            let integer_digits_shrink = new_p.saturating_sub(new_s) < old_p.saturating_sub(old_s);
            if new_p < old_p || new_s < old_s || integer_digits_shrink {
                findings.push((
                    Severity::Breaking,
                    format!("Precision shrinks from ({},{}) to ({},{})", old_p, old_s, new_p, new_s),
                ));
            } else {
                findings.push((
                    Severity::Info,
                    format!("Precision increases from ({},{}) to ({},{})", old_p, old_s, new_p, new_s),
                ));
            }
        }
    }

    if has_length(&old_base) && has_length(&new_base) {
        if let (Some(old_len), Some(new_len)) = (parse_type_length(old_raw), parse_type_length(new_raw)) {
            if new_len > old_len {
                findings.push((
                    Severity::Info,
                    format!("Column length increases from {} to {}", old_len, new_len),
                ));
            } else if new_len < old_len {
                findings.push((
                    Severity::Breaking,
                    format!("Column length shrinks from {} to {}; longer values will be truncated", old_len, new_len),
                ));
            }
        }
    }

    if findings.is_empty() {
        findings.push((Severity::Warning, format!("Type changes from {} to {}", old_raw, new_raw)));
    }
    findings
}

fn integer_rank(base: &str) -> Option<u8> {
    match base {
        "tinyint" => Some(1),
        "smallint" | "int2" | "smallserial" => Some(2),
        "mediumint" => Some(3),
        "int" | "integer" | "int4" | "serial" => Some(4),
        "bigint" | "int8" | "bigserial" => Some(5),
        _ => None,
    }
}

fn float_rank(base: &str) -> Option<u8> {
    match base {
        "float" | "real" | "float4" => Some(1),
        "double" | "float8" => Some(2),
        _ => None,
    }
}

fn text_rank(base: &str) -> Option<u8> {
    match base {
        "char" | "varchar" | "nchar" | "nvarchar" | "bpchar" => Some(0),
        "tinytext" => Some(1),
        "text" | "string" | "citext" | "clob" => Some(2),
        "mediumtext" => Some(3),
        "longtext" => Some(4),
        _ => None,
    }
}

fn binary_rank(base: &str) -> Option<u8> {
    match base {
        "binary" | "varbinary" => Some(0),
        "tinyblob" => Some(1),
        "blob" | "bytea" => Some(2),
        "mediumblob" => Some(3),
        "longblob" => Some(4),
        _ => None,
    }
}

fn widen_or_narrow(old: u8, new: u8) -> Severity {
    if new >= old {
        Severity::Info
    } else {
        Severity::Critical
    }
}

/// Severity of moving a column between two base types
pub fn determine_type_migration_severity(old_base: &str, new_base: &str) -> Severity {
    let old_base = old_base.to_lowercase();
    let new_base = new_base.to_lowercase();
    let (old, new) = (old_base.as_str(), new_base.as_str());

    if old == new {
        return Severity::Info;
    }

    let is_decimal = |b: &str| matches!(b, "decimal" | "numeric" | "dec");
    let is_bool = |b: &str| matches!(b, "bool" | "boolean");
    let is_datetime = |b: &str| matches!(b, "datetime" | "timestamp" | "timestamptz");

    if let (Some(o), Some(n)) = (integer_rank(old), integer_rank(new)) {
        return widen_or_narrow(o, n);
    }
    if integer_rank(old).is_some() && is_decimal(new) {
        return Severity::Info;
    }
    if integer_rank(old).is_some() && float_rank(new).is_some() {
        return Severity::Warning;
    }
    if let (Some(o), Some(n)) = (float_rank(old), float_rank(new)) {
        return widen_or_narrow(o, n);
    }
    if (is_decimal(old) && float_rank(new).is_some()) || (float_rank(old).is_some() && is_decimal(new)) {
        return Severity::Warning;
    }
    if let (Some(o), Some(n)) = (text_rank(old), text_rank(new)) {
        if o == 0 && n == 0 {
            return Severity::Warning;
        }
        return widen_or_narrow(o, n);
    }
    if let (Some(o), Some(n)) = (binary_rank(old), binary_rank(new)) {
        if o == 0 && n == 0 {
            return Severity::Warning;
        }
        return widen_or_narrow(o, n);
    }
    if old == "date" && is_datetime(new) {
        return Severity::Info;
    }
    if is_datetime(old) && new == "date" {
        return Severity::Critical;
    }
    if is_datetime(old) && is_datetime(new) {
        return Severity::Warning;
    }
    if (is_bool(old) && new == "tinyint") || (old == "tinyint" && is_bool(new)) {
        return Severity::Warning;
    }
    if matches!((old, new), ("json", "jsonb") | ("jsonb", "json")) {
        return Severity::Warning;
    }

    Severity::Critical
}

/// Advisory data-migration notes for a finding
pub fn migration_recommendations(change: &BreakingChange) -> Vec<String> {
    let description = change.description.to_lowercase();
    let target = change.target();
    let mut notes = Vec::new();

    if description.contains("rename") {
        notes.push(format!(
            "Data migration tip for {}: rename detected; update application code, views and triggers that use the old name",
            target
        ));
    }
    if description.contains("becomes not null") {
        notes.push(format!(
            "Data migration tip for {}: backfill NULL values before applying (UPDATE ... SET col = <value> WHERE col IS NULL)",
            target
        ));
    }
    if description.contains("adding not null column without default") {
        notes.push(format!(
            "Data migration tip for {}: add the column as NULL first, backfill it, then enforce NOT NULL",
            target
        ));
    }
    if description.contains("type changes") {
        notes.push(format!(
            "Data migration tip for {}: verify existing values cast cleanly to the new type, or cast/backfill through a new column",
            target
        ));
    }
    if description.contains("length shrinks") {
        notes.push(format!(
            "Data migration tip for {}: check the current max length of stored values before shrinking",
            target
        ));
    }
    if description.contains("table will be dropped") || description.contains("column will be dropped") {
        notes.push(format!(
            "Safety tip for {}: take a backup before applying; rollback cannot restore dropped data",
            target
        ));
    }

    notes
}

/// Findings with summary helpers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BreakingChangeReport {
    pub changes: Vec<BreakingChange>,
}

impl BreakingChangeReport {
    pub fn new(changes: Vec<BreakingChange>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.changes.iter().map(|c| c.severity).max()
    }

    pub fn has_at_least(&self, severity: Severity) -> bool {
        self.changes.iter().any(|c| c.severity >= severity)
    }

    pub fn count_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for change in &self.changes {
            *counts.entry(change.severity).or_insert(0) += 1;
        }
        counts
    }

    /// Keep only findings at or above a severity
    pub fn filter(&self, min: Severity) -> Self {
        Self {
            changes: self.changes.iter().filter(|c| c.severity >= min).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::diff::ColumnRename;
    use crate::schema::types::Table;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn table_diff(name: &str) -> TableDiff {
        TableDiff {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn analyze_one(td: TableDiff) -> Vec<BreakingChange> {
        BreakingChangeAnalyzer::analyze(&SchemaDiff {
            modified_tables: vec![td],
            ..Default::default()
        })
    }

    fn modified(old: Column, new: Column) -> TableDiff {
        let mut td = table_diff("t");
        td.modified_columns.push(ColumnChange {
            name: new.name.clone(),
            changes: column_changes(&old, &new),
            old,
            new,
        });
        td
    }

    fn find<'a>(findings: &'a [BreakingChange], needle: &str) -> &'a BreakingChange {
        findings
            .iter()
            .find(|f| f.description.contains(needle))
            .unwrap_or_else(|| panic!("no finding containing {:?} in {:#?}", needle, findings))
    }

    #[rstest]
    #[case("int", "bigint", Severity::Info)]
    #[case("bigint", "int", Severity::Critical)]
    #[case("int", "varchar", Severity::Critical)]
    #[case("int", "decimal", Severity::Info)]
    #[case("int", "double", Severity::Warning)]
    #[case("float", "double", Severity::Info)]
    #[case("double", "float", Severity::Critical)]
    #[case("char", "varchar", Severity::Warning)]
    #[case("varchar", "text", Severity::Info)]
    #[case("longtext", "text", Severity::Critical)]
    #[case("date", "datetime", Severity::Info)]
    #[case("datetime", "date", Severity::Critical)]
    #[case("datetime", "timestamp", Severity::Warning)]
    #[case("boolean", "tinyint", Severity::Warning)]
    #[case("blob", "longblob", Severity::Info)]
    #[case("json", "int", Severity::Critical)]
    fn test_type_migration_severity(
        #[case] old: &str,
        #[case] new: &str,
        #[case] expected: Severity,
    ) {
        assert_eq!(determine_type_migration_severity(old, new), expected);
    }

    #[test]
    fn test_severity_order_and_display() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Breaking);
        assert!(Severity::Breaking < Severity::Critical);
        assert_eq!(Severity::Breaking.to_string(), "BREAKING");
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_parse_type_length() {
        assert_eq!(parse_type_length("VARCHAR(255)"), Some(255));
        assert_eq!(parse_type_length("INT"), None);
    }

    #[rstest]
    #[case("VARCHAR(10)", "VARCHAR(20)", Severity::Info, "length increases")]
    #[case("VARCHAR(20)", "VARCHAR(10)", Severity::Breaking, "length shrinks")]
    #[case("DECIMAL(10,2)", "DECIMAL(8,2)", Severity::Breaking, "Precision shrinks")]
    #[case("ENUM('a','b')", "ENUM('a')", Severity::Critical, "values removed")]
    #[case("ENUM('a')", "ENUM('a','b')", Severity::Info, "values added")]
    fn test_type_change_rules(
        #[case] old: &str,
        #[case] new: &str,
        #[case] severity: Severity,
        #[case] needle: &str,
    ) {
        let findings = analyze_type_change(old, new);
        assert!(
            findings.iter().any(|(s, d)| *s == severity && d.contains(needle)),
            "{:?}",
            findings
        );
    }

    #[test]
    fn test_length_needs_both_sides() {
        let findings = analyze_type_change("VARCHAR(10)", "CHAR");
        assert!(!findings.iter().any(|(_, d)| d.contains("length")));
        let findings = analyze_type_change("VARCHAR(10)", "CHAR(10)");
        assert!(!findings.iter().any(|(_, d)| d.contains("length")));
        assert_eq!(findings[0].0, Severity::Warning);
    }

    #[test]
    fn test_column_attribute_rules() {
        let mut old = Column::new("c", "INT");
        old.auto_increment = true;
        old.charset = "latin1".to_string();
        old.collate = "latin1_bin".to_string();
        let mut new = Column::new("c", "INT").not_null();
        new.primary_key = true;
        new.charset = "utf8mb4".to_string();
        new.collate = "utf8mb4_bin".to_string();
        new.is_generated = true;
        new.generation_expression = "a + 1".to_string();

        let findings = analyze_one(modified(old, new));
        assert_eq!(find(&findings, "AUTO_INCREMENT is being removed").severity, Severity::Warning);
        assert_eq!(find(&findings, "Primary key status changed").severity, Severity::Breaking);
        assert_eq!(find(&findings, "Character set changes").severity, Severity::Warning);
        assert_eq!(find(&findings, "Collation changes").severity, Severity::Warning);
        assert_eq!(find(&findings, "Generated column status changed").severity, Severity::Breaking);
        assert_eq!(find(&findings, "becomes NOT NULL").severity, Severity::Breaking);
    }

    #[test]
    fn test_constraint_removals_and_additions_all_reported() {
        let constraints = vec![
            Constraint::new("pk", ConstraintType::PrimaryKey, &["id"]),
            Constraint::new("fk", ConstraintType::ForeignKey, &["a"]).references("p", &["id"]),
            Constraint::new("uq", ConstraintType::Unique, &["b"]),
            Constraint::new("chk", ConstraintType::Check, &["c"]).check("c > 0"),
        ];

        let mut td = table_diff("t");
        td.removed_constraints = constraints.clone();
        let removed = analyze_one(td);
        assert_eq!(removed.len(), 4);
        assert_eq!(find(&removed, "Foreign key will be dropped").severity, Severity::Warning);
        assert_eq!(find(&removed, "Check constraint will be dropped").severity, Severity::Info);

        let mut td = table_diff("t");
        td.added_constraints = constraints;
        let added = analyze_one(td);
        assert_eq!(added.len(), 4);
        assert_eq!(find(&added, "Unique constraint will be added").severity, Severity::Breaking);
    }

    #[test]
    fn test_modified_constraints() {
        let constraint = Constraint::new("uq", ConstraintType::Unique, &["b"]);
        let mut td = table_diff("t");
        td.modified_constraints = vec![
            ConstraintChange {
                name: "uq".to_string(),
                old: Some(constraint.clone()),
                new: Some(constraint.clone()),
                changes: Vec::new(),
                rebuild_only: false,
                rebuild_reason: String::new(),
            },
            ConstraintChange {
                name: "uq".to_string(),
                old: Some(constraint.clone()),
                new: Some(constraint),
                changes: Vec::new(),
                rebuild_only: true,
                rebuild_reason: "column \"b\" changes type".to_string(),
            },
            ConstraintChange {
                name: "broken".to_string(),
                old: None,
                new: None,
                changes: Vec::new(),
                rebuild_only: true,
                rebuild_reason: String::new(),
            },
        ];

        let findings = analyze_one(td);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Breaking);
    }

    #[test]
    fn test_modified_indexes() {
        let index = Index::new("idx", &["a"]);
        let unique = Index::new("idx", &["a"]).unique();
        let mut td = table_diff("t");
        td.modified_indexes = vec![
            IndexChange {
                name: "idx".to_string(),
                old: Some(index.clone()),
                new: Some(index.clone()),
                changes: Vec::new(),
                rebuild_only: false,
            },
            IndexChange {
                name: "idx".to_string(),
                changes: crate::schema::diff::index_changes(&index, &unique),
                old: Some(index),
                new: Some(unique),
                rebuild_only: true,
            },
        ];

        let findings = analyze_one(td);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[1].severity, Severity::Breaking);
    }

    #[test]
    fn test_drops_carry_safety_notes() {
        let mut td = table_diff("t");
        td.removed_columns.push(Column::new("legacy", "TEXT"));
        td.removed_indexes.push(Index::new("idx_legacy", &["legacy"]));
        let diff = SchemaDiff {
            removed_tables: vec![Table::new("old_things")],
            modified_tables: vec![td],
            ..Default::default()
        };

        let findings = BreakingChangeAnalyzer::analyze(&diff);
        assert_eq!(findings[0].target(), "old_things");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(find(&findings, "Index will be dropped").severity, Severity::Info);

        let notes: Vec<String> = findings.iter().flat_map(migration_recommendations).collect();
        assert_eq!(notes.iter().filter(|n| n.starts_with("Safety tip")).count(), 2);
    }

    #[test]
    fn test_rename_is_reported_with_attribute_changes() {
        let mut td = table_diff("t");
        td.renamed_columns.push(ColumnRename {
            old: Column::new("user_identifier", "INT"),
            new: Column::new("user_id", "INT").not_null(),
            score: 12,
        });

        let findings = analyze_one(td);
        assert_eq!(find(&findings, "rename detected").severity, Severity::Warning);
        assert_eq!(find(&findings, "becomes NOT NULL").object, "user_id");
    }

    #[rstest]
    #[case("Column rename detected (a -> b)", Some("Data migration tip"))]
    #[case("Column becomes NOT NULL; existing NULL values will fail", Some("backfill"))]
    #[case("Adding NOT NULL column without default", Some("NULL first"))]
    #[case("Type changes from INT to TEXT", Some("cast/backfill"))]
    #[case("Column length shrinks from 20 to 10", Some("max length"))]
    #[case("Table will be dropped; back up data before applying", Some("backup"))]
    #[case("Index will be dropped", None)]
    fn test_migration_recommendations(#[case] description: &str, #[case] expected: Option<&str>) {
        let change = BreakingChange {
            table: "t".to_string(),
            object: "c".to_string(),
            description: description.to_string(),
            severity: Severity::Warning,
        };
        let notes = migration_recommendations(&change);
        match expected {
            Some(needle) => assert!(notes.iter().any(|n| n.contains(needle)), "{:?}", notes),
            None => assert!(notes.is_empty()),
        }
    }

    #[test]
    fn test_report_helpers() {
        let finding = |severity| BreakingChange {
            table: "t".to_string(),
            object: String::new(),
            description: "x".to_string(),
            severity,
        };
        let report = BreakingChangeReport::new(vec![
            finding(Severity::Info),
            finding(Severity::Breaking),
            finding(Severity::Info),
        ]);

        assert_eq!(report.max_severity(), Some(Severity::Breaking));
        assert!(report.has_at_least(Severity::Warning));
        assert!(!report.has_at_least(Severity::Critical));
        assert_eq!(report.count_by_severity().get(&Severity::Info), Some(&2));
        assert_eq!(report.filter(Severity::Warning).changes.len(), 1);
    }
}
