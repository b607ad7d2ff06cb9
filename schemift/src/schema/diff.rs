//! Schema difference calculator
//!
//! This module compares two schema snapshots and calculates the differences.
//! Entities are matched by case-insensitive identity keys, every result list
//! is sorted case-insensitively, and modified entries only list the fields
//! that actually changed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::RenameConfig;
use crate::error::{Error, Result};
use crate::schema::rename;
use crate::schema::types::{Column, Constraint, ConstraintType, Database, Index, Table};

/// Options controlling a comparison
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    pub detect_column_renames: bool,
    pub rename: RenameConfig,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            detect_column_renames: true,
            rename: RenameConfig::default(),
        }
    }
}

/// Represents changes between two schema snapshots
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub added_tables: Vec<Table>,
    pub removed_tables: Vec<Table>,
    pub modified_tables: Vec<TableDiff>,
    pub warnings: Vec<String>,
}

impl SchemaDiff {
    /// Check if the snapshots are equivalent
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.modified_tables.is_empty()
    }
}

/// Changes within one table present in both snapshots
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableDiff {
    pub name: String,
    pub added_columns: Vec<Column>,
    pub removed_columns: Vec<Column>,
    pub renamed_columns: Vec<ColumnRename>,
    pub modified_columns: Vec<ColumnChange>,
    pub added_constraints: Vec<Constraint>,
    pub removed_constraints: Vec<Constraint>,
    pub modified_constraints: Vec<ConstraintChange>,
    pub added_indexes: Vec<Index>,
    pub removed_indexes: Vec<Index>,
    pub modified_indexes: Vec<IndexChange>,
    pub modified_options: Vec<TableOptionChange>,
    pub warnings: Vec<String>,
}

impl TableDiff {
    /// True when no columns, constraints, indexes or options changed
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.renamed_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.added_constraints.is_empty()
            && self.removed_constraints.is_empty()
            && self.modified_constraints.is_empty()
            && self.added_indexes.is_empty()
            && self.removed_indexes.is_empty()
            && self.modified_indexes.is_empty()
            && self.modified_options.is_empty()
    }
}

/// A single changed field, rendered as strings for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: String,
    pub new: String,
}

impl FieldChange {
    fn new(field: &str, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            old: old.into(),
            new: new.into(),
        }
    }
}

/// A column present in both snapshots with a different definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnChange {
    pub name: String,
    pub old: Column,
    pub new: Column,
    pub changes: Vec<FieldChange>,
}

impl ColumnChange {
    pub fn has_change(&self, field: &str) -> bool {
        self.changes.iter().any(|c| c.field == field)
    }
}

/// A removed/added column pair recognised as a rename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub old: Column,
    pub new: Column,
    pub score: u32,
}

/// A constraint that must be altered or rebuilt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintChange {
    pub name: String,
    pub old: Option<Constraint>,
    pub new: Option<Constraint>,
    pub changes: Vec<FieldChange>,
    pub rebuild_only: bool,
    pub rebuild_reason: String,
}

/// An index that must be altered or rebuilt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexChange {
    pub name: String,
    pub old: Option<Index>,
    pub new: Option<Index>,
    pub changes: Vec<FieldChange>,
    pub rebuild_only: bool,
}

impl IndexChange {
    pub fn has_change(&self, field: &str) -> bool {
        self.changes.iter().any(|c| c.field == field)
    }
}

/// A differing table option; a missing key is the empty string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptionChange {
    pub name: String,
    pub old: String,
    pub new: String,
}

/// Compare two snapshots
pub fn diff(old: &Database, new: &Database, options: &DiffOptions) -> Result<SchemaDiff> {
    check_structure(old, "old")?;
    check_structure(new, "new")?;

    let mut result = SchemaDiff::default();
    let old_tables = map_by_key(
        &old.tables,
        |t| t.name.trim().to_lowercase(),
        |t| t.name.clone(),
        |_| true,
        "old schema: table",
        &mut result.warnings,
    );
    let new_tables = map_by_key(
        &new.tables,
        |t| t.name.trim().to_lowercase(),
        |t| t.name.clone(),
        |_| true,
        "new schema: table",
        &mut result.warnings,
    );

    for (key, new_table) in &new_tables {
        match old_tables.get(key) {
            None => result.added_tables.push((*new_table).clone()),
            Some(old_table) => {
                let table_diff = compare_table(old_table, new_table, options);
                result.warnings.extend(table_diff.warnings.iter().cloned());
                if !table_diff.is_empty() {
                    result.modified_tables.push(table_diff);
                }
            }
        }
    }

    for (key, old_table) in &old_tables {
        if !new_tables.contains_key(key) {
            result.removed_tables.push((*old_table).clone());
        }
    }

    result.added_tables.sort_by(|a, b| cmp_name(&a.name, &b.name));
    result.removed_tables.sort_by(|a, b| cmp_name(&a.name, &b.name));
    result.modified_tables.sort_by(|a, b| cmp_name(&a.name, &b.name));

    tracing::info!(
        added = result.added_tables.len(),
        removed = result.removed_tables.len(),
        modified = result.modified_tables.len(),
        warnings = result.warnings.len(),
        "Schema diff computed"
    );

    Ok(result)
}

/// Compare two versions of one table
pub fn compare_table(old: &Table, new: &Table, options: &DiffOptions) -> TableDiff {
    tracing::debug!(table = %new.name, "Comparing table");

    let mut td = TableDiff {
        name: new.name.clone(),
        ..Default::default()
    };

    // Columns
    let old_scope = format!("old schema: table {:?} column", old.name);
    let new_scope = format!("new schema: table {:?} column", new.name);
    let old_columns = map_by_key(
        &old.columns,
        |c| c.name.trim().to_lowercase(),
        |c| c.name.clone(),
        |_| true,
        &old_scope,
        &mut td.warnings,
    );
    let new_columns = map_by_key(
        &new.columns,
        |c| c.name.trim().to_lowercase(),
        |c| c.name.clone(),
        |_| true,
        &new_scope,
        &mut td.warnings,
    );

    for (key, new_column) in &new_columns {
        match old_columns.get(key) {
            None => td.added_columns.push((*new_column).clone()),
            Some(old_column) => {
                let changes = column_changes(old_column, new_column);
                if !changes.is_empty() {
                    td.modified_columns.push(ColumnChange {
                        name: new_column.name.clone(),
                        old: (*old_column).clone(),
                        new: (*new_column).clone(),
                        changes,
                    });
                }
            }
        }
    }
    for (key, old_column) in &old_columns {
        if !new_columns.contains_key(key) {
            td.removed_columns.push((*old_column).clone());
        }
    }

    if options.detect_column_renames
        && !td.removed_columns.is_empty()
        && !td.added_columns.is_empty()
    {
        let removed = std::mem::take(&mut td.removed_columns);
        let added = std::mem::take(&mut td.added_columns);
        let detected = rename::detect_renames(removed, added, &options.rename);
        td.renamed_columns = detected.renames;
        td.removed_columns = detected.removed;
        td.added_columns = detected.added;
    }

    // Constraints
    let old_scope = format!("old schema: table {:?} constraint", old.name);
    let new_scope = format!("new schema: table {:?} constraint", new.name);
    let old_constraints = map_by_key(
        &old.constraints,
        Constraint::key,
        constraint_label,
        |c| !c.name.trim().is_empty(),
        &old_scope,
        &mut td.warnings,
    );
    let new_constraints = map_by_key(
        &new.constraints,
        Constraint::key,
        constraint_label,
        |c| !c.name.trim().is_empty(),
        &new_scope,
        &mut td.warnings,
    );

    let retyped: Vec<&str> = td
        .modified_columns
        .iter()
        .filter(|c| c.has_change("type"))
        .map(|c| c.name.as_str())
        .collect();

    for (key, new_constraint) in &new_constraints {
        let Some(old_constraint) = old_constraints.get(key) else {
            td.added_constraints.push((*new_constraint).clone());
            continue;
        };

        let changes = constraint_changes(old_constraint, new_constraint);
        if !changes.is_empty() {
            let enforced_only = new_constraint.constraint_type == ConstraintType::Check
                && old_constraint.constraint_type == ConstraintType::Check
                && changes.iter().all(|c| c.field == "enforced");
            td.modified_constraints.push(ConstraintChange {
                name: constraint_label(new_constraint),
                old: Some((*old_constraint).clone()),
                new: Some((*new_constraint).clone()),
                rebuild_only: !enforced_only,
                rebuild_reason: if enforced_only {
                    String::new()
                } else {
                    format!("{} changed", join_fields(&changes))
                },
                changes,
            });
        } else if new_constraint.constraint_type == ConstraintType::ForeignKey {
            // Foreign keys block type changes on their columns until dropped
            let dependent = new_constraint
                .columns
                .iter()
                .find(|c| retyped.iter().any(|r| r.eq_ignore_ascii_case(c)));
            if let Some(column) = dependent {
                td.modified_constraints.push(ConstraintChange {
                    name: constraint_label(new_constraint),
                    old: Some((*old_constraint).clone()),
                    new: Some((*new_constraint).clone()),
                    changes: Vec::new(),
                    rebuild_only: true,
                    rebuild_reason: format!("column {:?} changes type", column),
                });
            }
        }
    }
    for (key, old_constraint) in &old_constraints {
        if !new_constraints.contains_key(key) {
            td.removed_constraints.push((*old_constraint).clone());
        }
    }

    // Indexes
    let old_scope = format!("old schema: table {:?} index", old.name);
    let new_scope = format!("new schema: table {:?} index", new.name);
    let old_indexes = map_by_key(
        &old.indexes,
        Index::key,
        index_label,
        |i| !i.name.trim().is_empty(),
        &old_scope,
        &mut td.warnings,
    );
    let new_indexes = map_by_key(
        &new.indexes,
        Index::key,
        index_label,
        |i| !i.name.trim().is_empty(),
        &new_scope,
        &mut td.warnings,
    );

    for (key, new_index) in &new_indexes {
        match old_indexes.get(key) {
            None => td.added_indexes.push((*new_index).clone()),
            Some(old_index) => {
                let changes = index_changes(old_index, new_index);
                if !changes.is_empty() {
                    let rebuild_only = changes
                        .iter()
                        .any(|c| matches!(c.field.as_str(), "unique" | "type" | "columns"));
                    td.modified_indexes.push(IndexChange {
                        name: index_label(new_index),
                        old: Some((*old_index).clone()),
                        new: Some((*new_index).clone()),
                        changes,
                        rebuild_only,
                    });
                }
            }
        }
    }
    for (key, old_index) in &old_indexes {
        if !new_indexes.contains_key(key) {
            td.removed_indexes.push((*old_index).clone());
        }
    }

    td.modified_options = option_changes(old, new);

    td.added_columns.sort_by(|a, b| cmp_name(&a.name, &b.name));
    td.removed_columns.sort_by(|a, b| cmp_name(&a.name, &b.name));
    td.renamed_columns.sort_by(|a, b| cmp_name(&a.old.name, &b.old.name));
    td.modified_columns.sort_by(|a, b| cmp_name(&a.name, &b.name));
    td.added_constraints.sort_by(|a, b| cmp_name(&constraint_label(a), &constraint_label(b)));
    td.removed_constraints.sort_by(|a, b| cmp_name(&constraint_label(a), &constraint_label(b)));
    td.modified_constraints.sort_by(|a, b| cmp_name(&a.name, &b.name));
    td.added_indexes.sort_by(|a, b| cmp_name(&index_label(a), &index_label(b)));
    td.removed_indexes.sort_by(|a, b| cmp_name(&index_label(a), &index_label(b)));
    td.modified_indexes.sort_by(|a, b| cmp_name(&a.name, &b.name));

    td
}

fn check_structure(db: &Database, side: &str) -> Result<()> {
    for (i, table) in db.tables.iter().enumerate() {
        if table.name.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} schema: table at index {} has no name",
                side, i
            )));
        }
        for (j, column) in table.columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "{} schema: column at index {} of table {:?} has no name",
                    side, j, table.name
                )));
            }
        }
    }
    Ok(())
}

/// Build an ordered association keyed case-insensitively; the first entry wins
fn map_by_key<'a, T>(
    items: &'a [T],
    key: impl Fn(&T) -> String,
    label: impl Fn(&T) -> String,
    is_named: impl Fn(&T) -> bool,
    scope: &str,
    warnings: &mut Vec<String>,
) -> IndexMap<String, &'a T> {
    let mut map: IndexMap<String, &'a T> = IndexMap::new();

    for item in items {
        let mut item_key = key(item);
        if let Some(existing) = map.get(&item_key) {
            if is_named(item) {
                let message = format!(
                    "{} name collision between {:?} and {:?}; using {:?}",
                    scope,
                    label(existing),
                    label(item),
                    label(existing)
                );
                tracing::warn!(collision = %message, "Name collision");
                warnings.push(message);
                continue;
            }

            // Anonymous siblings with the same signature keep declaration order
            let mut ordinal = 2;
            while map.contains_key(&format!("{}#{}", item_key, ordinal)) {
                ordinal += 1;
            }
            item_key = format!("{}#{}", item_key, ordinal);
        }
        map.insert(item_key, item);
    }

    map
}

/// Display name for a constraint, falling back to its signature
pub fn constraint_label(constraint: &Constraint) -> String {
    let name = constraint.name.trim();
    if name.is_empty() {
        format!("({})", constraint.signature())
    } else {
        name.to_string()
    }
}

/// Display name for an index, falling back to its signature
pub fn index_label(index: &Index) -> String {
    let name = index.name.trim();
    if name.is_empty() {
        format!("({})", index.signature())
    } else {
        name.to_string()
    }
}

fn cmp_name(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn join_fields(changes: &[FieldChange]) -> String {
    changes.iter().map(|c| c.field.as_str()).collect::<Vec<_>>().join(", ")
}

fn opt_str(value: Option<&str>) -> String {
    value.map(str::to_string).unwrap_or_else(|| "<nil>".to_string())
}

fn opt_display<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "<nil>".to_string())
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn eq_list_ci(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| eq_ci(x, y))
}

/// Field-level differences between two column definitions
pub fn column_changes(old: &Column, new: &Column) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if !eq_ci(&old.type_raw, &new.type_raw) {
        changes.push(FieldChange::new("type", &old.type_raw, &new.type_raw));
    }
    if old.nullable != new.nullable {
        changes.push(FieldChange::new("nullable", old.nullable.to_string(), new.nullable.to_string()));
    }
    if old.primary_key != new.primary_key {
        changes.push(FieldChange::new("primary_key", old.primary_key.to_string(), new.primary_key.to_string()));
    }
    if old.auto_increment != new.auto_increment {
        changes.push(FieldChange::new(
            "auto_increment",
            old.auto_increment.to_string(),
            new.auto_increment.to_string(),
        ));
    }
    if !eq_ci(&old.charset, &new.charset) {
        changes.push(FieldChange::new("charset", &old.charset, &new.charset));
    }
    if !eq_ci(&old.collate, &new.collate) {
        changes.push(FieldChange::new("collate", &old.collate, &new.collate));
    }
    if old.comment != new.comment {
        changes.push(FieldChange::new("comment", &old.comment, &new.comment));
    }
    if old.default_value != new.default_value {
        changes.push(FieldChange::new(
            "default",
            opt_str(old.default_value.as_deref()),
            opt_str(new.default_value.as_deref()),
        ));
    }
    if old.on_update != new.on_update {
        changes.push(FieldChange::new(
            "on_update",
            opt_str(old.on_update.as_deref()),
            opt_str(new.on_update.as_deref()),
        ));
    }
    if old.is_generated != new.is_generated {
        changes.push(FieldChange::new("generated", old.is_generated.to_string(), new.is_generated.to_string()));
    }
    if old.generation_expression.trim() != new.generation_expression.trim() {
        changes.push(FieldChange::new(
            "generation_expression",
            &old.generation_expression,
            &new.generation_expression,
        ));
    }
    if old.generation_storage != new.generation_storage {
        changes.push(FieldChange::new(
            "generation_storage",
            opt_display(old.generation_storage),
            opt_display(new.generation_storage),
        ));
    }
    if (old.identity_seed, old.identity_increment) != (new.identity_seed, new.identity_increment) {
        changes.push(FieldChange::new(
            "identity",
            identity_str(old),
            identity_str(new),
        ));
    }

    changes
}

fn identity_str(column: &Column) -> String {
    match (column.identity_seed, column.identity_increment) {
        (None, None) => "<nil>".to_string(),
        (seed, increment) => format!("{},{}", seed.unwrap_or(1), increment.unwrap_or(1)),
    }
}

/// Field-level differences between two constraint definitions
pub fn constraint_changes(old: &Constraint, new: &Constraint) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if old.constraint_type != new.constraint_type {
        changes.push(FieldChange::new("type", old.constraint_type.as_str(), new.constraint_type.as_str()));
    }
    if !eq_list_ci(&old.columns, &new.columns) {
        changes.push(FieldChange::new("columns", old.columns.join(","), new.columns.join(",")));
    }
    if !eq_ci(&old.referenced_table, &new.referenced_table) {
        changes.push(FieldChange::new("referenced_table", &old.referenced_table, &new.referenced_table));
    }
    if !eq_list_ci(&old.referenced_columns, &new.referenced_columns) {
        changes.push(FieldChange::new(
            "referenced_columns",
            old.referenced_columns.join(","),
            new.referenced_columns.join(","),
        ));
    }
    if old.on_delete != new.on_delete {
        changes.push(FieldChange::new("on_delete", opt_display(old.on_delete), opt_display(new.on_delete)));
    }
    if old.on_update != new.on_update {
        changes.push(FieldChange::new("on_update", opt_display(old.on_update), opt_display(new.on_update)));
    }
    if old.check_expression.trim() != new.check_expression.trim() {
        changes.push(FieldChange::new("check_expression", &old.check_expression, &new.check_expression));
    }
    if old.enforced != new.enforced {
        changes.push(FieldChange::new("enforced", old.enforced.to_string(), new.enforced.to_string()));
    }

    changes
}

/// Field-level differences between two index definitions
pub fn index_changes(old: &Index, new: &Index) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if old.unique != new.unique {
        changes.push(FieldChange::new("unique", old.unique.to_string(), new.unique.to_string()));
    }
    if old.index_type != new.index_type {
        changes.push(FieldChange::new("type", old.index_type.to_string(), new.index_type.to_string()));
    }
    let same_columns = old.columns.len() == new.columns.len()
        && old.columns.iter().zip(&new.columns).all(|(a, b)| {
            eq_ci(&a.name, &b.name) && a.length == b.length && a.order == b.order
        });
    if !same_columns {
        let render = |index: &Index| {
            index.columns.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",")
        };
        changes.push(FieldChange::new("columns", render(old), render(new)));
    }
    if old.visibility != new.visibility {
        changes.push(FieldChange::new("visibility", old.visibility.to_string(), new.visibility.to_string()));
    }
    if old.comment != new.comment {
        changes.push(FieldChange::new("comment", &old.comment, &new.comment));
    }

    changes
}

/// Flat key comparison of table options, sorted by key
pub fn option_changes(old: &Table, new: &Table) -> Vec<TableOptionChange> {
    let old_options = old.option_map();
    let new_options = new.option_map();

    let mut keys: Vec<&String> = old_options.keys().chain(new_options.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter_map(|key| {
            let old_value = old_options.get(key).cloned().unwrap_or_default();
            let new_value = new_options.get(key).cloned().unwrap_or_default();
            (old_value != new_value).then(|| TableOptionChange {
                name: key.clone(),
                old: old_value,
                new: new_value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{IndexColumn, IndexVisibility};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn db(tables: Vec<Table>) -> Database {
        Database {
            name: "app".to_string(),
            tables,
            ..Default::default()
        }
    }

    fn table(name: &str, columns: &[(&str, &str)]) -> Table {
        columns
            .iter()
            .fold(Table::new(name), |t, (c, ty)| t.with_column(Column::new(c, ty)))
    }

    fn no_renames() -> DiffOptions {
        DiffOptions {
            detect_column_renames: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_added_removed_and_sorted_tables() {
        let old = db(vec![table("b", &[("id", "INT")]), table("Zeta", &[("id", "INT")])]);
        let new = db(vec![
            table("zeta", &[("id", "INT")]),
            table("C", &[("id", "INT")]),
            table("a", &[("id", "INT")]),
        ]);

        let d = diff(&old, &new, &DiffOptions::default()).unwrap();
        let added: Vec<&str> = d.added_tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(added, vec!["a", "C"]);
        assert_eq!(d.removed_tables[0].name, "b");
        assert!(d.modified_tables.is_empty());
    }

    #[test]
    fn test_identical_schemas_produce_empty_diff() {
        let schema = db(vec![table("users", &[("id", "INT"), ("name", "VARCHAR(10)")])]);
        let d = diff(&schema, &schema, &DiffOptions::default()).unwrap();
        assert!(d.is_empty());
        assert!(d.warnings.is_empty());
    }

    #[test]
    fn test_table_collision_warns_and_keeps_first() {
        let old = db(vec![table("Users", &[("id", "INT")]), table("users", &[("x", "INT")])]);
        let new = db(vec![table("users", &[("id", "INT")])]);

        let d = diff(&old, &new, &DiffOptions::default()).unwrap();
        assert!(d.is_empty());
        assert_eq!(d.warnings.len(), 1);
        assert!(d.warnings[0].starts_with("old schema:"));
        assert!(d.warnings[0].contains("using \"Users\""));
    }

    #[test]
    fn test_empty_table_name_is_input_error() {
        let old = db(vec![table("users", &[("id", "INT")]), Table::new(" ")]);
        let new = db(vec![]);
        match diff(&old, &new, &DiffOptions::default()) {
            Err(Error::InvalidInput(msg)) => assert_eq!(msg, "old schema: table at index 1 has no name"),
            other => panic!("expected input error, got {:?}", other),
        }
    }

    #[test]
    fn test_column_changes_list_only_changed_fields() {
        let old = Column::new("name", "varchar(10)");
        let mut new = Column::new("name", "VARCHAR(10)").not_null();
        new.charset = "utf8mb4".to_string();
        new.default_value = Some(String::new());

        let changes = column_changes(&old, &new);
        assert_eq!(
            changes,
            vec![
                FieldChange::new("nullable", "true", "false"),
                FieldChange::new("charset", "", "utf8mb4"),
                FieldChange::new("default", "<nil>", ""),
            ]
        );
    }

    #[test]
    fn test_column_case_insensitive_type_and_collation() {
        let mut old = Column::new("c", "INT");
        old.collate = "UTF8MB4_BIN".to_string();
        let mut new = Column::new("c", "int");
        new.collate = "utf8mb4_bin".to_string();
        assert!(column_changes(&old, &new).is_empty());
    }

    #[test]
    fn test_modified_column_entry() {
        let old = db(vec![table("users", &[("id", "INT"), ("age", "INT")])]);
        let new = db(vec![table("users", &[("id", "INT"), ("age", "BIGINT")])]);

        let d = diff(&old, &new, &DiffOptions::default()).unwrap();
        let td = &d.modified_tables[0];
        assert_eq!(td.modified_columns.len(), 1);
        assert_eq!(td.modified_columns[0].changes, vec![FieldChange::new("type", "INT", "BIGINT")]);
    }

    #[test]
    fn test_renames_toggle() {
        let old = db(vec![table("users", &[("id", "INT"), ("user_identifier", "INT")])]);
        let new = db(vec![table("users", &[("id", "INT"), ("user_id", "INT")])]);

        let with = diff(&old, &new, &DiffOptions::default()).unwrap();
        let td = &with.modified_tables[0];
        assert_eq!(td.renamed_columns.len(), 1);
        assert!(td.added_columns.is_empty() && td.removed_columns.is_empty());

        let without = diff(&old, &new, &no_renames()).unwrap();
        let td = &without.modified_tables[0];
        assert!(td.renamed_columns.is_empty());
        assert_eq!(td.added_columns[0].name, "user_id");
        assert_eq!(td.removed_columns[0].name, "user_identifier");
    }

    #[test]
    fn test_unnamed_constraints_match_by_signature() {
        let old = table("t", &[("c1", "INT")])
            .with_constraint(Constraint::new("", ConstraintType::Unique, &["c1"]));
        let new = table("t", &[("c1", "INT")])
            .with_constraint(Constraint::new("", ConstraintType::Unique, &["C1"]));
        assert!(compare_table(&old, &new, &no_renames()).is_empty());
    }

    #[test]
    fn test_anonymous_check_siblings_follow_declaration_order() {
        let checks = |a: &str, b: &str| {
            table("t", &[("c1", "INT")])
                .with_constraint(Constraint::new("", ConstraintType::Check, &["c1"]).check(a))
                .with_constraint(Constraint::new("", ConstraintType::Check, &["c1"]).check(b))
        };
        let td = compare_table(&checks("c1 > 0", "c1 < 10"), &checks("c1 > 0", "c1 < 20"), &no_renames());
        assert!(td.warnings.is_empty());
        assert_eq!(td.modified_constraints.len(), 1);
        assert_eq!(td.modified_constraints[0].changes[0].field, "check_expression");
        assert!(td.modified_constraints[0].rebuild_only);
    }

    #[test]
    fn test_enforced_only_check_change_is_in_place() {
        let old = table("t", &[("c1", "INT")])
            .with_constraint(Constraint::new("chk", ConstraintType::Check, &["c1"]).check("c1 > 0"));
        let mut new = old.clone();
        new.constraints[0].enforced = false;

        let td = compare_table(&old, &new, &no_renames());
        assert!(!td.modified_constraints[0].rebuild_only);
    }

    #[test]
    fn test_foreign_key_rebuilt_when_column_type_changes() {
        let fk = Constraint::new("fk_t_c1", ConstraintType::ForeignKey, &["c1"]).references("p", &["id"]);
        let old = table("t", &[("c1", "INT")]).with_constraint(fk.clone());
        let new = table("t", &[("c1", "BIGINT")]).with_constraint(fk);

        let td = compare_table(&old, &new, &no_renames());
        assert_eq!(td.modified_constraints.len(), 1);
        let change = &td.modified_constraints[0];
        assert!(change.rebuild_only);
        assert!(change.changes.is_empty());
        assert!(change.rebuild_reason.contains("c1"));
    }

    #[rstest]
    #[case::visibility(|i: &mut Index| i.visibility = IndexVisibility::Invisible, false)]
    #[case::comment(|i: &mut Index| i.comment = "hot path".to_string(), false)]
    #[case::unique(|i: &mut Index| i.unique = true, true)]
    #[case::prefix(|i: &mut Index| i.columns[0].length = Some(8), true)]
    fn test_index_rebuild_flag(#[case] change: fn(&mut Index), #[case] rebuild: bool) {
        let old = table("t", &[("c1", "VARCHAR(20)")]).with_index(Index::new("idx_c1", &["c1"]));
        let mut new = old.clone();
        change(&mut new.indexes[0]);

        let td = compare_table(&old, &new, &no_renames());
        assert_eq!(td.modified_indexes.len(), 1);
        assert_eq!(td.modified_indexes[0].rebuild_only, rebuild);
    }

    #[test]
    fn test_unnamed_unique_and_plain_index_are_distinct() {
        let old = table("t", &[("c1", "INT")]).with_index(Index::new("", &["c1"]));
        let new = table("t", &[("c1", "INT")]).with_index(Index::new("", &["c1"]).unique());

        let td = compare_table(&old, &new, &no_renames());
        assert_eq!(td.added_indexes.len(), 1);
        assert_eq!(td.removed_indexes.len(), 1);
        assert!(td.modified_indexes.is_empty());
    }

    #[test]
    fn test_index_column_details() {
        let mut ix = Index::new("idx", &["name"]);
        ix.columns[0] = IndexColumn {
            name: "name".to_string(),
            length: Some(10),
            ..Default::default()
        };
        let changes = index_changes(&Index::new("idx", &["name"]), &ix);
        assert_eq!(changes, vec![FieldChange::new("columns", "name", "name(10)")]);
    }

    #[test]
    fn test_option_changes_sorted_by_key() {
        let old = table("t", &[("id", "INT")])
            .with_option("ENGINE", "MyISAM")
            .with_option("row_format", "COMPACT");
        let mut new = table("t", &[("id", "INT")])
            .with_option("engine", "InnoDB")
            .with_option("CHARSET", "utf8mb4");
        new.comment = "core".to_string();

        let changes = option_changes(&old, &new);
        let keys: Vec<&str> = changes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(keys, vec!["CHARSET", "COMMENT", "ENGINE", "ROW_FORMAT"]);
        assert_eq!(changes[3].new, "");
    }
}
