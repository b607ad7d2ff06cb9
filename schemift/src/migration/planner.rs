//! Dialect-independent migration planning
//!
//! Every dialect goes through the same order so scripts stay valid when run
//! top to bottom in one transaction:
//!
//! 1. table option changes
//! 2. constraint and index drops (foreign keys first)
//! 3. column renames, additions, modifications, then removals
//! 4. constraint and index creates
//! 5. foreign key creates, collected across all tables and emitted last

use crate::migration::{
    ForeignKeyChecks, Migration, MigrationOptions, SqlGenerator, TransactionMode,
};
use crate::schema::analyzer::{migration_recommendations, BreakingChangeAnalyzer, Severity};
use crate::schema::diff::{column_changes, ConstraintChange, FieldChange, SchemaDiff, TableDiff};
use crate::schema::types::{Constraint, ConstraintType, Dialect, Index, Table};
use crate::utils::naming::{
    backup_name, get_constraint_name, get_index_name, get_max_identifier_length,
    truncate_identifier,
};

/// Statements produced for one table, with foreign keys kept apart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlterTableResult {
    pub statements: Vec<String>,
    pub rollback: Vec<String>,
    pub fk_statements: Vec<String>,
    pub fk_rollback: Vec<String>,
    pub notes: Vec<String>,
    pub unresolved: Vec<String>,
}

impl AlterTableResult {
    /// Add a statement and its inverse; a blank inverse is skipped
    pub fn add(&mut self, up: impl Into<String>, down: impl Into<String>) {
        push_pair(&mut self.statements, &mut self.rollback, up.into(), down.into());
    }

    /// Add a foreign key statement and its inverse
    pub fn add_fk(&mut self, up: impl Into<String>, down: impl Into<String>) {
        push_pair(&mut self.fk_statements, &mut self.fk_rollback, up.into(), down.into());
    }

    pub fn add_note(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !message.trim().is_empty() {
            self.notes.push(message.trim().to_string());
        }
    }

    pub fn add_unresolved(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !message.trim().is_empty() {
            tracing::warn!(reason = %message.trim(), "Unresolved migration change");
            self.unresolved.push(message.trim().to_string());
        }
    }

    /// Plain statements followed by foreign key statements
    pub fn all_statements(&self) -> Vec<String> {
        self.statements.iter().chain(&self.fk_statements).cloned().collect()
    }
}

fn push_pair(statements: &mut Vec<String>, rollback: &mut Vec<String>, up: String, down: String) {
    let up = up.trim();
    if up.is_empty() {
        return;
    }
    statements.push(up.to_string());
    let down = down.trim();
    if !down.is_empty() {
        rollback.push(down.to_string());
    }
}

/// Build the migration for a diff with the given dialect
pub fn plan<G: SqlGenerator + ?Sized>(gen: &G, diff: &SchemaDiff, options: &MigrationOptions) -> Migration {
    let mut migration = Migration::default();

    for finding in BreakingChangeAnalyzer::analyze(diff) {
        if finding.severity >= Severity::Warning {
            migration.add_breaking(&finding.to_string());
        } else {
            migration.add_note(&finding.to_string());
        }
        for tip in migration_recommendations(&finding) {
            migration.add_note(&tip);
        }
    }
    for warning in &diff.warnings {
        migration.add_note(&format!("Warning: {}", warning));
    }

    let mut body = AlterTableResult::default();

    for table in &diff.added_tables {
        let table = with_generated_names(table, options);
        gen.create_table(&table, &mut body);
        for index in &table.indexes {
            gen.create_index(&table.name, index, &mut body);
        }
        if !gen.inline_foreign_keys() {
            for fk in table
                .constraints
                .iter()
                .filter(|c| c.constraint_type == ConstraintType::ForeignKey)
            {
                gen.add_constraint(&table.name, fk, &mut body);
            }
        }
    }

    for td in &diff.modified_tables {
        alter_table(gen, td, options, &mut body);
    }

    for table in &diff.removed_tables {
        if !options.include_drops {
            body.add_note(format!(
                "Table {} was removed from the schema; drop skipped because drops are disabled",
                table.name
            ));
        } else if options.include_unsafe {
            gen.drop_table(table, &mut body);
        } else {
            let backup = backup_name(&options.backup_prefix, &options.run_id, &table.name, options.dialect);
            gen.rename_table(&table.name, &backup, &mut body);
            body.add_note(format!(
                "Table {} moved to {}; drop it manually once the migration is verified",
                table.name, backup
            ));
        }
    }

    let statements = body.all_statements();
    let mut rollback: Vec<String> = body.rollback.iter().chain(&body.fk_rollback).cloned().collect();

    let fk_checks = (options.defer_foreign_key_check && touches_foreign_keys(diff) && !statements.is_empty())
        .then(|| gen.foreign_key_checks());

    if let Some(ForeignKeyChecks::Toggle { off, on }) = &fk_checks {
        migration.add_statement(off);
        if !rollback.is_empty() {
            rollback.insert(0, on.clone());
            rollback.push(off.clone());
        }
    }

    let deferred = match &fk_checks {
        Some(ForeignKeyChecks::Deferred(statement)) => Some(statement.as_str()),
        _ => None,
    };
    let begin = gen.begin_transaction();

    match options.transaction_mode {
        TransactionMode::Single if !statements.is_empty() => {
            migration.add_statement(begin);
            if let Some(deferred) = deferred {
                migration.add_statement(deferred);
            }
            for statement in &statements {
                migration.add_statement(statement);
            }
            migration.add_statement("COMMIT");
        }
        TransactionMode::PerStatement => {
            for statement in &statements {
                if statement.starts_with("--") {
                    migration.add_statement(statement);
                    continue;
                }
                migration.add_statement(begin);
                if let Some(deferred) = deferred {
                    migration.add_statement(deferred);
                }
                migration.add_statement(statement);
                migration.add_statement("COMMIT");
            }
        }
        _ => {
            if deferred.is_some() {
                migration.add_note("Foreign key checks can only be deferred inside a transaction; none is used");
            }
            for statement in &statements {
                migration.add_statement(statement);
            }
        }
    }

    if let Some(ForeignKeyChecks::Toggle { on, .. }) = &fk_checks {
        migration.add_statement(on);
    }

    if options.dialect == Dialect::MySql
        && options.transaction_mode != TransactionMode::None
        && !statements.is_empty()
    {
        migration.add_note("MySQL commits implicitly after each DDL statement; transaction framing does not make this migration atomic");
    }

    for statement in &rollback {
        migration.add_rollback(statement);
    }
    for note in &body.notes {
        migration.add_note(note);
    }
    for reason in &body.unresolved {
        migration.add_unresolved(reason);
    }
    migration.dedupe();

    tracing::info!(
        dialect = %options.dialect,
        statements = migration.statements.len(),
        rollback = migration.rollback.len(),
        unresolved = migration.unresolved.len(),
        "Migration generated"
    );

    migration
}

fn alter_table<G: SqlGenerator + ?Sized>(
    gen: &G,
    td: &TableDiff,
    options: &MigrationOptions,
    out: &mut AlterTableResult,
) {
    let table = td.name.as_str();
    tracing::debug!(table, "Planning table changes");

    for change in &td.modified_options {
        gen.change_option(table, change, out);
    }

    let mut modified: Vec<&ConstraintChange> = Vec::new();
    for change in &td.modified_constraints {
        if change.old.is_none() || change.new.is_none() {
            continue;
        }
        if is_dependency_rebuild(change) && !options.preserve_foreign_keys {
            out.add_note(format!(
                "Foreign key {} on {} is not rebuilt ({}); foreign key preservation is disabled",
                change.name, table, change.rebuild_reason
            ));
            continue;
        }
        modified.push(change);
    }

    // Drops
    let mut dropped: Vec<&Constraint> = td.removed_constraints.iter().collect();
    dropped.extend(modified.iter().filter(|c| c.rebuild_only).filter_map(|c| c.old.as_ref()));
    dropped.sort_by_key(|c| c.constraint_type != ConstraintType::ForeignKey);
    for constraint in dropped {
        if constraint.name.trim().is_empty() && constraint.constraint_type != ConstraintType::PrimaryKey {
            out.add_unresolved(format!(
                "Cannot drop unnamed {} constraint ({}) on {}: it has no name to drop",
                constraint.constraint_type,
                constraint.signature(),
                table
            ));
            continue;
        }
        gen.drop_constraint(table, constraint, out);
    }

    let rebuilt_indexes: Vec<(&Index, &Index)> = td
        .modified_indexes
        .iter()
        .filter(|c| c.rebuild_only)
        .filter_map(|c| Some((c.old.as_ref()?, c.new.as_ref()?)))
        .collect();
    for index in td.removed_indexes.iter().chain(rebuilt_indexes.iter().map(|(old, _)| *old)) {
        if index.name.trim().is_empty() {
            out.add_unresolved(format!(
                "Cannot drop unnamed index ({}) on {}: it has no name to drop",
                index.signature(),
                table
            ));
            continue;
        }
        gen.drop_index(table, index, out);
    }

    // Columns
    for rename in &td.renamed_columns {
        let changes = attribute_changes(column_changes(&rename.old, &rename.new));
        gen.rename_column(table, rename, &changes, out);
    }
    for column in &td.added_columns {
        gen.add_column(table, column, out);
    }
    for change in &td.modified_columns {
        let changes = attribute_changes(change.changes.clone());
        if !changes.is_empty() {
            gen.modify_column(table, &change.old, &change.new, &changes, out);
        }
    }
    for column in &td.removed_columns {
        if options.include_unsafe {
            gen.drop_column(table, column, out);
        } else {
            let backup = backup_name(&options.backup_prefix, &options.run_id, &column.name, options.dialect);
            gen.backup_column(table, column, &backup, out);
            out.add_note(format!(
                "Column {}.{} moved to {}; drop it manually once the migration is verified",
                table, column.name, backup
            ));
        }
    }

    // Creates
    let created = td
        .added_constraints
        .iter()
        .chain(modified.iter().filter(|c| c.rebuild_only).filter_map(|c| c.new.as_ref()));
    for constraint in created {
        let constraint = with_constraint_name(constraint, table, options);
        gen.add_constraint(table, &constraint, out);
    }
    for change in modified.iter().filter(|c| !c.rebuild_only) {
        if let (Some(old), Some(new)) = (&change.old, &change.new) {
            gen.alter_constraint_enforcement(table, old, new, out);
        }
    }

    for index in td.added_indexes.iter().chain(rebuilt_indexes.iter().map(|(_, new)| *new)) {
        let index = with_index_name(index, table, options);
        gen.create_index(table, &index, out);
    }
    for change in td.modified_indexes.iter().filter(|c| !c.rebuild_only) {
        if let (Some(old), Some(new)) = (&change.old, &change.new) {
            gen.alter_index(table, old, new, &change.changes, out);
        }
    }
}

/// Primary key membership is carried by constraints, not column definitions
fn attribute_changes(changes: Vec<FieldChange>) -> Vec<FieldChange> {
    changes.into_iter().filter(|c| c.field != "primary_key").collect()
}

fn is_dependency_rebuild(change: &ConstraintChange) -> bool {
    change.rebuild_only
        && change.changes.is_empty()
        && change
            .new
            .as_ref()
            .is_some_and(|c| c.constraint_type == ConstraintType::ForeignKey)
}

fn touches_foreign_keys(diff: &SchemaDiff) -> bool {
    let has_fk = |constraints: &[Constraint]| {
        constraints
            .iter()
            .any(|c| c.constraint_type == ConstraintType::ForeignKey)
    };

    diff.added_tables.iter().any(|t| has_fk(&t.constraints))
        || diff.removed_tables.iter().any(|t| has_fk(&t.constraints))
        || diff.modified_tables.iter().any(|td| {
            has_fk(&td.added_constraints)
                || has_fk(&td.removed_constraints)
                || td.modified_constraints.iter().any(|c| {
                    c.old
                        .iter()
                        .chain(&c.new)
                        .any(|c| c.constraint_type == ConstraintType::ForeignKey)
                })
        })
}

fn with_constraint_name(
    constraint: &Constraint,
    table: &str,
    options: &MigrationOptions,
) -> Constraint {
    let mut constraint = constraint.clone();
    if constraint.name.trim().is_empty() {
        let pattern = match constraint.constraint_type {
            ConstraintType::PrimaryKey => &options.naming.primary_key_pattern,
            ConstraintType::ForeignKey => &options.naming.foreign_key_pattern,
            ConstraintType::Unique => &options.naming.unique_pattern,
            ConstraintType::Check => &options.naming.check_pattern,
        };
        let name = get_constraint_name(pattern, table, constraint.constraint_type.as_str(), &constraint.columns);
        constraint.name = truncate_identifier(&name, get_max_identifier_length(options.dialect));
    }
    constraint
}

fn with_index_name(index: &Index, table: &str, options: &MigrationOptions) -> Index {
    let mut index = index.clone();
    if index.name.trim().is_empty() {
        let pattern = if index.unique {
            &options.naming.unique_pattern
        } else {
            &options.naming.index_pattern
        };
        let name = get_index_name(pattern, table, &index.column_names());
        index.name = truncate_identifier(&name, get_max_identifier_length(options.dialect));
    }
    index
}

fn with_generated_names(table: &Table, options: &MigrationOptions) -> Table {
    let mut named = table.clone();
    named.constraints = table
        .constraints
        .iter()
        .map(|c| with_constraint_name(c, &table.name, options))
        .collect();
    named.indexes = table
        .indexes
        .iter()
        .map(|i| with_index_name(i, &table.name, options))
        .collect();
    named
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MySqlGenerator;
    use crate::schema::diff::{diff, DiffOptions};
    use crate::schema::types::{Column, Database};
    use pretty_assertions::assert_eq;

    fn options() -> MigrationOptions {
        MigrationOptions::new(Dialect::MySql)
            .transaction_mode(TransactionMode::None)
            .with_run_id("20240101120000_beef")
    }

    fn db(tables: Vec<Table>) -> Database {
        tables.into_iter().fold(Database::new("app"), |db, t| db.with_table(t))
    }

    fn position(statements: &[String], needle: &str) -> usize {
        statements
            .iter()
            .position(|s| s.contains(needle))
            .unwrap_or_else(|| panic!("{:?} not found in {:#?}", needle, statements))
    }

    #[test]
    fn test_all_statements_keeps_fk_last() {
        let mut result = AlterTableResult::default();
        result.add("stmt1", "undo1");
        result.add_fk("fk1", "");
        result.add("stmt2", "  ");
        result.add_fk("fk2", "undo fk2");
        result.add("   ", "orphan");

        assert_eq!(result.all_statements(), vec!["stmt1", "stmt2", "fk1", "fk2"]);
        assert_eq!(result.rollback, vec!["undo1"]);
        assert_eq!(result.fk_rollback, vec!["undo fk2"]);
        assert!(AlterTableResult::default().all_statements().is_empty());
    }

    #[test]
    fn test_per_table_order() {
        let old = Table::new("t")
            .with_column(Column::new("id", "INT").not_null())
            .with_column(Column::new("a", "INT"))
            .with_column(Column::new("legacy", "TEXT"))
            .with_option("ENGINE", "MyISAM")
            .with_index(Index::new("idx_a", &["a"]));
        let new = Table::new("t")
            .with_column(Column::new("id", "INT").not_null())
            .with_column(Column::new("a", "BIGINT"))
            .with_column(Column::new("b", "INT"))
            .with_option("ENGINE", "InnoDB")
            .with_index(Index::new("idx_a", &["a", "b"]));

        let d = diff(&db(vec![old]), &db(vec![new]), &DiffOptions::default()).unwrap();
        let m = plan(&MySqlGenerator::new(), &d, &options());

        let engine = position(&m.statements, "ENGINE=InnoDB");
        let drop_index = position(&m.statements, "DROP INDEX `idx_a`");
        let add = position(&m.statements, "ADD COLUMN `b`");
        let modify = position(&m.statements, "MODIFY COLUMN `a`");
        let backup = position(&m.statements, "CHANGE COLUMN `legacy`");
        let create_index = position(&m.statements, "CREATE INDEX `idx_a`");
        assert!(engine < drop_index);
        assert!(drop_index < add);
        assert!(add < modify);
        assert!(modify < backup);
        assert!(backup < create_index);
    }

    #[test]
    fn test_safe_removal_uses_backup_name() {
        let old = Table::new("t")
            .with_column(Column::new("id", "INT"))
            .with_column(Column::new("legacy", "TEXT"));
        let new = Table::new("t").with_column(Column::new("id", "INT"));
        let d = diff(&db(vec![old]), &db(vec![new]), &DiffOptions::default()).unwrap();

        let m = plan(&MySqlGenerator::new(), &d, &options());
        assert!(m.statements.iter().all(|s| !s.contains("DROP COLUMN")));
        assert!(m
            .statements
            .iter()
            .any(|s| s.contains("`__smf_backup_20240101120000_beef_legacy`")));

        let m = plan(&MySqlGenerator::new(), &d, &options().include_unsafe(true));
        assert!(m.statements.iter().any(|s| s.contains("DROP COLUMN `legacy`")));
    }

    #[test]
    fn test_removed_tables_by_mode() {
        let users = Table::new("users").with_column(Column::new("id", "INT"));
        let d = diff(&db(vec![users]), &db(vec![]), &DiffOptions::default()).unwrap();
        let gen = MySqlGenerator::new();

        let safe = plan(&gen, &d, &options());
        assert_eq!(
            safe.statements,
            vec!["RENAME TABLE `users` TO `__smf_backup_20240101120000_beef_users`"]
        );
        assert_eq!(
            safe.rollback,
            vec!["RENAME TABLE `__smf_backup_20240101120000_beef_users` TO `users`"]
        );

        let unsafe_ = plan(&gen, &d, &options().include_unsafe(true));
        assert_eq!(unsafe_.statements, vec!["DROP TABLE `users`"]);
        assert!(unsafe_.rollback[0].starts_with("-- cannot auto-rollback DROP TABLE"));
        assert!(unsafe_.rollback[0].contains("`users`"));

        let skipped = plan(&gen, &d, &options().include_drops(false));
        assert!(skipped.statements.is_empty());
        assert!(skipped.notes.iter().any(|n| n.contains("drop skipped")));
    }

    #[test]
    fn test_transaction_and_fk_framing() {
        let parent = Table::new("p").with_column(Column::new("id", "INT"));
        let mut child = Table::new("c").with_column(Column::new("p_id", "INT"));
        child.constraints.push(
            Constraint::new("fk_c_p", ConstraintType::ForeignKey, &["p_id"]).references("p", &["id"]),
        );
        let d = diff(&db(vec![]), &db(vec![parent, child]), &DiffOptions::default()).unwrap();

        let opts = options().transaction_mode(TransactionMode::Single);
        let m = plan(&MySqlGenerator::new(), &d, &opts);
        assert_eq!(m.statements.first().map(String::as_str), Some("SET FOREIGN_KEY_CHECKS=0"));
        assert_eq!(m.statements[1], "START TRANSACTION");
        assert_eq!(m.statements[m.statements.len() - 2], "COMMIT");
        assert_eq!(m.statements.last().map(String::as_str), Some("SET FOREIGN_KEY_CHECKS=1"));
        assert!(m.notes.iter().any(|n| n.contains("commits implicitly")));

        // Foreign keys come after every CREATE TABLE
        let fk = position(&m.statements, "FOREIGN KEY");
        let last_create = m.statements.iter().rposition(|s| s.starts_with("CREATE TABLE")).unwrap();
        assert!(last_create < fk);

        let no_defer = plan(&MySqlGenerator::new(), &d, &opts.clone().defer_foreign_key_check(false));
        assert!(no_defer.statements.iter().all(|s| !s.contains("FOREIGN_KEY_CHECKS")));
    }

    #[test]
    fn test_per_statement_framing() {
        let d = diff(
            &db(vec![]),
            &db(vec![Table::new("t").with_column(Column::new("id", "INT"))]),
            &DiffOptions::default(),
        )
        .unwrap();
        let m = plan(
            &MySqlGenerator::new(),
            &d,
            &options().transaction_mode(TransactionMode::PerStatement),
        );
        assert_eq!(m.statements.len(), 3);
        assert_eq!(m.statements[0], "START TRANSACTION");
        assert!(m.statements[1].starts_with("CREATE TABLE"));
        assert_eq!(m.statements[2], "COMMIT");
    }

    #[test]
    fn test_unnamed_drops_are_unresolved() {
        let old = Table::new("t")
            .with_column(Column::new("a", "INT"))
            .with_constraint(Constraint::new("", ConstraintType::Unique, &["a"]))
            .with_index(Index::new("", &["a"]));
        let new = Table::new("t").with_column(Column::new("a", "INT"));
        let d = diff(&db(vec![old]), &db(vec![new]), &DiffOptions::default()).unwrap();

        let m = plan(&MySqlGenerator::new(), &d, &options());
        assert!(m.statements.is_empty());
        assert_eq!(m.unresolved.len(), 2);
    }

    #[test]
    fn test_unnamed_creates_get_generated_names() {
        let old = Table::new("orders").with_column(Column::new("user_id", "INT"));
        let new = old
            .clone()
            .with_index(Index::new("", &["user_id"]))
            .with_constraint(Constraint::new("", ConstraintType::Unique, &["user_id"]));
        let d = diff(&db(vec![old]), &db(vec![new]), &DiffOptions::default()).unwrap();

        let m = plan(&MySqlGenerator::new(), &d, &options());
        assert!(m.statements.iter().any(|s| s.contains("`idx_orders_user_id`")));
        assert!(m.statements.iter().any(|s| s.contains("`uq_orders_user_id`")));
    }

    #[test]
    fn test_dependency_rebuild_respects_preserve_flag() {
        let fk = Constraint::new("fk_t_p", ConstraintType::ForeignKey, &["p_id"]).references("p", &["id"]);
        let parent = Table::new("p").with_column(Column::new("id", "BIGINT"));
        let old = Table::new("t")
            .with_column(Column::new("p_id", "INT"))
            .with_constraint(fk.clone());
        let new = Table::new("t")
            .with_column(Column::new("p_id", "BIGINT"))
            .with_constraint(fk);
        let d = diff(
            &db(vec![parent.clone(), old]),
            &db(vec![parent, new]),
            &DiffOptions::default(),
        )
        .unwrap();
        let gen = MySqlGenerator::new();

        let m = plan(&gen, &d, &options());
        let drop = position(&m.statements, "DROP FOREIGN KEY `fk_t_p`");
        let modify = position(&m.statements, "MODIFY COLUMN `p_id`");
        let add = position(&m.statements, "ADD CONSTRAINT `fk_t_p` FOREIGN KEY");
        assert!(drop < modify && modify < add);

        let m = plan(&gen, &d, &options().preserve_foreign_keys(false));
        assert!(m.statements.iter().all(|s| !s.contains("FOREIGN KEY")));
        assert!(m.notes.iter().any(|n| n.contains("not rebuilt")));
    }

    #[test]
    fn test_findings_split_into_breaking_and_notes() {
        let old = Table::new("t")
            .with_column(Column::new("a", "INT"))
            .with_index(Index::new("idx_a", &["a"]));
        let new = Table::new("t").with_column(Column::new("a", "INT").not_null());
        let d = diff(&db(vec![old]), &db(vec![new]), &DiffOptions::default()).unwrap();

        let m = plan(&MySqlGenerator::new(), &d, &options());
        assert!(m.breaking.iter().any(|b| b.starts_with("[BREAKING] t.a: Column becomes NOT NULL")));
        assert!(m.notes.iter().any(|n| n.starts_with("[INFO] t.idx_a: Index will be dropped")));
        assert!(m.notes.iter().any(|n| n.contains("backfill")));
    }
}
