//! SQLite migration generator
//!
//! SQLite's ALTER TABLE only renames tables and columns, adds columns and
//! drops columns. Anything else needs a table rebuild, which is reported as
//! unresolved instead of being generated.

use crate::migration::{AlterTableResult, ForeignKeyChecks, SqlGenerator};
use crate::schema::diff::{ColumnRename, FieldChange, TableOptionChange};
use crate::schema::types::{
    Column, Constraint, ConstraintType, Dialect, GenerationStorage, Index, IndexType,
    IndexVisibility, SortOrder, Table,
};

/// SQLite SQL generator
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGenerator;

impl SqliteGenerator {
    pub fn new() -> Self {
        Self
    }

    fn rebuild_required(&self, table: &str, what: &str, out: &mut AlterTableResult) {
        out.add_unresolved(format!("SQLite requires a table rebuild to {} on {}", what, table));
    }

    /// Column definition; `inline_pk` folds a single-column primary key in
    pub fn column_definition(&self, column: &Column, inline_pk: bool) -> String {
        let mut parts = vec![self.quote_identifier(&column.name), column.type_raw.trim().to_string()];

        if inline_pk {
            parts.push("PRIMARY KEY".to_string());
            if column.auto_increment {
                parts.push("AUTOINCREMENT".to_string());
            }
        }
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if column.is_generated {
            parts.push(format!(
                "GENERATED ALWAYS AS ({}) {}",
                column.generation_expression.trim(),
                column.generation_storage.unwrap_or(GenerationStorage::Virtual)
            ));
        } else if let Some(default) = &column.default_value {
            parts.push(format!("DEFAULT {}", self.format_value(default)));
        }
        if !column.collate.trim().is_empty() {
            parts.push(format!("COLLATE {}", column.collate.trim()));
        }

        parts.join(" ")
    }

    fn alter(&self, table: &str, clause: &str) -> String {
        format!("ALTER TABLE {} {}", self.quote_identifier(table), clause)
    }

    fn constraint_clause(&self, constraint: &Constraint) -> Option<String> {
        let prefix = if constraint.name.trim().is_empty() {
            String::new()
        } else {
            format!("CONSTRAINT {} ", self.quote_identifier(&constraint.name))
        };
        let columns = self.format_columns(&constraint.columns);
        let body = match constraint.constraint_type {
            ConstraintType::PrimaryKey if !constraint.columns.is_empty() => format!("PRIMARY KEY {}", columns),
            ConstraintType::Unique if !constraint.columns.is_empty() => format!("UNIQUE {}", columns),
            ConstraintType::Check if !constraint.check_expression.trim().is_empty() => {
                format!("CHECK ({})", constraint.check_expression.trim())
            }
            ConstraintType::ForeignKey
                if !constraint.columns.is_empty() && !constraint.referenced_table.trim().is_empty() =>
            {
                let mut clause = format!(
                    "FOREIGN KEY {} REFERENCES {} {}",
                    columns,
                    self.quote_identifier(&constraint.referenced_table),
                    self.format_columns(&constraint.referenced_columns)
                );
                if let Some(action) = constraint.on_delete {
                    clause.push_str(&format!(" ON DELETE {}", action));
                }
                if let Some(action) = constraint.on_update {
                    clause.push_str(&format!(" ON UPDATE {}", action));
                }
                clause
            }
            _ => return None,
        };
        Some(format!("{}{}", prefix, body))
    }

    fn create_index_sql(&self, table: &str, index: &Index) -> String {
        let columns: Vec<String> = index
            .columns
            .iter()
            .filter(|c| !c.name.trim().is_empty())
            .map(|c| {
                let quoted = self.quote_identifier(c.name.trim());
                match c.order {
                    SortOrder::Desc => format!("{} DESC", quoted),
                    SortOrder::Asc => quoted,
                }
            })
            .collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            columns.join(", ")
        )
    }

    fn drop_index_sql(&self, index: &Index) -> String {
        format!("DROP INDEX {}", self.quote_identifier(&index.name))
    }
}

impl SqlGenerator for SqliteGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn foreign_key_checks(&self) -> ForeignKeyChecks {
        ForeignKeyChecks::Toggle {
            off: "PRAGMA foreign_keys=OFF".to_string(),
            on: "PRAGMA foreign_keys=ON".to_string(),
        }
    }

    fn inline_foreign_keys(&self) -> bool {
        true
    }

    fn create_table(&self, table: &Table, out: &mut AlterTableResult) {
        let pk_columns = table.primary_key_columns();
        // AUTOINCREMENT is only legal on a column-level INTEGER PRIMARY KEY
        let inline_pk = match pk_columns.as_slice() {
            [only] => table.column(only).filter(|c| c.auto_increment).map(|c| c.name.clone()),
            _ => None,
        };

        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c, inline_pk.as_deref() == Some(c.name.as_str())))
            .collect();

        if inline_pk.is_none() && !pk_columns.is_empty() {
            match table.primary_key() {
                Some(pk) => lines.extend(self.constraint_clause(pk)),
                None => lines.push(format!("PRIMARY KEY {}", self.format_columns(&pk_columns))),
            }
        }
        for constraint in &table.constraints {
            if constraint.constraint_type == ConstraintType::PrimaryKey {
                continue;
            }
            match self.constraint_clause(constraint) {
                Some(clause) => lines.push(clause),
                None => out.add_unresolved(format!(
                    "Constraint {} on {} is incomplete; skipped",
                    constraint.name, table.name
                )),
            }
        }

        out.add(
            format!(
                "CREATE TABLE {} (\n  {}\n)",
                self.quote_identifier(&table.name),
                lines.join(",\n  ")
            ),
            format!("DROP TABLE {}", self.quote_identifier(&table.name)),
        );

        if !table.option_map().is_empty() {
            out.add_note(format!("SQLite ignores table options and comments; those of {} are dropped", table.name));
        }
    }

    fn rename_table(&self, from: &str, to: &str, out: &mut AlterTableResult) {
        out.add(
            self.alter(from, &format!("RENAME TO {}", self.quote_identifier(to))),
            self.alter(to, &format!("RENAME TO {}", self.quote_identifier(from))),
        );
    }

    fn drop_table(&self, table: &Table, out: &mut AlterTableResult) {
        let name = self.quote_identifier(&table.name);
        out.add(
            format!("DROP TABLE {}", name),
            format!("-- cannot auto-rollback DROP TABLE {}; restore it from a backup", name),
        );
    }

    fn change_option(&self, table: &str, change: &TableOptionChange, out: &mut AlterTableResult) {
        if change.name == "COMMENT" {
            out.add_note(format!("SQLite has no table comments; comment change on {} ignored", table));
        } else {
            self.rebuild_required(table, &format!("change table option {}", change.name), out);
        }
    }

    fn rename_column(
        &self,
        table: &str,
        rename: &ColumnRename,
        changes: &[FieldChange],
        out: &mut AlterTableResult,
    ) {
        let old = self.quote_identifier(&rename.old.name);
        let new = self.quote_identifier(&rename.new.name);
        out.add(
            self.alter(table, &format!("RENAME COLUMN {} TO {}", old, new)),
            self.alter(table, &format!("RENAME COLUMN {} TO {}", new, old)),
        );

        let fields: Vec<&str> = changes
            .iter()
            .map(|c| c.field.as_str())
            .filter(|f| *f != "comment")
            .collect();
        if !fields.is_empty() {
            self.rebuild_required(
                table,
                &format!("change {} of renamed column {}", fields.join(", "), rename.new.name),
                out,
            );
        }
    }

    fn add_column(&self, table: &str, column: &Column, out: &mut AlterTableResult) {
        let reason = if column.primary_key || column.unique {
            Some("add a PRIMARY KEY or UNIQUE column")
        } else if !column.nullable && column.default_value.is_none() && !column.is_generated {
            Some("add a NOT NULL column without default")
        } else if column.is_generated && column.generation_storage == Some(GenerationStorage::Stored) {
            Some("add a STORED generated column")
        } else {
            None
        };
        if let Some(reason) = reason {
            self.rebuild_required(table, &format!("{} ({})", reason, column.name), out);
            return;
        }

        out.add(
            self.alter(table, &format!("ADD COLUMN {}", self.column_definition(column, false))),
            self.alter(table, &format!("DROP COLUMN {}", self.quote_identifier(&column.name))),
        );
    }

    fn modify_column(
        &self,
        table: &str,
        _old: &Column,
        new: &Column,
        changes: &[FieldChange],
        out: &mut AlterTableResult,
    ) {
        let fields: Vec<&str> = changes
            .iter()
            .map(|c| c.field.as_str())
            .filter(|f| *f != "comment")
            .collect();
        if fields.is_empty() {
            out.add_note(format!("SQLite has no column comments; comment change on {}.{} ignored", table, new.name));
            return;
        }
        self.rebuild_required(table, &format!("change {} of column {}", fields.join(", "), new.name), out);
    }

    fn drop_column(&self, table: &str, column: &Column, out: &mut AlterTableResult) {
        out.add(
            self.alter(table, &format!("DROP COLUMN {}", self.quote_identifier(&column.name))),
            self.alter(table, &format!("ADD COLUMN {}", self.column_definition(column, false))),
        );
    }

    fn backup_column(
        &self,
        table: &str,
        column: &Column,
        backup: &str,
        out: &mut AlterTableResult,
    ) {
        let original = self.quote_identifier(&column.name);
        let parked = self.quote_identifier(backup);
        out.add(
            self.alter(table, &format!("RENAME COLUMN {} TO {}", original, parked)),
            self.alter(table, &format!("RENAME COLUMN {} TO {}", parked, original)),
        );
        if !column.nullable && column.default_value.is_none() {
            out.add_note(format!(
                "Column {}.{} keeps its NOT NULL constraint; inserts must still supply {}",
                table, column.name, backup
            ));
        }
    }

    fn add_constraint(&self, table: &str, constraint: &Constraint, out: &mut AlterTableResult) {
        self.rebuild_required(table, &format!("add {} constraint {}", constraint.constraint_type, constraint.name), out);
    }

    fn drop_constraint(&self, table: &str, constraint: &Constraint, out: &mut AlterTableResult) {
        self.rebuild_required(table, &format!("drop {} constraint {}", constraint.constraint_type, constraint.name), out);
    }

    fn alter_constraint_enforcement(
        &self,
        table: &str,
        _old: &Constraint,
        new: &Constraint,
        out: &mut AlterTableResult,
    ) {
        self.rebuild_required(table, &format!("change enforcement of constraint {}", new.name), out);
    }

    fn create_index(&self, table: &str, index: &Index, out: &mut AlterTableResult) {
        if index.index_type != IndexType::Btree {
            out.add_unresolved(format!(
                "SQLite has no {} indexes; index {} on {} skipped",
                index.index_type, index.name, table
            ));
            return;
        }
        if index.columns.iter().any(|c| c.length.is_some()) {
            out.add_note(format!(
                "SQLite has no prefix indexes; index {} on {} covers whole columns",
                index.name, table
            ));
        }
        if index.visibility == IndexVisibility::Invisible {
            out.add_note(format!(
                "SQLite has no invisible indexes; index {} on {} is created visible",
                index.name, table
            ));
        }
        out.add(self.create_index_sql(table, index), self.drop_index_sql(index));
    }

    fn drop_index(&self, table: &str, index: &Index, out: &mut AlterTableResult) {
        let down = if index.index_type == IndexType::Btree {
            self.create_index_sql(table, index)
        } else {
            format!("-- cannot auto-rollback: SQLite has no {} indexes", index.index_type)
        };
        out.add(self.drop_index_sql(index), down);
    }

    fn alter_index(
        &self,
        table: &str,
        _old: &Index,
        new: &Index,
        changes: &[FieldChange],
        out: &mut AlterTableResult,
    ) {
        if changes.iter().any(|c| c.field == "visibility") {
            out.add_unresolved(format!(
                "SQLite has no invisible indexes; visibility change of {} on {} skipped",
                new.name, table
            ));
        }
        if changes.iter().any(|c| c.field == "comment") {
            out.add_note(format!("SQLite has no index comments; comment change of {} ignored", new.name));
        }
    }
}
