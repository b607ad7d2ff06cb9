//! MySQL migration generator
//!
//! The reference dialect: every change the diff engine can describe has a
//! MySQL spelling except GIN/GiST indexes and resetting table options.

use crate::migration::{AlterTableResult, ForeignKeyChecks, SqlGenerator};
use crate::schema::diff::{ColumnRename, FieldChange, TableOptionChange};
use crate::schema::types::{
    Column, Constraint, ConstraintType, Dialect, GenerationStorage, Index, IndexType,
    IndexVisibility, SortOrder, Table,
};

/// Table options whose values are string literals
const STRING_OPTIONS: [&str; 7] = [
    "COMMENT",
    "CONNECTION",
    "DATA DIRECTORY",
    "INDEX DIRECTORY",
    "PASSWORD",
    "ENCRYPTION",
    "COMPRESSION",
];

/// MySQL SQL generator
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlGenerator;

impl MySqlGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Full column definition as used by ADD, MODIFY and CHANGE COLUMN
    pub fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![self.quote_identifier(&column.name), column.type_raw.trim().to_string()];

        if !column.charset.trim().is_empty() {
            parts.push(format!("CHARACTER SET {}", column.charset.trim()));
        }
        if !column.collate.trim().is_empty() {
            parts.push(format!("COLLATE {}", column.collate.trim()));
        }
        if column.is_generated {
            parts.push(format!(
                "GENERATED ALWAYS AS ({}) {}",
                column.generation_expression.trim(),
                column.generation_storage.unwrap_or(GenerationStorage::Virtual)
            ));
        }
        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());
        if !column.is_generated {
            if let Some(default) = &column.default_value {
                parts.push(format!("DEFAULT {}", self.format_value(default)));
            }
        }
        if let Some(on_update) = &column.on_update {
            parts.push(format!("ON UPDATE {}", self.format_value(on_update)));
        }
        if column.auto_increment {
            parts.push("AUTO_INCREMENT".to_string());
        }
        if !column.comment.is_empty() {
            parts.push(format!("COMMENT {}", self.quote_string(&column.comment)));
        }

        parts.join(" ")
    }

    /// Index key parts with prefix lengths and sort order
    pub fn format_index_columns(&self, index: &Index) -> String {
        let parts: Vec<String> = index
            .columns
            .iter()
            .filter(|c| !c.name.trim().is_empty())
            .map(|c| {
                let mut part = self.quote_identifier(c.name.trim());
                if let Some(length) = c.length {
                    part.push_str(&format!("({})", length));
                }
                if c.order == SortOrder::Desc {
                    part.push_str(" DESC");
                }
                part
            })
            .collect();
        format!("({})", parts.join(", "))
    }

    fn option_assignment(&self, key: &str, value: &str) -> String {
        if STRING_OPTIONS.contains(&key) {
            format!("{}={}", key, self.quote_string(value))
        } else {
            format!("{}={}", key, value)
        }
    }

    fn alter(&self, table: &str, clause: &str) -> String {
        format!("ALTER TABLE {} {}", self.quote_identifier(table), clause)
    }

    fn check_clause(&self, constraint: &Constraint) -> String {
        let mut clause = format!(
            "CONSTRAINT {} CHECK ({})",
            self.quote_identifier(&constraint.name),
            constraint.check_expression.trim()
        );
        if !constraint.enforced {
            clause.push_str(" NOT ENFORCED");
        }
        clause
    }

    fn foreign_key_clause(&self, constraint: &Constraint) -> String {
        let mut clause = String::new();
        if !constraint.name.trim().is_empty() {
            clause.push_str(&format!("CONSTRAINT {} ", self.quote_identifier(&constraint.name)));
        }
        clause.push_str(&format!(
            "FOREIGN KEY {} REFERENCES {} {}",
            self.format_columns(&constraint.columns),
            self.quote_identifier(&constraint.referenced_table),
            self.format_columns(&constraint.referenced_columns)
        ));
        if let Some(action) = constraint.on_delete {
            clause.push_str(&format!(" ON DELETE {}", action));
        }
        if let Some(action) = constraint.on_update {
            clause.push_str(&format!(" ON UPDATE {}", action));
        }
        clause
    }

    fn create_index_sql(&self, table: &str, index: &Index) -> Result<String, String> {
        let kind = match index.index_type {
            IndexType::Fulltext => "FULLTEXT ",
            IndexType::Spatial => "SPATIAL ",
            IndexType::Gin | IndexType::Gist => {
                return Err(format!(
                    "MySQL has no {} indexes; index {} on {} skipped",
                    index.index_type, index.name, table
                ))
            }
            IndexType::Btree | IndexType::Hash if index.unique => "UNIQUE ",
            IndexType::Btree | IndexType::Hash => "",
        };

        let mut sql = format!(
            "CREATE {}INDEX {} ON {} {}",
            kind,
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            self.format_index_columns(index)
        );
        if index.index_type == IndexType::Hash {
            sql.push_str(" USING HASH");
        }
        if !index.comment.is_empty() {
            sql.push_str(&format!(" COMMENT {}", self.quote_string(&index.comment)));
        }
        if index.visibility == IndexVisibility::Invisible {
            sql.push_str(" INVISIBLE");
        }
        Ok(sql)
    }

    fn drop_index_sql(&self, table: &str, index: &Index) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(&index.name),
            self.quote_identifier(table)
        )
    }

    /// ADD clause for a non-foreign-key constraint
    fn add_constraint_clause(&self, constraint: &Constraint) -> Result<String, String> {
        match constraint.constraint_type {
            ConstraintType::PrimaryKey if !constraint.columns.is_empty() => {
                Ok(format!("ADD PRIMARY KEY {}", self.format_columns(&constraint.columns)))
            }
            ConstraintType::Unique if !constraint.columns.is_empty() => Ok(format!(
                "ADD CONSTRAINT {} UNIQUE {}",
                self.quote_identifier(&constraint.name),
                self.format_columns(&constraint.columns)
            )),
            ConstraintType::Check if !constraint.check_expression.trim().is_empty() => {
                Ok(format!("ADD {}", self.check_clause(constraint)))
            }
            ConstraintType::Check => Err(format!("check constraint {} has no expression", constraint.name)),
            ConstraintType::ForeignKey
                if !constraint.columns.is_empty() && !constraint.referenced_table.trim().is_empty() =>
            {
                Ok(format!("ADD {}", self.foreign_key_clause(constraint)))
            }
            ConstraintType::ForeignKey => Err(format!(
                "foreign key {} is missing its columns or referenced table",
                constraint.name
            )),
            _ => Err(format!("{} constraint {} has no columns", constraint.constraint_type, constraint.name)),
        }
    }

    fn drop_constraint_clause(&self, constraint: &Constraint) -> String {
        let name = self.quote_identifier(&constraint.name);
        match constraint.constraint_type {
            ConstraintType::PrimaryKey => "DROP PRIMARY KEY".to_string(),
            ConstraintType::Unique => format!("DROP INDEX {}", name),
            ConstraintType::Check => format!("DROP CHECK {}", name),
            ConstraintType::ForeignKey => format!("DROP FOREIGN KEY {}", name),
        }
    }
}

impl SqlGenerator for MySqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn begin_transaction(&self) -> &'static str {
        "START TRANSACTION"
    }

    fn foreign_key_checks(&self) -> ForeignKeyChecks {
        ForeignKeyChecks::Toggle {
            off: "SET FOREIGN_KEY_CHECKS=0".to_string(),
            on: "SET FOREIGN_KEY_CHECKS=1".to_string(),
        }
    }

    fn create_table(&self, table: &Table, out: &mut AlterTableResult) {
        let mut lines: Vec<String> = table.columns.iter().map(|c| self.column_definition(c)).collect();

        let pk_columns = table.primary_key_columns();
        if !pk_columns.is_empty() {
            lines.push(format!("PRIMARY KEY {}", self.format_columns(&pk_columns)));
        }
        for constraint in &table.constraints {
            match constraint.constraint_type {
                ConstraintType::Unique => lines.push(format!(
                    "CONSTRAINT {} UNIQUE {}",
                    self.quote_identifier(&constraint.name),
                    self.format_columns(&constraint.columns)
                )),
                ConstraintType::Check if constraint.check_expression.trim().is_empty() => out.add_unresolved(format!(
                    "Check constraint {} on {} has no expression; skipped",
                    constraint.name, table.name
                )),
                ConstraintType::Check => lines.push(self.check_clause(constraint)),
                _ => {}
            }
        }

        let options: Vec<String> = table
            .option_map()
            .iter()
            .map(|(key, value)| self.option_assignment(key, value))
            .collect();
        let mut sql = format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote_identifier(&table.name),
            lines.join(",\n  ")
        );
        if !options.is_empty() {
            sql.push(' ');
            sql.push_str(&options.join(" "));
        }

        out.add(sql, format!("DROP TABLE {}", self.quote_identifier(&table.name)));
    }

    fn rename_table(&self, from: &str, to: &str, out: &mut AlterTableResult) {
        let (from, to) = (self.quote_identifier(from), self.quote_identifier(to));
        out.add(
            format!("RENAME TABLE {} TO {}", from, to),
            format!("RENAME TABLE {} TO {}", to, from),
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
        let is_comment = change.name == "COMMENT";
        if change.new.is_empty() && !is_comment {
            out.add_unresolved(format!(
                "Cannot reset table option {} on {}; set an explicit value instead",
                change.name, table
            ));
            return;
        }

        let up = self.alter(table, &self.option_assignment(&change.name, &change.new));
        let down = if change.old.is_empty() && !is_comment {
            format!(
                "-- cannot auto-rollback table option {} on {}",
                change.name,
                self.quote_identifier(table)
            )
        } else {
            self.alter(table, &self.option_assignment(&change.name, &change.old))
        };
        out.add(up, down);
    }

    fn rename_column(
        &self,
        table: &str,
        rename: &ColumnRename,
        _changes: &[FieldChange],
        out: &mut AlterTableResult,
    ) {
        // CHANGE COLUMN carries the full new definition, attributes included
        out.add(
            self.alter(
                table,
                &format!(
                    "CHANGE COLUMN {} {}",
                    self.quote_identifier(&rename.old.name),
                    self.column_definition(&rename.new)
                ),
            ),
            self.alter(
                table,
                &format!(
                    "CHANGE COLUMN {} {}",
                    self.quote_identifier(&rename.new.name),
                    self.column_definition(&rename.old)
                ),
            ),
        );
    }

    fn add_column(&self, table: &str, column: &Column, out: &mut AlterTableResult) {
        out.add(
            self.alter(table, &format!("ADD COLUMN {}", self.column_definition(column))),
            self.alter(table, &format!("DROP COLUMN {}", self.quote_identifier(&column.name))),
        );
    }

    fn modify_column(
        &self,
        table: &str,
        old: &Column,
        new: &Column,
        _changes: &[FieldChange],
        out: &mut AlterTableResult,
    ) {
        out.add(
            self.alter(table, &format!("MODIFY COLUMN {}", self.column_definition(new))),
            self.alter(table, &format!("MODIFY COLUMN {}", self.column_definition(old))),
        );
    }

    fn drop_column(&self, table: &str, column: &Column, out: &mut AlterTableResult) {
        out.add(
            self.alter(table, &format!("DROP COLUMN {}", self.quote_identifier(&column.name))),
            self.alter(table, &format!("ADD COLUMN {}", self.column_definition(column))),
        );
    }

    fn backup_column(
        &self,
        table: &str,
        column: &Column,
        backup: &str,
        out: &mut AlterTableResult,
    ) {
        // The parked column must not block inserts that no longer mention it
        let mut parked = column.clone();
        parked.name = backup.to_string();
        parked.nullable = true;
        parked.auto_increment = false;

        out.add(
            self.alter(
                table,
                &format!(
                    "CHANGE COLUMN {} {}",
                    self.quote_identifier(&column.name),
                    self.column_definition(&parked)
                ),
            ),
            self.alter(
                table,
                &format!(
                    "CHANGE COLUMN {} {}",
                    self.quote_identifier(backup),
                    self.column_definition(column)
                ),
            ),
        );
    }

    fn add_constraint(&self, table: &str, constraint: &Constraint, out: &mut AlterTableResult) {
        let clause = match self.add_constraint_clause(constraint) {
            Ok(clause) => clause,
            Err(reason) => {
                out.add_unresolved(format!("Cannot add constraint on {}: {}; skipped", table, reason));
                return;
            }
        };
        let up = self.alter(table, &clause);
        let down = self.alter(table, &self.drop_constraint_clause(constraint));

        if constraint.constraint_type == ConstraintType::ForeignKey {
            out.add_fk(up, down);
        } else {
            out.add(up, down);
        }
    }

    fn drop_constraint(&self, table: &str, constraint: &Constraint, out: &mut AlterTableResult) {
        let up = self.alter(table, &self.drop_constraint_clause(constraint));
        let down = match self.add_constraint_clause(constraint) {
            Ok(clause) => self.alter(table, &clause),
            Err(reason) => format!("-- cannot auto-rollback dropping constraint on {}: {}", table, reason),
        };
        out.add(up, down);
    }

    fn alter_constraint_enforcement(
        &self,
        table: &str,
        old: &Constraint,
        new: &Constraint,
        out: &mut AlterTableResult,
    ) {
        if new.constraint_type != ConstraintType::Check || old.enforced == new.enforced {
            out.add_unresolved(format!(
                "Cannot alter {} constraint {} on {} in place",
                new.constraint_type, new.name, table
            ));
            return;
        }
        let state = |enforced: bool| if enforced { "ENFORCED" } else { "NOT ENFORCED" };
        let name = self.quote_identifier(&new.name);
        out.add(
            self.alter(table, &format!("ALTER CHECK {} {}", name, state(new.enforced))),
            self.alter(table, &format!("ALTER CHECK {} {}", name, state(old.enforced))),
        );
    }

    fn create_index(&self, table: &str, index: &Index, out: &mut AlterTableResult) {
        match self.create_index_sql(table, index) {
            Ok(sql) => out.add(sql, self.drop_index_sql(table, index)),
            Err(reason) => out.add_unresolved(reason),
        }
    }

    fn drop_index(&self, table: &str, index: &Index, out: &mut AlterTableResult) {
        let down = self
            .create_index_sql(table, index)
            .unwrap_or_else(|reason| format!("-- cannot auto-rollback: {}", reason));
        out.add(self.drop_index_sql(table, index), down);
    }

    fn alter_index(
        &self,
        table: &str,
        old: &Index,
        new: &Index,
        changes: &[FieldChange],
        out: &mut AlterTableResult,
    ) {
        if changes.iter().any(|c| c.field == "comment") {
            // MySQL cannot change an index comment in place
            self.drop_index(table, old, out);
            self.create_index(table, new, out);
            return;
        }
        if changes.iter().any(|c| c.field == "visibility") {
            let name = self.quote_identifier(&new.name);
            out.add(
                self.alter(table, &format!("ALTER INDEX {} {}", name, new.visibility)),
                self.alter(table, &format!("ALTER INDEX {} {}", name, old.visibility)),
            );
        }
    }
}
