//! PostgreSQL migration generator

use crate::migration::{AlterTableResult, ForeignKeyChecks, SqlGenerator};
use crate::schema::diff::{ColumnRename, FieldChange, TableOptionChange};
use crate::schema::types::{
    Column, Constraint, ConstraintType, Dialect, Index, IndexType, IndexVisibility, SortOrder,
    Table,
};

/// PostgreSQL SQL generator
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresGenerator;

fn is_identity(column: &Column) -> bool {
    column.auto_increment || column.identity_seed.is_some() || column.identity_increment.is_some()
}

impl PostgresGenerator {
    pub fn new() -> Self {
        Self
    }

    fn identity_clause(&self, column: &Column) -> String {
        let mut clause = "GENERATED BY DEFAULT AS IDENTITY".to_string();
        if column.identity_seed.is_some() || column.identity_increment.is_some() {
            clause.push_str(&format!(
                " (START WITH {} INCREMENT BY {})",
                column.identity_seed.unwrap_or(1),
                column.identity_increment.unwrap_or(1)
            ));
        }
        clause
    }

    /// Column definition for CREATE TABLE and ADD COLUMN
    pub fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![self.quote_identifier(&column.name), column.type_raw.trim().to_string()];

        if !column.collate.trim().is_empty() {
            parts.push(format!("COLLATE {}", self.quote_identifier(column.collate.trim())));
        }
        if column.is_generated {
            parts.push(format!("GENERATED ALWAYS AS ({}) STORED", column.generation_expression.trim()));
        } else if is_identity(column) {
            parts.push(self.identity_clause(column));
        }
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if !column.is_generated && !is_identity(column) {
            if let Some(default) = &column.default_value {
                parts.push(format!("DEFAULT {}", self.format_value(default)));
            }
        }

        parts.join(" ")
    }

    /// Notes for column attributes PostgreSQL cannot carry
    fn column_caveats(&self, table: &str, column: &Column, out: &mut AlterTableResult) {
        if !column.charset.trim().is_empty() {
            out.add_note(format!(
                "PostgreSQL has no column character sets; charset {} of {}.{} ignored",
                column.charset.trim(),
                table,
                column.name
            ));
        }
        if column.on_update.is_some() {
            out.add_unresolved(format!(
                "PostgreSQL has no ON UPDATE clause; add a trigger for {}.{}",
                table, column.name
            ));
        }
    }

    fn alter(&self, table: &str, clause: &str) -> String {
        format!("ALTER TABLE {} {}", self.quote_identifier(table), clause)
    }

    fn alter_column(&self, table: &str, column: &str, clause: &str) -> String {
        self.alter(table, &format!("ALTER COLUMN {} {}", self.quote_identifier(column), clause))
    }

    fn comment_literal(&self, comment: &str) -> String {
        if comment.is_empty() {
            "NULL".to_string()
        } else {
            self.quote_string(comment)
        }
    }

    fn column_comment(&self, table: &str, column: &str, comment: &str) -> String {
        format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            self.comment_literal(comment)
        )
    }

    fn table_comment(&self, table: &str, comment: &str) -> String {
        format!(
            "COMMENT ON TABLE {} IS {}",
            self.quote_identifier(table),
            self.comment_literal(comment)
        )
    }

    fn index_comment(&self, index: &str, comment: &str) -> String {
        format!(
            "COMMENT ON INDEX {} IS {}",
            self.quote_identifier(index),
            self.comment_literal(comment)
        )
    }

    fn type_with_collation(&self, column: &Column) -> String {
        let mut ty = column.type_raw.trim().to_string();
        if !column.collate.trim().is_empty() {
            ty.push_str(&format!(" COLLATE {}", self.quote_identifier(column.collate.trim())));
        }
        ty
    }

    /// ALTER COLUMN steps that move `old` to `new`; `new.name` is the current name
    fn alter_column_steps(
        &self,
        table: &str,
        old: &Column,
        new: &Column,
        changes: &[FieldChange],
        out: &mut AlterTableResult,
    ) {
        let name = &new.name;
        let quoted = self.quote_identifier(name);
        let has = |field: &str| changes.iter().any(|c| c.field == field);

        if has("type") || has("collate") {
            let using = |column: &Column| {
                if has("type") {
                    format!(" USING {}::{}", quoted, column.type_raw.trim())
                } else {
                    String::new()
                }
            };
            out.add(
                self.alter_column(table, name, &format!("TYPE {}{}", self.type_with_collation(new), using(new))),
                self.alter_column(table, name, &format!("TYPE {}{}", self.type_with_collation(old), using(old))),
            );
        }

        if has("auto_increment") || has("identity") {
            match (is_identity(old), is_identity(new)) {
                (false, true) => out.add(
                    self.alter_column(table, name, &format!("ADD {}", self.identity_clause(new))),
                    self.alter_column(table, name, "DROP IDENTITY IF EXISTS"),
                ),
                (true, false) => out.add(
                    self.alter_column(table, name, "DROP IDENTITY IF EXISTS"),
                    self.alter_column(table, name, &format!("ADD {}", self.identity_clause(old))),
                ),
                (true, true) => {
                    let sequence = |column: &Column| {
                        format!(
                            "SET START WITH {} SET INCREMENT BY {}",
                            column.identity_seed.unwrap_or(1),
                            column.identity_increment.unwrap_or(1)
                        )
                    };
                    out.add(
                        self.alter_column(table, name, &sequence(new)),
                        self.alter_column(table, name, &sequence(old)),
                    );
                }
                (false, false) => {}
            }
        }

        if has("nullable") {
            let state = |column: &Column| if column.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
            out.add(
                self.alter_column(table, name, state(new)),
                self.alter_column(table, name, state(old)),
            );
        }

        if has("default") {
            let state = |column: &Column| match &column.default_value {
                Some(value) => format!("SET DEFAULT {}", self.format_value(value)),
                None => "DROP DEFAULT".to_string(),
            };
            out.add(
                self.alter_column(table, name, &state(new)),
                self.alter_column(table, name, &state(old)),
            );
        }

        if has("comment") {
            out.add(
                self.column_comment(table, name, &new.comment),
                self.column_comment(table, name, &old.comment),
            );
        }

        if has("charset") {
            out.add_note(format!(
                "PostgreSQL has no column character sets; charset change on {}.{} ignored",
                table, name
            ));
        }

        let unsupported: Vec<&str> = changes
            .iter()
            .map(|c| c.field.as_str())
            .filter(|f| matches!(*f, "on_update" | "generated" | "generation_expression" | "generation_storage"))
            .collect();
        if !unsupported.is_empty() {
            out.add_unresolved(format!(
                "Cannot change {} of {}.{} in place on PostgreSQL; recreate the column manually",
                unsupported.join(", "),
                table,
                name
            ));
        }
    }

    fn constraint_name(&self, table: &str, constraint: &Constraint) -> String {
        if constraint.name.trim().is_empty() && constraint.constraint_type == ConstraintType::PrimaryKey {
            format!("{}_pkey", table)
        } else {
            constraint.name.clone()
        }
    }

    fn constraint_clause(&self, table: &str, constraint: &Constraint) -> Result<String, String> {
        let name = self.quote_identifier(&self.constraint_name(table, constraint));
        let columns = self.format_columns(&constraint.columns);
        match constraint.constraint_type {
            ConstraintType::PrimaryKey | ConstraintType::Unique if constraint.columns.is_empty() => Err(format!(
                "{} constraint {} has no columns",
                constraint.constraint_type, constraint.name
            )),
            ConstraintType::PrimaryKey => Ok(format!("CONSTRAINT {} PRIMARY KEY {}", name, columns)),
            ConstraintType::Unique => Ok(format!("CONSTRAINT {} UNIQUE {}", name, columns)),
            ConstraintType::Check if constraint.check_expression.trim().is_empty() => {
                Err(format!("check constraint {} has no expression", constraint.name))
            }
            ConstraintType::Check => Ok(format!(
                "CONSTRAINT {} CHECK ({})",
                name,
                constraint.check_expression.trim()
            )),
            ConstraintType::ForeignKey
                if constraint.columns.is_empty() || constraint.referenced_table.trim().is_empty() =>
            {
                Err(format!(
                    "foreign key {} is missing its columns or referenced table",
                    constraint.name
                ))
            }
            ConstraintType::ForeignKey => {
                let mut clause = format!(
                    "CONSTRAINT {} FOREIGN KEY {} REFERENCES {} {}",
                    name,
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
                Ok(clause)
            }
        }
    }

    fn drop_constraint_sql(&self, table: &str, constraint: &Constraint) -> String {
        self.alter(
            table,
            &format!(
                "DROP CONSTRAINT {}",
                self.quote_identifier(&self.constraint_name(table, constraint))
            ),
        )
    }

    fn create_index_sql(&self, table: &str, index: &Index) -> Result<String, String> {
        let method = match index.index_type {
            IndexType::Btree => "",
            IndexType::Hash => " USING hash",
            IndexType::Gin => " USING gin",
            IndexType::Gist => " USING gist",
            IndexType::Fulltext | IndexType::Spatial => {
                return Err(format!(
                    "PostgreSQL has no {} indexes; index {} on {} skipped, use gin or gist instead",
                    index.index_type, index.name, table
                ))
            }
        };
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

        Ok(format!(
            "CREATE {}INDEX {} ON {}{} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            method,
            columns.join(", ")
        ))
    }

    fn drop_index_sql(&self, index: &Index) -> String {
        format!("DROP INDEX {}", self.quote_identifier(&index.name))
    }
}

impl SqlGenerator for PostgresGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn format_value(&self, value: &str) -> String {
        crate::migration::format_literal(value, |s| self.quote_string(s), true)
    }

    fn foreign_key_checks(&self) -> ForeignKeyChecks {
        ForeignKeyChecks::Deferred("SET CONSTRAINTS ALL DEFERRED".to_string())
    }

    fn create_table(&self, table: &Table, out: &mut AlterTableResult) {
        let mut lines: Vec<String> = Vec::new();
        for column in &table.columns {
            self.column_caveats(&table.name, column, out);
            lines.push(self.column_definition(column));
        }

        let pk_columns = table.primary_key_columns();
        if !pk_columns.is_empty() {
            let name = table
                .primary_key()
                .map(|pk| self.constraint_name(&table.name, pk))
                .unwrap_or_else(|| format!("{}_pkey", table.name));
            lines.push(format!(
                "CONSTRAINT {} PRIMARY KEY {}",
                self.quote_identifier(&name),
                self.format_columns(&pk_columns)
            ));
        }
        for constraint in &table.constraints {
            match constraint.constraint_type {
                ConstraintType::Unique | ConstraintType::Check => match self.constraint_clause(&table.name, constraint) {
                    Ok(clause) => lines.push(clause),
                    Err(reason) => out.add_unresolved(format!("Cannot create {}: {}; skipped", table.name, reason)),
                },
                _ => {}
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

        for (key, value) in table.option_map() {
            if key == "COMMENT" {
                out.add(self.table_comment(&table.name, &value), "");
            } else {
                out.add_note(format!(
                    "Table option {} on {} has no PostgreSQL equivalent; ignored",
                    key, table.name
                ));
            }
        }
        for column in table.columns.iter().filter(|c| !c.comment.is_empty()) {
            out.add(self.column_comment(&table.name, &column.name, &column.comment), "");
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
            out.add(self.table_comment(table, &change.new), self.table_comment(table, &change.old));
        } else {
            out.add_unresolved(format!(
                "Table option {} on {} has no PostgreSQL equivalent",
                change.name, table
            ));
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
        self.alter_column_steps(table, &rename.old, &rename.new, changes, out);
    }

    fn add_column(&self, table: &str, column: &Column, out: &mut AlterTableResult) {
        self.column_caveats(table, column, out);
        out.add(
            self.alter(table, &format!("ADD COLUMN {}", self.column_definition(column))),
            self.alter(table, &format!("DROP COLUMN {}", self.quote_identifier(&column.name))),
        );
        if !column.comment.is_empty() {
            out.add(self.column_comment(table, &column.name, &column.comment), "");
        }
    }

    fn modify_column(
        &self,
        table: &str,
        old: &Column,
        new: &Column,
        changes: &[FieldChange],
        out: &mut AlterTableResult,
    ) {
        self.alter_column_steps(table, old, new, changes, out);
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
        let original = self.quote_identifier(&column.name);
        let parked = self.quote_identifier(backup);
        out.add(
            self.alter(table, &format!("RENAME COLUMN {} TO {}", original, parked)),
            self.alter(table, &format!("RENAME COLUMN {} TO {}", parked, original)),
        );
        if is_identity(column) && !column.is_generated {
            out.add(
                self.alter_column(table, backup, "DROP IDENTITY IF EXISTS"),
                self.alter_column(table, backup, &format!("ADD {}", self.identity_clause(column))),
            );
        }
        if !column.nullable {
            out.add(
                self.alter_column(table, backup, "DROP NOT NULL"),
                self.alter_column(table, backup, "SET NOT NULL"),
            );
        }
    }

    fn add_constraint(&self, table: &str, constraint: &Constraint, out: &mut AlterTableResult) {
        let clause = match self.constraint_clause(table, constraint) {
            Ok(clause) => clause,
            Err(reason) => {
                out.add_unresolved(format!("Cannot add constraint on {}: {}; skipped", table, reason));
                return;
            }
        };
        if constraint.constraint_type == ConstraintType::Check && !constraint.enforced {
            out.add_note(format!(
                "PostgreSQL always enforces checks; {} on {} is created enforced",
                constraint.name, table
            ));
        }

        let up = self.alter(table, &format!("ADD {}", clause));
        let down = self.drop_constraint_sql(table, constraint);
        if constraint.constraint_type == ConstraintType::ForeignKey {
            out.add_fk(up, down);
        } else {
            out.add(up, down);
        }
    }

    fn drop_constraint(&self, table: &str, constraint: &Constraint, out: &mut AlterTableResult) {
        let down = match self.constraint_clause(table, constraint) {
            Ok(clause) => self.alter(table, &format!("ADD {}", clause)),
            Err(reason) => format!("-- cannot auto-rollback dropping constraint on {}: {}", table, reason),
        };
        out.add(self.drop_constraint_sql(table, constraint), down);
    }

    fn alter_constraint_enforcement(
        &self,
        table: &str,
        _old: &Constraint,
        new: &Constraint,
        out: &mut AlterTableResult,
    ) {
        out.add_unresolved(format!(
            "PostgreSQL cannot toggle enforcement of {} on {}; drop and recreate it manually",
            new.name, table
        ));
    }

    fn create_index(&self, table: &str, index: &Index, out: &mut AlterTableResult) {
        let sql = match self.create_index_sql(table, index) {
            Ok(sql) => sql,
            Err(reason) => {
                out.add_unresolved(reason);
                return;
            }
        };
        if index.columns.iter().any(|c| c.length.is_some()) {
            out.add_note(format!(
                "PostgreSQL has no prefix indexes; index {} on {} covers whole columns",
                index.name, table
            ));
        }
        if index.visibility == IndexVisibility::Invisible {
            out.add_note(format!(
                "PostgreSQL has no invisible indexes; index {} on {} is created visible",
                index.name, table
            ));
        }

        out.add(sql, self.drop_index_sql(index));
        if !index.comment.is_empty() {
            out.add(self.index_comment(&index.name, &index.comment), "");
        }
    }

    fn drop_index(&self, table: &str, index: &Index, out: &mut AlterTableResult) {
        let down = self
            .create_index_sql(table, index)
            .unwrap_or_else(|reason| format!("-- cannot auto-rollback: {}", reason));
        out.add(self.drop_index_sql(index), down);
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
            out.add(
                self.index_comment(&new.name, &new.comment),
                self.index_comment(&old.name, &old.comment),
            );
        }
        if changes.iter().any(|c| c.field == "visibility") {
            out.add_unresolved(format!(
                "PostgreSQL has no invisible indexes; visibility change of {} on {} skipped",
                new.name, table
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{MigrationOptions, TransactionMode};
    use crate::schema::diff::{column_changes, SchemaDiff};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn run(f: impl FnOnce(&PostgresGenerator, &mut AlterTableResult)) -> AlterTableResult {
        let mut out = AlterTableResult::default();
        f(&PostgresGenerator::new(), &mut out);
        out
    }

    #[rstest]
    #[case("hello", "'hello'")]
    #[case("it's", "'it''s'")]
    #[case("now()", "now()")]
    #[case("'{}'::jsonb", "'{}'::jsonb")]
    #[case("0", "0")]
    fn test_format_value(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(PostgresGenerator::new().format_value(input), expected);
    }

    #[test]
    fn test_column_definitions() {
        let gen = PostgresGenerator::new();

        let mut id = Column::new("id", "BIGINT").not_null();
        id.auto_increment = true;
        assert_eq!(gen.column_definition(&id), "\"id\" BIGINT GENERATED BY DEFAULT AS IDENTITY NOT NULL");

        id.identity_seed = Some(100);
        assert_eq!(
            gen.column_definition(&id),
            "\"id\" BIGINT GENERATED BY DEFAULT AS IDENTITY (START WITH 100 INCREMENT BY 1) NOT NULL"
        );

        let mut name = Column::new("name", "TEXT").not_null().with_default("anon");
        name.collate = "C".to_string();
        assert_eq!(gen.column_definition(&name), "\"name\" TEXT COLLATE \"C\" NOT NULL DEFAULT 'anon'");

        let mut total = Column::new("total", "NUMERIC");
        total.is_generated = true;
        total.generation_expression = "price * qty".to_string();
        assert_eq!(gen.column_definition(&total), "\"total\" NUMERIC GENERATED ALWAYS AS (price * qty) STORED");
    }

    #[test]
    fn test_modify_column_steps() {
        let old = Column::new("age", "INT").with_comment("years");
        let new = Column::new("age", "BIGINT").not_null().with_default("0");
        let changes = column_changes(&old, &new);
        let out = run(|g, out| g.modify_column("people", &old, &new, &changes, out));

        assert_eq!(
            out.statements,
            vec![
                "ALTER TABLE \"people\" ALTER COLUMN \"age\" TYPE BIGINT USING \"age\"::BIGINT",
                "ALTER TABLE \"people\" ALTER COLUMN \"age\" SET NOT NULL",
                "ALTER TABLE \"people\" ALTER COLUMN \"age\" SET DEFAULT 0",
                "COMMENT ON COLUMN \"people\".\"age\" IS NULL",
            ]
        );
        assert_eq!(
            out.rollback,
            vec![
                "ALTER TABLE \"people\" ALTER COLUMN \"age\" TYPE INT USING \"age\"::INT",
                "ALTER TABLE \"people\" ALTER COLUMN \"age\" DROP NOT NULL",
                "ALTER TABLE \"people\" ALTER COLUMN \"age\" DROP DEFAULT",
                "COMMENT ON COLUMN \"people\".\"age\" IS 'years'",
            ]
        );
    }

    #[test]
    fn test_identity_toggle() {
        let old = Column::new("id", "INT").not_null();
        let mut new = old.clone();
        new.auto_increment = true;
        let changes = column_changes(&old, &new);
        let out = run(|g, out| g.modify_column("t", &old, &new, &changes, out));
        assert_eq!(
            out.statements,
            vec!["ALTER TABLE \"t\" ALTER COLUMN \"id\" ADD GENERATED BY DEFAULT AS IDENTITY"]
        );
        assert_eq!(out.rollback, vec!["ALTER TABLE \"t\" ALTER COLUMN \"id\" DROP IDENTITY IF EXISTS"]);
    }

    #[test]
    fn test_generation_changes_are_unresolved() {
        let old = Column::new("total", "INT");
        let mut new = old.clone();
        new.is_generated = true;
        new.generation_expression = "a + b".to_string();
        let changes = column_changes(&old, &new);
        let out = run(|g, out| g.modify_column("t", &old, &new, &changes, out));
        assert!(out.statements.is_empty());
        assert_eq!(out.unresolved.len(), 1);
        assert!(out.unresolved[0].contains("generation_expression"));
    }

    #[test]
    fn test_rename_then_alter() {
        let rename = ColumnRename {
            old: Column::new("user_identifier", "INT"),
            new: Column::new("user_id", "INT").not_null(),
            score: 12,
        };
        let changes = column_changes(&rename.old, &rename.new);
        let out = run(|g, out| g.rename_column("orders", &rename, &changes, out));
        assert_eq!(
            out.statements,
            vec![
                "ALTER TABLE \"orders\" RENAME COLUMN \"user_identifier\" TO \"user_id\"",
                "ALTER TABLE \"orders\" ALTER COLUMN \"user_id\" SET NOT NULL",
            ]
        );
    }

    #[test]
    fn test_backup_column() {
        let column = Column::new("legacy", "TEXT").not_null();
        let out = run(|g, out| g.backup_column("t", &column, "__smf_backup_1_legacy", out));
        assert_eq!(
            out.statements,
            vec![
                "ALTER TABLE \"t\" RENAME COLUMN \"legacy\" TO \"__smf_backup_1_legacy\"",
                "ALTER TABLE \"t\" ALTER COLUMN \"__smf_backup_1_legacy\" DROP NOT NULL",
            ]
        );
        assert_eq!(out.rollback[0], "ALTER TABLE \"t\" RENAME COLUMN \"__smf_backup_1_legacy\" TO \"legacy\"");
    }

    #[test]
    fn test_constraints() {
        let pk = Constraint::new("", ConstraintType::PrimaryKey, &["id"]);
        let out = run(|g, out| g.add_constraint("users", &pk, out));
        assert_eq!(
            out.statements,
            vec!["ALTER TABLE \"users\" ADD CONSTRAINT \"users_pkey\" PRIMARY KEY (\"id\")"]
        );
        assert_eq!(out.rollback, vec!["ALTER TABLE \"users\" DROP CONSTRAINT \"users_pkey\""]);

        let fk = Constraint::new("fk_user", ConstraintType::ForeignKey, &["user_id"]).references("users", &["id"]);
        let out = run(|g, out| g.add_constraint("orders", &fk, out));
        assert_eq!(
            out.fk_statements,
            vec!["ALTER TABLE \"orders\" ADD CONSTRAINT \"fk_user\" FOREIGN KEY (\"user_id\") REFERENCES \"users\" (\"id\")"]
        );

        let out = run(|g, out| g.alter_constraint_enforcement("t", &fk, &fk, out));
        assert_eq!(out.unresolved.len(), 1);
    }

    #[test]
    fn test_indexes() {
        let mut index = Index::new("idx_tags", &["tags"]);
        index.index_type = IndexType::Gin;
        index.comment = "search".to_string();
        let out = run(|g, out| g.create_index("docs", &index, out));
        assert_eq!(
            out.statements,
            vec![
                "CREATE INDEX \"idx_tags\" ON \"docs\" USING gin (\"tags\")",
                "COMMENT ON INDEX \"idx_tags\" IS 'search'",
            ]
        );
        assert_eq!(out.rollback, vec!["DROP INDEX \"idx_tags\""]);

        let mut prefixed = Index::new("idx_name", &["name"]).unique();
        prefixed.columns[0].length = Some(10);
        let out = run(|g, out| g.create_index("docs", &prefixed, out));
        assert_eq!(out.statements, vec!["CREATE UNIQUE INDEX \"idx_name\" ON \"docs\" (\"name\")"]);
        assert_eq!(out.notes.len(), 1);

        let mut fulltext = Index::new("ft_body", &["body"]);
        fulltext.index_type = IndexType::Fulltext;
        let out = run(|g, out| g.create_index("docs", &fulltext, out));
        assert!(out.statements.is_empty());
        assert_eq!(out.unresolved.len(), 1);
    }

    #[test]
    fn test_create_table_with_comments() {
        let mut table = Table::new("users")
            .with_column(Column::new("id", "BIGINT").not_null().with_comment("key"))
            .with_constraint(Constraint::new("pk_users", ConstraintType::PrimaryKey, &["id"]))
            .with_option("ENGINE", "InnoDB");
        table.comment = "people".to_string();

        let out = run(|g, out| g.create_table(&table, out));
        assert_eq!(
            out.statements,
            vec![
                "CREATE TABLE \"users\" (\n  \"id\" BIGINT NOT NULL,\n  CONSTRAINT \"pk_users\" PRIMARY KEY (\"id\")\n)",
                "COMMENT ON TABLE \"users\" IS 'people'",
                "COMMENT ON COLUMN \"users\".\"id\" IS 'key'",
            ]
        );
        assert_eq!(out.rollback, vec!["DROP TABLE \"users\""]);
        assert!(out.notes[0].contains("ENGINE"));
    }

    #[test]
    fn test_deferred_constraints_inside_transaction() {
        let users = Table::new("users").with_column(Column::new("id", "INT").not_null());
        let orders = Table::new("orders")
            .with_column(Column::new("user_id", "INT"))
            .with_constraint(
                Constraint::new("fk_orders_user", ConstraintType::ForeignKey, &["user_id"]).references("users", &["id"]),
            );
        let diff = SchemaDiff {
            added_tables: vec![orders, users],
            ..Default::default()
        };
        let options = MigrationOptions::new(Dialect::PostgreSql)
            .transaction_mode(TransactionMode::Single)
            .with_run_id("20240101120000_beef");

        let migration = PostgresGenerator::new().generate_migration(&diff, &options);
        assert_eq!(migration.statements[0], "BEGIN");
        assert_eq!(migration.statements[1], "SET CONSTRAINTS ALL DEFERRED");
        assert_eq!(migration.statements.last().map(String::as_str), Some("COMMIT"));
        assert!(migration.statements.iter().any(|s| s.contains("FOREIGN KEY")));
    }
}
