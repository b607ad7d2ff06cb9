//! Migration generation
//!
//! Turns a [`SchemaDiff`] into an ordered, reversible SQL script for one
//! dialect. The ordering and safety rules live in [`planner`]; each dialect
//! module only knows how to spell individual statements.

pub mod mysql;
pub mod planner;
pub mod postgres;
pub mod sqlite;

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::config::NamingConfig;
use crate::error::Error;
use crate::schema::diff::{ColumnRename, FieldChange, SchemaDiff, TableOptionChange};
use crate::schema::types::{Column, Constraint, Dialect, Index, Table};

pub use mysql::MySqlGenerator;
pub use planner::AlterTableResult;
pub use postgres::PostgresGenerator;
pub use sqlite::SqliteGenerator;

/// How generated statements are grouped into transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    None,
    #[default]
    Single,
    PerStatement,
}

impl FromStr for TransactionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "none" => Ok(TransactionMode::None),
            "single" => Ok(TransactionMode::Single),
            "per_statement" => Ok(TransactionMode::PerStatement),
            other => Err(Error::ConfigError(format!("Unknown transaction mode: {}", other))),
        }
    }
}

/// Options for a single generation run
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOptions {
    pub dialect: Dialect,
    pub include_drops: bool,
    pub include_unsafe: bool,
    pub transaction_mode: TransactionMode,
    pub preserve_foreign_keys: bool,
    pub defer_foreign_key_check: bool,
    pub backup_prefix: String,
    pub naming: NamingConfig,
    /// Distinguishes backup names between runs
    pub run_id: String,
}

impl MigrationOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            include_drops: true,
            include_unsafe: false,
            transaction_mode: TransactionMode::Single,
            preserve_foreign_keys: true,
            defer_foreign_key_check: true,
            backup_prefix: "__smf_backup_".to_string(),
            naming: NamingConfig::default(),
            run_id: generate_run_id(),
        }
    }

    pub fn include_drops(mut self, include: bool) -> Self {
        self.include_drops = include;
        self
    }

    pub fn include_unsafe(mut self, include: bool) -> Self {
        self.include_unsafe = include;
        self
    }

    pub fn transaction_mode(mut self, mode: TransactionMode) -> Self {
        self.transaction_mode = mode;
        self
    }

    pub fn preserve_foreign_keys(mut self, preserve: bool) -> Self {
        self.preserve_foreign_keys = preserve;
        self
    }

    pub fn defer_foreign_key_check(mut self, defer: bool) -> Self {
        self.defer_foreign_key_check = defer;
        self
    }

    pub fn backup_prefix(mut self, prefix: &str) -> Self {
        self.backup_prefix = prefix.to_string();
        self
    }

    pub fn naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }

    /// Pin the run id, e.g. for reproducible output
    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self::new(Dialect::default())
    }
}

/// UTC timestamp plus a short random suffix
pub fn generate_run_id() -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("{}_{:04x}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}

/// A generated migration script
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Migration {
    pub statements: Vec<String>,
    /// Inverse statements in forward order; applied in reverse
    pub rollback: Vec<String>,
    pub breaking: Vec<String>,
    pub notes: Vec<String>,
    pub unresolved: Vec<String>,
}

fn clean_statement(statement: &str) -> String {
    statement.trim().trim_end_matches(';').trim_end().to_string()
}

impl Migration {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn add_statement(&mut self, statement: &str) {
        let statement = clean_statement(statement);
        if !statement.is_empty() {
            self.statements.push(statement);
        }
    }

    pub fn add_rollback(&mut self, statement: &str) {
        let statement = clean_statement(statement);
        if !statement.is_empty() {
            self.rollback.push(statement);
        }
    }

    pub fn add_statement_with_rollback(&mut self, up: &str, down: &str) {
        self.add_statement(up);
        self.add_rollback(down);
    }

    pub fn add_breaking(&mut self, message: &str) {
        push_trimmed(&mut self.breaking, message);
    }

    pub fn add_note(&mut self, message: &str) {
        push_trimmed(&mut self.notes, message);
    }

    pub fn add_unresolved(&mut self, message: &str) {
        push_trimmed(&mut self.unresolved, message);
    }

    /// Drop repeated notes, findings, unresolved items and rollback lines
    pub fn dedupe(&mut self) {
        dedupe_list(&mut self.breaking);
        dedupe_list(&mut self.notes);
        dedupe_list(&mut self.unresolved);
        dedupe_list(&mut self.rollback);
    }

    /// Rollback as an executable script, last change undone first
    pub fn rollback_string(&self) -> String {
        let mut out = String::from("-- schemift rollback\n");
        for statement in self.rollback.iter().rev() {
            out.push_str(&terminate(statement));
            out.push('\n');
        }
        out
    }
}

fn push_trimmed(list: &mut Vec<String>, message: &str) {
    let message = message.trim();
    if !message.is_empty() {
        list.push(message.to_string());
    }
}

fn dedupe_list(list: &mut Vec<String>) {
    let mut seen = HashSet::new();
    list.retain(|item| seen.insert(item.trim().to_string()));
}

fn terminate(statement: &str) -> String {
    if statement.starts_with("--") {
        statement.to_string()
    } else {
        format!("{};", statement)
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "-- {}", title)?;
    for item in items {
        for (i, line) in item.lines().enumerate() {
            if i == 0 {
                writeln!(f, "-- - {}", line)?;
            } else {
                writeln!(f, "--   {}", line)?;
            }
        }
    }
    writeln!(f)
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- schemift migration")?;
        writeln!(f, "-- Review before running in production.")?;
        writeln!(f)?;

        write_section(f, "BREAKING CHANGES (manual review required)", &self.breaking)?;
        write_section(f, "UNRESOLVED (cannot auto-generate safely)", &self.unresolved)?;
        write_section(f, "NOTES", &self.notes)?;

        if self.statements.is_empty() {
            writeln!(f, "-- No SQL statements generated.")?;
        } else {
            writeln!(f, "-- SQL")?;
            for statement in &self.statements {
                writeln!(f, "{}", terminate(statement))?;
            }
        }

        if !self.rollback.is_empty() {
            writeln!(f)?;
            writeln!(f, "-- ROLLBACK SQL (run separately)")?;
            for statement in self.rollback.iter().rev() {
                for line in terminate(statement).lines() {
                    if line.starts_with("--") {
                        writeln!(f, "{}", line)?;
                    } else {
                        writeln!(f, "-- {}", line)?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// How a dialect keeps foreign keys from failing mid-script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignKeyChecks {
    /// Session switch placed around the whole script
    Toggle { off: String, on: String },
    /// Statement placed at the start of the transaction
    Deferred(String),
}

/// SQL generation for one dialect
///
/// The first group of methods is the public capability set. The remaining
/// methods spell single DDL changes into an [`AlterTableResult`]; they are
/// driven by [`planner::plan`], which owns ordering and safety. A change a
/// dialect cannot express is recorded with [`AlterTableResult::add_unresolved`].
pub trait SqlGenerator {
    fn dialect(&self) -> Dialect;

    fn quote_identifier(&self, name: &str) -> String;

    fn quote_string(&self, value: &str) -> String;

    /// Render a default or literal value
    fn format_value(&self, value: &str) -> String {
        format_literal(value, |s| self.quote_string(s), false)
    }

    /// Generate the full migration for a diff
    fn generate_migration(&self, diff: &SchemaDiff, options: &MigrationOptions) -> Migration {
        planner::plan(self, diff, options)
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN"
    }

    fn foreign_key_checks(&self) -> ForeignKeyChecks;

    /// Whether CREATE TABLE must carry its foreign keys inline
    fn inline_foreign_keys(&self) -> bool {
        false
    }

    /// Comma-separated quoted column list in parentheses, blanks skipped
    fn format_columns(&self, columns: &[String]) -> String {
        let quoted: Vec<String> = columns
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| self.quote_identifier(c))
            .collect();
        format!("({})", quoted.join(", "))
    }

    fn create_table(&self, table: &Table, out: &mut AlterTableResult);
    fn rename_table(&self, from: &str, to: &str, out: &mut AlterTableResult);
    fn drop_table(&self, table: &Table, out: &mut AlterTableResult);

    fn change_option(&self, table: &str, change: &TableOptionChange, out: &mut AlterTableResult);

    fn rename_column(
        &self,
        table: &str,
        rename: &ColumnRename,
        changes: &[FieldChange],
        out: &mut AlterTableResult,
    );
    fn add_column(&self, table: &str, column: &Column, out: &mut AlterTableResult);
    fn modify_column(
        &self,
        table: &str,
        old: &Column,
        new: &Column,
        changes: &[FieldChange],
        out: &mut AlterTableResult,
    );
    fn drop_column(&self, table: &str, column: &Column, out: &mut AlterTableResult);
    /// Move a column aside instead of dropping it
    fn backup_column(&self, table: &str, column: &Column, backup: &str, out: &mut AlterTableResult);

    fn add_constraint(&self, table: &str, constraint: &Constraint, out: &mut AlterTableResult);
    fn drop_constraint(&self, table: &str, constraint: &Constraint, out: &mut AlterTableResult);
    fn alter_constraint_enforcement(
        &self,
        table: &str,
        old: &Constraint,
        new: &Constraint,
        out: &mut AlterTableResult,
    );

    fn create_index(&self, table: &str, index: &Index, out: &mut AlterTableResult);
    fn drop_index(&self, table: &str, index: &Index, out: &mut AlterTableResult);
    /// Visibility and comment changes that need no rebuild
    fn alter_index(
        &self,
        table: &str,
        old: &Index,
        new: &Index,
        changes: &[FieldChange],
        out: &mut AlterTableResult,
    );
}

/// Pick the generator for a dialect
pub fn generator_for(dialect: Dialect) -> Box<dyn SqlGenerator> {
    match dialect {
        Dialect::MySql => Box::new(MySqlGenerator::new()),
        Dialect::PostgreSql => Box::new(PostgresGenerator::new()),
        Dialect::Sqlite => Box::new(SqliteGenerator::new()),
    }
}

static KEYWORD_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(NULL|TRUE|FALSE|CURRENT_TIMESTAMP|CURRENT_DATE|CURRENT_TIME|LOCALTIME|LOCALTIMESTAMP)(\s*\(\s*\d*\s*\))?$",
    )
    .expect("keyword literal pattern is valid")
});

static NUMERIC_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("numeric literal pattern is valid")
});

static FUNCTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*\(").expect("function name pattern is valid"));

/// Scan an expression for statement separators, unterminated quotes and
/// unbalanced parentheses. On success, returns where the first top-level
/// parenthesis group closes.
fn scan_expression(value: &str) -> Option<Option<usize>> {
    let mut in_quote = false;
    let mut depth = 0usize;
    let mut first_close = None;
    for (i, c) in value.char_indices() {
        match c {
            ';' => return None,
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.checked_sub(1)?;
                if depth == 0 && first_close.is_none() {
                    first_close = Some(i);
                }
            }
            _ => {}
        }
    }
    if in_quote || depth != 0 {
        return None;
    }
    Some(first_close)
}

/// The first parenthesis group is well formed and closes on the last character
fn is_single_group(value: &str) -> bool {
    value.ends_with(')') && scan_expression(value) == Some(Some(value.len() - 1))
}

/// `'...'` with every inner quote doubled
fn is_quoted_literal(value: &str) -> bool {
    value.len() >= 2
        && value.starts_with('\'')
        && value.ends_with('\'')
        && !value[1..value.len() - 1].replace("''", "").contains('\'')
}

/// Classify a literal and render it, quoting with `quote` when it is plain text
pub fn format_literal(value: &str, quote: impl Fn(&str) -> String, allow_casts: bool) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "''".to_string();
    }
    if KEYWORD_LITERAL.is_match(trimmed) {
        return trimmed.to_uppercase();
    }
    if NUMERIC_LITERAL.is_match(trimmed) || is_quoted_literal(trimmed) {
        return trimmed.to_string();
    }
    if (FUNCTION_NAME.is_match(trimmed) || trimmed.starts_with('(')) && is_single_group(trimmed) {
        return trimmed.to_string();
    }
    if allow_casts && trimmed.contains("::") && scan_expression(trimmed).is_some() {
        return trimmed.to_string();
    }
    quote(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    #[rstest]
    #[case("", "''")]
    #[case("   ", "''")]
    #[case("null", "NULL")]
    #[case("Null", "NULL")]
    #[case("true", "TRUE")]
    #[case("current_timestamp", "CURRENT_TIMESTAMP")]
    #[case("current_timestamp(3)", "CURRENT_TIMESTAMP(3)")]
    #[case("CURRENT_DATE", "CURRENT_DATE")]
    #[case("42", "42")]
    #[case("-1", "-1")]
    #[case("3.14", "3.14")]
    #[case("1e10", "1e10")]
    #[case("NOW()", "NOW()")]
    #[case("CONCAT('a', 'b')", "CONCAT('a', 'b')")]
    #[case("(1 + 2)", "(1 + 2)")]
    #[case("'quoted'", "'quoted'")]
    #[case("hello world", "'hello world'")]
    #[case("test@example.com", "'test@example.com'")]
    #[case("it's", "'it''s'")]
    #[case("pending (manual)", "'pending (manual)'")]
    #[case("a; b()", "'a; b()'")]
    #[case("x(); DROP TABLE users; SELECT ()", "'x(); DROP TABLE users; SELECT ()'")]
    #[case("f(a) + g(b)", "'f(a) + g(b)'")]
    #[case("(1) + (2)", "'(1) + (2)'")]
    #[case("f(')')", "f(')')")]
    #[case("f('a)", "'f(''a)'")]
    #[case("'it''s'", "'it''s'")]
    #[case("'it's'", "'''it''s'''")]
    fn test_format_literal(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(format_literal(input, quote, false), expected);
    }

    #[test]
    fn test_casts_only_when_allowed() {
        assert_eq!(format_literal("'now'::timestamp", quote, true), "'now'::timestamp");
        assert_eq!(format_literal("a::b", quote, false), "'a::b'");
        assert_eq!(format_literal("a::b", quote, true), "a::b");
        assert_eq!(
            format_literal("'x'::text; DROP TABLE t", quote, true),
            "'''x''::text; DROP TABLE t'"
        );
    }

    #[test]
    fn test_options_defaults_and_builders() {
        let options = MigrationOptions::new(Dialect::PostgreSql);
        assert!(options.include_drops);
        assert!(!options.include_unsafe);
        assert_eq!(options.transaction_mode, TransactionMode::Single);
        assert!(options.preserve_foreign_keys);
        assert!(options.defer_foreign_key_check);
        assert_eq!(options.backup_prefix, "__smf_backup_");

        let options = options.include_unsafe(true).with_run_id("20240101000000_abcd");
        assert!(options.include_unsafe);
        assert_eq!(options.run_id, "20240101000000_abcd");
    }

    #[test]
    fn test_run_id_shape() {
        let run_id = generate_run_id();
        let (stamp, suffix) = run_id.split_once('_').unwrap();
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[rstest]
    #[case("single", TransactionMode::Single)]
    #[case("per-statement", TransactionMode::PerStatement)]
    #[case("PER_STATEMENT", TransactionMode::PerStatement)]
    #[case("none", TransactionMode::None)]
    fn test_transaction_mode_parse(#[case] input: &str, #[case] expected: TransactionMode) {
        assert_eq!(input.parse::<TransactionMode>().unwrap(), expected);
    }

    #[test]
    fn test_add_helpers_trim_and_skip_blank() {
        let mut m = Migration::default();
        m.add_statement("  ALTER TABLE t ADD COLUMN c INT; ");
        m.add_statement("   ");
        m.add_statement_with_rollback("CREATE INDEX i ON t (c)", "");
        m.add_note("  note ");
        m.add_note("");

        assert_eq!(m.statements, vec!["ALTER TABLE t ADD COLUMN c INT", "CREATE INDEX i ON t (c)"]);
        assert!(m.rollback.is_empty());
        assert_eq!(m.notes, vec!["note"]);
    }

    #[test]
    fn test_dedupe() {
        let mut m = Migration::default();
        for _ in 0..2 {
            m.add_note("n");
            m.add_breaking("b");
            m.add_unresolved("u");
            m.add_rollback("DROP INDEX i");
            m.add_statement("SELECT 1");
        }
        m.dedupe();
        assert_eq!(m.notes.len(), 1);
        assert_eq!(m.breaking.len(), 1);
        assert_eq!(m.unresolved.len(), 1);
        assert_eq!(m.rollback.len(), 1);
        assert_eq!(m.statements.len(), 2);
    }

    #[test]
    fn test_display_layout() {
        let mut m = Migration::default();
        m.add_breaking("[WARNING] t.c: Column will be dropped");
        m.add_unresolved("line one\nline two");
        m.add_statement_with_rollback("ALTER TABLE t ADD COLUMN c INT", "ALTER TABLE t DROP COLUMN c");
        m.add_statement_with_rollback("DROP TABLE old", "-- cannot auto-rollback DROP TABLE old");

        let text = m.to_string();
        let expected = "\
-- schemift migration
-- Review before running in production.

-- BREAKING CHANGES (manual review required)
-- - [WARNING] t.c: Column will be dropped

-- UNRESOLVED (cannot auto-generate safely)
-- - line one
--   line two

-- SQL
ALTER TABLE t ADD COLUMN c INT;
DROP TABLE old;

-- ROLLBACK SQL (run separately)
-- cannot auto-rollback DROP TABLE old
-- ALTER TABLE t DROP COLUMN c;
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_migration_display() {
        let text = Migration::default().to_string();
        assert!(text.contains("-- No SQL statements generated."));
        assert!(!text.contains("ROLLBACK"));
    }

    #[test]
    fn test_rollback_string_reverses() {
        let mut m = Migration::default();
        m.add_statement_with_rollback("A", "undo A");
        m.add_statement_with_rollback("B", "undo B");
        assert_eq!(m.rollback_string(), "-- schemift rollback\nundo B;\nundo A;\n");
    }

    #[test]
    fn test_generator_for_each_dialect() {
        for dialect in [Dialect::MySql, Dialect::PostgreSql, Dialect::Sqlite] {
            assert_eq!(generator_for(dialect).dialect(), dialect);
        }
    }
}
