//! Naming utilities for schemift
//!
//! Generated names for constraints, indexes and backup columns, plus
//! identifier limits and keyword checks used by validation.

use std::collections::HashMap;

use crate::schema::types::Dialect;

/// Format a name according to a pattern with placeholders
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();

    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{}}}", placeholder), value);
    }

    result
}

/// Get index name from table and columns according to pattern
pub fn get_index_name(pattern: &str, table_name: &str, columns: &[String]) -> String {
    let columns_str = columns.join("_");

    format_name(pattern, &[("table", table_name), ("columns", &columns_str)])
}

/// Create a constraint name based on multiple fields and pattern
pub fn get_constraint_name(
    pattern: &str,
    table_name: &str,
    constraint_type: &str,
    columns: &[String],
) -> String {
    let columns_str = columns.join("_");

    format_name(
        pattern,
        &[
            ("table", table_name),
            ("type", constraint_type),
            ("columns", &columns_str),
        ],
    )
}

/// Name a column or table is moved to instead of being dropped
pub fn backup_name(prefix: &str, run_id: &str, name: &str, dialect: Dialect) -> String {
    truncate_identifier(
        &format!("{}{}_{}", prefix, run_id, name),
        get_max_identifier_length(dialect),
    )
}

/// Check for name conflicts in a list of identifiers
pub fn check_identifier_conflicts(names: &[String], ignore_case: bool) -> Option<(String, String)> {
    let mut seen = HashMap::<String, String>::new();

    for name in names {
        let key = if ignore_case {
            name.to_lowercase()
        } else {
            name.clone()
        };

        if let Some(existing) = seen.get(&key) {
            return Some((existing.clone(), name.clone()));
        }
        seen.insert(key, name.clone());
    }

    None
}

/// Truncate an identifier to fit database limits
pub fn truncate_identifier(name: &str, max_length: usize) -> String {
    if name.len() <= max_length {
        return name.to_string();
    }

    // Hash of the full name keeps truncated names distinct
    let hash = format!("{:x}", md5::compute(name.as_bytes()));
    if max_length <= 9 {
        return hash[..max_length.min(hash.len())].to_string();
    }

    let mut keep_length = max_length - 9;
    while !name.is_char_boundary(keep_length) {
        keep_length -= 1;
    }

    format!("{}_{}", &name[..keep_length], &hash[0..8])
}

/// Get maximum identifier length for specific database
pub fn get_max_identifier_length(dialect: Dialect) -> usize {
    match dialect {
        Dialect::PostgreSql => 63,
        Dialect::MySql => 64,
        Dialect::Sqlite => 2048,
    }
}

/// Check if a name is a reserved SQL keyword
pub fn is_sql_keyword(name: &str) -> bool {
    // Common SQL keywords across databases
    const SQL_KEYWORDS: &[&str] = &[
        "add", "all", "alter", "and", "any", "as", "asc", "backup", "begin", "between",
        "by", "case", "check", "column", "constraint", "create", "database", "default",
        "delete", "desc", "distinct", "drop", "else", "end", "except", "exec", "exists",
        "foreign", "from", "full", "group", "having", "in", "index", "inner", "insert",
        "intersect", "into", "is", "join", "key", "left", "like", "limit", "not",
        "null", "on", "or", "order", "outer", "primary", "procedure", "references",
        "right", "rownum", "select", "set", "table", "top", "truncate", "union",
        "unique", "update", "values", "view", "where", "with",
    ];

    SQL_KEYWORDS.contains(&name.to_lowercase().as_str())
}
