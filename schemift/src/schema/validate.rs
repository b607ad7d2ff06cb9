//! Schema model validation
//!
//! Checks a loaded snapshot before it reaches the diff engine: naming rules,
//! duplicate detection, primary key consistency and reference resolvability.

use regex::Regex;
use std::collections::HashSet;

use crate::error::{Result, ValidationError};
use crate::schema::types::{
    split_reference, ConstraintType, DataType, Database, Table, ValidationRules,
};
use crate::utils::naming::{check_identifier_conflicts, is_sql_keyword};

impl Database {
    /// Validate the snapshot, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("database name is empty").into());
        }

        for (i, table) in self.tables.iter().enumerate() {
            if table.name.trim().is_empty() {
                return Err(ValidationError::new(format!("table at index {} has no name", i)).into());
            }
        }

        let names: Vec<String> = self.tables.iter().map(|t| t.name.clone()).collect();
        if let Some((first, second)) = check_identifier_conflicts(&names, true) {
            return Err(ValidationError::new(format!(
                "duplicate table name {:?} (conflicts with {:?})",
                second, first
            ))
            .table(second)
            .into());
        }

        let rules = NameRules::compile(self.validation.as_ref())?;
        let table_names: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();

        for table in &self.tables {
            validate_table(table, &table_names, &rules)?;
        }

        Ok(())
    }
}

struct NameRules {
    max_length: Option<usize>,
    pattern: Option<Regex>,
    forbid_reserved: bool,
    require_primary_key: bool,
}

impl NameRules {
    fn compile(rules: Option<&ValidationRules>) -> Result<Self> {
        let Some(rules) = rules else {
            return Ok(Self {
                max_length: None,
                pattern: None,
                forbid_reserved: false,
                require_primary_key: false,
            });
        };

        let pattern = match rules.name_pattern.as_deref() {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                ValidationError::new(format!("invalid name pattern: {}", e)).field("name_pattern")
            })?),
            None => None,
        };

        Ok(Self {
            max_length: rules.max_name_length,
            pattern,
            forbid_reserved: rules.forbid_reserved_words,
            require_primary_key: rules.require_primary_key,
        })
    }

    fn check(&self, name: &str) -> std::result::Result<(), String> {
        if let Some(max) = self.max_length {
            if name.chars().count() > max {
                return Err(format!("name {:?} exceeds {} characters", name, max));
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(name) {
                return Err(format!("name {:?} does not match pattern {}", name, pattern.as_str()));
            }
        }
        if self.forbid_reserved && is_sql_keyword(name) {
            return Err(format!("name {:?} is a reserved word", name));
        }
        Ok(())
    }
}

fn validate_table(table: &Table, table_names: &HashSet<String>, rules: &NameRules) -> Result<()> {
    let fail = |message: String| ValidationError::new(message).table(&table.name);

    rules.check(&table.name).map_err(|m| fail(m).field("name"))?;

    if table.columns.is_empty() {
        return Err(fail("table has no columns".to_string()).into());
    }

    let mut seen = HashSet::new();
    for (i, column) in table.columns.iter().enumerate() {
        if column.name.trim().is_empty() {
            return Err(fail(format!("column at index {} has no name", i)).into());
        }
        let col_fail = |message: &str, field: &str| fail(message.to_string()).column(&column.name).field(field);

        if !seen.insert(column.name.to_lowercase()) {
            return Err(col_fail("duplicate column name", "name").into());
        }
        rules.check(&column.name).map_err(|m| col_fail(&m, "name"))?;

        if column.type_raw.trim().is_empty() {
            return Err(col_fail("type is required", "type_raw").into());
        }
        if column.is_generated && column.generation_expression.trim().is_empty() {
            return Err(col_fail("generated column requires an expression", "generation_expression").into());
        }
        if column.auto_increment && column.data_type != DataType::Int {
            return Err(col_fail("auto_increment requires an integer type", "auto_increment").into());
        }
        if column.data_type == DataType::Enum && column.enum_values().is_empty() {
            return Err(col_fail("enum column requires a list of values", "type_raw").into());
        }
        if let Some(reference) = &column.references {
            match split_reference(reference) {
                None => {
                    return Err(col_fail("references must be written as table.column", "references").into())
                }
                Some((ref_table, _)) if !table_names.contains(&ref_table.to_lowercase()) => {
                    return Err(col_fail(&format!("references unknown table {:?}", ref_table), "references").into())
                }
                Some(_) => {}
            }
        }
    }

    let pk_constraints: Vec<_> = table
        .constraints
        .iter()
        .filter(|c| c.constraint_type == ConstraintType::PrimaryKey)
        .collect();
    if pk_constraints.len() > 1 {
        return Err(fail("table has more than one primary key constraint".to_string()).into());
    }
    if let Some(pk) = pk_constraints.first() {
        let flagged: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.to_lowercase())
            .collect();
        let declared: Vec<String> = pk.columns.iter().map(|c| c.to_lowercase()).collect();
        if !flagged.is_empty() && flagged != declared {
            return Err(fail(
                "primary key declared on columns conflicts with primary key constraint".to_string(),
            )
            .into());
        }
    }
    if rules.require_primary_key && pk_constraints.is_empty() && !table.columns.iter().any(|c| c.primary_key) {
        return Err(fail("table has no primary key".to_string()).into());
    }

    for constraint in &table.constraints {
        let label = if constraint.name.is_empty() {
            constraint.signature()
        } else {
            constraint.name.clone()
        };
        let con_fail = |message: String| fail(format!("constraint {:?}: {}", label, message));

        if constraint.constraint_type != ConstraintType::Check && constraint.columns.is_empty() {
            return Err(con_fail("has no columns".to_string()).into());
        }
        if let Some(missing) = constraint.columns.iter().find(|c| table.column(c).is_none()) {
            return Err(con_fail(format!("unknown column {:?}", missing)).into());
        }

        match constraint.constraint_type {
            ConstraintType::ForeignKey => {
                if constraint.referenced_table.trim().is_empty() {
                    return Err(con_fail("foreign key has no referenced table".to_string()).into());
                }
                if constraint.referenced_columns.len() != constraint.columns.len() {
                    return Err(con_fail("referenced column count does not match".to_string()).into());
                }
                if !table_names.contains(&constraint.referenced_table.to_lowercase()) {
                    return Err(con_fail(format!(
                        "references unknown table {:?}",
                        constraint.referenced_table
                    ))
                    .into());
                }
            }
            ConstraintType::Check => {
                if constraint.check_expression.trim().is_empty() {
                    return Err(con_fail("check constraint has no expression".to_string()).into());
                }
            }
            _ => {}
        }
    }

    for index in &table.indexes {
        if index.columns.is_empty() {
            return Err(fail(format!("index {:?} has no columns", index.name)).into());
        }
        if let Some(missing) = index.columns.iter().find(|c| table.column(&c.name).is_none()) {
            return Err(fail(format!("index {:?}: unknown column {:?}", index.name, missing.name)).into());
        }
    }

    Ok(())
}
