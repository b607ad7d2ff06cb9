//! Schema model types
//!
//! Dialect-neutral representation of one schema snapshot. Values are built
//! by the loader (or by hand in tests) and are not mutated after they are
//! handed to the diff engine, except for constraint synthesis.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::NamingConfig;
use crate::error::Error;
use crate::utils::naming::get_constraint_name;

/// Target SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dialect {
    #[default]
    MySql,
    PostgreSql,
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::PostgreSql => "postgresql",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgresql" | "postgres" | "pg" => Ok(Dialect::PostgreSql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(Error::ConfigError(format!("Unsupported dialect: {}", other))),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dialect> for String {
    fn from(dialect: Dialect) -> Self {
        dialect.as_str().to_string()
    }
}

/// Normalized type category of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Int,
    Float,
    Boolean,
    Datetime,
    Json,
    Uuid,
    Binary,
    Enum,
    #[default]
    Unknown,
}

impl DataType {
    /// Classify a raw SQL type such as `VARCHAR(255)` or `bigint unsigned`
    pub fn from_raw(raw: &str) -> DataType {
        match type_base(raw).as_str() {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "int2"
            | "int4" | "int8" | "serial" | "smallserial" | "bigserial" => DataType::Int,
            "decimal" | "numeric" | "dec" | "float" | "double" | "real" | "float4"
            | "float8" | "money" => DataType::Float,
            "bool" | "boolean" | "bit" => DataType::Boolean,
            "char" | "varchar" | "nchar" | "nvarchar" | "text" | "tinytext" | "mediumtext"
            | "longtext" | "string" | "clob" | "citext" | "bpchar" => DataType::String,
            "date" | "time" | "datetime" | "timestamp" | "timestamptz" | "timetz" | "year"
            | "interval" => DataType::Datetime,
            "json" | "jsonb" => DataType::Json,
            "uuid" | "uniqueidentifier" => DataType::Uuid,
            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob"
            | "bytea" => DataType::Binary,
            "enum" | "set" => DataType::Enum,
            _ => DataType::Unknown,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Datetime => "datetime",
            DataType::Json => "json",
            DataType::Uuid => "uuid",
            DataType::Binary => "binary",
            DataType::Enum => "enum",
            DataType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Lower-cased base name of a raw type, without arguments or modifiers
pub fn type_base(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let head = lower.split('(').next().unwrap_or("").trim();

    match head {
        "character varying" => "varchar".to_string(),
        "character" => "char".to_string(),
        "double precision" => "double".to_string(),
        "timestamp with time zone" => "timestamptz".to_string(),
        "timestamp without time zone" => "timestamp".to_string(),
        "time with time zone" => "timetz".to_string(),
        "time without time zone" => "time".to_string(),
        _ => head.split_whitespace().next().unwrap_or("").to_string(),
    }
}

/// Arguments between the parentheses of a raw type, with quotes stripped
pub fn type_arguments(raw: &str) -> Vec<String> {
    let (Some(start), Some(end)) = (raw.find('('), raw.rfind(')')) else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }

    raw[start + 1..end]
        .split(',')
        .map(|arg| arg.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|arg| !arg.is_empty())
        .collect()
}

/// Storage mode of a generated column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationStorage {
    #[serde(alias = "virtual")]
    Virtual,
    #[serde(alias = "stored")]
    Stored,
}

impl fmt::Display for GenerationStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStorage::Virtual => f.write_str("VIRTUAL"),
            GenerationStorage::Stored => f.write_str("STORED"),
        }
    }
}

/// Referential action for foreign keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[serde(rename = "CASCADE", alias = "cascade")]
    Cascade,
    #[serde(rename = "RESTRICT", alias = "restrict")]
    Restrict,
    #[serde(rename = "SET NULL", alias = "set null", alias = "set_null")]
    SetNull,
    #[serde(rename = "SET DEFAULT", alias = "set default", alias = "set_default")]
    SetDefault,
    #[serde(rename = "NO ACTION", alias = "no action", alias = "no_action")]
    NoAction,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        };
        f.write_str(sql)
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    pub name: String,
    #[serde(alias = "type")]
    pub type_raw: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    /// Column-level shortcut, expanded into a unique constraint
    pub unique: bool,
    /// Column-level shortcut, expanded into a check constraint
    pub check: Option<String>,
    /// Column-level shortcut `table.column`, expanded into a foreign key
    pub references: Option<String>,
    pub ref_on_delete: Option<ReferentialAction>,
    pub ref_on_update: Option<ReferentialAction>,
    pub default_value: Option<String>,
    pub on_update: Option<String>,
    pub charset: String,
    pub collate: String,
    pub comment: String,
    pub is_generated: bool,
    pub generation_expression: String,
    pub generation_storage: Option<GenerationStorage>,
    pub identity_seed: Option<i64>,
    pub identity_increment: Option<i64>,
}

impl Column {
    /// Create a column with a raw type; the category is derived from it
    pub fn new(name: &str, type_raw: &str) -> Self {
        Self {
            name: name.to_string(),
            type_raw: type_raw.to_string(),
            data_type: DataType::from_raw(type_raw),
            nullable: true,
            ..Default::default()
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    /// Values of an ENUM or SET type
    pub fn enum_values(&self) -> Vec<String> {
        if self.data_type == DataType::Enum {
            type_arguments(&self.type_raw)
        } else {
            Vec::new()
        }
    }

    /// Whether the database supplies a value when none is given on insert
    pub fn has_implicit_value(&self) -> bool {
        self.default_value.is_some()
            || self.auto_increment
            || self.is_generated
            || self.identity_seed.is_some()
    }
}

/// Type of a table constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    #[serde(alias = "PRIMARY KEY", alias = "primary key", alias = "PRIMARY_KEY")]
    PrimaryKey,
    #[serde(alias = "FOREIGN KEY", alias = "foreign key", alias = "FOREIGN_KEY")]
    ForeignKey,
    #[serde(alias = "UNIQUE")]
    Unique,
    #[serde(alias = "CHECK")]
    Check,
}

impl ConstraintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintType::PrimaryKey => "primary_key",
            ConstraintType::ForeignKey => "foreign_key",
            ConstraintType::Unique => "unique",
            ConstraintType::Check => "check",
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// Table constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub referenced_table: String,
    #[serde(default)]
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
    #[serde(default)]
    pub check_expression: String,
    #[serde(default = "default_true")]
    pub enforced: bool,
}

impl Constraint {
    pub fn new(name: &str, constraint_type: ConstraintType, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            constraint_type,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_table: String::new(),
            referenced_columns: Vec::new(),
            on_delete: None,
            on_update: None,
            check_expression: String::new(),
            enforced: true,
        }
    }

    pub fn references(mut self, table: &str, columns: &[&str]) -> Self {
        self.referenced_table = table.to_string();
        self.referenced_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn check(mut self, expression: &str) -> Self {
        self.check_expression = expression.to_string();
        self
    }

    /// `type:col1,col2` identity used when the constraint has no name
    pub fn signature(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.trim().to_lowercase()).collect();
        format!("{}:{}", self.constraint_type, columns.join(","))
    }

    /// Identity key used to match constraints across snapshots
    pub fn key(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            self.signature()
        } else {
            name.to_lowercase()
        }
    }
}

/// Index method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    #[default]
    #[serde(alias = "BTREE")]
    Btree,
    #[serde(alias = "HASH")]
    Hash,
    #[serde(alias = "FULLTEXT")]
    Fulltext,
    #[serde(alias = "SPATIAL")]
    Spatial,
    #[serde(alias = "GIN")]
    Gin,
    #[serde(alias = "GIST")]
    Gist,
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexType::Btree => "btree",
            IndexType::Hash => "hash",
            IndexType::Fulltext => "fulltext",
            IndexType::Spatial => "spatial",
            IndexType::Gin => "gin",
            IndexType::Gist => "gist",
        };
        f.write_str(name)
    }
}

/// Sort direction of an index column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("ASC"),
            SortOrder::Desc => f.write_str("DESC"),
        }
    }
}

/// Index visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexVisibility {
    #[default]
    #[serde(alias = "visible")]
    Visible,
    #[serde(alias = "invisible")]
    Invisible,
}

impl fmt::Display for IndexVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexVisibility::Visible => f.write_str("VISIBLE"),
            IndexVisibility::Invisible => f.write_str("INVISIBLE"),
        }
    }
}

/// Column reference inside an index
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexColumn {
    pub name: String,
    pub length: Option<u32>,
    pub order: SortOrder,
}

impl IndexColumn {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

impl fmt::Display for IndexColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(length) = self.length {
            write!(f, "({})", length)?;
        }
        if self.order == SortOrder::Desc {
            write!(f, " DESC")?;
        }
        Ok(())
    }
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    #[serde(rename = "type")]
    pub index_type: IndexType,
    pub columns: Vec<IndexColumn>,
    pub visibility: IndexVisibility,
    pub comment: String,
}

impl Index {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| IndexColumn::new(c)).collect(),
            ..Default::default()
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// `idx:<unique>:<type>:<cols>` identity used when the index has no name
    pub fn signature(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.to_string().trim().to_lowercase())
            .collect();
        format!(
            "idx:{}:{}:{}",
            if self.unique { 1 } else { 0 },
            self.index_type,
            columns.join(",")
        )
    }

    /// Identity key used to match indexes across snapshots
    pub fn key(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            self.signature()
        } else {
            name.to_lowercase()
        }
    }
}

/// Recognized MySQL table options
pub const MYSQL_TABLE_OPTIONS: [&str; 24] = [
    "AUTOEXTEND_SIZE",
    "AUTO_INCREMENT",
    "AVG_ROW_LENGTH",
    "CHARSET",
    "CHECKSUM",
    "COLLATE",
    "COMPRESSION",
    "CONNECTION",
    "DATA DIRECTORY",
    "DELAY_KEY_WRITE",
    "ENCRYPTION",
    "ENGINE",
    "INDEX DIRECTORY",
    "INSERT_METHOD",
    "KEY_BLOCK_SIZE",
    "MAX_ROWS",
    "MIN_ROWS",
    "PAGE_CHECKSUM",
    "PASSWORD",
    "ROW_FORMAT",
    "STATS_AUTO_RECALC",
    "STATS_PERSISTENT",
    "STATS_SAMPLE_PAGES",
    "TABLESPACE",
];

/// Canonical spelling of a table option key
pub fn normalize_option_key(key: &str) -> String {
    let upper = key.trim().to_uppercase();
    match upper.as_str() {
        "DATA_DIRECTORY" => "DATA DIRECTORY".to_string(),
        "INDEX_DIRECTORY" => "INDEX DIRECTORY".to_string(),
        "DEFAULT CHARSET" | "DEFAULT_CHARSET" | "CHARACTER SET" | "CHARACTER_SET" => {
            "CHARSET".to_string()
        }
        "DEFAULT COLLATE" | "DEFAULT_COLLATE" | "COLLATION" => "COLLATE".to_string(),
        _ => upper,
    }
}

/// Table definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    pub name: String,
    pub comment: String,
    pub options: BTreeMap<String, String>,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
    pub indexes: Vec<Index>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.insert(key.to_string(), value.to_string());
        self
    }

    /// Find a column by case-insensitive name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.constraint_type == ConstraintType::PrimaryKey)
    }

    /// Primary key columns, from the constraint or else the column flags
    pub fn primary_key_columns(&self) -> Vec<String> {
        match self.primary_key() {
            Some(pk) => pk.columns.clone(),
            None => self
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.clone())
                .collect(),
        }
    }

    /// Options with canonical keys and the table comment folded in.
    /// When two raw keys normalize to the same key, the first in key order wins.
    pub fn option_map(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        let mut raw_keys: BTreeMap<String, &str> = BTreeMap::new();

        for (raw, value) in &self.options {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let key = normalize_option_key(raw);
            if let Some(first) = raw_keys.get(&key) {
                tracing::warn!(
                    table = %self.name,
                    option = %key,
                    kept = %first,
                    ignored = %raw,
                    "Table option collision"
                );
                continue;
            }
            raw_keys.insert(key.clone(), raw);
            map.insert(key, value.to_string());
        }

        let comment = self.comment.trim();
        if !comment.is_empty() {
            map.insert("COMMENT".to_string(), comment.to_string());
        }
        map
    }

    /// Expand column-level shortcuts into explicit constraints
    pub fn synthesize_constraints(&mut self, naming: &NamingConfig) {
        let mut synthesized = Vec::new();

        if self.primary_key().is_none() {
            let columns: Vec<String> = self
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.clone())
                .collect();
            if !columns.is_empty() {
                let mut pk = Constraint::new(
                    &get_constraint_name(&naming.primary_key_pattern, &self.name, "primary_key", &columns),
                    ConstraintType::PrimaryKey,
                    &[],
                );
                pk.columns = columns;
                synthesized.push(pk);
            }
        }

        for column in &self.columns {
            let columns = vec![column.name.clone()];

            if column.unique {
                let mut unique = Constraint::new(
                    &get_constraint_name(&naming.unique_pattern, &self.name, "unique", &columns),
                    ConstraintType::Unique,
                    &[],
                );
                unique.columns = columns.clone();
                synthesized.push(unique);
            }

            if let Some(expression) = column.check.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
                let mut check = Constraint::new(
                    &get_constraint_name(&naming.check_pattern, &self.name, "check", &columns),
                    ConstraintType::Check,
                    &[],
                );
                check.columns = columns.clone();
                check.check_expression = expression.to_string();
                synthesized.push(check);
            }

            if let Some((ref_table, ref_column)) = column.references.as_deref().and_then(split_reference) {
                let mut fk = Constraint::new(
                    &get_constraint_name(&naming.foreign_key_pattern, &self.name, "foreign_key", &columns),
                    ConstraintType::ForeignKey,
                    &[],
                )
                .references(ref_table, &[ref_column]);
                fk.columns = columns.clone();
                fk.on_delete = column.ref_on_delete;
                fk.on_update = column.ref_on_update;
                synthesized.push(fk);
            }
        }

        for constraint in synthesized {
            let exists = self.constraints.iter().any(|existing| {
                existing.key() == constraint.key()
                    || (existing.constraint_type != ConstraintType::Check
                        && existing.signature() == constraint.signature())
            });
            if !exists {
                self.constraints.push(constraint);
            }
        }

        if let Some(pk_columns) = self.primary_key().map(|pk| pk.columns.clone()) {
            for column in &mut self.columns {
                if pk_columns.iter().any(|c| c.eq_ignore_ascii_case(&column.name)) {
                    column.primary_key = true;
                }
            }
        }
    }
}

/// Split a `table.column` reference
pub fn split_reference(reference: &str) -> Option<(&str, &str)> {
    let (table, column) = reference.trim().rsplit_once('.')?;
    if table.is_empty() || column.is_empty() {
        return None;
    }
    Some((table, column))
}

/// Optional naming and structure rules applied during validation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub max_name_length: Option<usize>,
    pub name_pattern: Option<String>,
    pub forbid_reserved_words: bool,
    pub require_primary_key: bool,
}

/// Complete schema snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub name: String,
    pub dialect: Option<Dialect>,
    pub tables: Vec<Table>,
    pub validation: Option<ValidationRules>,
}

impl Database {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Find a table by case-insensitive name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Fill in type categories that were not given explicitly
    pub fn normalize_types(&mut self) {
        for column in self.tables.iter_mut().flat_map(|t| t.columns.iter_mut()) {
            if column.data_type == DataType::Unknown {
                column.data_type = DataType::from_raw(&column.type_raw);
            }
        }
    }

    /// Expand column-level shortcuts in every table
    pub fn synthesize_constraints(&mut self, naming: &NamingConfig) {
        for table in &mut self.tables {
            table.synthesize_constraints(naming);
        }
    }
}
