//! Schema file loading
//!
//! Reads a schema snapshot document (TOML, JSON or YAML) into a
//! [`Database`], then normalizes, validates and synthesizes constraints so
//! both sides of a comparison are prepared the same way.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::schema::types::Database;

/// On-disk schema document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Toml,
    Json,
    Yaml,
}

impl SchemaFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Ok(SchemaFormat::Toml),
            "json" => Ok(SchemaFormat::Json),
            "yaml" | "yml" => Ok(SchemaFormat::Yaml),
            other => Err(Error::SchemaLoadError(format!(
                "{}: unsupported schema file extension {:?}",
                path.display(),
                other
            ))),
        }
    }
}

#[derive(Deserialize)]
struct SchemaDocument {
    database: Database,
}

/// Parse a schema document without preparing it
pub fn parse_schema(content: &str, format: SchemaFormat) -> Result<Database> {
    let document: SchemaDocument = match format {
        SchemaFormat::Toml => toml::from_str(content).map_err(|e| Error::SchemaLoadError(e.to_string()))?,
        SchemaFormat::Json => serde_json::from_str(content)?,
        SchemaFormat::Yaml => serde_yaml::from_str(content)?,
    };
    Ok(document.database)
}

/// Normalize types, validate, and expand column shortcuts
pub fn prepare(mut database: Database, config: &Config) -> Result<Database> {
    if database.dialect.is_none() {
        database.dialect = Some(config.migration.dialect);
    }
    database.normalize_types();
    database.validate()?;
    database.synthesize_constraints(&config.naming);
    Ok(database)
}

/// Load and prepare a schema snapshot from a file
pub fn load_schema(path: impl AsRef<Path>, config: &Config) -> Result<Database> {
    let path = path.as_ref();
    let format = SchemaFormat::from_path(path)?;
    let content = fs::read_to_string(path)
        .map_err(|e| Error::SchemaLoadError(format!("{}: {}", path.display(), e)))?;

    let database = parse_schema(&content, format).map_err(|e| match e {
        Error::SchemaLoadError(msg) | Error::SerializationError(msg) => {
            Error::SchemaLoadError(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;

    let database = prepare(database, config)?;
    tracing::debug!(
        path = %path.display(),
        tables = database.tables.len(),
        "Loaded schema snapshot"
    );
    Ok(database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{ConstraintType, DataType, Dialect, IndexType, SortOrder};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const USERS_TOML: &str = r#"
[database]
name = "app"
dialect = "mysql"

[[database.tables]]
name = "users"
comment = "application users"
options = { engine = "InnoDB", charset = "utf8mb4" }

[[database.tables.columns]]
name = "id"
type = "BIGINT"
primary_key = true
auto_increment = true

[[database.tables.columns]]
name = "email"
type = "VARCHAR(255)"
unique = true

[[database.tables.columns]]
name = "team_id"
type = "BIGINT"
nullable = true
references = "teams.id"
ref_on_delete = "cascade"

[[database.tables.indexes]]
name = "idx_users_email_prefix"
columns = [{ name = "email", length = 10, order = "desc" }]

[[database.tables]]
name = "teams"

[[database.tables.columns]]
name = "id"
type = "BIGINT"
primary_key = true
"#;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml_schema() {
        let file = write_temp(".toml", USERS_TOML);
        let db = load_schema(file.path(), &Config::default()).unwrap();

        assert_eq!(db.name, "app");
        assert_eq!(db.dialect, Some(Dialect::MySql));
        let users = db.table("users").unwrap();
        assert_eq!(users.columns[0].data_type, DataType::Int);
        assert!(!users.columns[0].nullable);
        assert_eq!(users.option_map().get("CHARSET").map(String::as_str), Some("utf8mb4"));

        let types: Vec<ConstraintType> = users.constraints.iter().map(|c| c.constraint_type).collect();
        assert_eq!(
            types,
            vec![ConstraintType::PrimaryKey, ConstraintType::Unique, ConstraintType::ForeignKey]
        );

        let index = &users.indexes[0];
        assert_eq!(index.index_type, IndexType::Btree);
        assert_eq!(index.columns[0].length, Some(10));
        assert_eq!(index.columns[0].order, SortOrder::Desc);
    }

    #[test]
    fn test_json_and_yaml_match_toml() {
        let toml_db = parse_schema(USERS_TOML, SchemaFormat::Toml).unwrap();
        let json = serde_json::json!({ "database": toml_db });
        let json_db = parse_schema(&json.to_string(), SchemaFormat::Json).unwrap();
        assert_eq!(json_db, toml_db);

        let yaml = serde_yaml::to_string(&json).unwrap();
        let yaml_db = parse_schema(&yaml, SchemaFormat::Yaml).unwrap();
        assert_eq!(yaml_db, toml_db);
    }

    #[test]
    fn test_missing_dialect_inherits_config() {
        let file = write_temp(
            ".yaml",
            "database:\n  name: app\n  tables:\n    - name: t\n      columns:\n        - name: id\n          type: INT\n",
        );
        let mut config = Config::default();
        config.migration.dialect = Dialect::Sqlite;

        let db = load_schema(file.path(), &config).unwrap();
        assert_eq!(db.dialect, Some(Dialect::Sqlite));
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let file = write_temp(".toml", "[database]\nname = \"app\"\n\n[[database.tables]]\nname = \"empty\"\n");
        let result = load_schema(file.path(), &Config::default());
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_parse_error_names_file() {
        let file = write_temp(".json", "{ not json");
        match load_schema(file.path(), &Config::default()) {
            Err(Error::SchemaLoadError(msg)) => {
                assert!(msg.contains(&file.path().display().to_string()))
            }
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_extension() {
        let file = write_temp(".sql", "CREATE TABLE t (id INT);");
        assert!(matches!(
            load_schema(file.path(), &Config::default()),
            Err(Error::SchemaLoadError(_))
        ));
    }
}
