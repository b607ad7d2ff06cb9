//! Error types for schemift

use std::fmt;

use thiserror::Error;

/// Result type for schemift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schemift
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    ValidationError(ValidationError),

    #[error("Schema load error: {0}")]
    SchemaLoadError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A single model validation failure, located as precisely as possible
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub table: Option<String>,
    pub column: Option<String>,
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation error")?;
        let mut located = false;
        for (label, value) in [
            ("table", &self.table),
            ("column", &self.column),
            ("field", &self.field),
        ] {
            if let Some(value) = value {
                write!(f, "{} {} {:?}", if located { "" } else { " in" }, label, value)?;
                located = true;
            }
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for Error {
    fn from(error: ValidationError) -> Self {
        Error::ValidationError(error)
    }
}

/// Convert Serde JSON errors to schemift errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to schemift errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

/// Convert YAML errors to schemift errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("type is required")
            .table("users")
            .column("email")
            .field("type_raw");
        assert_eq!(
            err.to_string(),
            r#"validation error in table "users" column "email" field "type_raw": type is required"#
        );
    }

    #[test]
    fn test_validation_error_without_location() {
        let err = ValidationError::new("database name is empty");
        assert_eq!(err.to_string(), "validation error: database name is empty");
        assert_eq!(
            Error::from(err).to_string(),
            "validation error: database name is empty"
        );
    }
}
