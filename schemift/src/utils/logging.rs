//! Logging utilities for schemift
//!
//! This module provides logging setup and configuration.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Map a configured level name to a tracing level, defaulting to INFO
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter directive enabling the crate's events at `level`
pub fn crate_directive(level: Level) -> Result<Directive> {
    format!("schemift={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log directive: {}", e)))
}

fn install<S>(subscriber: S) -> Result<()>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber).map_err(|e| Error::Unknown(e.to_string()))
}

/// Initialize logging based on configuration
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => return Ok(()),
    };

    let env_filter = EnvFilter::from_default_env().add_directive(crate_directive(parse_level(&config.level))?);
    let json = config.format.eq_ignore_ascii_case("json");

    if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = Mutex::new(File::create(file_path)?);

        if json {
            install(
                fmt::Subscriber::builder()
                    .json()
                    .with_env_filter(env_filter)
                    .with_writer(file)
                    .finish(),
            )
        } else {
            install(
                fmt::Subscriber::builder()
                    .with_ansi(false)
                    .with_env_filter(env_filter)
                    .with_writer(file)
                    .finish(),
            )
        }
    } else if config.stdout {
        if json {
            install(fmt::Subscriber::builder().json().with_env_filter(env_filter).finish())
        } else {
            install(fmt::Subscriber::builder().with_env_filter(env_filter).finish())
        }
    } else {
        Ok(())
    }
}

/// Debug-level text logging on stderr, used by `--verbose`
///
/// Stdout stays reserved for generated output.
pub fn init_verbose() -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive(crate_directive(Level::DEBUG)?);
    install(
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .finish(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("trace", Level::TRACE)]
    #[case("DEBUG", Level::DEBUG)]
    #[case("warn", Level::WARN)]
    #[case("warning", Level::WARN)]
    #[case("error", Level::ERROR)]
    #[case("loud", Level::INFO)]
    fn test_parse_level(#[case] input: &str, #[case] expected: Level) {
        assert_eq!(parse_level(input), expected);
    }

    #[test]
    fn test_crate_directive() {
        let directive = crate_directive(Level::DEBUG).unwrap();
        assert_eq!(directive.to_string().to_lowercase(), "schemift=debug");
    }

    #[test]
    fn test_no_config_is_a_no_op() {
        assert!(init_logging(&None).is_ok());
    }
}
