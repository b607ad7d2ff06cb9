//! schemift command line interface

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use schemift::config::{self, Config};
use schemift::migration::{generator_for, TransactionMode};
use schemift::output::{render_diff, render_findings, render_migration, OutputFormat};
use schemift::schema::analyzer::{BreakingChangeAnalyzer, BreakingChangeReport, Severity};
use schemift::schema::diff::diff;
use schemift::schema::loader::load_schema;
use schemift::schema::types::{Database, Dialect};
use schemift::utils::logging;

#[derive(Parser, Debug)]
#[command(name = "schemift", version, about = "Compare schema snapshots and generate reversible migrations")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the differences between two snapshots
    Diff(DiffArgs),
    /// List risky changes between two snapshots
    Breaking(BreakingArgs),
    /// Generate a migration script from old to new
    Migrate(MigrateArgs),
}

#[derive(Args, Debug)]
struct Snapshots {
    /// Schema snapshot before the change
    old: PathBuf,
    /// Schema snapshot after the change
    new: PathBuf,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format: text or json
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DiffArgs {
    #[command(flatten)]
    snapshots: Snapshots,
    #[command(flatten)]
    out: OutputArgs,
    /// Report renamed columns as removed plus added
    #[arg(long)]
    no_renames: bool,
}

#[derive(Args, Debug)]
struct BreakingArgs {
    #[command(flatten)]
    snapshots: Snapshots,
    #[command(flatten)]
    out: OutputArgs,
    /// Hide findings below this severity
    #[arg(long)]
    min_severity: Option<Severity>,
    /// Exit with status 2 when a finding reaches this severity
    #[arg(long)]
    fail_on: Option<Severity>,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    #[command(flatten)]
    snapshots: Snapshots,
    #[command(flatten)]
    out: OutputArgs,
    /// Target dialect: mysql, postgresql or sqlite
    #[arg(long)]
    dialect: Option<Dialect>,
    /// Also write the rollback script to this file
    #[arg(long)]
    rollback_output: Option<PathBuf>,
    /// Drop removed tables and columns instead of moving them aside
    #[arg(long = "unsafe")]
    allow_unsafe: bool,
    /// Leave removed tables in place
    #[arg(long)]
    no_drops: bool,
    /// Transaction framing: single, per-statement or none
    #[arg(long)]
    transaction: Option<TransactionMode>,
    /// Do not rebuild foreign keys around column changes
    #[arg(long)]
    no_preserve_fks: bool,
    /// Do not disable or defer foreign key checks
    #[arg(long)]
    no_defer_fk_checks: bool,
    /// Report renamed columns as removed plus added
    #[arg(long)]
    no_renames: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => config::load_from_file(path)?,
        None => Config::default(),
    };

    if cli.verbose {
        logging::init_verbose()?;
    } else {
        logging::init_logging(&config.logging)?;
    }

    match cli.command {
        Command::Diff(args) => {
            if args.no_renames {
                config.diff.detect_renames = false;
            }
            let (old, new) = load_pair(&args.snapshots, &config)?;
            let diff = diff(&old, &new, &config.diff_options())?;
            let format = args.out.format.unwrap_or(config.output.format);
            emit(&render_diff(&diff, format)?, args.out.output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Breaking(args) => {
            let (old, new) = load_pair(&args.snapshots, &config)?;
            let diff = diff(&old, &new, &config.diff_options())?;
            let report = BreakingChangeReport::new(BreakingChangeAnalyzer::analyze(&diff));
            let shown = match args.min_severity {
                Some(min) => report.filter(min),
                None => report.clone(),
            };

            let format = args.out.format.unwrap_or(config.output.format);
            emit(&render_findings(&shown.changes, format)?, args.out.output.as_deref())?;

            match args.fail_on {
                Some(threshold) if report.has_at_least(threshold) => Ok(ExitCode::from(2)),
                _ => Ok(ExitCode::SUCCESS),
            }
        }
        Command::Migrate(args) => {
            apply_migrate_flags(&mut config, &args);
            let (old, new) = load_pair(&args.snapshots, &config)?;
            let diff = diff(&old, &new, &config.diff_options())?;

            let options = config.migration_options();
            let migration = generator_for(options.dialect).generate_migration(&diff, &options);

            let format = args.out.format.unwrap_or(config.output.format);
            emit(&render_migration(&migration, format)?, args.out.output.as_deref())?;
            if let Some(path) = &args.rollback_output {
                fs::write(path, migration.rollback_string())
                    .with_context(|| format!("Failed to write rollback to {}", path.display()))?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// CLI flags win over the config file
fn apply_migrate_flags(config: &mut Config, args: &MigrateArgs) {
    let migration = &mut config.migration;
    if let Some(dialect) = args.dialect {
        migration.dialect = dialect;
    }
    if let Some(mode) = args.transaction {
        migration.transaction_mode = mode;
    }
    if args.allow_unsafe {
        migration.include_unsafe = true;
    }
    if args.no_drops {
        migration.include_drops = false;
    }
    if args.no_preserve_fks {
        migration.preserve_foreign_keys = false;
    }
    if args.no_defer_fk_checks {
        migration.defer_foreign_key_check = false;
    }
    if args.no_renames {
        config.diff.detect_renames = false;
    }
}

fn load_pair(snapshots: &Snapshots, config: &Config) -> Result<(Database, Database)> {
    let old = load_schema(&snapshots.old, config)
        .with_context(|| format!("Failed to load {}", snapshots.old.display()))?;
    let new = load_schema(&snapshots.new, config)
        .with_context(|| format!("Failed to load {}", snapshots.new.display()))?;
    Ok((old, new))
}

fn emit(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Output written");
        }
        None => print!("{}", content),
    }
    Ok(())
}
