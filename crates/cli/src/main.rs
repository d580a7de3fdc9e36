// Spreadmart CLI - audit and reconcile multi-branch sales extracts

mod audit;
mod exit_codes;
mod kpi;
mod split;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use spreadmart_audit::{AuditConfig, AuditError};
use spreadmart_io::{IoError, ReportFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exit_codes::{audit_exit_code, io_exit_code, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "spreadmart")]
#[command(about = "Audit and reconcile sales extracts from several branches")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Debug logging for spreadmart crates (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge branch extracts, flag duplicates, price mismatches and outliers
    #[command(after_help = "\
Examples:
  spreadmart audit store_A.csv store_B.csv store_C.csv
  spreadmart audit store_*.csv --config audit.toml --out-dir reports --zip
  spreadmart audit branches.xlsx --format xlsx
  spreadmart audit store_*.csv --json > report.json")]
    Audit {
        /// Branch extracts (.csv, .tsv, .xlsx, .xls, .ods), in merge order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Audit config (TOML); defaults match the supermarket sales columns
        #[arg(long, short = 'c', env = "SPREADMART_CONFIG")]
        config: Option<PathBuf>,

        /// Directory the artifacts are written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Artifact format
        #[arg(long, short = 'f', value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// Also bundle the artifacts into Audit_Reports.zip
        #[arg(long)]
        zip: bool,

        /// Output the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Reconciliation KPIs over a cleaned dataset written by `audit`
    #[command(after_help = "\
Examples:
  spreadmart kpi Cleaned_Data.csv
  spreadmart kpi Cleaned_Data.csv --log Audit_Log.csv --top 3
  spreadmart kpi Audit_Report.xlsx --json")]
    Kpi {
        /// Cleaned dataset (.csv or the first sheet of an .xlsx report)
        file: PathBuf,

        /// Audit config the dataset was written with
        #[arg(long, short = 'c', env = "SPREADMART_CONFIG")]
        config: Option<PathBuf>,

        /// Audit log of the same run, for the clean/duplicate split
        #[arg(long)]
        log: Option<PathBuf>,

        /// Number of best-selling categories to list
        #[arg(long, default_value_t = spreadmart_audit::kpi::DEFAULT_TOP_CATEGORIES)]
        top: usize,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Split a master extract into one file per branch
    #[command(after_help = "\
Examples:
  spreadmart split supermarket_sales.csv
  spreadmart split supermarket_sales.csv --by City --out-dir branches")]
    Split {
        /// Master extract
        file: PathBuf,

        /// Column whose value names the branch
        #[arg(long, default_value = "Branch")]
        by: String,

        /// Directory the branch files are written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Validate an audit config without running
    #[command(after_help = "\
Examples:
  spreadmart validate audit.toml")]
    Validate {
        /// Path to the audit config
        config: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// One CSV per artifact
    Csv,
    /// One workbook with a sheet per artifact
    Xlsx,
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => ReportFormat::Csv,
            Format::Xlsx => ReportFormat::Xlsx,
        }
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  spreadmart-audit ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  spreadmart-audit ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

/// Logs go to stderr so stdout stays clean for `--json`.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,spreadmart=debug,spreadmart_audit=debug,spreadmart_io=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Audit {
            files,
            config,
            out_dir,
            format,
            zip,
            json,
            output,
        } => audit::cmd_audit(files, config, out_dir, format.into(), zip, json, output),
        Commands::Kpi { file, config, log, top, json } => kpi::cmd_kpi(file, config, log, top, json),
        Commands::Split { file, by, out_dir } => split::cmd_split(file, by, out_dir),
        Commands::Validate { config } => audit::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Read and validate the audit config, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<AuditConfig, CliError> {
    let Some(path) = path else {
        return Ok(AuditConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    Ok(AuditConfig::from_toml(&text)?)
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<AuditError> for CliError {
    fn from(err: AuditError) -> Self {
        let hint = match &err {
            AuditError::Schema { expected_from, .. } => {
                Some(format!("every input must have the same columns as {expected_from}"))
            }
            AuditError::ReservedColumn { column, .. } => {
                Some(format!("rename '{column}' in the input or set columns.origin in the config"))
            }
            AuditError::MissingColumn { .. } => {
                Some("map header names with the [columns] section of --config".to_string())
            }
            _ => None,
        };
        Self { code: audit_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let code = io_exit_code(&err);
        let error = Self { code, message: err.to_string(), hint: None };
        match err {
            IoError::UnsupportedFormat(_) => error.with_hint("convert the file to CSV or XLSX first"),
            _ => error,
        }
    }
}
