//! dyntables command-line interface
//!
//! Drives a [`dyntables::DynamicTables`] manager from the shell.
//!
//! # Usage
//!
//! ```bash
//! # Route one row into dt1_wikipediaorg
//! dtables -d mydb -U myuser --prefix dt1_ \
//!     --columns "domain VARCHAR(100), keyword VARCHAR(100)" --dynamic-column domain \
//!     input wikipedia.org cats
//!
//! # Show a table as JSON
//! dtables -o json show dt1_wikipediaorg
//!
//! # Drop every dt1_ table in one transaction
//! dtables --prefix dt1_ delete
//!
//! # Run the walkthrough without a server
//! dtables --memory demo
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dyntables::config::DEFAULT_CONFIG_FILE;
use dyntables::{Backend, ConnectionConfig, DynamicTables, MemoryBackend, PgBackend};

mod commands;
mod config;
mod formatter;

use commands::Command;
use config::CliConfig;
use formatter::OutputFormat;

/// Default file name for `--log-file` given without a value.
const DEFAULT_LOG_FILE: &str = "dynamic_tables.log";

/// dyntables command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "dtables",
    version,
    about = "Route rows into PostgreSQL tables named after a column value",
    long_about = "Route rows into PostgreSQL tables named after a column value.\n\n\
                  Tables are created on first use and can be dropped together\n\
                  by prefix in a single transaction."
)]
struct Args {
    /// Server hostname
    #[arg(short = 'H', long, env = "DTABLES_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(short = 'p', long, env = "DTABLES_PORT")]
    port: Option<u16>,

    /// Database name
    #[arg(short = 'd', long, env = "DTABLES_DATABASE")]
    database: Option<String>,

    /// Username
    #[arg(short = 'U', long, env = "DTABLES_USER")]
    user: Option<String>,

    /// Password (use DTABLES_PASSWORD env var for security)
    #[arg(short = 'W', long, env = "DTABLES_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Schema searched by catalog queries
    #[arg(long, env = "DTABLES_SCHEMA")]
    schema: Option<String>,

    /// Table prefix
    #[arg(long, env = "DTABLES_PREFIX")]
    prefix: Option<String>,

    /// Column list, e.g. "domain VARCHAR(100), keyword VARCHAR(100)"
    #[arg(long, env = "DTABLES_COLUMNS")]
    columns: Option<String>,

    /// Column whose value picks the table
    #[arg(long, env = "DTABLES_DYNAMIC_COLUMN")]
    dynamic_column: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read connection settings from a JSON file (config.json when no file is
    /// given), ignoring the [connection] section and the connection flags
    #[arg(long, value_name = "FILE", num_args = 0..=1)]
    json_config: Option<Option<PathBuf>>,

    /// Use an in-process backend (no server connection)
    #[arg(long)]
    memory: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "table")]
    output: OutputFormatArg,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, default_value = "error", env = "DTABLES_LOG_LEVEL")]
    log_level: String,

    /// Enable verbose output (same as --log-level debug)
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Append logs to a file instead of stderr
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = DEFAULT_LOG_FILE)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Output format argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Display results in a formatted table
    Table,
    /// Display results as JSON
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    let config = load_config(&args)?;
    let layout = config.layout_config()?;
    let format = args.output.into();

    if let Some(output) = args.command.execute_offline(&layout) {
        println!("{output}");
        return Ok(());
    }

    if args.memory {
        info!("using the in-memory backend");
        let tables = DynamicTables::with_layout(MemoryBackend::new(), layout);
        return execute(tables, &args.command, format).await;
    }

    let connection = connection_config(&args, &config)?;
    let backend = PgBackend::connect(&connection)
        .await
        .with_context(|| format!("cannot connect to {}", connection.display_target()))?;
    execute(DynamicTables::with_layout(backend, layout), &args.command, format).await
}

async fn execute<B: Backend>(
    mut tables: DynamicTables<B>,
    command: &Command,
    format: OutputFormat,
) -> Result<()> {
    let result = command.execute(&mut tables, format).await;
    if let Err(e) = tables.close().await {
        warn!("error closing connection: {}", e);
    }
    println!("{}", result?);
    Ok(())
}

fn connection_config(args: &Args, config: &CliConfig) -> Result<ConnectionConfig> {
    match &args.json_config {
        Some(Some(path)) => ConnectionConfig::from_json_file(path)
            .with_context(|| format!("cannot load {}", path.display())),
        Some(None) => ConnectionConfig::from_default_file()
            .with_context(|| format!("cannot load {}", DEFAULT_CONFIG_FILE)),
        None => config.connection_config(),
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let level = if args.verbose {
        "debug"
    } else {
        args.log_level.as_str()
    };
    let filter = EnvFilter::try_new(format!("dyntables={level},dtables={level}"))
        .with_context(|| format!("invalid log level: {level}"))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => subscriber.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<CliConfig> {
    let mut config = if let Some(path) = &args.config {
        CliConfig::from_file(path)?
    } else {
        CliConfig::load_default()?
    };

    // Override with command line arguments
    let connection = &mut config.connection;
    if let Some(host) = &args.host {
        connection.host = host.clone();
    }
    if let Some(port) = args.port {
        connection.port = port;
    }
    if let Some(db) = &args.database {
        connection.database = Some(db.clone());
    }
    if let Some(user) = &args.user {
        connection.user = Some(user.clone());
    }
    if let Some(pass) = &args.password {
        connection.password = Some(pass.clone());
    }
    if let Some(schema) = &args.schema {
        connection.schema = schema.clone();
    }

    let layout = &mut config.layout;
    if let Some(prefix) = &args.prefix {
        layout.prefix = Some(prefix.clone());
    }
    if let Some(columns) = &args.columns {
        layout.columns = Some(columns.clone());
    }
    if let Some(dynamic) = &args.dynamic_column {
        layout.dynamic_column = Some(dynamic.clone());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "dtables",
            "--memory",
            "--prefix",
            "dt1_",
            "input",
            "wikipedia.org",
            "cats",
        ])
        .unwrap();
        assert!(args.memory);
        assert_eq!(args.log_level, "error");
        assert!(args.log_file.is_none());
        assert_eq!(
            args.command,
            Command::Input {
                values: vec!["wikipedia.org".into(), "cats".into()],
                atomic: false,
            }
        );
    }

    #[test]
    fn test_log_file_default_name() {
        let args = Args::try_parse_from(["dtables", "--log-file", "--memory", "status"]).unwrap();
        assert_eq!(args.log_file, Some(PathBuf::from(DEFAULT_LOG_FILE)));

        let args = Args::try_parse_from(["dtables", "--log-file=x.log", "status"]).unwrap();
        assert_eq!(args.log_file, Some(PathBuf::from("x.log")));
    }

    #[test]
    fn test_json_config_flag() {
        let args = Args::try_parse_from(["dtables", "--json-config", "--memory", "status"]).unwrap();
        assert_eq!(args.json_config, Some(None));

        let args = Args::try_parse_from(["dtables", "--json-config=db.json", "status"]).unwrap();
        assert_eq!(args.json_config, Some(Some(PathBuf::from("db.json"))));

        let args = Args::try_parse_from(["dtables", "status"]).unwrap();
        assert!(args.json_config.is_none());
    }

    #[test]
    fn test_json_config_replaces_connection_section() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"{"database": "jsondb", "user": "jsonuser", "host": "json.internal"}"#,
        )
        .unwrap();

        let flag = format!("--json-config={}", path.display());
        let args = Args::try_parse_from(["dtables", "-d", "flagdb", flag.as_str(), "status"]).unwrap();
        let config = load_config(&args).unwrap();

        let connection = connection_config(&args, &config).unwrap();
        assert_eq!(connection.database, "jsondb");
        assert_eq!(connection.host, "json.internal");
    }

    #[test]
    fn test_json_config_missing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let flag = format!("--json-config={}", temp_dir.path().join("absent.json").display());
        let args = Args::try_parse_from(["dtables", flag.as_str(), "status"]).unwrap();
        let config = load_config(&args).unwrap();

        let err = connection_config(&args, &config).unwrap_err();
        assert!(format!("{:#}", err).contains("configuration file not found"));
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "dtables",
            "-H",
            "db.internal",
            "-d",
            "mydb",
            "-U",
            "me",
            "--columns",
            "domain TEXT",
            "status",
        ])
        .unwrap();
        let mut config = load_config(&args).unwrap();
        // isolate from any config file on the machine
        config.layout.prefix = None;

        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.database.as_deref(), Some("mydb"));
        let layout = config.layout_config().unwrap();
        assert_eq!(layout.columns().len(), 1);
    }
}
