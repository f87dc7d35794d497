//! # ids-cli
//!
//! Command-line batch auditor for IDS documents.
//!
//! Audits files and directories, prints one status line per document and
//! exits with the OR of every document's status flags.

mod batch;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use config::BatchConfig;
use ids_audit::{AuditStatus, IdsVersion, SchemaSelection, WarningBehavior};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ids")]
#[command(about = "IDS document auditor")]
#[command(version)]
struct Cli {
    /// Path to a YAML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit IDS files or directories
    Audit {
        /// Files or directories to audit
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Extensions picked up in directories (e.g. ids,xml)
        #[arg(short, long, value_delimiter = ',')]
        extensions: Vec<String>,

        /// IDS schema version to check against; read from the document by default
        #[arg(short, long, value_enum)]
        schema: Option<SchemaArg>,

        /// How structural warnings affect the status
        #[arg(short, long, value_enum)]
        warnings: Option<WarningArg>,

        /// Skip the structural checks
        #[arg(long)]
        no_structure: bool,

        /// Skip the content audit
        #[arg(long)]
        no_content: bool,

        /// Skip the content audit for files whose path matches this regex
        #[arg(long, value_name = "REGEX")]
        omit_content: Option<String>,

        /// XSD that must pass the schema definition check first (repeatable)
        #[arg(long, value_name = "FILE")]
        xsd: Vec<PathBuf>,

        /// Directory with IFC schema tables replacing the embedded ones (repeatable)
        #[arg(long, value_name = "DIR")]
        schema_tables: Vec<PathBuf>,
    },

    /// Check XSD files with the schema definition check
    CheckSchema {
        /// XSD files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaArg {
    Sniff,
    #[value(name = "0.9.6")]
    V096,
    #[value(name = "0.9.7")]
    V097,
    #[value(name = "1.0")]
    V10,
}

impl From<SchemaArg> for SchemaSelection {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Sniff => Self::Sniff,
            SchemaArg::V096 => Self::Fixed(IdsVersion::V0_9_6),
            SchemaArg::V097 => Self::Fixed(IdsVersion::V0_9_7),
            SchemaArg::V10 => Self::Fixed(IdsVersion::V1_0),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum WarningArg {
    Info,
    Warning,
    Error,
}

impl From<WarningArg> for WarningBehavior {
    fn from(arg: WarningArg) -> Self {
        match arg {
            WarningArg::Info => Self::Info,
            WarningArg::Warning => Self::Warning,
            WarningArg::Error => Self::Error,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(status: AuditStatus) -> ExitCode {
    ExitCode::from(u8::try_from(status.bits()).unwrap_or(u8::MAX))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => BatchConfig::load(path).context("failed to load configuration")?,
        None => BatchConfig::default(),
    };

    let status = match cli.command {
        Commands::Audit {
            inputs,
            extensions,
            schema,
            warnings,
            no_structure,
            no_content,
            omit_content,
            xsd,
            schema_tables,
        } => {
            if !extensions.is_empty() {
                config.extensions = extensions;
            }
            if let Some(schema) = schema {
                config.audit.schema = schema.into();
            }
            if let Some(warnings) = warnings {
                config.audit.warning_behavior = warnings.into();
            }
            if no_structure {
                config.audit.structure = false;
            }
            if no_content {
                config.audit.content = false;
            }
            if omit_content.is_some() {
                config.omit_content = omit_content;
            }
            config.audit.schema_files.extend(xsd);
            config.audit.schema_tables.extend(schema_tables);

            let report = batch::run(&inputs, &config).await;
            print!("{}", report.render());
            report.status()
        }
        Commands::CheckSchema { files } => {
            config.audit.schema_files = files;
            let (status, diagnostics) = batch::check_schemas(&config);
            for diagnostic in &diagnostics {
                println!("{diagnostic}");
            }
            println!("schema definition check: {status}");
            status
        }
    };

    tracing::info!(%status, "done");
    Ok(exit_code(status))
}
