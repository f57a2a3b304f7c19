// Conciliador CLI - reconcile delivery-partner exports against the POS system

mod catalog_cmds;
mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use conciliador_config::ConfigError;
use conciliador_recon::ReconError;

use exit_codes::{recon_exit_code, EXIT_CONFIG, EXIT_INPUT, EXIT_OUTPUT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "conciliador")]
#[command(about = "Reconcile delivery-partner order exports against the point-of-sale system")]
#[command(version)]
struct Cli {
    /// Catalog file (default: user catalog if present, else the built-in one)
    #[arg(long, global = true, env = "CONCILIADOR_CATALOG")]
    catalog: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one partner export for a store and date range
    #[command(after_help = "\
Dates accept dd/mm/yyyy or yyyy-mm-dd. The system side comes from the
database (--system-db or CONCILIADOR_DB) or from a spreadsheet export
(--system-file, which takes precedence).

Examples:
  conciliador run ifood.xlsx --store 58 --partner 1032 --start 01/01/2024 --end 31/01/2024 --system-db pdv.sqlite
  conciliador run goomer.csv --store 58 --partner 709 --start 2024-01-01 --end 2024-01-31 --system-file sistema.xlsx
  conciliador run ifood.xlsx --store 58 --partner 1032 --start 01/01/2024 --end 31/01/2024 -o - -f json | jq .summary
  conciliador run ifood.xlsx --store 58 --partner 1032 --start 01/01/2024 --end 31/01/2024 --fail-on-unmatched")]
    Run(run::RunArgs),

    /// List stores and the partners each one reconciles
    Stores,

    /// List delivery partners and their system-side rules
    Partners {
        /// Only partners enabled for this store
        #[arg(long)]
        store: Option<u32>,
    },

    /// List adapters and the columns they require
    Adapters,

    /// Validate the catalog, and optionally standalone adapter files
    #[command(after_help = "\
Examples:
  conciliador validate
  conciliador validate --catalog loja.toml
  conciliador validate novo_parceiro.toml")]
    Validate {
        /// Adapter definition files (TOML) to check
        adapters: Vec<PathBuf>,
    },

    /// Write the built-in catalog to the user config directory for editing
    Init {
        /// Destination (default: the user catalog path)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "conciliador=debug" } else { "conciliador=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let catalog = cli.catalog.as_deref();
    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args, catalog),
        Commands::Stores => catalog_cmds::cmd_stores(catalog),
        Commands::Partners { store } => catalog_cmds::cmd_partners(catalog, store),
        Commands::Adapters => catalog_cmds::cmd_adapters(catalog),
        Commands::Validate { adapters } => catalog_cmds::cmd_validate(catalog, &adapters),
        Commands::Init { path, force } => catalog_cmds::cmd_init(path, force),
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

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, msg)
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self::new(EXIT_OUTPUT, msg)
    }

    /// Catalog errors, with a pointer to the listing command that helps.
    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::UnknownStore(_) => Some("run `conciliador stores` to list store ids"),
            ConfigError::UnknownPartner(_) | ConfigError::PartnerNotAllowed { .. } => {
                Some("run `conciliador stores` to see the partners enabled per store")
            }
            ConfigError::UnknownAdapter(_) => Some("run `conciliador adapters` to list adapters"),
            ConfigError::Parse { .. } | ConfigError::Validation(_) => {
                Some("check the catalog with `conciliador validate`")
            }
            ConfigError::Io { .. } => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint: hint.map(String::from) }
    }

    pub fn recon(err: ReconError) -> Self {
        Self::new(recon_exit_code(&err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
