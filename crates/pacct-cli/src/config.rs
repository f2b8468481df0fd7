use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pacct::{AccountingLogConfig, PacctError, SystemParams};

#[derive(Parser)]
#[command(name = "pacct-cli", about = "Inspect and generate process-accounting logs")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(flatten)]
    pub params: ParamArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the host's page size and clock tick rate
///
/// Useful when reading a log produced on a different machine.
#[derive(Debug, Clone, Default, Args)]
pub struct ParamArgs {
    /// Bytes per memory page (defaults to the host's)
    #[arg(long, global = true)]
    pub page_size: Option<u64>,

    /// CPU clock ticks per second (defaults to the host's)
    #[arg(long, global = true)]
    pub ticks_per_second: Option<u64>,

    /// fsync after every appended record
    #[arg(long, global = true)]
    pub sync: bool,
}

impl ParamArgs {
    /// Host parameters with any overrides applied
    pub fn resolve(&self, host: SystemParams) -> Result<SystemParams, PacctError> {
        SystemParams::new(
            self.page_size.unwrap_or(host.page_size()),
            self.ticks_per_second.unwrap_or(host.ticks_per_second()),
        )
    }

    /// Log configuration with the resolved parameters and sync setting
    pub fn log_config(&self, host: SystemParams) -> Result<AccountingLogConfig, PacctError> {
        Ok(AccountingLogConfig::with_params(self.resolve(host)?).with_sync_on_write(self.sync))
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Print records from a log
    Dump {
        /// Accounting log path
        path: PathBuf,
        /// Index of the first record to print
        #[arg(long, default_value_t = 0)]
        start: u64,
        /// Maximum number of records to print
        #[arg(long)]
        limit: Option<usize>,
        /// Emit one JSON object per line
        #[arg(long)]
        json: bool,
        /// Resolve user and group IDs to names
        #[arg(long)]
        names: bool,
    },
    /// Print the final record of a log
    Last {
        /// Accounting log path
        path: PathBuf,
        /// Emit JSON
        #[arg(long)]
        json: bool,
        /// Resolve user and group IDs to names
        #[arg(long)]
        names: bool,
    },
    /// Print the number of records in a log
    Count {
        /// Accounting log path
        path: PathBuf,
    },
    /// Write a log of synthetic records (truncates the file)
    Generate {
        /// Accounting log path
        path: PathBuf,
        /// Number of records
        #[arg(long, default_value_t = 1000)]
        count: u32,
        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// User names to pick from
        #[arg(long = "user", default_values_t = [String::from("root")])]
        users: Vec<String>,
        /// Group names to pick from
        #[arg(long = "group", default_values_t = [String::from("root")])]
        groups: Vec<String>,
    },
}
