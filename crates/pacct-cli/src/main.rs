use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use pacct::{AccountingLog, IdentityDirectory, OpenMode, SystemParams};
use pacct_cli::config::{Cli, Command};
use pacct_cli::generate::{GenerateOptions, generate};
use pacct_cli::report::EntrySummary;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
fn system_directory() -> anyhow::Result<Box<dyn IdentityDirectory>> {
    Ok(Box::new(pacct::SystemDirectory::new()))
}

#[cfg(not(unix))]
fn system_directory() -> anyhow::Result<Box<dyn IdentityDirectory>> {
    anyhow::bail!("user and group lookup is only supported on unix hosts")
}

fn names_directory(names: bool) -> anyhow::Result<Option<Box<dyn IdentityDirectory>>> {
    if names { system_directory().map(Some) } else { Ok(None) }
}

fn print_summary(out: &mut impl Write, summary: &EntrySummary, json: bool) -> anyhow::Result<()> {
    if json {
        serde_json::to_writer(&mut *out, summary)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", summary.to_line())?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let host = SystemParams::from_host();
    let config = cli.params.log_config(host)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Dump {
            path,
            start,
            limit,
            json,
            names,
        } => {
            let directory = names_directory(names)?;
            let mut log = AccountingLog::open_with_mode(&path, OpenMode::Read, config)
                .with_context(|| format!("Failed to open {}", path.display()))?;

            let entries = log.each_entry(start)?;
            for entry in entries.take(limit.unwrap_or(usize::MAX)) {
                let (record, index) = entry?;
                let summary = EntrySummary::new(&record, index, directory.as_deref());
                print_summary(&mut out, &summary, json)?;
            }
        }

        Command::Last { path, json, names } => {
            let directory = names_directory(names)?;
            let mut log = AccountingLog::open_with_mode(&path, OpenMode::Read, config)
                .with_context(|| format!("Failed to open {}", path.display()))?;

            match log.last_entry()? {
                Some(record) => {
                    let index = log.num_entries()? - 1;
                    let summary = EntrySummary::new(&record, index, directory.as_deref());
                    print_summary(&mut out, &summary, json)?;
                }
                None => info!(path = %path.display(), "Log is empty"),
            }
        }

        Command::Count { path } => {
            let log = AccountingLog::open_with_mode(&path, OpenMode::Read, config)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            writeln!(out, "{}", log.num_entries()?)?;
        }

        Command::Generate {
            path,
            count,
            seed,
            users,
            groups,
        } => {
            let directory = system_directory()?;
            let mut log = AccountingLog::open_with_mode(&path, OpenMode::Write, config)
                .with_context(|| format!("Failed to create {}", path.display()))?;

            let options = GenerateOptions {
                count,
                users,
                groups,
                ..Default::default()
            };
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };

            let written = generate(&mut log, &options, &*directory, &mut rng)?;
            log.close()?;
            writeln!(out, "Wrote {} records to {}", written, path.display())?;
        }
    }

    Ok(())
}
