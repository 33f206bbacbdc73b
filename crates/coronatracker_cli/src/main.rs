//! CLI entry point for inspecting and editing a CoronaTracker database.
//!
//! # Responsibility
//! - Verify `coronatracker_core` linkage (`ping`).
//! - Drive the same store API the app uses, one command per invocation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coronatracker_core::{
    default_log_level, init_logging, sample_countries, AppContext, Country, CountryStore,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "coronatracker", version, about = "Country statistics store tool")]
struct Cli {
    /// Database file to open.
    #[arg(long, env = "CORONATRACKER_DB_PATH", default_value = "coronatracker.sqlite3")]
    db: PathBuf,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long)]
    log_dir: Option<String>,

    #[arg(long, default_value_t = default_log_level().to_string())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core ping and version.
    Ping,
    /// List every country.
    List,
    /// Show one country by code.
    Show { code: String },
    /// Add a new country.
    Add(CountryArgs),
    /// Replace an existing country.
    Update(CountryArgs),
    /// Delete a country by code.
    Delete { code: String },
    /// Insert the bundled demo countries that are missing.
    Seed,
}

#[derive(Debug, clap::Args)]
struct CountryArgs {
    name: String,
    code: String,
    confirmed: u64,
    deaths: u64,
}

impl From<CountryArgs> for Country {
    fn from(args: CountryArgs) -> Self {
        Country::new(args.name, args.code, args.confirmed, args.deaths)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(&cli.log_level, log_dir).context("failed to initialize logging")?;
    }

    if let Command::Ping = cli.command {
        println!("coronatracker_core ping={}", coronatracker_core::ping());
        println!("coronatracker_core version={}", coronatracker_core::core_version());
        return Ok(());
    }

    let store = CountryStore::open(&AppContext::with_db_path(&cli.db))
        .with_context(|| format!("failed to open store at `{}`", cli.db.display()))?;

    match cli.command {
        Command::Ping => {}
        Command::List => {
            for country in store.get_all().get() {
                print_country(&country);
            }
        }
        Command::Show { code } => match store.get_by_code(&code).get() {
            Some(country) => print_country(&country),
            None => bail!("country not found: {code}"),
        },
        Command::Add(args) => {
            store.add(args.into()).wait().context("add failed")?;
        }
        Command::Update(args) => {
            store.update(args.into()).wait().context("update failed")?;
        }
        Command::Delete { code } => {
            let Some(country) = store.get_by_code(&code).get() else {
                bail!("country not found: {code}");
            };
            store.delete(country).wait().context("delete failed")?;
        }
        Command::Seed => {
            let existing = store.get_all().get();
            let pending = sample_countries()
                .into_iter()
                .filter(|sample| !existing.iter().any(|c| c.code == sample.code))
                .map(|sample| store.add(sample))
                .collect::<Vec<_>>();
            let seeded = pending.len();
            for write in pending {
                write.wait().context("seed failed")?;
            }
            println!("seeded {seeded} countries");
        }
    }

    Ok(())
}

fn print_country(country: &Country) {
    println!(
        "{:<8} {:<24} confirmed={:<10} deaths={}",
        country.code, country.name, country.confirmed, country.deaths
    );
}
