pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use crate::dates;
use crate::ledger::Ledger;
use crate::reminder::{JournalCenter, ReminderScheduler};
use crate::settings::{self, Settings};
use crate::store::Store;

#[derive(Parser)]
#[command(name = "tenancy")]
#[command(about = "Landlord's ledger for properties, tenancies and rent payments")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Database directory, overriding the saved setting")]
    pub db_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Reference time for due-date checks (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)"
    )]
    pub as_of: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Property addresses")]
    Address {
        #[command(subcommand)]
        cmd: commands::address::AddressCommands,
    },

    #[command(about = "Tenancies and their lease terms")]
    Tenancy {
        #[command(subcommand)]
        cmd: commands::tenancy::TenancyCommands,
    },

    #[command(about = "Rent payments and due dates")]
    Rent {
        #[command(subcommand)]
        cmd: commands::rent::RentCommands,
    },

    #[command(about = "Sweep all tenancies and reschedule their reminders")]
    Check {
        #[command(subcommand)]
        cmd: commands::check::CheckCommands,
    },

    #[command(about = "Pending reminders")]
    Reminders {
        #[command(subcommand)]
        cmd: commands::reminders::ReminderCommands,
    },

    #[command(about = "Saved settings")]
    Settings {
        #[command(subcommand)]
        cmd: commands::settings::SettingsCommands,
    },
}

/// Everything a command handler needs, built once per invocation.
pub struct Session {
    pub ledger: Ledger<JournalCenter>,
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub as_of: NaiveDateTime,
}

impl Session {
    pub fn open(cli: &Cli) -> anyhow::Result<Self> {
        let settings_path = settings::settings_path()?;
        let settings = Settings::load(&settings_path)
            .with_context(|| format!("reading settings from {}", settings_path.display()))?;

        let db_dir = cli.db_dir.clone().unwrap_or_else(|| settings.database_dir.clone());
        debug!(db_dir = %db_dir.display(), "opening ledger");

        let store = Store::open(&db_dir, settings.date_policy)?;
        let center = JournalCenter::open(&db_dir)?;
        let scheduler = ReminderScheduler::new(Arc::new(center), settings.reminder_policy());

        let as_of = match cli.as_of.as_deref() {
            Some(raw) => dates::parse_input(raw)?,
            None => dates::now(),
        };

        Ok(Self {
            ledger: Ledger::new(store, scheduler),
            settings,
            settings_path,
            as_of,
        })
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut session = Session::open(&cli)?;

    match cli.command {
        Commands::Address { cmd } => commands::address::handle(cmd, &session),
        Commands::Tenancy { cmd } => commands::tenancy::handle(cmd, &session).await,
        Commands::Rent { cmd } => commands::rent::handle(cmd, &session).await,
        Commands::Check { cmd } => commands::check::handle(cmd, &session).await,
        Commands::Reminders { cmd } => commands::reminders::handle(cmd, &session).await,
        Commands::Settings { cmd } => commands::settings::handle(cmd, &mut session),
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
