use std::path::PathBuf;

use clap::Subcommand;
use serde_json::json;

use crate::cli::{print_json, Session};

#[derive(Subcommand)]
pub enum SettingsCommands {
    #[command(about = "Show the saved settings and where they live")]
    Show,

    #[command(about = "Move the database to another directory")]
    SetDbDir {
        #[arg(help = "Directory for the database files")]
        dir: PathBuf,
    },

    #[command(about = "Restore the default settings")]
    Reset,
}

pub fn handle(cmd: SettingsCommands, session: &mut Session) -> anyhow::Result<()> {
    match cmd {
        SettingsCommands::Show => {}
        SettingsCommands::SetDbDir { dir } => {
            session.settings.set_database_dir(dir)?;
            move_ledger(session)?;
        }
        SettingsCommands::Reset => {
            session.settings.reset_to_default();
            move_ledger(session)?;
        }
    }

    print_json(&json!({
        "settings_path": session.settings_path,
        "settings": session.settings,
        "database_dir": session.ledger.store().location(),
    }))
}

/// Moves the store and the reminder journal together, then persists the
/// new location.
fn move_ledger(session: &mut Session) -> anyhow::Result<()> {
    let dir = &session.settings.database_dir;
    session.ledger.relocate(dir)?;
    session.ledger.scheduler().center().relocate(dir)?;
    session.settings.save(&session.settings_path)?;
    Ok(())
}
