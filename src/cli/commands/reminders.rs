use clap::Subcommand;
use serde_json::json;

use crate::cli::{print_json, Session};

#[derive(Subcommand)]
pub enum ReminderCommands {
    #[command(about = "Pending reminders in firing order")]
    List,

    #[command(about = "Cancel pending reminders of one tenancy, or all of them")]
    Clear {
        #[arg(long, help = "Tenancy ID")]
        tenancy: Option<i64>,
    },
}

pub async fn handle(cmd: ReminderCommands, session: &Session) -> anyhow::Result<()> {
    let scheduler = session.ledger.scheduler();
    match cmd {
        ReminderCommands::List => print_json(&scheduler.center().notifications().await?),
        ReminderCommands::Clear { tenancy } => {
            let cleared = match tenancy {
                Some(id) => scheduler.clear_tenancy(id).await?,
                None => scheduler.clear_all().await?,
            };
            print_json(&json!({ "cleared": cleared }))
        }
    }
}
