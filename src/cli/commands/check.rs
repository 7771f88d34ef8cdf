use clap::Subcommand;

use crate::cli::{print_json, Session};

#[derive(Subcommand)]
pub enum CheckCommands {
    #[command(about = "Recompute every tenancy's next due date and reschedule rent reminders")]
    Overdue,

    #[command(about = "Reschedule lease renewal reminders and report each tenancy's stage")]
    Renewals,
}

pub async fn handle(cmd: CheckCommands, session: &Session) -> anyhow::Result<()> {
    match cmd {
        CheckCommands::Overdue => print_json(&session.ledger.check_overdue_rent(session.as_of).await?),
        CheckCommands::Renewals => print_json(&session.ledger.check_renewals(session.as_of).await?),
    }
}
