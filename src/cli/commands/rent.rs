use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use crate::cli::{print_json, Session};
use crate::dates::parse_input;
use crate::models::{parse_amount, RentPayment};

#[derive(Subcommand)]
pub enum RentCommands {
    #[command(about = "Record a rent payment and reschedule the tenancy's reminders")]
    Pay {
        #[arg(long, help = "Tenancy ID")]
        tenancy: i64,
        #[arg(long, help = "Amount paid, e.g. \"12,500\"")]
        amount: String,
        #[arg(long, help = "Payment date, defaults to now")]
        paid_on: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },

    #[command(about = "Payments of one tenancy, or of all tenancies, newest first")]
    History {
        #[arg(long, help = "Tenancy ID")]
        tenancy: Option<i64>,
    },

    #[command(about = "Latest payment of one tenancy, or of every tenancy")]
    Latest {
        #[arg(long, help = "Tenancy ID")]
        tenancy: Option<i64>,
    },

    #[command(about = "Every tenancy with its latest payment and rent status")]
    Overview,
}

pub async fn handle(cmd: RentCommands, session: &Session) -> anyhow::Result<()> {
    let ledger = &session.ledger;
    match cmd {
        RentCommands::Pay {
            tenancy,
            amount,
            paid_on,
            notes,
        } => {
            let mut payment = RentPayment::new(tenancy, parse_amount(&amount));
            if let Some(raw) = paid_on {
                payment.paid_on = parse_input(&raw)?;
            }
            payment.notes = notes;
            ledger.record_rent_payment(&mut payment, session.as_of).await?;

            let next_due = match ledger.tenancy(tenancy)? {
                Some(tenancy) => Some(ledger.next_rent_due_date(&tenancy)?),
                None => None,
            };
            print_json(&json!({ "payment": payment, "next_rent_due": next_due }))
        }
        RentCommands::History { tenancy: Some(id) } => print_json(&ledger.rent_payments(id)?),
        RentCommands::History { tenancy: None } => print_json(&ledger.all_rent_payments()?),
        RentCommands::Latest { tenancy: Some(id) } => {
            let latest = ledger
                .latest_rent_payment(id)?
                .ok_or_else(|| anyhow!("no payments recorded for tenancy {id}"))?;
            print_json(&latest)
        }
        RentCommands::Latest { tenancy: None } => print_json(&ledger.latest_rent_payments()?),
        RentCommands::Overview => print_json(&ledger.rent_overview(session.as_of)?),
    }
}
