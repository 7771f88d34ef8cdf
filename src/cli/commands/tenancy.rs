use anyhow::{anyhow, bail};
use clap::{Args, Subcommand};
use serde_json::json;

use crate::cli::{print_json, Session};
use crate::dates::parse_input;
use crate::ledger::Ledger;
use crate::models::{parse_amount, DueDay, Tenancy};
use crate::reminder::NotificationCenter;

#[derive(Subcommand)]
pub enum TenancyCommands {
    #[command(about = "Add a tenancy and schedule its reminders")]
    Add {
        #[command(flatten)]
        fields: TenancyFields,
    },

    #[command(about = "List all tenancies")]
    List,

    #[command(about = "Show one tenancy")]
    Show {
        #[arg(help = "Tenancy ID")]
        id: i64,
    },

    #[command(about = "Change fields of a tenancy and reschedule its reminders")]
    Update {
        #[arg(help = "Tenancy ID")]
        id: i64,

        #[command(flatten)]
        fields: TenancyFields,
    },

    #[command(about = "Delete a tenancy that has no recorded payments")]
    Delete {
        #[arg(help = "Tenancy ID")]
        id: i64,
    },
}

#[derive(Args, Default)]
pub struct TenancyFields {
    #[arg(long, help = "Tenant name")]
    pub name: Option<String>,
    #[arg(long)]
    pub contact: Option<String>,
    #[arg(long, help = "ID of the rented address", conflicts_with = "no_address")]
    pub address_id: Option<i64>,
    #[arg(long, help = "Detach the tenancy from its address")]
    pub no_address: bool,
    #[arg(long, help = "Lease start date")]
    pub lease_start: Option<String>,
    #[arg(long, help = "Whether the lease agreement has been signed")]
    pub signed: Option<bool>,
    #[arg(long, help = "Advance deposit, e.g. \"₹25,000\"")]
    pub advance: Option<String>,
    #[arg(long, help = "Agreed monthly rent")]
    pub rent: Option<String>,
    #[arg(long, help = "Day of the month rent falls due (1-28)")]
    pub due_day: Option<i64>,
    #[arg(long, help = "Date the agreement was signed")]
    pub agreement_signed: Option<String>,
    #[arg(long)]
    pub comments: Option<String>,
}

impl TenancyFields {
    /// Overwrites the fields that were given on the command line. The
    /// address is looked up so the tenancy carries the stored record.
    pub fn apply<C: NotificationCenter>(self, tenancy: &mut Tenancy, ledger: &Ledger<C>) -> anyhow::Result<()> {
        if let Some(name) = self.name {
            tenancy.name = name;
        }
        if let Some(contact) = self.contact {
            tenancy.contact = contact;
        }
        if self.no_address {
            tenancy.address = None;
        }
        if let Some(id) = self.address_id {
            let address = ledger.address(id)?.ok_or_else(|| anyhow!("no address with id {id}"))?;
            tenancy.address = Some(address);
        }
        if let Some(raw) = self.lease_start {
            tenancy.lease_start_date = parse_input(&raw)?;
        }
        if let Some(signed) = self.signed {
            tenancy.lease_agreement_signed = signed;
        }
        if let Some(raw) = self.advance {
            tenancy.advance_amount = parse_amount(&raw);
        }
        if let Some(raw) = self.rent {
            tenancy.agreed_rent = parse_amount(&raw);
        }
        if let Some(day) = self.due_day {
            tenancy.monthly_due_date = DueDay::new(day)?;
        }
        if let Some(raw) = self.agreement_signed {
            tenancy.agreement_signed_date = parse_input(&raw)?;
        }
        if let Some(comments) = self.comments {
            tenancy.comments = comments;
        }
        Ok(())
    }
}

pub async fn handle(cmd: TenancyCommands, session: &Session) -> anyhow::Result<()> {
    let ledger = &session.ledger;
    match cmd {
        TenancyCommands::Add { fields } => {
            if !fields.name.as_deref().is_some_and(|name| !name.trim().is_empty()) {
                bail!("a tenancy needs a --name");
            }
            let mut tenancy = Tenancy::new("", 0.0, DueDay::default());
            fields.apply(&mut tenancy, ledger)?;
            ledger.save_tenancy(&mut tenancy, session.as_of).await?;
            print_json(&tenancy)
        }
        TenancyCommands::List => print_json(&ledger.tenancies()?),
        TenancyCommands::Show { id } => {
            let tenancy = ledger.tenancy(id)?.ok_or_else(|| anyhow!("no tenancy with id {id}"))?;
            let next_due = ledger.next_rent_due_date(&tenancy)?;
            print_json(&json!({ "tenancy": tenancy, "next_rent_due": next_due }))
        }
        TenancyCommands::Update { id, fields } => {
            let mut tenancy = ledger.tenancy(id)?.ok_or_else(|| anyhow!("no tenancy with id {id}"))?;
            fields.apply(&mut tenancy, ledger)?;
            ledger.update_tenancy(&tenancy, session.as_of).await?;
            print_json(&tenancy)
        }
        TenancyCommands::Delete { id } => {
            ledger.delete_tenancy(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}
