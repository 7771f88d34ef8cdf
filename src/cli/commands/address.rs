use anyhow::anyhow;
use clap::{Args, Subcommand};
use serde_json::json;

use crate::cli::{print_json, Session};
use crate::models::Address;

#[derive(Subcommand)]
pub enum AddressCommands {
    #[command(about = "Add an address")]
    Add {
        #[command(flatten)]
        fields: AddressFields,
    },

    #[command(about = "List all addresses")]
    List,

    #[command(about = "Show one address")]
    Show {
        #[arg(help = "Address ID")]
        id: i64,
    },

    #[command(about = "Change fields of an address")]
    Update {
        #[arg(help = "Address ID")]
        id: i64,

        #[command(flatten)]
        fields: AddressFields,
    },

    #[command(about = "Delete an address")]
    Delete {
        #[arg(help = "Address ID")]
        id: i64,
    },
}

#[derive(Args, Default)]
pub struct AddressFields {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub line1: Option<String>,
    #[arg(long)]
    pub line2: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub pin_code: Option<String>,
}

impl AddressFields {
    /// Overwrites the fields that were given on the command line.
    pub fn apply(self, address: &mut Address) {
        let targets = [
            (self.title, &mut address.title),
            (self.line1, &mut address.line1),
            (self.line2, &mut address.line2),
            (self.city, &mut address.city),
            (self.state, &mut address.state),
            (self.pin_code, &mut address.pin_code),
        ];
        for (value, target) in targets {
            if let Some(value) = value {
                *target = value;
            }
        }
    }
}

pub fn handle(cmd: AddressCommands, session: &Session) -> anyhow::Result<()> {
    let ledger = &session.ledger;
    match cmd {
        AddressCommands::Add { fields } => {
            let mut address = Address::default();
            fields.apply(&mut address);
            ledger.save_address(&mut address)?;
            print_json(&address)
        }
        AddressCommands::List => print_json(&ledger.addresses()?),
        AddressCommands::Show { id } => {
            let address = ledger.address(id)?.ok_or_else(|| anyhow!("no address with id {id}"))?;
            print_json(&address)
        }
        AddressCommands::Update { id, fields } => {
            let mut address = ledger.address(id)?.ok_or_else(|| anyhow!("no address with id {id}"))?;
            fields.apply(&mut address);
            ledger.update_address(&address)?;
            print_json(&address)
        }
        AddressCommands::Delete { id } => {
            ledger.delete_address(id)?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_only_touches_given_fields() {
        let mut address = Address {
            title: "Home".to_string(),
            city: "Pune".to_string(),
            ..Address::default()
        };
        AddressFields {
            city: Some("Mumbai".to_string()),
            ..AddressFields::default()
        }
        .apply(&mut address);
        assert_eq!(address.title, "Home");
        assert_eq!(address.city, "Mumbai");
    }
}
