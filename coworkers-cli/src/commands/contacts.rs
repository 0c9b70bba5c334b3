//! `coworkers contacts` — what the local group currently holds.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use coworkers_core::{config, GROUP_UID};
use coworkers_store::{ContactRecord, FileStore};

#[derive(Args, Debug)]
pub struct ContactsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ContactRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "position")]
    position: String,
    #[tabled(rename = "email")]
    email: String,
    #[tabled(rename = "mobile")]
    mobile: String,
    #[tabled(rename = "skype")]
    skype: String,
    #[tabled(rename = "photo")]
    photo: &'static str,
}

impl ContactsArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let account = config::load_account_at(&home)
            .context("no account — run `coworkers sign-in` first")?;
        let store = FileStore::open_at(&home, &account.key())
            .context("failed to open the local contact store")?;

        let mut contacts: Vec<&ContactRecord> = match store.ledger().find_group(GROUP_UID) {
            Some(group) => store.ledger().contacts_in(group.local_id).collect(),
            None => Vec::new(),
        };
        contacts.sort_by(|a, b| {
            (&a.name.family, &a.name.given, &a.uid).cmp(&(&b.name.family, &b.name.given, &b.uid))
        });

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&contacts)
                    .context("failed to serialize contacts JSON")?
            );
            return Ok(());
        }

        if contacts.is_empty() {
            println!("No contacts synced yet.");
            println!("Run: coworkers sync");
            return Ok(());
        }

        let count = contacts.len();
        let rows: Vec<ContactRow> = contacts.into_iter().map(row).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{count} contacts");
        Ok(())
    }
}

fn row(contact: &ContactRecord) -> ContactRow {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    ContactRow {
        name: contact.name.to_string(),
        position: text(&contact.position),
        email: text(&contact.email),
        mobile: text(&contact.mobile),
        skype: text(&contact.skype),
        photo: match (contact.photo.url(), contact.photo.is_synced()) {
            (None, _) => "none",
            (Some(_), true) => "synced",
            (Some(_), false) => "pending",
        },
    }
}
