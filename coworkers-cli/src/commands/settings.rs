//! `coworkers settings show` and `coworkers settings set <key> <value>`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use coworkers_core::{config, Settings};

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the current settings.
    Show(ShowArgs),

    /// Change one setting.
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// One of: group_title, sync_frequency, photos, prefer_native_names, notifications.
    pub key: String,

    pub value: String,
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "setting")]
    key: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

pub fn run(cmd: SettingsCommand) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let mut settings = config::load_settings_at(&home).context("failed to load settings")?;

    match cmd {
        SettingsCommand::Show(args) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&settings)
                        .context("failed to serialize settings JSON")?
                );
            } else {
                print_table(&settings);
            }
        }
        SettingsCommand::Set(args) => {
            settings
                .set(&args.key, &args.value)
                .with_context(|| format!("cannot set '{}'", args.key))?;
            config::save_settings_at(&home, &settings).context("failed to save settings")?;
            println!("✓ {} = {}", args.key, args.value);
        }
    }

    Ok(())
}

fn print_table(settings: &Settings) {
    let rows: Vec<SettingRow> = settings
        .entries()
        .into_iter()
        .map(|(key, value)| SettingRow { key, value })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
