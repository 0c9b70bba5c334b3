//! `coworkers status` — last pass, next pass and daemon visibility.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use coworkers_core::config;
use coworkers_daemon::{send_request, DaemonRequest};
use coworkers_sync::{run_state, RunReport, RunStatus};

/// Arguments for `coworkers status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusJson {
    signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    daemon_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_run: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_run: Option<DateTime<Utc>>,
    /// A pass is overdue and runs as soon as the daemon gets to it.
    due: bool,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let account = config::find_account_at(&home).context("failed to read the account file")?;
        let daemon_running = daemon_running(&home);

        let status = match &account {
            Some(account) => {
                let state = run_state::load_at(&home, &account.key())
                    .context("failed to load the run state")?;
                StatusJson {
                    signed_in: true,
                    account: Some(account.name().to_string()),
                    endpoint: Some(account.endpoint.clone()),
                    daemon_running,
                    due: state.is_due(Utc::now()),
                    last_run: state.last,
                    next_run: state.next_run,
                }
            }
            None => StatusJson {
                signed_in: false,
                account: None,
                endpoint: None,
                daemon_running,
                last_run: None,
                next_run: None,
                due: false,
            },
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(status);
        Ok(())
    }
}

/// A single request, no retries: status must not stall when nothing listens.
fn daemon_running(home: &Path) -> bool {
    send_request(home, &DaemonRequest::new("status"))
        .map(|response| response.ok)
        .unwrap_or(false)
}

fn print_table(status: StatusJson) {
    println!("Coworkers v{}", env!("CARGO_PKG_VERSION"));

    let Some(account) = status.account else {
        println!("Not signed in.");
        println!("Run: coworkers sign-in --endpoint <url> --username <name>");
        return;
    };

    let mut rows = vec![
        StatusRow {
            field: "account",
            value: account,
        },
        StatusRow {
            field: "endpoint",
            value: status.endpoint.unwrap_or_default(),
        },
        StatusRow {
            field: "daemon",
            value: if status.daemon_running {
                "running".green().to_string()
            } else {
                "stopped".bright_black().to_string()
            },
        },
    ];

    match &status.last_run {
        Some(last) => {
            rows.push(StatusRow {
                field: "last run",
                value: format!("{} ({})", format_local(last.finished_at), status_label(last.status)),
            });
            rows.push(StatusRow {
                field: "changes",
                value: format!(
                    "{} inserted, {} updated, {} deleted, {} skipped",
                    last.stats.inserted, last.stats.updated, last.stats.deleted, last.stats.skipped
                ),
            });
            if let Some(error) = &last.error {
                rows.push(StatusRow {
                    field: "error",
                    value: error.clone(),
                });
            }
        }
        None => rows.push(StatusRow {
            field: "last run",
            value: "never".to_string(),
        }),
    }

    rows.push(StatusRow {
        field: "next run",
        value: match status.next_run {
            Some(at) if status.due => format!("{} (due now)", format_local(at)),
            Some(at) => format_local(at),
            None => "due now".to_string(),
        },
    });

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn status_label(status: RunStatus) -> String {
    let label = status.to_string();
    match status {
        RunStatus::Completed => label.green().to_string(),
        RunStatus::Interrupted => label.yellow().to_string(),
        RunStatus::StorageError | RunStatus::DirectoryUnavailable => label.red().to_string(),
    }
}

pub(crate) fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%a %Y-%m-%d %H:%M").to_string()
}
