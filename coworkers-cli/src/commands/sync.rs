//! `coworkers sync` — run one pass in the foreground.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use coworkers_sync::pipeline::{self, SyncOptions};
use coworkers_sync::{CancellationToken, Notifier, RunReport, RunStatus};

use super::super::NetworkArg;
use super::status::format_local;

/// Arguments for `coworkers sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Network the photo policy is evaluated against.
    #[arg(long, value_name = "NETWORK", default_value = "unmetered")]
    pub network: NetworkArg,

    /// HTTP timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Prints notifications to stderr so `--json` output stays clean.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{} {message}", "notice:".cyan().bold());
    }
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let options = SyncOptions {
            network: self.network.into(),
            timeout: Duration::from_secs(self.timeout),
        };

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("interrupt received, stopping after the current record");
            on_interrupt.cancel();
        })
        .context("failed to install the Ctrl-C handler")?;

        let report = pipeline::run(&home, &options, &StderrNotifier, &cancel)
            .context("sync could not start — run `coworkers sign-in` first?")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
        } else {
            print_report(&report);
        }

        if report.status == RunStatus::Interrupted {
            bail!("sync interrupted");
        }
        if report.status.is_failure() {
            bail!(
                "sync {}: {}",
                report.status,
                report.error.as_deref().unwrap_or("no detail")
            );
        }
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    let stats = &report.stats;
    let mark = match report.status {
        RunStatus::Completed => "✓".green().bold(),
        RunStatus::Interrupted => "■".yellow().bold(),
        RunStatus::StorageError | RunStatus::DirectoryUnavailable => "✗".red().bold(),
    };
    println!(
        "{mark} sync {} ({} inserted, {} updated, {} deleted, {} skipped)",
        report.status, stats.inserted, stats.updated, stats.deleted, stats.skipped
    );

    let photos = &report.photos;
    if photos.downloaded + photos.cleared + photos.deferred + photos.failed > 0 {
        println!(
            "  photos: {} downloaded, {} cleared, {} deferred, {} failed",
            photos.downloaded, photos.cleared, photos.deferred, photos.failed
        );
    }
    if let Some(next) = report.next_run {
        println!("  next run: {}", format_local(next));
    }
}
