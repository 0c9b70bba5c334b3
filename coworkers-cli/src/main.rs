//! Coworkers — keep a local address book group in step with the company
//! employee directory.
//!
//! # Usage
//!
//! ```text
//! coworkers sign-in --endpoint <url> --username <name> [--password <pw>] [--no-verify]
//! coworkers sign-out [--purge]
//! coworkers settings show [--json]
//! coworkers settings set <key> <value>
//! coworkers sync [--network offline|metered|unmetered] [--json]
//! coworkers status [--json]
//! coworkers contacts [--json]
//! coworkers daemon start|stop|status|sync|logs
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    account::{SignInArgs, SignOutArgs},
    contacts::ContactsArgs,
    daemon::DaemonCommand,
    settings::SettingsCommand,
    status::StatusArgs,
    sync::SyncArgs,
};
use coworkers_sync::NetworkState;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "coworkers",
    version,
    about = "Sync the company employee directory into a local contact group",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save the directory account, verifying the credentials first.
    SignIn(SignInArgs),

    /// Forget the directory account.
    SignOut(SignOutArgs),

    /// Show or change sync settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Run one sync pass now.
    Sync(SyncArgs),

    /// Show the last pass and the next scheduled one.
    Status(StatusArgs),

    /// List the contacts in the local group.
    Contacts(ContactsArgs),

    /// Run and control the background sync daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Shared network argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `NetworkState` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkArg(pub NetworkState);

impl FromStr for NetworkArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<NetworkState>().map(Self).map_err(|_| {
            format!("unknown network '{s}'; expected: offline, metered, unmetered")
        })
    }
}

impl fmt::Display for NetworkArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<NetworkArg> for NetworkState {
    fn from(n: NetworkArg) -> Self {
        n.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The daemon installs its own subscriber.
    if !matches!(
        cli.command,
        Commands::Daemon {
            command: DaemonCommand::Start(_)
        }
    ) {
        init_logging();
    }

    match cli.command {
        Commands::SignIn(args) => args.run(),
        Commands::SignOut(args) => args.run(),
        Commands::Settings { command } => commands::settings::run(command),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Contacts(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}

fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    let _ = env_logger::Builder::from_env(env).try_init();
}
