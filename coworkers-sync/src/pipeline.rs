//! Shared sync pipeline entrypoint used by CLI and daemon.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use coworkers_core::{config, Account};
use coworkers_directory::{Credentials, Directory, DirectoryClient, UreqTransport};
use coworkers_store::FileStore;

use crate::connectivity::{NetworkState, StaticConnectivity};
use crate::notify::Notifier;
use crate::run::{RunContext, RunReport, SyncConfig, SyncRun};
use crate::run_state;
use crate::schedule::NextRun;
use crate::SyncError;

/// Per-invocation knobs that are not user settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Network the photo gate evaluates against.
    pub network: NetworkState,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            network: NetworkState::Unmetered,
            timeout: Duration::from_secs(30),
        }
    }
}

pub fn credentials(account: &Account) -> Credentials {
    Credentials::new(&account.username, &account.password)
}

/// Run one pass for the configured account against the real directory.
///
/// This is the canonical sync entrypoint for both `coworkers sync` and the
/// daemon processor.
pub fn run(
    home: &Path,
    options: &SyncOptions,
    notifier: &dyn Notifier,
    cancel: &CancellationToken,
) -> Result<RunReport, SyncError> {
    let directory = DirectoryClient::new(UreqTransport::new(options.timeout));
    run_with(home, &directory, options.network, notifier, cancel)
}

/// [`run`] against any [`Directory`].
///
/// Loads settings and account, opens the account's file store, executes the
/// pass and records the report in the run state. Only setup and bookkeeping
/// failures are errors; the pass itself always yields a report.
pub fn run_with<D: Directory + ?Sized>(
    home: &Path,
    directory: &D,
    network: NetworkState,
    notifier: &dyn Notifier,
    cancel: &CancellationToken,
) -> Result<RunReport, SyncError> {
    let account = config::load_account_at(home)?;
    let settings = config::load_settings_at(home)?;
    let key = account.key();

    let mut store = FileStore::open_at(home, &key)?;
    let mut state = run_state::load_at(home, &key)?;
    let mut scheduler = NextRun::default();

    tracing::info!("sync started for {}", account.name());
    let sync = SyncRun::new(
        SyncConfig::from(&settings),
        account.endpoint.clone(),
        credentials(&account),
    );
    let report = sync.execute(
        RunContext {
            store: &mut store,
            directory,
            connectivity: &StaticConnectivity(network),
            scheduler: &mut scheduler,
            notifier,
        },
        cancel,
    );

    state.record(report.clone());
    run_state::save_at(home, &key, &state)?;
    Ok(report)
}

/// Check that `account` can read the employee list. Returns the number of
/// employees visible to it.
pub fn verify_account<D: Directory + ?Sized>(
    directory: &D,
    account: &Account,
) -> Result<usize, SyncError> {
    let employees = directory.fetch_employees(&account.endpoint, &credentials(account))?;
    Ok(employees.len())
}
