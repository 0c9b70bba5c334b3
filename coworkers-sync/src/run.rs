//! One sync pass: group, employees, contacts, photos, schedule, notify.
//!
//! Every stage is preceded by a cancellation check. Group and directory
//! failures end the pass; per-record failures inside the reconciler and the
//! photo syncer only show up in the counters.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use coworkers_core::{
    Contact, ContactStore, DataError, Employee, Group, PhotoSync, Settings, SyncFrequency,
    SyncStats, Uid, GROUP_UID,
};
use coworkers_directory::{Credentials, Directory, DirectoryError};

use crate::cancel::checkpoint;
use crate::connectivity::Connectivity;
use crate::error::Interrupted;
use crate::notify::{Notifier, SYNC_COMPLETED};
use crate::photos::{PhotoStats, PhotoSyncer};
use crate::reconcile::Reconciler;
use crate::schedule::{next_run, Scheduler};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable settings for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub group_title: String,
    pub frequency: SyncFrequency,
    pub photos: PhotoSync,
    pub prefer_native_names: bool,
    pub notifications: bool,
}

impl From<&Settings> for SyncConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            group_title: settings.group_title.clone(),
            frequency: settings.sync_frequency,
            photos: settings.photos,
            prefer_native_names: settings.prefer_native_names,
            notifications: settings.notifications,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Terminal status of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Completed,
    Interrupted,
    StorageError,
    DirectoryUnavailable,
}

impl RunStatus {
    /// Whether the pass ended because something broke (not completed, not
    /// cancelled).
    pub fn is_failure(self) -> bool {
        matches!(self, RunStatus::StorageError | RunStatus::DirectoryUnavailable)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Interrupted => write!(f, "interrupted"),
            RunStatus::StorageError => write!(f, "storage-error"),
            RunStatus::DirectoryUnavailable => write!(f, "directory-unavailable"),
        }
    }
}

/// What a pass did, handed back to whoever invoked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub stats: SyncStats,
    #[serde(default)]
    pub photos: PhotoStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set when the pass completed and scheduled its successor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    /// Cause of a fatal failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Why a pass stopped early.
enum Abort {
    Interrupted,
    Group(DataError),
    Fetch(DirectoryError),
}

impl From<Interrupted> for Abort {
    fn from(_: Interrupted) -> Self {
        Abort::Interrupted
    }
}

// ---------------------------------------------------------------------------
// SyncRun
// ---------------------------------------------------------------------------

/// Collaborators a pass works against.
pub struct RunContext<'a, S: ContactStore + ?Sized, D: Directory + ?Sized> {
    pub store: &'a mut S,
    pub directory: &'a D,
    pub connectivity: &'a dyn Connectivity,
    pub scheduler: &'a mut dyn Scheduler,
    pub notifier: &'a dyn Notifier,
}

/// A configured pass for one account.
#[derive(Debug, Clone)]
pub struct SyncRun {
    config: SyncConfig,
    endpoint: String,
    credentials: Credentials,
}

impl SyncRun {
    pub fn new(config: SyncConfig, endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            config,
            endpoint: endpoint.into(),
            credentials,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Execute every stage in order. Never fails: fatal errors and
    /// cancellation are reported through [`RunReport::status`].
    pub fn execute<S, D>(
        &self,
        ctx: RunContext<'_, S, D>,
        cancel: &CancellationToken,
    ) -> RunReport
    where
        S: ContactStore + ?Sized,
        D: Directory + ?Sized,
    {
        let started_at = Utc::now();
        let mut report = RunReport {
            status: RunStatus::Completed,
            stats: SyncStats::default(),
            photos: PhotoStats::default(),
            started_at,
            finished_at: started_at,
            next_run: None,
            error: None,
        };

        match self.stages(ctx, cancel, &mut report) {
            Ok(()) => tracing::info!("sync completed: {}", summary(&report)),
            Err(Abort::Interrupted) => {
                tracing::info!("sync interrupted: {}", summary(&report));
                report.status = RunStatus::Interrupted;
            }
            Err(Abort::Group(err)) => {
                tracing::error!("sync failed: group not synced: {err}");
                report.status = RunStatus::StorageError;
                report.error = Some(err.to_string());
            }
            Err(Abort::Fetch(err)) => {
                tracing::error!("sync failed: directory not available: {err}");
                report.status = RunStatus::DirectoryUnavailable;
                report.error = Some(err.to_string());
            }
        }
        report.finished_at = Utc::now();
        report
    }

    fn stages<S, D>(
        &self,
        ctx: RunContext<'_, S, D>,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<(), Abort>
    where
        S: ContactStore + ?Sized,
        D: Directory + ?Sized,
    {
        checkpoint(cancel)?;
        let group = self.sync_group(&mut *ctx.store).map_err(Abort::Group)?;
        tracing::debug!("group synced");

        checkpoint(cancel)?;
        let employees = self.fetch_employees(ctx.directory).map_err(Abort::Fetch)?;
        tracing::info!("found {} employees", employees.len());

        checkpoint(cancel)?;
        let contacts = self.sync_contacts(&mut *ctx.store, &group, &employees, cancel, report)?;

        checkpoint(cancel)?;
        let mut photos =
            PhotoSyncer::new(&mut *ctx.store, ctx.directory, ctx.connectivity, self.config.photos);
        let outcome = photos.sync(&contacts, cancel);
        report.photos = photos.stats();
        report.stats.skipped += report.photos.failed;
        outcome?;

        checkpoint(cancel)?;
        let at = next_run(self.config.frequency, Local::now());
        ctx.scheduler.schedule(at);
        report.next_run = Some(at);

        if self.config.notifications {
            ctx.notifier.notify(SYNC_COMPLETED);
        }
        Ok(())
    }

    /// Find the group by its uid and refresh its title, or create it.
    fn sync_group<S: ContactStore + ?Sized>(&self, store: &mut S) -> Result<Group, DataError> {
        let title = &self.config.group_title;
        match store.find_group_by_uid(GROUP_UID)? {
            Some(group) => {
                store.update_group_title(&group, title)?;
                Ok(group)
            }
            None => store.create_group(GROUP_UID, title),
        }
    }

    fn fetch_employees<D: Directory + ?Sized>(
        &self,
        directory: &D,
    ) -> Result<BTreeMap<Uid, Employee>, DirectoryError> {
        let employees = directory.fetch_employees(&self.endpoint, &self.credentials)?;
        Ok(Employee::map_by_uid(employees))
    }

    fn sync_contacts<S: ContactStore + ?Sized>(
        &self,
        store: &mut S,
        group: &Group,
        employees: &BTreeMap<Uid, Employee>,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<BTreeMap<Uid, Contact>, Abort> {
        // Listing failure counts as a group failure.
        let contacts = store.find_contacts_by_group(group).map_err(Abort::Group)?;
        let contacts = Contact::map_by_uid(contacts);
        tracing::info!("found {} contacts", contacts.len());

        let mut reconciler = Reconciler::new(store, group, self.config.prefer_native_names);
        let outcome = reconciler.reconcile(employees, contacts, cancel);
        report.stats = reconciler.stats();
        Ok(outcome?)
    }
}

fn summary(report: &RunReport) -> String {
    let stats = &report.stats;
    format!(
        "created {}, updated {}, removed {}, skipped {}, photos {}",
        stats.inserted, stats.updated, stats.deleted, stats.skipped, report.photos.downloaded
    )
}
