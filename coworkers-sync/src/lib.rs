//! # coworkers-sync
//!
//! Reconciliation engine and pass orchestration.
//!
//! A pass ([`SyncRun`]) syncs the group, fetches the employee directory,
//! reconciles local contacts ([`Reconciler`]), syncs photos
//! ([`PhotoSyncer`]), schedules the next pass and notifies. Call
//! [`pipeline::run`] to execute one pass for the configured account with
//! its persisted store and run state.

pub mod cancel;
pub mod connectivity;
pub mod error;
pub mod notify;
pub mod photos;
pub mod pipeline;
pub mod reconcile;
pub mod run;
pub mod run_state;
pub mod schedule;

pub use connectivity::{Connectivity, NetworkState, StaticConnectivity};
pub use error::{Interrupted, SyncError};
pub use notify::{LogNotifier, Notifier, SYNC_COMPLETED};
pub use photos::{PhotoStats, PhotoSyncer};
pub use reconcile::Reconciler;
pub use run::{RunContext, RunReport, RunStatus, SyncConfig, SyncRun};
pub use run_state::RunState;
pub use schedule::{next_run, NextRun, Scheduler};
pub use tokio_util::sync::CancellationToken;
