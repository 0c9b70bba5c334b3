//! Run state: the last pass report and the next scheduled pass.
//!
//! Persists a [`RunState`] JSON document at
//! `<home>/.coworkers/state/<account>.json`.
//! Writes use the same atomic `.tmp` + rename pattern as the settings.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, SyncError};
use crate::run::RunReport;

/// On-disk run state for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<RunReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
}

impl RunState {
    /// Remember `report`; a completed pass also moves the next run forward.
    pub fn record(&mut self, report: RunReport) {
        if let Some(at) = report.next_run {
            self.next_run = Some(at);
        }
        self.last = Some(report);
    }

    /// Whether a pass is due at `now`. With nothing scheduled yet, it is.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run.map_or(true, |at| at <= now)
    }
}

/// `~/.coworkers/state/<account_key>.json`
pub fn state_path_at(home: &Path, account_key: &str) -> PathBuf {
    home.join(".coworkers")
        .join("state")
        .join(format!("{account_key}.json"))
}

/// Load the run state; an empty state if the file does not exist yet.
pub fn load_at(home: &Path, account_key: &str) -> Result<RunState, SyncError> {
    let path = state_path_at(home, account_key);
    if !path.exists() {
        return Ok(RunState::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the run state atomically.
pub fn save_at(home: &Path, account_key: &str, state: &RunState) -> Result<(), SyncError> {
    let path = state_path_at(home, account_key);
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid run state path"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Remove the run state. Missing state is not an error.
pub fn remove_at(home: &Path, account_key: &str) -> Result<(), SyncError> {
    let path = state_path_at(home, account_key);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}
