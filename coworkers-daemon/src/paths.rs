use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DAEMON_LOG: &str = "daemon.log";
pub const DAEMON_SOCKET: &str = "daemon.sock";

/// Wait before retrying after a failed pass.
pub const RETRY_AFTER: Duration = Duration::from_secs(60 * 60);
/// Longest single sleep of the scheduler; the run state is re-read after it.
pub const MAX_SLEEP: Duration = Duration::from_secs(15 * 60);
/// How often to look for an account when none is configured.
pub const ACCOUNT_POLL: Duration = Duration::from_secs(60);

pub fn coworkers_root(home: &Path) -> PathBuf {
    home.join(".coworkers")
}

pub fn run_dir(home: &Path) -> PathBuf {
    coworkers_root(home).join("run")
}

pub fn socket_path(home: &Path) -> PathBuf {
    run_dir(home).join(DAEMON_SOCKET)
}

pub fn logs_dir(home: &Path) -> PathBuf {
    coworkers_root(home).join("logs")
}

pub fn log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(DAEMON_LOG)
}
