use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::Instant;

use coworkers_core::config;
use coworkers_sync::pipeline::{self, SyncOptions};
use coworkers_sync::{run_state, CancellationToken, LogNotifier, RunReport, RunState};

use crate::error::{io_err, DaemonError};
use crate::paths::{
    log_path, logs_dir, run_dir, socket_path, ACCOUNT_POLL, MAX_SLEEP, RETRY_AFTER,
};
use crate::protocol::{DaemonRequest, DaemonResponse};

/// How the daemon process is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonOptions {
    pub sync: SyncOptions,
    /// Append log lines to `~/.coworkers/logs/daemon.log` instead of stderr.
    pub log_to_file: bool,
    /// Emit JSON log lines.
    pub json_logs: bool,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            sync: SyncOptions::default(),
            log_to_file: true,
            json_logs: false,
        }
    }
}

struct SyncJob {
    source: &'static str,
    respond_to: oneshot::Sender<Result<SyncSummary, String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub source: String,
    pub duration_ms: u128,
    #[serde(flatten)]
    pub report: RunReport,
}

/// What the processor is doing, shared with the status command.
#[derive(Debug, Default)]
struct Activity {
    in_progress: Option<&'static str>,
    last: Option<SyncSummary>,
}

type SharedActivity = Arc<RwLock<Activity>>;

/// The configured account and its persisted run state.
struct Schedule {
    account: String,
    state: RunState,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, options: DaemonOptions) -> Result<(), DaemonError> {
    ensure_runtime_dirs(home)?;
    init_tracing(home, &options);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), options))
}

/// Run the daemon runtime.
pub async fn run(home: PathBuf, options: DaemonOptions) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let activity: SharedActivity = Arc::new(RwLock::new(Activity::default()));
    let started_at_unix = unix_seconds_now();
    let cancel = CancellationToken::new();

    let (sync_tx, sync_rx) = mpsc::channel::<SyncJob>(64);
    // Receivers subscribe before any task runs so an early shutdown is never missed.
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    tracing::info!(home = %home.display(), "daemon starting");

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let sync_tx = sync_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = scheduler_task(home, sync_tx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let activity = activity.clone();
        let cancel = cancel.clone();
        let sync = options.sync;
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result =
                sync_processor_task(home, sync, activity, cancel, sync_rx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let activity = activity.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = socket_server_task(
                home,
                activity,
                sync_tx,
                shutdown.clone(),
                shutdown_rx,
                started_at_unix,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let rotation_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = log_rotation_task(home, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    // Any shutdown also cancels a pass that is still running.
    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            };
            cancel.cancel();
            result
        })
    };

    let (scheduler_result, processor_result, socket_result, rotation_result, signal_result) =
        tokio::join!(
            scheduler_handle,
            processor_handle,
            socket_handle,
            rotation_handle,
            signal_handle
        );

    handle_join("scheduler", scheduler_result)?;
    handle_join("sync_processor", processor_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("log_rotation", rotation_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("daemon stopped");
    Ok(())
}

async fn scheduler_task(
    home: PathBuf,
    sync_tx: mpsc::Sender<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        if !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty)) {
            break;
        }

        let delay = match load_schedule(home.clone()).await {
            Ok(Some(schedule)) => {
                let now = Utc::now();
                let wake = next_wake(&schedule.state, now);
                tracing::debug!(account = %schedule.account, wake = %wake, "next pass");
                delay_until(wake, now)
            }
            Ok(None) => ACCOUNT_POLL,
            Err(err) => {
                tracing::warn!(error = %err, "cannot read run state");
                ACCOUNT_POLL
            }
        };

        if !delay.is_zero() {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(delay) => continue,
            }
        }

        match enqueue_sync(&sync_tx, "schedule").await {
            Ok(summary) => {
                tracing::info!(
                    status = %summary.report.status,
                    inserted = summary.report.stats.inserted,
                    updated = summary.report.stats.updated,
                    deleted = summary.report.stats.deleted,
                    skipped = summary.report.stats.skipped,
                    duration_ms = summary.duration_ms,
                    "scheduled sync finished",
                );
            }
            Err(DaemonError::ChannelClosed(_)) => break,
            Err(err) => {
                // Nothing was recorded, so the pass is still due; back off.
                tracing::error!(error = %err, "scheduled sync failed");
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(RETRY_AFTER) => {}
                }
            }
        }
    }

    Ok(())
}

/// When the scheduler should start the next pass.
///
/// A pass is due at `next_run`, or right away when nothing is scheduled.
/// After a failed pass the retry waits [`RETRY_AFTER`] from its end.
fn next_wake(state: &RunState, now: DateTime<Utc>) -> DateTime<Utc> {
    let scheduled = state.next_run.unwrap_or(now);
    let retry_at = state
        .last
        .as_ref()
        .filter(|last| last.status.is_failure())
        .and_then(|last| {
            chrono::Duration::from_std(RETRY_AFTER)
                .ok()
                .map(|backoff| last.finished_at + backoff)
        });
    match retry_at {
        Some(retry_at) => scheduled.max(retry_at),
        None => scheduled,
    }
}

fn delay_until(wake: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (wake - now)
        .to_std()
        .map(|delay| delay.min(MAX_SLEEP))
        .unwrap_or(Duration::ZERO)
}

async fn sync_processor_task(
    home: PathBuf,
    options: SyncOptions,
    activity: SharedActivity,
    cancel: CancellationToken,
    mut sync_rx: mpsc::Receiver<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = sync_rx.recv() => {
                let Some(job) = maybe_job else { break };
                let started = Instant::now();
                activity.write().await.in_progress = Some(job.source);

                let home_for_sync = home.clone();
                let cancel = cancel.clone();
                let sync_result = tokio::task::spawn_blocking(move || {
                    pipeline::run(&home_for_sync, &options, &LogNotifier, &cancel)
                })
                .await
                .map_err(|err| DaemonError::Protocol(format!("sync task join error: {err}")))?;

                let outcome = match sync_result {
                    Ok(report) => {
                        let summary = SyncSummary {
                            source: job.source.to_string(),
                            duration_ms: started.elapsed().as_millis(),
                            report,
                        };
                        Ok(summary)
                    }
                    Err(err) => Err(err.to_string()),
                };

                {
                    let mut guard = activity.write().await;
                    guard.in_progress = None;
                    if let Ok(summary) = &outcome {
                        guard.last = Some(summary.clone());
                    }
                }

                let _ = job.respond_to.send(outcome);
            }
        }
    }

    Ok(())
}

async fn socket_server_task(
    home: PathBuf,
    activity: SharedActivity,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "control socket listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let home = home.clone();
                let activity = activity.clone();
                let sync_tx = sync_tx.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(
                        stream,
                        home,
                        activity,
                        sync_tx,
                        shutdown_tx,
                        started_at_unix,
                    ).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    home: PathBuf,
    activity: SharedActivity,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let response = match request.cmd.as_str() {
            "status" => {
                let payload = build_status_payload(&home, activity.clone(), started_at_unix).await;
                DaemonResponse::ok(payload)
            }
            "sync" => match enqueue_sync(&sync_tx, "socket").await {
                Ok(summary) => DaemonResponse::ok(json!(summary)),
                Err(err) => DaemonResponse::error(err.to_string()),
            },
            "stop" => {
                tracing::info!("stop requested over control socket");
                let _ = shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if request.cmd == "stop" {
            break;
        }
    }

    Ok(())
}

async fn build_status_payload(home: &Path, activity: SharedActivity, started_at_unix: u64) -> Value {
    let (in_progress, last) = {
        let activity = activity.read().await;
        (activity.in_progress, activity.last.clone())
    };

    let schedule = match load_schedule(home.to_path_buf()).await {
        Ok(schedule) => schedule,
        Err(err) => {
            tracing::warn!(error = %err, "cannot read run state for status");
            None
        }
    };
    let (account, next_run, last_run) = match schedule {
        Some(Schedule { account, state }) => (Some(account), state.next_run, state.last),
        None => (None, None, None),
    };

    json!({
        "running": true,
        "started_at_unix": started_at_unix,
        "account": account,
        "in_progress": in_progress,
        "next_run": next_run,
        "last_run": last_run,
        "last_daemon_sync": last,
        "socket": socket_path(home).display().to_string(),
        "log": log_path(home).display().to_string(),
    })
}

async fn enqueue_sync(
    sync_tx: &mpsc::Sender<SyncJob>,
    source: &'static str,
) -> Result<SyncSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    sync_tx
        .send(SyncJob {
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync response"))?;
    outcome.map_err(DaemonError::Protocol)
}

async fn load_schedule(home: PathBuf) -> Result<Option<Schedule>, DaemonError> {
    tokio::task::spawn_blocking(move || load_schedule_blocking(&home))
        .await
        .map_err(|err| DaemonError::Protocol(format!("run state join error: {err}")))?
}

fn load_schedule_blocking(home: &Path) -> Result<Option<Schedule>, DaemonError> {
    let Some(account) = config::find_account_at(home)? else {
        return Ok(None);
    };
    let state = run_state::load_at(home, &account.key())?;
    Ok(Some(Schedule {
        account: account.name().to_string(),
        state,
    }))
}

async fn log_rotation_task(
    home: PathBuf,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(Duration::from_secs(5));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let home = home.clone();
                tokio::task::spawn_blocking(move || {
                    crate::log_rotation::rotate_logs(&home);
                })
                .await
                .ok();
            }
        }
    }
    Ok(())
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    for dir in [run_dir(home), logs_dir(home)] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }
    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Reopens the daemon log for every event so rotation needs no handle swap.
struct LogFile(PathBuf);

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFile {
    type Writer = Box<dyn std::io::Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        match fs::OpenOptions::new().create(true).append(true).open(&self.0) {
            Ok(file) => Box::new(file),
            Err(_) => Box::new(std::io::stderr()),
        }
    }
}

fn init_tracing(home: &Path, options: &DaemonOptions) {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = if options.log_to_file {
        BoxMakeWriter::new(LogFile(log_path(home)))
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer);
    let _ = if options.json_logs {
        builder.json().try_init()
    } else {
        builder.with_ansi(!options.log_to_file).try_init()
    };
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
