use std::collections::HashMap;
use std::fs::OpenOptions;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::{KillError, LaunchError, ProcessInfo, ProcessRecord};

/// How long a process gets to honour SIGTERM before SIGKILL
pub const KILL_GRACE: Duration = Duration::from_secs(1);

/// How long to wait for the reaper after SIGKILL. Together with
/// [`KILL_GRACE`] this stays under the default client timeout.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(2);

struct Entry {
    /// Distinguishes a reused pid from the process that held it before
    seq: u64,
    record: ProcessRecord,
    exited: watch::Receiver<bool>,
}

type Entries = Arc<Mutex<HashMap<u32, Entry>>>;

/// Table of children spawned by this daemon, keyed by pid
#[derive(Clone)]
pub struct ProcessTable {
    entries: Entries,
    next_seq: Arc<AtomicU64>,
    log_dir: PathBuf,
}

impl ProcessTable {
    pub fn new(log_dir: PathBuf) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_seq: Arc::new(AtomicU64::new(0)),
            log_dir,
        }
    }

    /// Spawn `template` with `args` appended and start tracking it.
    ///
    /// The child runs in its own process group with stdout and stderr going to
    /// a log file. Spawning and registering happen under the table lock, so
    /// the pid is either fully tracked or not at all.
    pub async fn launch(
        &self,
        section: &str,
        key: &str,
        template: &[String],
        args: &[String],
    ) -> Result<u32, LaunchError> {
        let Some((program, template_args)) = template.split_first() else {
            return Err(LaunchError::EmptyCommand);
        };

        let mut cmd_args = template_args.to_vec();
        cmd_args.extend(args.iter().cloned());

        // Held from opening the log until the entry is registered
        let mut entries = self.entries.lock().await;

        let start_time = Utc::now();
        let log_path = log_file_path(&self.log_dir, program, start_time.timestamp());
        let log_shared = entries.values().any(|e| e.record.log_path == log_path);
        let (stdout, stderr) = open_log(&log_path)?;

        let mut command = std::process::Command::new(program);
        command
            .args(&cmd_args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .process_group(0);
        let mut command = Command::from(command);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                if !log_shared {
                    let _ = std::fs::remove_file(&log_path);
                }
                return Err(LaunchError::from_spawn(program, e));
            }
        };

        let Some(pid) = child.id() else {
            if !log_shared {
                let _ = std::fs::remove_file(&log_path);
            }
            return Err(LaunchError::Spawn {
                program: program.clone(),
                message: "child exited before its pid could be read".to_string(),
            });
        };

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let (exit_tx, exit_rx) = watch::channel(false);

        entries.insert(
            pid,
            Entry {
                seq,
                record: ProcessRecord {
                    pid,
                    command: program.clone(),
                    args: cmd_args,
                    section: section.to_string(),
                    key: key.to_string(),
                    start_time,
                    log_path: log_path.clone(),
                },
                exited: exit_rx,
            },
        );

        tokio::spawn(reap(self.entries.clone(), pid, seq, child, log_path, exit_tx));
        drop(entries);

        info!(pid, section, key, "Started '{}'", program);
        Ok(pid)
    }

    /// Snapshot of every tracked process, sorted by pid
    pub async fn list(&self) -> Vec<ProcessInfo> {
        let now = Utc::now();
        let entries = self.entries.lock().await;
        let mut processes: Vec<ProcessInfo> = entries
            .values()
            .map(|entry| ProcessInfo::snapshot(&entry.record, now))
            .collect();
        processes.sort_by_key(|p| p.pid);
        processes
    }

    /// Terminate a tracked process.
    ///
    /// Sends SIGTERM to the process group, waits [`KILL_GRACE`], then sends
    /// SIGKILL if the child is still alive. Returns whether SIGKILL was needed.
    pub async fn kill(&self, pid: u32) -> Result<bool, KillError> {
        let (seq, mut exited) = {
            let entries = self.entries.lock().await;
            let entry = entries.get(&pid).ok_or(KillError::NotTracked(pid))?;
            (entry.seq, entry.exited.clone())
        };

        let group = Pid::from_raw(pid as i32);

        debug!(pid, "Sending SIGTERM");
        send_signal(group, Signal::SIGTERM, pid)?;

        let mut forced = false;
        if !wait_for_exit(&mut exited, KILL_GRACE).await {
            warn!(pid, "Process did not exit after SIGTERM, sending SIGKILL");
            forced = true;
            send_signal(group, Signal::SIGKILL, pid)?;
            if !wait_for_exit(&mut exited, KILL_REAP_TIMEOUT).await {
                warn!(pid, "Process not reaped after SIGKILL");
            }
        }

        remove_entry(&self.entries, pid, seq).await;
        info!(pid, forced, "Process terminated");
        Ok(forced)
    }

    pub async fn contains(&self, pid: u32) -> bool {
        self.entries.lock().await.contains_key(&pid)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Wait for the child, then drop its record and log file.
///
/// The log stays while another tracked process writes to the same file; the
/// last of them to exit removes it.
async fn reap(
    entries: Entries,
    pid: u32,
    seq: u64,
    mut child: Child,
    log_path: PathBuf,
    exit_tx: watch::Sender<bool>,
) {
    match child.wait().await {
        Ok(status) => debug!(pid, "Process exited: {}", status),
        Err(e) => warn!(pid, "Failed to wait for process: {}", e),
    }

    let mut guard = entries.lock().await;
    if !remove_owned(&mut guard, pid, seq) {
        debug!(pid, "Record already removed by kill");
    }

    if guard.values().any(|e| e.record.log_path == log_path) {
        debug!(pid, "Log {} still in use", log_path.display());
    } else if let Err(e) = std::fs::remove_file(&log_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(pid, "Failed to remove log {}: {}", log_path.display(), e);
        }
    }
    drop(guard);

    exit_tx.send_replace(true);
}

async fn remove_entry(entries: &Entries, pid: u32, seq: u64) -> bool {
    remove_owned(&mut *entries.lock().await, pid, seq)
}

/// Remove `pid` only if it still belongs to launch `seq`
fn remove_owned(entries: &mut HashMap<u32, Entry>, pid: u32, seq: u64) -> bool {
    match entries.get(&pid) {
        Some(entry) if entry.seq == seq => {
            entries.remove(&pid);
            true
        }
        _ => false,
    }
}

async fn wait_for_exit(exited: &mut watch::Receiver<bool>, limit: Duration) -> bool {
    tokio::time::timeout(limit, exited.wait_for(|done| *done))
        .await
        .is_ok()
}

fn send_signal(group: Pid, signal: Signal, pid: u32) -> Result<(), KillError> {
    match killpg(group, signal) {
        // Already gone, the reaper will notice
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(KillError::Signal {
            pid,
            message: errno.desc().to_string(),
        }),
    }
}

/// `<log_dir>/hyprdrive_<program>_<unix timestamp>.log`
fn log_file_path(log_dir: &Path, program: &str, timestamp: i64) -> PathBuf {
    let name: String = Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    log_dir.join(format!("hyprdrive_{}_{}.log", name, timestamp))
}

fn open_log(path: &Path) -> Result<(Stdio, Stdio), LaunchError> {
    let to_error = |e: std::io::Error| LaunchError::LogFile {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    let stdout = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_error)?;
    let stderr = stdout.try_clone().map_err(to_error)?;
    Ok((Stdio::from(stdout), Stdio::from(stderr)))
}
