use crate::error::{AppError, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessStatus, System};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// How long `kill_all` waits for each killed worker to go away
const KILL_WAIT: Duration = Duration::from_secs(3);
const KILL_POLL: Duration = Duration::from_millis(50);

/// Keeps the office suite's worker process in a known state.
///
/// Workers are found by process name, so every supervisor configured with
/// the same name sees (and kills) the same processes.
#[derive(Debug, Clone)]
pub struct EngineSupervisor {
    soffice_path: PathBuf,
    worker_name: String,
}

impl EngineSupervisor {
    pub fn new(soffice_path: PathBuf, worker_name: String) -> Self {
        Self {
            soffice_path,
            worker_name,
        }
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Pids of live (non-zombie) workers
    pub async fn running_workers(&self) -> Vec<Pid> {
        let name = self.worker_name.clone();
        tokio::task::spawn_blocking(move || scan_workers(&name))
            .await
            .unwrap_or_else(|e| {
                warn!("Process scan panicked: {}", e);
                Vec::new()
            })
    }

    /// Start a headless engine unless a worker is already up.
    ///
    /// Returns `true` when a new engine was launched.
    pub async fn ensure_running(&self) -> Result<bool> {
        let running = self.running_workers().await;
        if !running.is_empty() {
            debug!(
                "Reusing {} running {} process(es)",
                running.len(),
                self.worker_name
            );
            return Ok(false);
        }

        let child = Command::new(&self.soffice_path)
            .args(["--headless", "--nofirststartwizard"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| startup_error(&self.soffice_path, e))?;

        info!(
            "Started headless engine {} (pid {:?})",
            self.soffice_path.display(),
            child.id()
        );
        // The engine keeps running detached; `kill_all` is what stops it.
        drop(child);
        Ok(true)
    }

    /// Kill every worker matching the configured name.
    ///
    /// Best-effort: failures are logged and the number of processes that
    /// were signalled is returned.
    pub async fn kill_all(&self) -> usize {
        let name = self.worker_name.clone();
        let killed = match tokio::task::spawn_blocking(move || kill_workers(&name)).await {
            Ok(killed) => killed,
            Err(e) => {
                warn!("Failed to kill {} processes: {}", self.worker_name, e);
                return 0;
            }
        };

        if killed > 0 {
            info!("Killed {} {} process(es)", killed, self.worker_name);
        }
        killed
    }
}

pub(crate) fn startup_error(path: &Path, err: io::Error) -> AppError {
    if err.kind() == io::ErrorKind::NotFound {
        AppError::Startup(format!(
            "Office not found at: '{}'. Is LibreOffice installed?",
            path.display()
        ))
    } else {
        AppError::Startup(format!("Failed to launch '{}': {}", path.display(), err))
    }
}

/// Windows reports image names with their `.exe`; either spelling matches.
fn is_worker(process_name: &str, worker_name: &str) -> bool {
    strip_exe(process_name) == strip_exe(worker_name)
}

fn strip_exe(name: &str) -> &str {
    match name.len().checked_sub(4).filter(|i| *i > 0) {
        Some(i) if name.get(i..).is_some_and(|ext| ext.eq_ignore_ascii_case(".exe")) => &name[..i],
        _ => name,
    }
}

fn live_workers(sys: &System, name: &str) -> Vec<Pid> {
    sys.processes()
        .values()
        .filter(|p| p.status() != ProcessStatus::Zombie && is_worker(p.name(), name))
        .map(|p| p.pid())
        .collect()
}

fn scan_workers(name: &str) -> Vec<Pid> {
    let mut sys = System::new();
    sys.refresh_processes();
    live_workers(&sys, name)
}

/// Kill matching workers and wait for each to exit. Runs on a blocking thread.
fn kill_workers(name: &str) -> usize {
    let mut sys = System::new();
    sys.refresh_processes();

    let killed: Vec<Pid> = live_workers(&sys, name)
        .into_iter()
        .filter(|pid| match sys.process(*pid) {
            Some(p) if p.kill() => true,
            _ => {
                warn!("Could not kill {} (pid {})", name, pid);
                false
            }
        })
        .collect();

    for pid in &killed {
        if !wait_for_exit(&mut sys, *pid) {
            warn!("{} (pid {}) still alive after kill", name, pid);
        }
    }
    killed.len()
}

fn wait_for_exit(sys: &mut System, pid: Pid) -> bool {
    let started = Instant::now();
    loop {
        let gone = !sys.refresh_process(pid)
            || sys
                .process(pid)
                .map(|p| p.status() == ProcessStatus::Zombie)
                .unwrap_or(true);
        if gone {
            return true;
        }
        if started.elapsed() >= KILL_WAIT {
            return false;
        }
        std::thread::sleep(KILL_POLL);
    }
}
