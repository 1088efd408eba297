use super::cleanup::cleanup_temp;
use super::filter::FilterMode;
use super::supervisor::{startup_error, EngineSupervisor};
use crate::config::ConverterConfig;
use crate::error::{display_deadline, AppError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Upper bound on reaping our own child after a kill, and on draining its
/// stderr once it has exited
const REAP_WAIT: Duration = Duration::from_secs(3);

/// Drives `soffice --convert-to pdf` for one file at a time.
pub struct LibreOfficeEngine {
    config: ConverterConfig,
    supervisor: EngineSupervisor,
}

impl LibreOfficeEngine {
    /// Validate the configuration without touching the process table.
    pub fn new(config: ConverterConfig) -> Result<Self> {
        config.validate()?;
        let supervisor =
            EngineSupervisor::new(config.soffice_path.clone(), config.worker_name.clone());
        Ok(Self { config, supervisor })
    }

    /// Validate the configuration and make sure a headless engine is up.
    pub async fn start(config: ConverterConfig) -> Result<Self> {
        let engine = Self::new(config)?;
        engine.supervisor.ensure_running().await?;
        Ok(engine)
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn supervisor(&self) -> &EngineSupervisor {
        &self.supervisor
    }

    pub async fn ensure_running(&self) -> Result<bool> {
        self.supervisor.ensure_running().await
    }

    /// Check that the configured executable answers `--version`
    pub async fn is_available(&self) -> bool {
        Command::new(&self.config.soffice_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Arguments for a single conversion run
    pub fn conversion_args(input_path: &Path, output_dir: Option<&Path>) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--norestore",
            "--nofirststartwizard",
            "--headless",
            "--convert-to",
            "pdf",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        args.push(input_path.as_os_str().to_os_string());

        if let Some(dir) = output_dir.filter(|d| !d.as_os_str().is_empty()) {
            args.push("--outdir".into());
            args.push(dir.as_os_str().to_os_string());
        }
        args
    }

    pub async fn convert_with_default_timeout(
        &self,
        input_path: &Path,
        output_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        self.convert(input_path, output_dir, self.config.default_timeout)
            .await
    }

    /// Convert `input_path` to PDF and return where the engine writes it.
    ///
    /// Without an output directory the PDF lands next to the input. On
    /// failure the engine is killed, residual temp files are removed from
    /// the target directory and the original error is returned.
    pub async fn convert(
        &self,
        input_path: &Path,
        output_dir: Option<&Path>,
        timeout: Duration,
    ) -> Result<PathBuf> {
        let mode = FilterMode::from_path(input_path);
        if !mode.is_supported() {
            let ext = input_path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Err(AppError::UnsupportedFormat(format!(
                "Not a valid extension: '.{}'",
                ext
            )));
        }

        // The engine may run in the input's directory, so relative inputs
        // are resolved against ours first
        let input_path = std::path::absolute(input_path)?;
        let output_dir = output_dir.filter(|d| !d.as_os_str().is_empty());
        let input_parent = input_path.parent().filter(|p| !p.as_os_str().is_empty());
        let target_dir = output_dir
            .or(input_parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let pdf_path = target_dir.join(format!("{}.pdf", stem));

        let deadline = self.config.deadline.deadline(timeout);
        info!(
            "Converting {} to PDF using LibreOffice ({:?}, deadline {})",
            input_path.display(),
            mode,
            display_deadline(&deadline)
        );

        let result = match self
            .run_conversion(&input_path, output_dir, input_parent, deadline)
            .await
        {
            Ok(()) => expect_output(&pdf_path).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                if self.config.kill_after_success {
                    self.supervisor.kill_all().await;
                }
                Ok(pdf_path)
            }
            Err(e) => {
                warn!("Conversion of {} failed: {}", input_path.display(), e);
                self.supervisor.kill_all().await;
                cleanup_temp(&target_dir);
                Err(e)
            }
        }
    }

    async fn run_conversion(
        &self,
        input_path: &Path,
        output_dir: Option<&Path>,
        working_dir: Option<&Path>,
        deadline: Duration,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.config.soffice_path);
        cmd.args(Self::conversion_args(input_path, output_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // soffice writes into its working directory when --outdir is absent
        if output_dir.is_none() {
            if let Some(dir) = working_dir {
                cmd.current_dir(dir);
            }
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| startup_error(&self.config.soffice_path, e))?;
        debug!("Spawned soffice conversion (pid {:?})", child.id());

        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        match tokio::time::timeout(deadline, child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                if let Some(task) = stderr {
                    task.abort();
                }
                Ok(())
            }
            Ok(Ok(status)) => {
                let stderr = match stderr {
                    Some(task) => match tokio::time::timeout(REAP_WAIT, task).await {
                        Ok(Ok(text)) => text,
                        _ => String::new(),
                    },
                    None => String::new(),
                };
                Err(AppError::ConversionFailed(format!(
                    "soffice exited with {}: {}",
                    status,
                    stderr.trim()
                )))
            }
            Ok(Err(e)) => Err(AppError::Io(e)),
            Err(_) => {
                warn!(
                    "soffice did not finish within {}, killing it",
                    display_deadline(&deadline)
                );
                reap(&mut child).await;
                if let Some(task) = stderr {
                    task.abort();
                }
                Err(AppError::Timeout(deadline))
            }
        }
    }
}

/// soffice exits 0 even when it could not load the source, so the PDF
/// itself is the only proof of success
async fn expect_output(pdf_path: &Path) -> Result<()> {
    if tokio::fs::try_exists(pdf_path).await? {
        Ok(())
    } else {
        Err(AppError::ConversionFailed(format!(
            "soffice exited cleanly but wrote no PDF at {}",
            pdf_path.display()
        )))
    }
}

async fn reap(child: &mut Child) {
    match tokio::time::timeout(REAP_WAIT, child.kill()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Failed to kill soffice child: {}", e),
        Err(_) => warn!("soffice child (pid {:?}) did not exit after kill", child.id()),
    }
}
