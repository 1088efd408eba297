use crate::error::{AppError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process name of the office suite's worker binary
pub const DEFAULT_WORKER_NAME: &str = "soffice.bin";

/// Default per-request timeout (30 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Which deadline a conversion is held to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "secs")]
pub enum DeadlinePolicy {
    /// The timeout passed with each request is the real deadline
    Requested,
    /// Every conversion gets the same fixed grace period; the requested
    /// timeout is only reported
    FixedGrace(#[serde(serialize_with = "as_secs")] Duration),
}

impl DeadlinePolicy {
    pub fn deadline(&self, requested: Duration) -> Duration {
        match self {
            DeadlinePolicy::Requested => requested,
            DeadlinePolicy::FixedGrace(grace) => *grace,
        }
    }
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Path to the soffice executable
    pub soffice_path: PathBuf,
    /// Name the engine's worker shows up as in the process table
    pub worker_name: String,
    pub default_timeout: Duration,
    pub deadline: DeadlinePolicy,
    /// Terminate the engine after successful conversions too
    pub kill_after_success: bool,
}

impl ConverterConfig {
    pub fn new(soffice_path: impl Into<PathBuf>) -> Self {
        Self {
            soffice_path: soffice_path.into(),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            default_timeout: DEFAULT_TIMEOUT,
            deadline: DeadlinePolicy::Requested,
            kill_after_success: true,
        }
    }

    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_deadline(mut self, deadline: DeadlinePolicy) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_kill_after_success(mut self, kill: bool) -> Self {
        self.kill_after_success = kill;
        self
    }

    /// Build the configuration from the process environment.
    ///
    /// `SOFFICE_PATH` overrides the engine location, otherwise the usual
    /// install locations for the current OS are tried.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let soffice_path = lookup("SOFFICE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_soffice_path);

        let mut config = Self::new(soffice_path);

        if let Some(name) = lookup("DOCMILL_WORKER_NAME") {
            if name.is_empty() {
                return Err(AppError::Config(
                    "DOCMILL_WORKER_NAME must not be empty".to_string(),
                ));
            }
            config.worker_name = name;
        }

        if let Some(value) = lookup("DOCMILL_TIMEOUT_SECS") {
            config.default_timeout = parse_secs("DOCMILL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = lookup("DOCMILL_GRACE_SECS") {
            config.deadline = DeadlinePolicy::FixedGrace(parse_secs("DOCMILL_GRACE_SECS", &value)?);
        }

        if let Some(value) = lookup("DOCMILL_KEEP_ENGINE_WARM") {
            config.kill_after_success = !(value == "true" || value == "1");
        }

        Ok(config)
    }

    /// Reject configurations that cannot possibly drive an engine.
    pub fn validate(&self) -> Result<()> {
        if self.soffice_path.as_os_str().is_empty() {
            return Err(AppError::Config(
                "Office path 'soffice' is required".to_string(),
            ));
        }
        if self.worker_name.is_empty() {
            return Err(AppError::Config("Worker process name is required".to_string()));
        }
        Ok(())
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(AppError::Config(format!(
            "{} must be a positive number of seconds, got '{}'",
            key, value
        ))),
    }
}

fn default_soffice_path() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice")
    } else if cfg!(target_os = "windows") {
        PathBuf::from(r"C:\Program Files\LibreOffice\program\soffice.exe")
    } else {
        // Try common Linux paths
        for path in &["/usr/bin/soffice", "/usr/bin/libreoffice"] {
            if Path::new(path).exists() {
                return PathBuf::from(path);
            }
        }
        PathBuf::from("soffice")
    }
}
