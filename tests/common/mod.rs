//! Shell scripts standing in for `soffice`.
//!
//! The script's file name doubles as the worker process name, so a script
//! started with `--headless --nofirststartwizard` behaves like a resident
//! engine that `kill_all` can find.

#![allow(dead_code)]

use docmill::{ConverterConfig, LibreOfficeEngine};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Resident mode: sleep like a headless engine waiting for work
const RESIDENT: &str = r#"if [ "$1" = "--headless" ] && [ "$2" = "--nofirststartwizard" ]; then
  sleep 30
  exit 0
fi
"#;

/// Writes `<stem>.pdf` into `--outdir`, or the working directory without one
pub const WRITES_PDF: &str = r#"stem=$(basename "$6")
out="${8:-.}"
printf '%%PDF-1.4\n' > "$out/${stem%.*}.pdf"
"#;

/// Leaves a partial PDF behind and never finishes
pub const HANGS: &str = r#"if [ -n "$8" ]; then
  touch "$8/partial.pdf#"
fi
sleep 10
"#;

/// Prefix that fails like soffice when the input does not resolve
pub const REQUIRES_SOURCE: &str = r#"if [ ! -f "$6" ]; then
  echo "source file could not be loaded: $6 (cwd $(pwd))" >&2
  exit 1
fi
"#;

/// Reports the load error but exits 0 without output, as soffice does
pub const EXITS_CLEAN_WITHOUT_PDF: &str =
    "echo 'Error: source file could not be loaded' >&2\nexit 0\n";

pub const FAILS: &str = "echo 'source file could not be loaded' >&2\nexit 2\n";

pub struct FakeEngine {
    _dir: TempDir,
    pub path: PathBuf,
    pub name: String,
}

impl FakeEngine {
    pub fn new(conversion: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        // Stays under the 15 byte limit of Linux process names
        let name = format!("dmt-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
        let path = dir.path().join(&name);

        let script = format!("#!/bin/sh\n{}{}", RESIDENT, conversion);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self {
            _dir: dir,
            path,
            name,
        }
    }

    pub fn config(&self) -> ConverterConfig {
        ConverterConfig::new(&self.path).with_worker_name(self.name.clone())
    }

    pub fn engine(&self) -> LibreOfficeEngine {
        LibreOfficeEngine::new(self.config()).unwrap()
    }
}

/// Poll until the number of live workers satisfies `pred`
pub async fn wait_for_workers(
    engine: &LibreOfficeEngine,
    pred: impl Fn(usize) -> bool,
) -> usize {
    let started = Instant::now();
    loop {
        let count = engine.supervisor().running_workers().await.len();
        if pred(count) || started.elapsed() > Duration::from_secs(5) {
            return count;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

pub fn seed_residuals(dir: &Path) {
    for name in ["a.tmp", "b.pdf#", "c.txt"] {
        std::fs::write(dir.join(name), b"x").unwrap();
    }
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
