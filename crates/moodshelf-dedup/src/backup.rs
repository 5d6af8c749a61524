use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{DedupError, Result};

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Copies the catalog file aside before anything destructive happens.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn create_backup(&self, source: &Path) -> Result<PathBuf> {
        self.create_backup_at(source, Local::now())
    }

    /// Copy `source` to `<dir>/<stem>_backup_<timestamp>.<ext>`. A `-wal`
    /// sidecar, if present, is copied next to it. Existing files are never
    /// overwritten; a numeric suffix is added instead.
    pub fn create_backup_at(&self, source: &Path, now: DateTime<Local>) -> Result<PathBuf> {
        let failure = |source_err: io::Error| DedupError::BackupFailure {
            path: source.to_path_buf(),
            source: source_err,
        };

        let mut input = File::open(source).map_err(failure)?;
        let expected_len = input.metadata().map_err(failure)?.len();

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "catalog".to_string());
        let ext = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "db".to_string());

        let (dest, mut output) =
            create_unique(&self.backup_dir, &format!("{stem}_backup"), &ext, now).map_err(failure)?;

        let copied = io::copy(&mut input, &mut output).and_then(|n| {
            output.sync_all()?;
            Ok(n)
        });
        match copied {
            Ok(n) if n == expected_len => {}
            Ok(n) => {
                discard(&dest);
                return Err(failure(io::Error::other(format!(
                    "short copy: {n} of {expected_len} bytes"
                ))));
            }
            Err(e) => {
                discard(&dest);
                return Err(failure(e));
            }
        }

        if let Err(e) = copy_wal_sidecar(source, &dest) {
            discard(&dest);
            return Err(failure(e));
        }

        tracing::info!(
            source = %source.display(),
            backup = %dest.display(),
            bytes = expected_len,
            "catalog backup created"
        );
        Ok(dest)
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn copy_wal_sidecar(source: &Path, dest: &Path) -> io::Result<()> {
    let wal = sidecar(source, "-wal");
    let has_frames = fs::metadata(&wal).map(|m| m.len() > 0).unwrap_or(false);
    if !has_frames {
        return Ok(());
    }

    let mut input = File::open(&wal)?;
    let mut output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(sidecar(dest, "-wal"))?;
    io::copy(&mut input, &mut output)?;
    output.sync_all()?;
    tracing::debug!(wal = %wal.display(), "copied WAL sidecar");
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "could not remove partial backup");
    }
}

/// Create `<dir>/<prefix>_<timestamp>.<ext>` with create-new semantics,
/// trying `_<n>` suffixes when the name is taken.
pub(crate) fn create_unique(
    dir: &Path,
    prefix: &str,
    ext: &str,
    now: DateTime<Local>,
) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{prefix}_{stamp}.{ext}")
        } else {
            format!("{prefix}_{stamp}_{attempt}.{ext}")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {prefix}_{stamp} in {}", dir.display()),
    ))
}
