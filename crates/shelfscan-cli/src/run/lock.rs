//! `.fetch_in_progress` lock keeping two runs off the same site.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};

pub(super) const LOCK_FILE_NAME: &str = ".fetch_in_progress";
const STALE_AFTER_HOURS: i64 = 6;

/// Held for the duration of a site run; the file is removed on drop.
#[derive(Debug)]
pub(super) struct SiteLock {
    path: PathBuf,
}

impl SiteLock {
    /// Take the lock at `path`, replacing it when it is stale.
    ///
    /// Returns `Ok(None)` when another run holds a fresh lock.
    pub(super) fn acquire(path: &Path) -> anyhow::Result<Option<Self>> {
        Self::acquire_at(path, Utc::now())
    }

    fn acquire_at(path: &Path, now: DateTime<Utc>) -> anyhow::Result<Option<Self>> {
        match create_lock_file(path, now) {
            Ok(()) => return Ok(Some(Self::held(path))),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to create {}", path.display()))
            }
        }

        let Some(locked_at) = lock_timestamp(path) else {
            tracing::warn!(path = %path.display(), "unreadable lock file, leaving it in place");
            return Ok(None);
        };
        if now - locked_at < TimeDelta::hours(STALE_AFTER_HOURS) {
            return Ok(None);
        }

        tracing::warn!(path = %path.display(), %locked_at, "replacing stale lock");
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to remove {}", path.display()))
            }
        }
        match create_lock_file(path, now) {
            Ok(()) => Ok(Some(Self::held(path))),
            // Another run replaced it first.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to create {}", path.display())),
        }
    }

    fn held(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl Drop for SiteLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock");
        }
    }
}

fn create_lock_file(path: &Path, now: DateTime<Utc>) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", std::process::id())?;
    writeln!(file, "{}", now.to_rfc3339())?;
    Ok(())
}

/// When the lock was taken: the recorded timestamp, else the file's mtime.
fn lock_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let recorded = fs::read_to_string(path).ok().and_then(|contents| {
        contents
            .lines()
            .nth(1)
            .and_then(|line| DateTime::parse_from_rfc3339(line.trim()).ok())
            .map(|ts| ts.with_timezone(&Utc))
    });
    recorded.or_else(|| {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    })
}
