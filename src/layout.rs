use crate::error::SnapkeepError;
use crate::naming::daily_dir_name;
use crate::Result;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Reserved directory name for user-triggered snapshots. Excluded from
/// date parsing and never pruned.
pub const SNAPSHOT_DIR_NAME: &str = "Snapshots";

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    if let Some(rest) = path.strip_prefix('~') {
        let home = std::env::var_os("HOME")
            .ok_or_else(|| SnapkeepError::config("Cannot expand ~: HOME is not set"))?;
        let rest = rest.trim_start_matches(['/', '\\']);
        if rest.is_empty() {
            Ok(PathBuf::from(home))
        } else {
            Ok(PathBuf::from(home).join(rest))
        }
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Validate and expand the configured root path without touching the
/// filesystem. Lookup uses this; it must never create directories.
pub fn resolve_root(root_path: &str) -> Result<PathBuf> {
    if root_path.trim().is_empty() {
        return Err(SnapkeepError::config("No backup root path specified"));
    }
    expand_home(root_path)
}

/// Resolve and create the backup root directory.
///
/// An empty configured path is a configuration error; creation failures other
/// than already-exists are storage errors carrying the offending path.
pub fn ensure_root(root_path: &str) -> Result<PathBuf> {
    let root = resolve_root(root_path)?;
    ensure_dir(&root)?;
    Ok(root)
}

/// Create (if absent) and return the daily backup directory for `date`,
/// e.g. `<root>/2024-03-10`.
pub fn ensure_daily_dir(root: &Path, date: NaiveDate) -> Result<PathBuf> {
    let dir = root.join(daily_dir_name(date));
    ensure_dir(&dir)?;
    Ok(dir)
}

/// Create (if absent) and return the snapshot directory, `<root>/Snapshots`.
pub fn ensure_snapshot_dir(root: &Path) -> Result<PathBuf> {
    let dir = root.join(SNAPSHOT_DIR_NAME);
    ensure_dir(&dir)?;
    Ok(dir)
}

/// Idempotent directory creation. `create_dir_all` treats already-exists as
/// success, so concurrent writers racing on the same daily directory are safe.
fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| SnapkeepError::Storage {
        path: dir.to_path_buf(),
        source,
    })
}
