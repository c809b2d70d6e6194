use crate::cancel::CancelToken;
use crate::layout::SNAPSHOT_DIR_NAME;
use crate::naming::parse_daily_dir;
use crate::Result;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Delete daily backup directories whose age meets or exceeds the retention
/// window, returning how many were removed.
///
/// A `retention_days` of 0 keeps everything. The reserved `Snapshots`
/// directory and any subdirectory whose name is not a `YYYY-MM-DD` date are
/// skipped. Deletion is best-effort per directory: a failed removal is
/// logged and the walk continues. Cancellation returns the count so far.
pub fn prune(
    root: &Path,
    retention_days: i64,
    today: NaiveDate,
    cancel: &CancelToken,
) -> Result<usize> {
    if retention_days == 0 {
        return Ok(0);
    }

    let mut pruned = 0;

    for entry in fs::read_dir(root)? {
        if cancel.is_cancelled() {
            debug!(pruned, "prune cancelled");
            return Ok(pruned);
        }

        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name == SNAPSHOT_DIR_NAME {
            continue;
        }

        let Some(dir_date) = parse_daily_dir(name) else {
            debug!(name, "skipping non-date directory");
            continue;
        };

        let age_days = (today - dir_date).num_days();
        if age_days < retention_days {
            continue;
        }

        let path = entry.path();
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                debug!(path = %path.display(), age_days, "pruned daily directory");
                pruned += 1;
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to prune directory");
            }
        }
    }

    Ok(pruned)
}
