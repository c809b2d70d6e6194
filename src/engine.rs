use crate::cancel::CancelToken;
use crate::config::Config;
use crate::layout::{ensure_daily_dir, ensure_root, ensure_snapshot_dir, resolve_root, SNAPSHOT_DIR_NAME};
use crate::lookup::{display_records, list_versions, DisplayRecord};
use crate::naming::versioned_name;
use crate::policy::{is_eligible, is_excluded};
use crate::prune::prune;
use crate::Result;
use chrono::Local;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The byte-copy primitive, supplied by the environment.
///
/// The engine never reads file contents itself; it only asks for `src` to be
/// copied to `dst`. Tests inject failing implementations through this seam.
pub trait CopyFile {
    fn copy(&self, src: &Path, dst: &Path) -> std::io::Result<u64>;
}

/// Default copier backed by `std::fs::copy`
pub struct FsCopier;

impl CopyFile for FsCopier {
    fn copy(&self, src: &Path, dst: &Path) -> std::io::Result<u64> {
        fs::copy(src, dst)
    }
}

/// What a backup action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// A copy was written to this path
    Created(PathBuf),
    /// The pre-save original for this file already exists today
    AlreadyExists,
    /// Policy decided this save produces no backup
    Skipped,
}

/// Wires naming, policy, layout, pruning, and lookup together in response to
/// the host's save/modify/snapshot events.
///
/// Tracks one dirty flag per file path: set on the first modify event,
/// cleared after a backup attempt (successful or not — a failed copy is not
/// retried on the next identical save).
pub struct Engine {
    config: Config,
    copier: Box<dyn CopyFile>,
    dirty: HashMap<PathBuf, bool>,
    cancel: CancelToken,
}

impl Engine {
    pub fn new(config: Config, cancel: CancelToken) -> Self {
        Self::with_copier(config, cancel, Box::new(FsCopier))
    }

    pub fn with_copier(config: Config, cancel: CancelToken, copier: Box<dyn CopyFile>) -> Self {
        Self {
            config,
            copier,
            dirty: HashMap::new(),
            cancel,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record a modification event for this buffer
    pub fn note_modified(&mut self, path: &Path) {
        self.dirty.insert(path.to_path_buf(), true);
    }

    /// Whether this buffer has unbacked-up modifications
    pub fn is_dirty(&self, path: &Path) -> bool {
        self.dirty.get(path).copied().unwrap_or(false)
    }

    fn clear_dirty(&mut self, path: &Path) {
        self.dirty.insert(path.to_path_buf(), false);
    }

    /// Pre-save action: preserve the original, pre-save content of a file the
    /// first time it is ever saved with the engine running.
    ///
    /// Copies the old on-disk content into today's daily directory under the
    /// plain file name. No-ops if that copy already exists.
    pub fn backup_on_presave(&mut self, path: &Path, buffer_size: u64) -> Result<BackupOutcome> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %path.display(), "no usable file name, skipping");
            return Ok(BackupOutcome::Skipped);
        };

        if !is_eligible(path, buffer_size, self.is_dirty(path), &self.config) {
            return Ok(BackupOutcome::Skipped);
        }

        let root = ensure_root(&self.config.root_path)?;
        let daily = ensure_daily_dir(&root, Local::now().date_naive())?;

        let target = daily.join(file_name);
        if target.is_file() {
            // The original reference copy is permanent for the day; the
            // dirty flag stays set so the post-save versioned copy fires.
            return Ok(BackupOutcome::AlreadyExists);
        }

        self.copy_and_clear(path, &target)?;
        Ok(BackupOutcome::Created(target))
    }

    /// Post-save action: write a new versioned copy of the just-saved file
    /// into today's daily directory, pruning expired directories first.
    pub fn backup_on_postsave(&mut self, path: &Path, buffer_size: u64) -> Result<BackupOutcome> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %path.display(), "no usable file name, skipping");
            return Ok(BackupOutcome::Skipped);
        };

        if !is_eligible(path, buffer_size, self.is_dirty(path), &self.config) {
            return Ok(BackupOutcome::Skipped);
        }

        let root = ensure_root(&self.config.root_path)?;

        // Retention is best-effort; a failed walk never blocks the backup.
        match prune(&root, self.config.retention_days, Local::now().date_naive(), &self.cancel) {
            Ok(pruned) if pruned > 0 => debug!(pruned, "pruned expired daily directories"),
            Ok(_) => {}
            Err(error) => warn!(%error, "pruning failed"),
        }

        let daily = ensure_daily_dir(&root, Local::now().date_naive())?;
        let target = daily.join(versioned_name(file_name, Local::now().naive_local()));

        self.copy_and_clear(path, &target)?;
        Ok(BackupOutcome::Created(target))
    }

    /// Snapshot action: copy the current content into the snapshot directory
    /// under a versioned name, regardless of dirty state.
    pub fn create_snapshot(&mut self, path: &Path, buffer_size: u64) -> Result<BackupOutcome> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %path.display(), "no usable file name, skipping");
            return Ok(BackupOutcome::Skipped);
        };

        if !self.config.enabled || buffer_size == 0 || is_excluded(path, &self.config) {
            return Ok(BackupOutcome::Skipped);
        }

        let root = ensure_root(&self.config.root_path)?;
        let snapshots = ensure_snapshot_dir(&root)?;
        let target = snapshots.join(versioned_name(file_name, Local::now().naive_local()));

        match self.copier.copy(path, &target) {
            Ok(_) => Ok(BackupOutcome::Created(target)),
            Err(error) => {
                warn!(src = %path.display(), dst = %target.display(), %error, "snapshot copy failed");
                Err(error.into())
            }
        }
    }

    /// Run retention pruning on demand, returning the number of directories
    /// removed.
    pub fn prune_now(&self) -> Result<usize> {
        let root = ensure_root(&self.config.root_path)?;
        prune(&root, self.config.retention_days, Local::now().date_naive(), &self.cancel)
    }

    /// List the historical versions of `file_name`, formatted for display,
    /// newest first and capped at the configured display limit.
    ///
    /// Lookup only reads; it never creates directories. An empty result means
    /// the file has no backups yet.
    pub fn list_versions(&self, file_name: &str) -> Result<Vec<DisplayRecord>> {
        let root = resolve_root(&self.config.root_path)?;
        let snapshots = root.join(SNAPSHOT_DIR_NAME);

        let entries = list_versions(
            file_name,
            &root,
            &snapshots,
            self.config.display_limit,
            &self.cancel,
        )?;
        Ok(display_records(&entries, Local::now()))
    }

    /// Copy and clear the dirty flag. The flag is cleared even when the copy
    /// fails, so a broken destination cannot cause a retry storm; the failure
    /// is logged and returned for the host to surface.
    fn copy_and_clear(&mut self, src: &Path, dst: &Path) -> Result<()> {
        let result = self.copier.copy(src, dst);
        self.clear_dirty(src);

        match result {
            Ok(_) => Ok(()),
            Err(error) => {
                warn!(src = %src.display(), dst = %dst.display(), %error, "backup copy failed");
                Err(error.into())
            }
        }
    }
}
