use crate::cancel::CancelToken;
use crate::error::SnapkeepError;
use crate::layout::SNAPSHOT_DIR_NAME;
use crate::naming::{has_timestamp, parse_versioned, split_name};
use crate::Result;
use chrono::{DateTime, Local};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Which storage area a version was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Daily,
    Snapshot,
}

impl SourceKind {
    /// User-facing label for this storage area
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Daily => "Backup",
            SourceKind::Snapshot => "Snapshot",
        }
    }
}

/// One historical version of a file, reconstructed from filesystem state.
#[derive(Debug, Clone)]
pub struct VersionEntry {
    pub path: PathBuf,
    pub modified_at: SystemTime,
    pub size_bytes: u64,
    pub source_kind: SourceKind,
    /// Stem of the owning file; `base_name + extension` is its full name.
    pub base_name: String,
    pub extension: String,
}

/// A version entry formatted for presentation.
#[derive(Debug, Clone)]
pub struct DisplayRecord {
    /// e.g. `10 March, 02:52pm (3 secs ago)`
    pub created: String,
    /// e.g. `1.5k`
    pub size: String,
    pub file_name: String,
    pub path: PathBuf,
    pub kind: &'static str,
}

struct Candidate {
    path: PathBuf,
    modified_at: SystemTime,
    size_bytes: u64,
    source_kind: SourceKind,
}

/// Find all historical versions of `target_file_name` across the daily
/// backup tree and the snapshot directory, newest first.
///
/// `target_file_name` is a file name, not a path. `display_limit` caps the
/// result length (0 = unlimited). An empty result means no versions exist;
/// it is not an error.
pub fn list_versions(
    target_file_name: &str,
    backup_root: &Path,
    snapshot_root: &Path,
    display_limit: usize,
    cancel: &CancelToken,
) -> Result<Vec<VersionEntry>> {
    let mut candidates = Vec::new();
    collect_candidates(backup_root, SourceKind::Daily, cancel, &mut candidates)?;
    collect_candidates(snapshot_root, SourceKind::Snapshot, cancel, &mut candidates)?;

    // Stable sort: entries with equal mtimes keep enumeration order.
    candidates.sort_by_key(|c| Reverse(c.modified_at));

    let mut seen = HashSet::new();
    let mut versions = Vec::new();

    for candidate in candidates {
        if display_limit != 0 && versions.len() >= display_limit {
            break;
        }

        let Some(file_name) = candidate.path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((base_name, extension)) = match_target(file_name, target_file_name) else {
            continue;
        };
        if !seen.insert(candidate.path.clone()) {
            continue;
        }

        versions.push(VersionEntry {
            path: candidate.path,
            modified_at: candidate.modified_at,
            size_bytes: candidate.size_bytes,
            source_kind: candidate.source_kind,
            base_name,
            extension,
        });
    }

    Ok(versions)
}

/// Match a backup file name against the owning file's name.
///
/// Versioned names match when their parsed stem+extension reconstructs the
/// target; names with no timestamp suffix match on exact equality (the very
/// first backup of a file is stored unversioned). Returns the owning file's
/// stem and extension.
fn match_target(file_name: &str, target: &str) -> Option<(String, String)> {
    if let Some(parsed) = parse_versioned(file_name) {
        if format!("{}{}", parsed.stem, parsed.extension) == target {
            return Some((parsed.stem.to_string(), parsed.extension.to_string()));
        }
        return None;
    }

    if !has_timestamp(file_name) && file_name == target {
        let (stem, extension) = split_name(file_name);
        return Some((stem.to_string(), extension.to_string()));
    }

    None
}

/// Walk one storage root recursively and record every regular file.
///
/// The snapshot directory lives inside the backup root, so the daily walk
/// skips it to keep each file tagged with a single source kind. A missing
/// root simply contributes nothing. Files that vanish between enumeration
/// and stat are skipped.
fn collect_candidates(
    root: &Path,
    kind: SourceKind,
    cancel: &CancelToken,
    out: &mut Vec<Candidate>,
) -> Result<()> {
    if !root.is_dir() {
        return Ok(());
    }

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        !(kind == SourceKind::Daily
            && entry.depth() == 1
            && entry.file_type().is_dir()
            && entry.file_name() == SNAPSHOT_DIR_NAME)
    });

    for entry in walker {
        if cancel.is_cancelled() {
            return Err(SnapkeepError::Interrupted);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                debug!(%error, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(error) => {
                debug!(path = %entry.path().display(), %error, "skipping unstattable file");
                continue;
            }
        };
        let modified_at = match metadata.modified() {
            Ok(modified_at) => modified_at,
            Err(_) => SystemTime::UNIX_EPOCH,
        };

        out.push(Candidate {
            path: entry.into_path(),
            modified_at,
            size_bytes: metadata.len(),
            source_kind: kind,
        });
    }

    Ok(())
}

/// Format version entries for presentation, newest-first order preserved.
pub fn display_records(entries: &[VersionEntry], now: DateTime<Local>) -> Vec<DisplayRecord> {
    entries
        .iter()
        .map(|entry| {
            let modified: DateTime<Local> = entry.modified_at.into();
            let elapsed = now.signed_duration_since(modified).num_seconds().max(0);
            let when = modified.format("%d %B, %I:%M%P").to_string();

            DisplayRecord {
                created: format!("{when} ({} ago)", format_relative(elapsed)),
                size: format_size(entry.size_bytes),
                file_name: format!("{}{}", entry.base_name, entry.extension),
                path: entry.path.clone(),
                kind: entry.source_kind.label(),
            }
        })
        .collect()
}

/// Format a byte count with binary prefixes, two decimals with trailing
/// zeros trimmed. Units stop at MiB; anything larger still reads in `m`.
pub fn format_size(bytes: u64) -> String {
    const SUFFIXES: [(&str, u64); 3] = [("b", 1 << 10), ("k", 1 << 20), ("m", 1 << 30)];

    for (suffix, limit) in SUFFIXES {
        if bytes >= limit {
            continue;
        }
        return format!("{}{suffix}", trim_decimal(bytes as f64 / (limit >> 10) as f64));
    }

    format!("{}m", trim_decimal(bytes as f64 / (1 << 20) as f64))
}

/// Round to two decimals and drop trailing zeros, keeping one decimal digit
fn trim_decimal(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let mut formatted = format!("{rounded:.2}");
    while formatted.ends_with('0') && !formatted.ends_with(".0") {
        formatted.pop();
    }
    formatted
}

/// Render elapsed seconds as the single most significant time unit:
/// days, then hours, then minutes (with leftover seconds), then seconds.
pub fn format_relative(seconds: i64) -> String {
    let days = seconds / 86_400;
    let mut rem = seconds - days * 86_400;
    let hours = rem / 3_600;
    rem -= hours * 3_600;
    let minutes = rem / 60;
    let secs = rem - minutes * 60;

    if days == 0 && hours == 0 && minutes == 0 {
        if secs == 1 {
            "1 sec".to_string()
        } else {
            format!("{secs} secs")
        }
    } else if days == 0 && hours == 0 && minutes == 1 && secs == 0 {
        "1 min".to_string()
    } else if days == 0 && hours == 0 {
        format!("{minutes} mins, {secs} secs")
    } else if days == 0 && hours == 1 {
        "1 hr".to_string()
    } else if days == 0 {
        format!("{hours} hrs")
    } else if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}
