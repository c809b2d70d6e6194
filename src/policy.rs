use crate::config::Config;
use crate::naming::split_name;
use std::path::Path;

/// Check whether a file is blocked by any of the configured exclusion lists.
///
/// A file is excluded when its extension is in `exclude_extensions`, its
/// directory-stripped stem is in `exclude_dirs`, or its full name is in
/// `exclude_files`.
pub fn is_excluded(file_path: &Path, config: &Config) -> bool {
    let Some(file_name) = file_path.file_name().and_then(|name| name.to_str()) else {
        // A path without a representable file name has nothing to match on.
        return false;
    };

    let (stem, extension) = split_name(file_name);

    (!extension.is_empty() && config.exclude_extensions.contains(extension))
        || config.exclude_dirs.contains(stem)
        || config.exclude_files.contains(file_name)
}

/// Decide whether a save of this buffer should produce a backup.
///
/// Eligible iff backups are enabled, the buffer has been modified since its
/// last backup, it is not empty, it is not excluded, and it fits under the
/// configured size limit (0 = unlimited).
pub fn is_eligible(file_path: &Path, buffer_size_bytes: u64, dirty: bool, config: &Config) -> bool {
    config.enabled
        && dirty
        && buffer_size_bytes > 0
        && !is_excluded(file_path, config)
        && (config.max_backup_size_bytes == 0 || buffer_size_bytes <= config.max_backup_size_bytes)
}
