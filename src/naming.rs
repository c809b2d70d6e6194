use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// Timestamp inserted into versioned file names, seconds resolution.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Date format used for daily backup directories.
const DAILY_DIR_FORMAT: &str = "%Y-%m-%d";

/// A timestamp suffix anywhere in a file name. Used to tell unversioned
/// names (the very first backup of a file) apart from versioned ones.
static TIMESTAMP_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\d{4}-\d{1,2}-\d{1,2}-\d{1,2}-\d{1,2}-\d{1,2}\)").unwrap()
});

/// The full versioned-name grammar: `<stem> (<timestamp>)<extension>`.
/// This is the parse direction of [`versioned_name`]; both directions live
/// in this module so they cannot drift apart.
static VERSIONED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+) \((\d{4})-(\d{1,2})-(\d{1,2})-(\d{1,2})-(\d{1,2})-(\d{1,2})\)(\.[^.]*)?$")
        .unwrap()
});

/// A backup file name parsed back into its structured parts.
///
/// `stem` + `extension` reconstructs the name of the owning file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName<'a> {
    pub stem: &'a str,
    pub extension: &'a str,
    pub timestamp: NaiveDateTime,
}

/// Insert a timestamp into `file_name`, just before the extension.
///
/// Both daily backups and snapshots use this format; only the containing
/// directory differs.
pub fn versioned_name(file_name: &str, when: NaiveDateTime) -> String {
    let (stem, extension) = split_name(file_name);
    format!("{stem} ({}){extension}", when.format(TIMESTAMP_FORMAT))
}

/// Name of the daily backup directory for the given local date, e.g. `2024-03-10`.
pub fn daily_dir_name(date: NaiveDate) -> String {
    date.format(DAILY_DIR_FORMAT).to_string()
}

/// Parse a directory name as a daily-backup date. Non-date names return `None`.
pub fn parse_daily_dir(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, DAILY_DIR_FORMAT).ok()
}

/// Parse a file name against the versioned-name grammar.
///
/// Returns `None` for names without a timestamp suffix and for names whose
/// timestamp fields do not form a real calendar date/time.
pub fn parse_versioned(file_name: &str) -> Option<ParsedName<'_>> {
    let caps = VERSIONED_NAME.captures(file_name)?;

    let field = |i: usize| caps.get(i).unwrap().as_str().parse::<u32>().ok();
    let year = caps.get(2).unwrap().as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(3)?, field(4)?)?;
    let timestamp = date.and_hms_opt(field(5)?, field(6)?, field(7)?)?;

    Some(ParsedName {
        stem: caps.get(1).unwrap().as_str(),
        extension: caps.get(8).map(|m| m.as_str()).unwrap_or(""),
        timestamp,
    })
}

/// Whether a file name carries a timestamp suffix anywhere.
pub fn has_timestamp(file_name: &str) -> bool {
    TIMESTAMP_SUFFIX.is_match(file_name)
}

/// Split a file name into stem and extension (the extension keeps its dot).
///
/// The extension is the substring from the last `.`; names with no dot and
/// dotfiles like `.bashrc` have an empty extension.
pub fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => file_name.split_at(pos),
        _ => (file_name, ""),
    }
}
