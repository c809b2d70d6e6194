use crate::error::SnapkeepError;
use crate::Result;
use configparser::ini::Ini;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Master switch; nothing is backed up while this is false.
    pub enabled: bool,
    /// Root of the backup tree. A leading `~` is expanded to the home directory.
    pub root_path: String,
    /// Buffers larger than this are not backed up. 0 = unlimited.
    pub max_backup_size_bytes: u64,
    /// File extensions (with dot, e.g. `.log`) that are never backed up.
    pub exclude_extensions: HashSet<String>,
    /// File stems that are never backed up.
    pub exclude_dirs: HashSet<String>,
    /// Exact file names that are never backed up.
    pub exclude_files: HashSet<String>,
    /// Daily directories older than this many days are pruned. 0 = keep forever.
    pub retention_days: i64,
    /// Maximum number of versions shown per lookup. 0 = unlimited.
    pub display_limit: usize,
    /// Ask the host to open restored versions as transient previews.
    pub use_transient_preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            enabled: true,
            root_path: "~/Backups".to_string(),
            max_backup_size_bytes: 0,
            exclude_extensions: HashSet::new(),
            exclude_dirs: HashSet::new(),
            exclude_files: HashSet::new(),
            retention_days: 0,
            display_limit: 100,
            use_transient_preview: false,
        }
    }
}

/// Get default configuration
pub fn default_config() -> Config {
    Config::default()
}

/// Load configuration from file, falling back to defaults
pub fn load_config() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        return Ok(default_config());
    }

    let mut conf = Ini::new();
    conf.load(&config_path)
        .map_err(|e| SnapkeepError::config(format!("Failed to parse config file: {e}")))?;

    let mut config = default_config();

    if let Some(value) = conf.get("snapkeep", "enabled") {
        config.enabled = parse_bool(&value).unwrap_or(config.enabled);
    }
    if let Some(value) = conf.get("snapkeep", "root_path") {
        config.root_path = value;
    }
    if let Some(value) = conf.get("snapkeep", "use_transient_preview") {
        config.use_transient_preview = parse_bool(&value).unwrap_or(config.use_transient_preview);
    }

    // Numeric values fail loudly; a typo here silently changing retention
    // or size limits would be worse than an error.
    if let Some(value) = conf.get("snapkeep", "max_backup_size_bytes") {
        config.max_backup_size_bytes = value
            .parse()
            .map_err(|_| SnapkeepError::config(format!("Invalid max_backup_size_bytes: {value}")))?;
    }
    if let Some(value) = conf.get("snapkeep", "retention_days") {
        config.retention_days = value
            .parse()
            .map_err(|_| SnapkeepError::config(format!("Invalid retention_days: {value}")))?;
    }
    if let Some(value) = conf.get("snapkeep", "display_limit") {
        config.display_limit = value
            .parse()
            .map_err(|_| SnapkeepError::config(format!("Invalid display_limit: {value}")))?;
    }

    if let Some(value) = conf.get("snapkeep", "exclude_extensions") {
        config.exclude_extensions = parse_list(&value);
    }
    if let Some(value) = conf.get("snapkeep", "exclude_dirs") {
        config.exclude_dirs = parse_list(&value);
    }
    if let Some(value) = conf.get("snapkeep", "exclude_files") {
        config.exclude_files = parse_list(&value);
    }

    Ok(config)
}

/// Get the configuration file path for the current platform
fn get_config_path() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Ok(PathBuf::from(appdata).join("snapkeep").join("config.ini"));
        }
    }

    // Unix-like systems (Linux, macOS, etc.)
    if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
        Ok(PathBuf::from(config_dir).join("snapkeep").join("config.ini"))
    } else if let Some(home) = std::env::var_os("HOME") {
        Ok(PathBuf::from(home)
            .join(".config")
            .join("snapkeep")
            .join("config.ini"))
    } else {
        Err(SnapkeepError::config("Could not determine config directory"))
    }
}

/// Parse a boolean value from INI string
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a comma-separated INI value into a set, dropping empty entries
fn parse_list(value: &str) -> HashSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Create a sample configuration file
pub fn create_sample_config() -> String {
    r#"[snapkeep]
# Master switch for all backups (true/false)
enabled = true

# Root directory for daily backups and snapshots; ~ expands to $HOME
root_path = ~/Backups

# Skip files larger than this many bytes; 0 = no limit
max_backup_size_bytes = 0

# Comma-separated extensions (with dot) that are never backed up
exclude_extensions = .log, .tmp

# Comma-separated file stems that are never backed up
exclude_dirs =

# Comma-separated exact file names that are never backed up
exclude_files =

# Delete daily backup directories older than this many days; 0 = keep forever
retention_days = 30

# Maximum versions shown per lookup; 0 = no limit
display_limit = 100

# Open restored versions as transient previews (true/false)
use_transient_preview = false
"#
    .to_string()
}

/// Display the current configuration in a user-friendly format
pub fn dump_config(config: &Config) -> Result<()> {
    let config_path = get_config_path()?;

    println!("snapkeep Configuration");
    println!("======================");
    println!();

    if config_path.exists() {
        println!("Config file: {} (found)", config_path.display());
    } else {
        println!(
            "Config file: {} (not found, using defaults)",
            config_path.display()
        );
    }
    println!();

    let mut extensions: Vec<_> = config.exclude_extensions.iter().cloned().collect();
    extensions.sort();
    let mut dirs: Vec<_> = config.exclude_dirs.iter().cloned().collect();
    dirs.sort();
    let mut files: Vec<_> = config.exclude_files.iter().cloned().collect();
    files.sort();

    println!("Current Settings:");
    println!("----------------");
    println!("enabled               = {}", config.enabled);
    println!("root_path             = {}", config.root_path);
    println!("max_backup_size_bytes = {}", config.max_backup_size_bytes);
    println!("exclude_extensions    = {}", extensions.join(", "));
    println!("exclude_dirs          = {}", dirs.join(", "));
    println!("exclude_files         = {}", files.join(", "));
    println!("retention_days        = {}", config.retention_days);
    println!("display_limit         = {}", config.display_limit);
    println!("use_transient_preview = {}", config.use_transient_preview);
    println!();

    println!("Backup layout with current settings:");
    println!("-----------------------------------");
    println!("{}/YYYY-MM-DD/example (YYYY-MM-DD-HH-MM-SS).txt", config.root_path);
    println!("{}/Snapshots/example (YYYY-MM-DD-HH-MM-SS).txt", config.root_path);

    if !config_path.exists() {
        println!();
        println!("To create a configuration file:");
        println!("------------------------------");
        println!(
            "1. Create directory: mkdir -p {}",
            config_path.parent().unwrap().display()
        );
        println!("2. Create config file with your preferred settings");
        println!("3. Use 'snapkeep --dump-config' again to verify");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::test_support::ENV_MUTEX;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert!(config.enabled);
        assert_eq!(config.root_path, "~/Backups");
        assert_eq!(config.max_backup_size_bytes, 0);
        assert!(config.exclude_extensions.is_empty());
        assert!(config.exclude_dirs.is_empty());
        assert!(config.exclude_files.is_empty());
        assert_eq!(config.retention_days, 0);
        assert_eq!(config.display_limit, 100);
        assert!(!config.use_transient_preview);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("invalid"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_parse_list() {
        let set = parse_list(".log, .tmp,.bak");
        assert_eq!(set.len(), 3);
        assert!(set.contains(".log"));
        assert!(set.contains(".tmp"));
        assert!(set.contains(".bak"));

        assert!(parse_list("").is_empty());
        assert!(parse_list(" , ,").is_empty());
    }

    #[test]
    fn test_load_config_nonexistent_file() {
        let _guard = ENV_MUTEX.lock().unwrap(); // Serialize environment access

        #[cfg(not(target_os = "windows"))]
        let (original_xdg, original_home) = (
            std::env::var_os("XDG_CONFIG_HOME"),
            std::env::var_os("HOME"),
        );

        let dir = tempdir().unwrap();

        #[cfg(not(target_os = "windows"))]
        std::env::set_var("XDG_CONFIG_HOME", dir.path());
        #[cfg(target_os = "windows")]
        std::env::set_var("APPDATA", dir.path());

        let config = load_config().unwrap();
        let default = default_config();

        assert_eq!(config.enabled, default.enabled);
        assert_eq!(config.root_path, default.root_path);
        assert_eq!(config.display_limit, default.display_limit);

        #[cfg(not(target_os = "windows"))]
        {
            if let Some(xdg) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", xdg);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
            if let Some(home) = original_home {
                std::env::set_var("HOME", home);
            } else {
                std::env::remove_var("HOME");
            }
        }
    }

    #[test]
    fn test_config_from_file() {
        let _guard = ENV_MUTEX.lock().unwrap(); // Serialize environment access

        #[cfg(not(target_os = "windows"))]
        let (original_xdg, original_home) = (
            std::env::var_os("XDG_CONFIG_HOME"),
            std::env::var_os("HOME"),
        );

        let dir = tempdir().unwrap();
        let config_dir = dir.path().join("snapkeep");
        fs::create_dir_all(&config_dir).unwrap();
        let config_path = config_dir.join("config.ini");

        let config_content = r#"[snapkeep]
enabled = false
root_path = /var/backups/editor
max_backup_size_bytes = 1048576
exclude_extensions = .log, .tmp
exclude_dirs = node_modules
exclude_files = secrets.env
retention_days = 14
display_limit = 25
use_transient_preview = true
"#;
        fs::write(&config_path, config_content).unwrap();

        #[cfg(not(target_os = "windows"))]
        {
            std::env::remove_var("HOME"); // Clear HOME to ensure XDG_CONFIG_HOME is used
            std::env::set_var("XDG_CONFIG_HOME", dir.path());
        }
        #[cfg(target_os = "windows")]
        std::env::set_var("APPDATA", dir.path());

        let config = load_config().unwrap();

        assert!(!config.enabled);
        assert_eq!(config.root_path, "/var/backups/editor");
        assert_eq!(config.max_backup_size_bytes, 1_048_576);
        assert!(config.exclude_extensions.contains(".log"));
        assert!(config.exclude_extensions.contains(".tmp"));
        assert!(config.exclude_dirs.contains("node_modules"));
        assert!(config.exclude_files.contains("secrets.env"));
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.display_limit, 25);
        assert!(config.use_transient_preview);

        #[cfg(not(target_os = "windows"))]
        {
            if let Some(xdg) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", xdg);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
            if let Some(home) = original_home {
                std::env::set_var("HOME", home);
            } else {
                std::env::remove_var("HOME");
            }
        }
    }

    #[test]
    fn test_config_partial_override() {
        let _guard = ENV_MUTEX.lock().unwrap(); // Serialize environment access

        #[cfg(not(target_os = "windows"))]
        let (original_xdg, original_home) = (
            std::env::var_os("XDG_CONFIG_HOME"),
            std::env::var_os("HOME"),
        );

        let dir = tempdir().unwrap();
        let config_dir = dir.path().join("snapkeep");
        fs::create_dir_all(&config_dir).unwrap();

        let config_content = r#"[snapkeep]
retention_days = 7
"#;
        fs::write(config_dir.join("config.ini"), config_content).unwrap();

        #[cfg(not(target_os = "windows"))]
        {
            std::env::remove_var("HOME"); // Clear HOME to ensure XDG_CONFIG_HOME is used
            std::env::set_var("XDG_CONFIG_HOME", dir.path());
        }
        #[cfg(target_os = "windows")]
        std::env::set_var("APPDATA", dir.path());

        let config = load_config().unwrap();
        let default = default_config();

        assert_eq!(config.retention_days, 7);
        assert_eq!(config.enabled, default.enabled);
        assert_eq!(config.root_path, default.root_path);
        assert_eq!(config.display_limit, default.display_limit);

        #[cfg(not(target_os = "windows"))]
        {
            if let Some(xdg) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", xdg);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
            if let Some(home) = original_home {
                std::env::set_var("HOME", home);
            } else {
                std::env::remove_var("HOME");
            }
        }
    }

    #[test]
    fn test_config_invalid_numeric() {
        let _guard = ENV_MUTEX.lock().unwrap(); // Serialize environment access

        #[cfg(not(target_os = "windows"))]
        let (original_xdg, original_home) = (
            std::env::var_os("XDG_CONFIG_HOME"),
            std::env::var_os("HOME"),
        );

        let dir = tempdir().unwrap();
        let config_dir = dir.path().join("snapkeep");
        fs::create_dir_all(&config_dir).unwrap();

        let config_content = r#"[snapkeep]
retention_days = not_a_number
"#;
        fs::write(config_dir.join("config.ini"), config_content).unwrap();

        #[cfg(not(target_os = "windows"))]
        {
            std::env::remove_var("HOME"); // Clear HOME to ensure XDG_CONFIG_HOME is used
            std::env::set_var("XDG_CONFIG_HOME", dir.path());
        }
        #[cfg(target_os = "windows")]
        std::env::set_var("APPDATA", dir.path());

        let result = load_config();
        assert!(result.is_err());

        #[cfg(not(target_os = "windows"))]
        {
            if let Some(xdg) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", xdg);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
            if let Some(home) = original_home {
                std::env::set_var("HOME", home);
            } else {
                std::env::remove_var("HOME");
            }
        }
    }

    #[test]
    fn test_config_invalid_boolean_falls_back() {
        let _guard = ENV_MUTEX.lock().unwrap(); // Serialize environment access

        #[cfg(not(target_os = "windows"))]
        let (original_xdg, original_home) = (
            std::env::var_os("XDG_CONFIG_HOME"),
            std::env::var_os("HOME"),
        );

        let dir = tempdir().unwrap();
        let config_dir = dir.path().join("snapkeep");
        fs::create_dir_all(&config_dir).unwrap();

        let config_content = r#"[snapkeep]
enabled = maybe
use_transient_preview = kinda
"#;
        fs::write(config_dir.join("config.ini"), config_content).unwrap();

        #[cfg(not(target_os = "windows"))]
        {
            std::env::remove_var("HOME"); // Clear HOME to ensure XDG_CONFIG_HOME is used
            std::env::set_var("XDG_CONFIG_HOME", dir.path());
        }
        #[cfg(target_os = "windows")]
        std::env::set_var("APPDATA", dir.path());

        let config = load_config().unwrap();
        let default = default_config();

        assert_eq!(config.enabled, default.enabled);
        assert_eq!(config.use_transient_preview, default.use_transient_preview);

        #[cfg(not(target_os = "windows"))]
        {
            if let Some(xdg) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", xdg);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
            if let Some(home) = original_home {
                std::env::set_var("HOME", home);
            } else {
                std::env::remove_var("HOME");
            }
        }
    }

    #[test]
    fn test_create_sample_config() {
        let sample = create_sample_config();

        assert!(sample.contains("[snapkeep]"));
        assert!(sample.contains("enabled"));
        assert!(sample.contains("root_path"));
        assert!(sample.contains("max_backup_size_bytes"));
        assert!(sample.contains("exclude_extensions"));
        assert!(sample.contains("retention_days"));
        assert!(sample.contains("display_limit"));
        assert!(sample.contains("use_transient_preview"));

        // Verify it's valid INI by parsing it
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("sample.ini");
        fs::write(&config_path, &sample).unwrap();

        let mut conf = Ini::new();
        assert!(conf.load(&config_path).is_ok());
    }

    #[test]
    fn test_dump_config() {
        let _guard = ENV_MUTEX.lock().unwrap(); // Serialize environment access

        let config = default_config();
        let result = dump_config(&config);
        assert!(result.is_ok());
    }
}
