pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod lookup;
pub mod naming;
pub mod policy;
pub mod prune;

pub use cancel::CancelToken;
pub use config::{create_sample_config, default_config, dump_config, load_config, Config};
pub use engine::{BackupOutcome, CopyFile, Engine, FsCopier};
pub use error::SnapkeepError;
pub use lookup::{DisplayRecord, SourceKind, VersionEntry};
pub use naming::{daily_dir_name, versioned_name};
pub use prune::prune;

/// Main library result type
pub type Result<T> = std::result::Result<T, SnapkeepError>;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    // Serializes tests across modules that modify environment variables
    pub static ENV_MUTEX: Mutex<()> = Mutex::new(());
}
