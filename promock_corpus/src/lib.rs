pub mod config;
pub mod error;
pub mod loader;
pub mod manager;
pub mod source;

pub use config::{ServiceConfig, ServiceConfigFile};
pub use error::RefreshError;
pub use loader::{load_config_from_file, parse_config_from_str, ConfigFormat};
pub use manager::{CorpusManager, CorpusSnapshot, CorpusSummary, RefreshOutcome};
pub use source::{read_snapshot, scan_directory, SnapshotFile};
