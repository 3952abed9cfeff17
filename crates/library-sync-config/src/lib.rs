pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, MetadataConfig, SyncTuning, TrackerConfig};
pub use credentials::CredentialStore;
pub use paths::{container_base_path, PathManager};
