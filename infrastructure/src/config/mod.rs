//! TOML configuration for the challenge coordinator

mod file_config;
mod loader;

pub use file_config::{
    FileChallengeConfig, FileConfig, FileFeedConfig, FileParticipantsConfig,
    FileRequestConfig, FileShutdownConfig, FileStorageConfig,
};
pub use loader::ConfigLoader;
