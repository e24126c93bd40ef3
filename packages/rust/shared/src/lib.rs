//! Shared types, error model, and configuration for tubekeeper.
//!
//! This crate is the foundation depended on by all other tubekeeper crates.
//! It provides:
//! - [`TubekeeperError`]: the unified error type
//! - Domain types ([`Video`], [`VideoUpdate`], [`ChannelInfo`], [`UpsertPolicy`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AuthConfig, BackupConfig, SectionConfig, YouTubeConfig, config_dir,
    config_file_path, init_config, init_config_at, load_config, load_config_from,
    validate_credentials,
};
pub use error::{Result, TubekeeperError};
pub use types::{ChannelInfo, UpsertPolicy, Video, VideoUpdate};
