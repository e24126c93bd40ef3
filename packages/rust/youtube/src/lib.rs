//! YouTube Data API access for tubekeeper.
//!
//! This crate provides:
//! - [`VideoSource`]: the read/write seam the pipelines depend on
//! - [`YouTubeClient`]: its reqwest-based implementation
//! - [`TokenProvider`]: pluggable OAuth2 access-token supply

pub mod auth;
mod client;
mod source;
mod wire;

pub use auth::{RefreshTokenProvider, StaticToken, TokenProvider, provider_from_config};
pub use client::YouTubeClient;
pub use source::{MAX_BATCH_SIZE, UploadsPage, VideoSource};
