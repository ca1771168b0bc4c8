//! Shared types, error model, and configuration for LinkForge.
//!
//! This crate is the foundation depended on by all other LinkForge crates.
//! It provides:
//! - [`LinkForgeError`] — the unified error type
//! - Domain types ([`LinkOccurrence`], [`AffiliateLink`], [`PersistedLink`])
//! - Configuration ([`AppConfig`], config loading)
//! - Slug normalization helpers ([`slug`])

pub mod config;
pub mod error;
pub mod slug;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, NetworkSettings, ScanConfig, SiteConfig, StorageConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_token,
};
pub use error::{LinkForgeError, Result};
pub use types::{AffiliateLink, LinkOccurrence, PersistedLink, is_http_url};
