//! Shared types, error model, and configuration for feedscribe.
//!
//! This crate is the foundation depended on by all other feedscribe crates.
//! It provides:
//! - [`FeedscribeError`], the unified error type
//! - Domain types ([`Feed`], [`RawItem`], [`NormalizedItem`], [`OutputDocument`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, OutputConfig, RenderConfig, config_dir, config_file_path,
    init_config, init_config_at, load_config, load_config_from,
};
pub use error::{FeedscribeError, Result};
pub use types::{Feed, NormalizedItem, OutputDocument, RawItem};
