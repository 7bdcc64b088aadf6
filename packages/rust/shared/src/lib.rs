//! Shared types, error model, and configuration for pagesift.
//!
//! This crate is the foundation depended on by all other pagesift crates.
//! It provides:
//! - [`PageSiftError`] — the unified error type
//! - Domain types ([`Profile`], [`FieldSpec`], [`Record`], [`RunId`])
//! - Configuration ([`AppConfig`], [`LlmConfig`], config loading)
//! - The built-in scraping profiles

pub mod config;
pub mod error;
pub mod profiles;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LlmConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_api_key,
};
pub use error::{PageSiftError, Result};
pub use profiles::{GYMS_PROFILE, JS_COURSES_PROFILE, builtin_profiles};
pub use types::{FieldKind, FieldSpec, Profile, Record, RunId};
