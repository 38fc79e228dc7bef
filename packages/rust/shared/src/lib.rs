//! Shared types, error model, and configuration for parlwatch.
//!
//! This crate is the foundation depended on by all other parlwatch crates.
//! It provides:
//! - [`MonitorError`] — the unified error type
//! - Domain types ([`Document`], [`Alert`], [`DocumentType`], [`AlertTier`])
//! - Configuration ([`AppConfig`], [`MonitoredSource`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AlertsConfig, AppConfig, DatabaseConfig, MonitoredSource, MonitoringConfig,
    NotificationsConfig, ScrapingConfig, WebhookConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{MonitorError, Result};
pub use types::{Alert, AlertTier, CycleId, Document, DocumentType, ScrapeRecord, SourceKind};
