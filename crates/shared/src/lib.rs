//! Shared library for flashynime.
//!
//! This crate provides functionality used by the API client and the CLI:
//! - Configuration management
//! - Canonical content models
//! - Key-value storage backends (memory, files, SQLite)
//! - Persisted app state (watchlist, history, language)
//! - Logging infrastructure

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use logging::LogConfig;
pub use models::*;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{AppState, AppStore, Language};

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
