//! PolicyDesk Common Library
//!
//! Shared code for the PolicyDesk services including:
//! - Database entities and repository patterns
//! - Error types and handling
//! - Configuration management
//! - Authentication and access-control utilities
//! - CSV lead import engine
//! - Document storage signing
//! - Telephony collaborator client
//! - Metrics and observability

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod import;
pub mod metrics;
pub mod pagination;
pub mod storage;
pub mod telephony;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use pagination::{PageMeta, PageRequest};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default list page size
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Hard cap on list page size
pub const MAX_PAGE_LIMIT: u64 = 100;
