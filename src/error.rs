//! Error types for the cache library
//!
//! Provides unified error handling using thiserror. Lookups and inserts never
//! fail: absence and duplicate inserts are reported through `Option`/`bool`.
//! Errors only surface from configuration, background task startup, and
//! structural self-checks.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache library.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background expiration task could not be started
    #[error("Failed to start background task: {0}")]
    Runtime(#[from] std::io::Error),

    /// An internal structure failed its consistency check
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache library.
pub type Result<T> = std::result::Result<T, CacheError>;
