//! Common types and utilities shared across Cascade crates.
//!
//! This crate holds the shared error type and the observability helpers
//! used throughout the Cascade workspace. It stays small so that the
//! driver, filter and configuration crates can all depend on it.
//!
//! # Overview
//!
//! - [`CascadeError`] and [`Result`]: Shared error handling
//! - [`observability`]: Centralised tracing/logging initialisation
//!
//! # Examples
//!
//! Matching on a missing dropdown option:
//!
//! ```rust
//! use cascade_common::CascadeError;
//!
//! let err = CascadeError::selection_not_found("country", "DE");
//! assert!(err.is_selection_not_found());
//! assert_eq!(err.to_string(), "Option 'DE' not found in level 'country'");
//! ```
use std::time::Duration;

pub mod observability;

/// Error types used across the Cascade system.
#[derive(thiserror::Error, Debug)]
pub enum CascadeError {
    /// Loading indicators stayed visible past the configured deadline.
    #[error("Timed out after {waited:?} waiting for loading indicators to hide: {}", .visible.join(", "))]
    Timeout {
        waited: Duration,
        /// Indicators still visible at the last poll.
        visible: Vec<String>,
    },

    /// The requested label is not among the options rendered for a level.
    #[error("Option '{label}' not found in level '{level}'")]
    SelectionNotFound { level: String, label: String },

    /// A driver (WebDriver session, element lookup, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CascadeError {
    pub fn selection_not_found(level: impl Into<String>, label: impl Into<String>) -> Self {
        Self::SelectionNotFound {
            level: level.into(),
            label: label.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_selection_not_found(&self) -> bool {
        matches!(self, Self::SelectionNotFound { .. })
    }
}

/// Convenient alias for results that use [`CascadeError`].
pub type Result<T> = std::result::Result<T, CascadeError>;
