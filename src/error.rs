// src/error.rs

//! Unified error handling for the aggregation engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Navigation failed before a document was available
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// A deadline was exceeded
    #[error("Timed out after {elapsed_ms}ms: {context}")]
    Timeout { context: String, elapsed_ms: u64 },

    /// Engine or session level failure
    #[error("Automation error: {0}")]
    Automation(String),

    /// The rendering engine could not be launched
    #[error("Rendering engine failed to start: {0}")]
    EngineInit(String),

    /// Operation not supported by the active engine
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A source subset resolved to zero registered adapters
    #[error("No registered sources in requested subset: {0:?}")]
    InvalidSourceSubset(Vec<String>),
}

/// Coarse classification reported alongside absorbed failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Timeout,
    Automation,
    Parse,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Automation => "automation",
            ErrorKind::Parse => "parse",
            ErrorKind::Config => "config",
        };
        f.write_str(s)
    }
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a navigation error for a URL.
    pub fn navigation(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a timeout error with context.
    pub fn timeout(context: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            context: context.into(),
            elapsed_ms,
        }
    }

    /// Create an automation error.
    pub fn automation(message: impl fmt::Display) -> Self {
        Self::Automation(message.to_string())
    }

    /// Classify the error for failure reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            AppError::Http(_) | AppError::Navigation { .. } | AppError::Io(_) => {
                ErrorKind::Transport
            }
            AppError::Timeout { .. } => ErrorKind::Timeout,
            AppError::Automation(_) | AppError::EngineInit(_) | AppError::Unsupported(_) => {
                ErrorKind::Automation
            }
            AppError::Json(_)
            | AppError::Toml(_)
            | AppError::Url(_)
            | AppError::Selector { .. } => ErrorKind::Parse,
            AppError::Config(_)
            | AppError::Validation(_)
            | AppError::InvalidSourceSubset(_) => ErrorKind::Config,
        }
    }

    /// Whether the failure means the rendering context can no longer be trusted.
    pub fn is_automation(&self) -> bool {
        matches!(self, AppError::Automation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(AppError::timeout("nav", 10).kind(), ErrorKind::Timeout);
        assert_eq!(
            AppError::navigation("https://x.test", "dns").kind(),
            ErrorKind::Transport
        );
        assert_eq!(AppError::automation("crashed").kind(), ErrorKind::Automation);
        assert_eq!(AppError::selector("[[", "bad").kind(), ErrorKind::Parse);
        assert_eq!(
            AppError::InvalidSourceSubset(vec!["nope".into()]).kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_is_automation() {
        assert!(AppError::automation("gone").is_automation());
        assert!(!AppError::timeout("wait", 5).is_automation());
    }

    #[test]
    fn test_display_includes_context() {
        let err = AppError::navigation("https://x.test/a", "connection refused");
        assert_eq!(
            err.to_string(),
            "Navigation to https://x.test/a failed: connection refused"
        );
    }
}
