//! Error types for pagecheck
//!
//! Error messages name the selector, path or file involved.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pagecheck
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid suite '{path}': {message}")]
    SuiteParse { path: String, message: String },

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write file '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Selector Errors ===
    #[error("Invalid selector '{selector}' at offset {offset}: {reason}")]
    InvalidSelector {
        selector: String,
        offset: usize,
        reason: String,
    },

    #[error("Invalid text pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // === Document Provider Errors ===
    #[error("Document provider error: {0}")]
    ProviderCommunication(String),

    #[error("Document provider connection lost: {0}")]
    ProviderDisconnected(String),

    #[error("Navigation to '{url}' failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("Base URL '{url}' is unreachable: {reason}. Is the dev server running?")]
    BaseUrlUnreachable { url: String, reason: String },

    // === Interaction Errors ===
    #[error("Cannot interact with '{target}': {reason}")]
    TargetNotInteractable { target: String, reason: String },

    // === Run Control ===
    #[error("Run cancelled")]
    Cancelled,

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid selector error
    pub fn invalid_selector(selector: &str, offset: usize, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            offset,
            reason: reason.to_string(),
        }
    }

    /// Create a target not interactable error
    pub fn not_interactable(target: &str, reason: &str) -> Self {
        Self::TargetNotInteractable {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a navigation failed error
    pub fn navigation_failed(url: &str, reason: &str) -> Self {
        Self::NavigationFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Classify this error as a scenario fault
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Error::InvalidSelector { .. }
            | Error::InvalidPattern { .. }
            | Error::ProviderCommunication(_) => FaultKind::Resolution,
            Error::TargetNotInteractable { .. } => FaultKind::NotInteractable,
            Error::NavigationFailed { .. } => FaultKind::Navigation,
            Error::ProviderDisconnected(_) => FaultKind::Disconnected,
            Error::Cancelled => FaultKind::Cancelled,
            _ => FaultKind::Internal,
        }
    }

    /// Whether this error stops the whole suite rather than one scenario
    pub fn is_fatal_to_suite(&self) -> bool {
        matches!(self, Error::ProviderDisconnected(_) | Error::Cancelled)
    }
}

/// Category of a fault recorded against a scenario
///
/// Faults mean the harness could not finish the scenario; they are reported
/// separately from assertion failures, which mean the page was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Resolution,
    NotInteractable,
    Navigation,
    Disconnected,
    Cancelled,
    Internal,
}

impl FaultKind {
    /// Stable code used in reports
    pub fn code(&self) -> &'static str {
        match self {
            FaultKind::Resolution => "RESOLUTION_FAULT",
            FaultKind::NotInteractable => "TARGET_NOT_INTERACTABLE",
            FaultKind::Navigation => "NAVIGATION_FAILED",
            FaultKind::Disconnected => "PROVIDER_DISCONNECTED",
            FaultKind::Cancelled => "CANCELLED",
            FaultKind::Internal => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        assert_eq!(
            Error::invalid_selector("a[", 2, "unclosed attribute").fault_kind(),
            FaultKind::Resolution
        );
        assert_eq!(
            Error::ProviderCommunication("eval failed".into()).fault_kind(),
            FaultKind::Resolution
        );
        assert_eq!(
            Error::not_interactable("button", "no visible match").fault_kind(),
            FaultKind::NotInteractable
        );
        assert_eq!(Error::Cancelled.fault_kind(), FaultKind::Cancelled);
    }

    #[test]
    fn test_only_disconnect_and_cancel_abort_suite() {
        assert!(Error::ProviderDisconnected("ws closed".into()).is_fatal_to_suite());
        assert!(Error::Cancelled.is_fatal_to_suite());
        assert!(!Error::navigation_failed("/", "404").is_fatal_to_suite());
        assert!(!Error::not_interactable("a", "hidden").is_fatal_to_suite());
    }
}
