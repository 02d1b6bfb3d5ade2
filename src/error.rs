//! Error types for roster loading, filtering and notification sends.

use thiserror::Error;

use crate::ids::Dimension;

/// Errors raised by the roster pipeline and its collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PortalError {
    /// The roster or fee fetch failed (network, non-2xx, malformed body).
    #[error("roster unavailable: {0}")]
    RosterUnavailable(String),

    /// A fee-filtered audience resolved to nobody.
    #[error("no matching recipients: {condition}")]
    NoMatchingRecipients {
        /// Human-readable description of the empty condition.
        condition: String,
    },

    /// The create-notification call failed; carries the backend's reason.
    #[error("notification submit failed: {0}")]
    NotificationSubmitFailure(String),

    /// An upstream identifier could not be normalized.
    #[error("invalid {dimension} identifier: {raw:?}")]
    InvalidIdentifier { dimension: Dimension, raw: String },

    /// A required draft field is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Login was rejected or no session is active.
    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("CSV error: {0}")]
    Csv(String),
}

impl PortalError {
    /// Message suitable for a banner in the hosting view.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RosterUnavailable(_) => "Failed to load roster - using demo data".to_string(),
            Self::NoMatchingRecipients { condition } => {
                format!("No recipients match: {condition}. Nothing was sent.")
            }
            Self::NotificationSubmitFailure(reason) => format!("Failed to send notification: {reason}"),
            Self::MissingField(_) => "Please fill in all required fields".to_string(),
            Self::Authentication(_) => "Please log in again.".to_string(),
            Self::InvalidIdentifier { .. } | Self::Config(_) | Self::Io(_) | Self::Csv(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }

    /// Whether the view should fall back to demo data instead of failing.
    #[must_use]
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::RosterUnavailable(_))
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        Self::RosterUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<csv::Error> for PortalError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// Result type alias for roster operations.
pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_roster_failures_degrade() {
        assert!(PortalError::RosterUnavailable("timeout".into()).is_degradable());
        assert!(!PortalError::NotificationSubmitFailure("500".into()).is_degradable());
        assert!(!PortalError::NoMatchingRecipients {
            condition: "pending fees".into()
        }
        .is_degradable());
    }

    #[test]
    fn submit_failure_keeps_raw_reason() {
        let err = PortalError::NotificationSubmitFailure("due_date is required".into());
        assert!(err.user_message().contains("due_date is required"));
    }
}
