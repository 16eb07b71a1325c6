use crate::application::validator::ValidationIssue;
use crate::domain::money::Currency;
use rust_decimal::Decimal;
use thiserror::Error;

/// Text shown to the user when a failure carries no server message.
pub const GENERIC_FAILURE: &str = "Something went wrong, please try again";

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),
    #[error("Insufficient balance: {required} {currency} required, {available} available")]
    InsufficientBalance {
        currency: Currency,
        required: Decimal,
        available: Decimal,
    },
    #[error("Fee schedule unavailable: {0}")]
    FeeScheduleUnavailable(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: &'static str, action: &'static str },
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WalletError>;

impl WalletError {
    /// The message a front end should display for this failure.
    pub fn user_message(&self) -> String {
        match self {
            WalletError::Api(message) if !message.trim().is_empty() => message.clone(),
            WalletError::Validation(issues) => join_issues(issues),
            WalletError::InsufficientBalance { .. } | WalletError::FeeScheduleUnavailable(_) => {
                self.to_string()
            }
            WalletError::InvalidTransition { .. } | WalletError::Config(_) => self.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = WalletError::Api("Solde insuffisant".to_string());
        assert_eq!(err.user_message(), "Solde insuffisant");
    }

    #[test]
    fn test_user_message_falls_back_for_blank_and_transport_errors() {
        assert_eq!(WalletError::Api("  ".into()).user_message(), GENERIC_FAILURE);
        assert_eq!(
            WalletError::InvalidResponse("missing field".into()).user_message(),
            GENERIC_FAILURE
        );
    }

    #[test]
    fn test_validation_message_lists_issues() {
        let err = WalletError::Validation(vec![
            ValidationIssue::MissingField("recipient"),
            ValidationIssue::NonPositiveAmount,
        ]);
        assert_eq!(
            err.user_message(),
            "recipient is required; amount must be greater than zero"
        );
    }
}
