use super::money::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Cancelled => "cancelled",
        })
    }
}

impl FromStr for WithdrawalStatus {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            "cancelled" | "canceled" => Ok(WithdrawalStatus::Cancelled),
            other => Err(WalletError::Config(format!("unknown withdrawal status '{other}'"))),
        }
    }
}

/// An action taken on an existing withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalAction {
    /// The owner withdraws their own pending request.
    Cancel,
    Approve,
    Reject { reason: String },
    Delete,
}

impl WithdrawalAction {
    pub fn name(&self) -> &'static str {
        match self {
            WithdrawalAction::Cancel => "cancel",
            WithdrawalAction::Approve => "approve",
            WithdrawalAction::Reject { .. } => "reject",
            WithdrawalAction::Delete => "delete",
        }
    }

    /// Whether the action may be applied to a request in `status`.
    ///
    /// Only pending requests can be cancelled, approved or rejected. Pending
    /// requests cannot be deleted, they must be settled first.
    pub fn allowed_on(&self, status: WithdrawalStatus) -> bool {
        match self {
            WithdrawalAction::Cancel | WithdrawalAction::Approve | WithdrawalAction::Reject { .. } => {
                status == WithdrawalStatus::Pending
            }
            WithdrawalAction::Delete => status != WithdrawalStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub id: u64,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: WithdrawalStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub admin_note: Option<String>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actions_respect_status() {
        assert!(WithdrawalAction::Cancel.allowed_on(WithdrawalStatus::Pending));
        assert!(!WithdrawalAction::Cancel.allowed_on(WithdrawalStatus::Approved));
        assert!(!WithdrawalAction::Approve.allowed_on(WithdrawalStatus::Rejected));
        assert!(!WithdrawalAction::Delete.allowed_on(WithdrawalStatus::Pending));
        assert!(WithdrawalAction::Delete.allowed_on(WithdrawalStatus::Cancelled));
    }

    #[test]
    fn test_page_deserialization() {
        let page: Page<WithdrawalRecord> = serde_json::from_value(json!({
            "data": [{
                "id": 7,
                "amount": "25.00",
                "currency": "USD",
                "status": "pending",
                "payment_method": "orange-money"
            }],
            "current_page": 1,
            "last_page": 3,
            "total": 41
        }))
        .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].status, WithdrawalStatus::Pending);
        assert!(page.has_next());
    }

    #[test]
    fn test_status_parsing_accepts_us_spelling() {
        assert_eq!(
            "canceled".parse::<WithdrawalStatus>().unwrap(),
            WithdrawalStatus::Cancelled
        );
        assert!("paid".parse::<WithdrawalStatus>().is_err());
    }
}
