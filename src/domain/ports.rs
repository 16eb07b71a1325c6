use super::fees::{FeeKind, FeeSchedule};
use super::money::Amount;
use super::referral::{PackStats, Referral};
use super::request::{Receipt, Recipient, Submission};
use super::wallet::WalletBalance;
use super::withdrawal::{Page, WithdrawalAction, WithdrawalRecord, WithdrawalStatus};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait FeeSource: Send + Sync {
    /// Fetches the schedule for `kind`, quoted against a nominal `reference` amount.
    async fn fee_schedule(&self, kind: FeeKind, reference: Amount) -> Result<FeeSchedule>;
}

#[async_trait]
pub trait WalletSource: Send + Sync {
    async fn balance(&self) -> Result<WalletBalance>;
}

#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn lookup(&self, account_id: &str) -> Result<Recipient>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn submit(&self, submission: Submission) -> Result<Receipt>;
}

/// Whose withdrawal requests a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalScope {
    Own,
    Admin { status: Option<WithdrawalStatus> },
}

#[async_trait]
pub trait WithdrawalDesk: Send + Sync {
    async fn list(&self, scope: WithdrawalScope, page: u32) -> Result<Page<WithdrawalRecord>>;
    /// Applies `action` and returns the server's message.
    async fn act(&self, id: u64, action: WithdrawalAction) -> Result<String>;
}

#[async_trait]
pub trait ReferralSource: Send + Sync {
    async fn pack_stats(&self, pack_id: u64) -> Result<PackStats>;
    async fn referrals(&self, pack_id: u64) -> Result<Vec<Referral>>;
}

/// Everything a checkout needs from the backend.
pub trait CheckoutBackend: FeeSource + WalletSource + RecipientDirectory + PaymentGateway {}

impl<T> CheckoutBackend for T where T: FeeSource + WalletSource + RecipientDirectory + PaymentGateway {}

pub type CheckoutBackendRef = Arc<dyn CheckoutBackend>;
