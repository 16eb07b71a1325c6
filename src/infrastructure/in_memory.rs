use crate::domain::fees::{FeeKind, FeeSchedule};
use crate::domain::money::{Amount, Balance, Currency};
use crate::domain::ports::{
    FeeSource, PaymentGateway, RecipientDirectory, ReferralSource, WalletSource, WithdrawalDesk,
    WithdrawalScope,
};
use crate::domain::referral::{PackStats, Referral};
use crate::domain::request::{PaymentMethod, Receipt, Recipient, Submission};
use crate::domain::wallet::WalletBalance;
use crate::domain::withdrawal::{Page, WithdrawalAction, WithdrawalRecord, WithdrawalStatus};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

const PAGE_SIZE: usize = 10;

#[derive(Default)]
struct BackendState {
    wallet: WalletBalance,
    schedules: HashMap<FeeKind, FeeSchedule>,
    recipients: HashMap<String, Recipient>,
    receipts: HashMap<Uuid, Receipt>,
    withdrawals: BTreeMap<u64, WithdrawalRecord>,
    held: HashMap<u64, Decimal>,
    /// Last withdrawal id handed out. Ids are never reused, even after a delete.
    last_withdrawal_id: u64,
    packs: HashMap<u64, (PackStats, Vec<Referral>)>,
    applied: u64,
    lost_responses: u32,
}

/// An in-process backend that applies submissions to its own wallet.
///
/// It enforces the server-side rules a real backend is expected to: balance
/// checks, idempotency keys and withdrawal status transitions. Useful for
/// tests and for exercising checkouts without a network.
#[derive(Default)]
pub struct InMemoryBackend {
    state: RwLock<BackendState>,
}

impl InMemoryBackend {
    pub fn new(wallet: WalletBalance) -> Self {
        let backend = Self::default();
        backend.configure(|s| s.wallet = wallet)
    }

    pub fn with_schedule(self, kind: FeeKind, schedule: FeeSchedule) -> Self {
        self.configure(|s| {
            s.schedules.insert(kind, schedule);
        })
    }

    pub fn with_recipient(self, recipient: Recipient) -> Self {
        self.configure(|s| {
            s.recipients.insert(recipient.account_id.clone(), recipient);
        })
    }

    pub fn with_pack(self, stats: PackStats, referrals: Vec<Referral>) -> Self {
        self.configure(|s| {
            s.packs.insert(stats.pack_id, (stats, referrals));
        })
    }

    fn configure(mut self, f: impl FnOnce(&mut BackendState)) -> Self {
        f(self.state.get_mut());
        self
    }

    pub async fn set_wallet(&self, wallet: WalletBalance) {
        self.state.write().await.wallet = wallet;
    }

    pub async fn remove_schedule(&self, kind: FeeKind) {
        self.state.write().await.schedules.remove(&kind);
    }

    /// Applies the next `count` submissions but reports them as failed, as if
    /// the response had been lost in transit.
    pub async fn lose_responses(&self, count: u32) {
        self.state.write().await.lost_responses = count;
    }

    /// Number of submissions that changed state.
    pub async fn applied_submissions(&self) -> u64 {
        self.state.read().await.applied
    }
}

impl BackendState {
    fn debit(&mut self, currency: Currency, total: Decimal) -> Result<()> {
        let balance = self.wallet.available_mut(currency);
        if balance.value() < total {
            return Err(WalletError::Api("Insufficient balance".to_string()));
        }
        *balance = *balance - Balance::new(total);
        Ok(())
    }

    fn credit(&mut self, currency: Currency, amount: Decimal) {
        let balance = self.wallet.available_mut(currency);
        *balance = *balance + Balance::new(amount);
    }

    fn apply(&mut self, submission: &Submission) -> Result<Option<String>> {
        match submission {
            Submission::Transfer(s) => {
                if !self.recipients.contains_key(&s.recipient_account_id) {
                    return Err(WalletError::Api("Recipient not found".to_string()));
                }
                self.debit(s.currency, s.total_amount)?;
                Ok(None)
            }
            Submission::Withdrawal(s) => {
                self.debit(s.currency, s.total_amount)?;
                self.last_withdrawal_id += 1;
                let id = self.last_withdrawal_id;
                self.withdrawals.insert(
                    id,
                    WithdrawalRecord {
                        id,
                        amount: s.amount,
                        currency: s.currency,
                        status: WithdrawalStatus::Pending,
                        payment_method: serde_json::to_value(&s.method)
                            .ok()
                            .and_then(|v| v["payment_method"].as_str().map(str::to_string)),
                        created_at: None,
                        user_name: None,
                        admin_note: None,
                    },
                );
                self.held.insert(id, s.total_amount);
                Ok(Some(id.to_string()))
            }
            Submission::Payment(s) => {
                if s.method == PaymentMethod::Wallet {
                    self.debit(s.currency, s.total_amount)?;
                }
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl FeeSource for InMemoryBackend {
    async fn fee_schedule(&self, kind: FeeKind, _reference: Amount) -> Result<FeeSchedule> {
        let state = self.state.read().await;
        state.schedules.get(&kind).copied().ok_or_else(|| {
            WalletError::FeeScheduleUnavailable(format!("no {kind} fee schedule configured"))
        })
    }
}

#[async_trait]
impl WalletSource for InMemoryBackend {
    async fn balance(&self) -> Result<WalletBalance> {
        Ok(self.state.read().await.wallet)
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryBackend {
    async fn lookup(&self, account_id: &str) -> Result<Recipient> {
        let state = self.state.read().await;
        state
            .recipients
            .get(account_id)
            .cloned()
            .ok_or_else(|| WalletError::Api("Recipient not found".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for InMemoryBackend {
    async fn submit(&self, submission: Submission) -> Result<Receipt> {
        let key = submission.idempotency_key();
        let mut state = self.state.write().await;

        let existing = state.receipts.get(&key).cloned();
        let receipt = match existing {
            Some(existing) => {
                debug!(%key, "duplicate submission, returning original receipt");
                existing
            }
            None => {
                let reference = state.apply(&submission)?;
                state.applied += 1;
                let receipt = Receipt {
                    message: "Operation completed successfully".to_string(),
                    reference,
                    idempotency_key: key,
                };
                state.receipts.insert(key, receipt.clone());
                receipt
            }
        };

        if state.lost_responses > 0 {
            state.lost_responses -= 1;
            return Err(WalletError::InvalidResponse(
                "connection closed before response".to_string(),
            ));
        }
        Ok(receipt)
    }
}

#[async_trait]
impl WithdrawalDesk for InMemoryBackend {
    async fn list(&self, scope: WithdrawalScope, page: u32) -> Result<Page<WithdrawalRecord>> {
        let state = self.state.read().await;
        let matching: Vec<WithdrawalRecord> = state
            .withdrawals
            .values()
            .rev()
            .filter(|w| match scope {
                WithdrawalScope::Own | WithdrawalScope::Admin { status: None } => true,
                WithdrawalScope::Admin { status: Some(s) } => w.status == s,
            })
            .cloned()
            .collect();

        let total = matching.len();
        let last_page = total.div_ceil(PAGE_SIZE).max(1) as u32;
        let page = page.max(1);
        let data = matching
            .into_iter()
            .skip((page as usize - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect();

        Ok(Page {
            data,
            current_page: page,
            last_page,
            per_page: Some(PAGE_SIZE as u32),
            total: total as u64,
        })
    }

    async fn act(&self, id: u64, action: WithdrawalAction) -> Result<String> {
        let mut state = self.state.write().await;
        let record = state
            .withdrawals
            .get(&id)
            .cloned()
            .ok_or_else(|| WalletError::Api(format!("Withdrawal request {id} not found")))?;

        if !action.allowed_on(record.status) {
            return Err(WalletError::Api(format!(
                "Cannot {} a {} withdrawal request",
                action.name(),
                record.status
            )));
        }

        let refund = |state: &mut BackendState| {
            if let Some(total) = state.held.remove(&id) {
                state.credit(record.currency, total);
            }
        };

        match action {
            WithdrawalAction::Cancel => {
                refund(&mut *state);
                set_status(&mut *state, id, WithdrawalStatus::Cancelled, None);
            }
            WithdrawalAction::Approve => {
                state.held.remove(&id);
                set_status(&mut *state, id, WithdrawalStatus::Approved, None);
            }
            WithdrawalAction::Reject { reason } => {
                refund(&mut *state);
                set_status(&mut *state, id, WithdrawalStatus::Rejected, Some(reason));
            }
            WithdrawalAction::Delete => {
                state.withdrawals.remove(&id);
            }
        }

        Ok(format!("Withdrawal request {id} updated"))
    }
}

fn set_status(state: &mut BackendState, id: u64, status: WithdrawalStatus, note: Option<String>) {
    if let Some(record) = state.withdrawals.get_mut(&id) {
        record.status = status;
        if note.is_some() {
            record.admin_note = note;
        }
    }
}

#[async_trait]
impl ReferralSource for InMemoryBackend {
    async fn pack_stats(&self, pack_id: u64) -> Result<PackStats> {
        let state = self.state.read().await;
        state
            .packs
            .get(&pack_id)
            .map(|(stats, _)| stats.clone())
            .ok_or_else(|| WalletError::Api("Pack not found".to_string()))
    }

    async fn referrals(&self, pack_id: u64) -> Result<Vec<Referral>> {
        let state = self.state.read().await;
        state
            .packs
            .get(&pack_id)
            .map(|(_, referrals)| referrals.clone())
            .ok_or_else(|| WalletError::Api("Pack not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::{MobileOperator, WithdrawalSubmission};
    use rust_decimal_macros::dec;
    use secrecy::SecretString;

    fn withdrawal(total: Decimal) -> Submission {
        Submission::Withdrawal(WithdrawalSubmission {
            amount: total,
            currency: Currency::Usd,
            method: PaymentMethod::MobileMoney {
                operator: MobileOperator::Mpesa,
                phone_number: "0820000000".into(),
            },
            fee_amount: Decimal::ZERO,
            referral_commission: Decimal::ZERO,
            total_amount: total,
            password: SecretString::from("pw".to_string()),
            idempotency_key: Uuid::new_v4(),
        })
    }

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new(WalletBalance::new(Balance::new(dec!(100)), Balance::ZERO))
    }

    #[tokio::test]
    async fn test_withdrawal_is_held_then_refunded_on_cancel() {
        let backend = backend();
        let receipt = backend.submit(withdrawal(dec!(30))).await.unwrap();
        assert_eq!(receipt.reference.as_deref(), Some("1"));
        assert_eq!(backend.balance().await.unwrap().usd, Balance::new(dec!(70)));

        backend.act(1, WithdrawalAction::Cancel).await.unwrap();
        assert_eq!(backend.balance().await.unwrap().usd, Balance::new(dec!(100)));

        let page = backend.list(WithdrawalScope::Own, 1).await.unwrap();
        assert_eq!(page.data[0].status, WithdrawalStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_approved_withdrawal_cannot_be_cancelled() {
        let backend = backend();
        backend.submit(withdrawal(dec!(10))).await.unwrap();
        backend.act(1, WithdrawalAction::Approve).await.unwrap();
        let err = backend.act(1, WithdrawalAction::Cancel).await.unwrap_err();
        assert!(matches!(err, WalletError::Api(_)));
        assert_eq!(backend.balance().await.unwrap().usd, Balance::new(dec!(90)));
    }

    #[tokio::test]
    async fn test_admin_listing_filters_and_paginates() {
        let backend = backend();
        for _ in 0..12 {
            backend.submit(withdrawal(dec!(1))).await.unwrap();
        }
        backend
            .act(
                3,
                WithdrawalAction::Reject {
                    reason: "invalid number".into(),
                },
            )
            .await
            .unwrap();

        let pending = backend
            .list(
                WithdrawalScope::Admin {
                    status: Some(WithdrawalStatus::Pending),
                },
                2,
            )
            .await
            .unwrap();
        assert_eq!(pending.total, 11);
        assert_eq!(pending.last_page, 2);
        assert_eq!(pending.data.len(), 1);

        let rejected = backend
            .list(
                WithdrawalScope::Admin {
                    status: Some(WithdrawalStatus::Rejected),
                },
                1,
            )
            .await
            .unwrap();
        assert_eq!(rejected.data[0].admin_note.as_deref(), Some("invalid number"));
    }

    #[tokio::test]
    async fn test_withdrawal_ids_not_reused_after_delete() {
        let backend = backend();
        backend.submit(withdrawal(dec!(10))).await.unwrap();
        backend.act(1, WithdrawalAction::Approve).await.unwrap();
        backend.act(1, WithdrawalAction::Delete).await.unwrap();

        let receipt = backend.submit(withdrawal(dec!(10))).await.unwrap();
        assert_eq!(receipt.reference.as_deref(), Some("2"));
        let page = backend.list(WithdrawalScope::Own, 1).await.unwrap();
        assert_eq!(page.data.iter().map(|w| w.id).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn test_server_side_balance_check() {
        let backend = backend();
        let err = backend.submit(withdrawal(dec!(100.01))).await.unwrap_err();
        assert_eq!(err.user_message(), "Insufficient balance");
        assert_eq!(backend.applied_submissions().await, 0);
    }
}
