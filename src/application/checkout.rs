use super::fee_resolver::FeeResolver;
use super::validator::{self, Draft, SubmitGate, ValidationIssue};
use crate::domain::fees::{FeeBreakdown, FeeKind, FeeSchedule};
use crate::domain::money::{Amount, Currency};
use crate::domain::ports::CheckoutBackendRef;
use crate::domain::request::{Confirmation, Order, Receipt, Recipient};
use crate::domain::wallet::WalletBalance;
use crate::error::{Result, WalletError};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

/// Where a checkout is in its confirmation flow.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    Idle,
    AwaitingRecipientLookup,
    Confirming(Confirmation),
    /// Seen from outside only when a `submit` or `retry` future was dropped
    /// before it finished. The outcome is unknown, so the confirmation stays
    /// available to `retry`.
    Submitting(Confirmation),
    Succeeded(Receipt),
    /// `confirmation` is kept when the same submission may be retried.
    Failed {
        message: String,
        confirmation: Option<Confirmation>,
    },
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::AwaitingRecipientLookup => "awaiting recipient lookup",
            CheckoutState::Confirming(_) => "confirming",
            CheckoutState::Submitting(_) => "submitting",
            CheckoutState::Succeeded(_) => "succeeded",
            CheckoutState::Failed { .. } => "failed",
        }
    }
}

/// One open transfer, withdrawal or purchase.
///
/// The fee schedule is resolved once when the checkout opens and reused for
/// every quote. The wallet balance is fetched on open and again right before
/// submission.
pub struct Checkout {
    backend: CheckoutBackendRef,
    kind: FeeKind,
    schedule: FeeSchedule,
    wallet: WalletBalance,
    recipient: Option<Recipient>,
    state: CheckoutState,
}

impl Checkout {
    /// Opens a checkout of `kind`.
    ///
    /// Fails with [`WalletError::FeeScheduleUnavailable`] when the schedule
    /// cannot be fetched.
    pub async fn open(backend: CheckoutBackendRef, kind: FeeKind, reference: Amount) -> Result<Self> {
        let schedule = FeeResolver::new(&*backend, reference)
            .resolve(kind)
            .await?;
        let wallet = backend.balance().await?;

        Ok(Self {
            backend,
            kind,
            schedule,
            wallet,
            recipient: None,
            state: CheckoutState::Idle,
        })
    }

    pub fn kind(&self) -> FeeKind {
        self.kind
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn schedule(&self) -> FeeSchedule {
        self.schedule
    }

    pub fn wallet(&self) -> &WalletBalance {
        &self.wallet
    }

    pub fn recipient(&self) -> Option<&Recipient> {
        self.recipient.as_ref()
    }

    /// Looks up the recipient of a transfer by account id.
    pub async fn lookup_recipient(&mut self, account_id: &str) -> Result<&Recipient> {
        if self.kind != FeeKind::Transfer {
            return Err(self.invalid("look up a recipient"));
        }
        if !matches!(self.state, CheckoutState::Idle) {
            return Err(self.invalid("look up a recipient"));
        }
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(WalletError::Validation(vec![ValidationIssue::MissingField(
                "recipient",
            )]));
        }

        self.recipient = None;
        self.state = CheckoutState::AwaitingRecipientLookup;
        let looked_up = self.backend.lookup(account_id).await;
        self.state = CheckoutState::Idle;

        let mut recipient = looked_up?;
        if recipient.account_id.is_empty() {
            recipient.account_id = account_id.to_string();
        }
        info!(account_id, name = %recipient.name, "recipient found");
        Ok(self.recipient.insert(recipient))
    }

    /// Computes the breakdown for `amount` with the resolved schedule.
    pub fn quote(&self, amount: Decimal, currency: Currency) -> Result<FeeBreakdown> {
        Ok(self.schedule.apply(Amount::new(amount)?, currency))
    }

    /// Evaluates the submit gate for `draft` without changing state.
    pub fn gate(&self, draft: &Draft) -> SubmitGate {
        let breakdown = self.quote(draft.amount, draft.currency).ok();
        validator::evaluate(draft, breakdown.as_ref(), &self.wallet, self.recipient.is_some())
    }

    /// Moves to the confirmation step if the draft passes every check.
    pub fn review(&mut self, draft: Draft) -> Result<Confirmation> {
        if !matches!(
            self.state,
            CheckoutState::Idle | CheckoutState::Confirming(_)
        ) {
            return Err(self.invalid("review an order"));
        }
        if draft.order.fee_kind() != self.kind {
            return Err(WalletError::Config(format!(
                "a {} checkout cannot review a {} order",
                self.kind,
                draft.order.fee_kind()
            )));
        }

        let gate = self.gate(&draft);
        if !gate.is_enabled() {
            return Err(WalletError::Validation(gate.issues));
        }

        let breakdown = self.quote(draft.amount, draft.currency)?;
        let recipient = match draft.order {
            Order::Transfer { .. } => self.recipient.clone(),
            _ => None,
        };
        let confirmation = Confirmation {
            breakdown,
            order: draft.order,
            recipient,
            idempotency_key: Uuid::new_v4(),
        };
        self.state = CheckoutState::Confirming(confirmation.clone());
        Ok(confirmation)
    }

    /// Leaves the confirmation step without submitting.
    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            CheckoutState::Confirming(_) => {
                self.state = CheckoutState::Idle;
                Ok(())
            }
            _ => Err(self.invalid("cancel")),
        }
    }

    /// Submits the confirmed order.
    pub async fn submit(&mut self, password: SecretString) -> Result<Receipt> {
        let confirmation = match &self.state {
            CheckoutState::Confirming(c) => c.clone(),
            _ => return Err(self.invalid("submit")),
        };
        self.send(confirmation, password, true).await
    }

    /// Re-sends a failed or interrupted submission with its original
    /// idempotency key.
    ///
    /// The local balance check is skipped: the first attempt may already have
    /// been applied, and the server answers a repeated key with the original
    /// receipt.
    pub async fn retry(&mut self, password: SecretString) -> Result<Receipt> {
        let confirmation = match &self.state {
            CheckoutState::Failed {
                confirmation: Some(c),
                ..
            }
            | CheckoutState::Submitting(c) => c.clone(),
            _ => return Err(self.invalid("retry")),
        };
        self.send(confirmation, password, false).await
    }

    /// Returns the checkout to `Idle` for a new order, dropping any
    /// confirmation. An interrupted submission is abandoned with its key.
    pub fn reset(&mut self) {
        if let CheckoutState::Submitting(c) = &self.state {
            warn!(key = %c.idempotency_key, "abandoning interrupted submission");
        }
        self.state = CheckoutState::Idle;
        self.recipient = None;
    }

    async fn send(
        &mut self,
        confirmation: Confirmation,
        password: SecretString,
        revalidate: bool,
    ) -> Result<Receipt> {
        if password.expose_secret().trim().is_empty() {
            return Err(WalletError::Validation(vec![ValidationIssue::MissingField(
                "password",
            )]));
        }

        self.state = CheckoutState::Submitting(confirmation.clone());

        let fresh = match self.backend.balance().await {
            Ok(wallet) => wallet,
            Err(e) => return Err(self.fail(e, Some(confirmation))),
        };
        self.wallet = fresh;

        if revalidate
            && confirmation.order.debits_wallet()
            && let Some(ValidationIssue::InsufficientBalance {
                currency,
                required,
                available,
            }) = validator::check_balance(&confirmation.breakdown, &self.wallet)
        {
            warn!(%currency, %required, %available, "balance dropped below total before submission");
            let err = WalletError::InsufficientBalance {
                currency,
                required,
                available,
            };
            return Err(self.fail(err, None));
        }

        let submission = match confirmation.to_submission(password) {
            Some(s) => s,
            None => {
                let err = WalletError::Validation(vec![ValidationIssue::MissingField("recipient")]);
                return Err(self.fail(err, None));
            }
        };

        match self.backend.submit(submission).await {
            Ok(receipt) => {
                info!(
                    kind = %self.kind,
                    key = %receipt.idempotency_key,
                    total = %confirmation.breakdown.total,
                    currency = %confirmation.breakdown.currency,
                    "submission accepted"
                );
                self.state = CheckoutState::Succeeded(receipt.clone());
                Ok(receipt)
            }
            Err(e) => Err(self.fail(e, Some(confirmation))),
        }
    }

    fn fail(&mut self, err: WalletError, confirmation: Option<Confirmation>) -> WalletError {
        warn!(kind = %self.kind, error = %err, "submission failed");
        self.state = CheckoutState::Failed {
            message: err.user_message(),
            confirmation,
        };
        err
    }

    fn invalid(&self, action: &'static str) -> WalletError {
        WalletError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }
}
