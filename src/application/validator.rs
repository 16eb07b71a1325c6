use crate::domain::fees::FeeBreakdown;
use crate::domain::money::{Amount, Currency};
use crate::domain::request::{Order, PaymentMethod};
use crate::domain::wallet::WalletBalance;
use rust_decimal::Decimal;
use std::fmt;

/// A reason the submit action is unavailable.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    MissingField(&'static str),
    NonPositiveAmount,
    /// More than two decimal places.
    TooManyDecimals,
    AmountTooLarge(Decimal),
    InsufficientBalance {
        currency: Currency,
        required: Decimal,
        available: Decimal,
    },
    /// The payment method cannot be used for this operation.
    UnsupportedMethod(&'static str),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField(name) => write!(f, "{name} is required"),
            ValidationIssue::NonPositiveAmount => f.write_str("amount must be greater than zero"),
            ValidationIssue::TooManyDecimals => {
                f.write_str("amount must have at most two decimal places")
            }
            ValidationIssue::AmountTooLarge(max) => write!(f, "amount must not exceed {max}"),
            ValidationIssue::InsufficientBalance {
                currency,
                required,
                available,
            } => write!(
                f,
                "insufficient balance: {required:.2} {currency} required, {available:.2} {currency} available"
            ),
            ValidationIssue::UnsupportedMethod(reason) => f.write_str(reason),
        }
    }
}

/// Whether submission is allowed, and why not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmitGate {
    pub issues: Vec<ValidationIssue>,
}

impl SubmitGate {
    pub fn is_enabled(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_insufficient_balance(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::InsufficientBalance { .. }))
    }

    /// Inline error text, one line per issue.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Compares a total against the balance of its currency.
pub fn check_balance(breakdown: &FeeBreakdown, wallet: &WalletBalance) -> Option<ValidationIssue> {
    let available = wallet.available(breakdown.currency).value();
    (breakdown.total > available).then_some(ValidationIssue::InsufficientBalance {
        currency: breakdown.currency,
        required: breakdown.total,
        available,
    })
}

/// Everything the user filled in before asking to confirm.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub amount: Decimal,
    pub currency: Currency,
    pub order: Order,
}

/// Evaluates every rule that gates the submit button.
///
/// `breakdown` is `None` when the amount could not produce one. `has_recipient`
/// only matters for transfers.
pub fn evaluate(
    draft: &Draft,
    breakdown: Option<&FeeBreakdown>,
    wallet: &WalletBalance,
    has_recipient: bool,
) -> SubmitGate {
    let mut issues = Vec::new();

    if matches!(draft.order, Order::Transfer { .. }) && !has_recipient {
        issues.push(ValidationIssue::MissingField("recipient"));
    }

    if let Some(issue) = Amount::issue(draft.amount) {
        issues.push(issue);
    }

    if let Some(method) = draft.order.payment_method() {
        issues.extend(method.missing_fields().into_iter().map(ValidationIssue::MissingField));
    }

    if matches!(
        draft.order,
        Order::Withdrawal {
            method: PaymentMethod::Wallet
        }
    ) {
        issues.push(ValidationIssue::UnsupportedMethod(
            "withdrawals must go to mobile money or a card",
        ));
    }

    if draft.order.debits_wallet()
        && let Some(breakdown) = breakdown
        && let Some(issue) = check_balance(breakdown, wallet)
    {
        issues.push(issue);
    }

    SubmitGate { issues }
}
