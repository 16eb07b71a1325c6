use super::fees::{FeeBreakdown, FeeKind};
use super::money::Currency;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// The owner of the account funds are transferred to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default)]
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MobileOperator {
    OrangeMoney,
    AirtelMoney,
    Mpesa,
    Afrimoney,
}

/// How money leaves or enters the wallet. Each method carries its own details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "payment_method", rename_all = "kebab-case")]
pub enum PaymentMethod {
    /// Paid from the wallet balance itself.
    Wallet,
    MobileMoney {
        operator: MobileOperator,
        phone_number: String,
    },
    Card {
        card_number: String,
        card_holder: String,
        expiry_date: String,
        cvv: String,
    },
}

impl PaymentMethod {
    /// Names of the detail fields that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        match self {
            PaymentMethod::Wallet => {}
            PaymentMethod::MobileMoney { phone_number, .. } => {
                if phone_number.trim().is_empty() {
                    missing.push("phone number");
                }
            }
            PaymentMethod::Card {
                card_number,
                card_holder,
                expiry_date,
                cvv,
            } => {
                for (name, value) in [
                    ("card number", card_number),
                    ("card holder", card_holder),
                    ("expiry date", expiry_date),
                    ("cvv", cvv),
                ] {
                    if value.trim().is_empty() {
                        missing.push(name);
                    }
                }
            }
        }
        missing
    }
}

/// What a payment dispatched through the gateway is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentPurpose {
    PackPurchase { pack_id: u64, duration_months: u32 },
    PackRenewal { pack_id: u64, duration_months: u32 },
    VirtualPurchase,
}

/// Operation-specific details of a checkout.
#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    Transfer { note: Option<String> },
    Withdrawal { method: PaymentMethod },
    Purchase {
        purpose: PaymentPurpose,
        method: PaymentMethod,
    },
}

impl Order {
    pub fn fee_kind(&self) -> FeeKind {
        match self {
            Order::Transfer { .. } => FeeKind::Transfer,
            Order::Withdrawal { .. } => FeeKind::Withdrawal,
            Order::Purchase { .. } => FeeKind::Purchase,
        }
    }

    /// Whether the total is taken from the wallet balance.
    pub fn debits_wallet(&self) -> bool {
        match self {
            Order::Transfer { .. } | Order::Withdrawal { .. } => true,
            Order::Purchase { method, .. } => *method == PaymentMethod::Wallet,
        }
    }

    pub fn payment_method(&self) -> Option<&PaymentMethod> {
        match self {
            Order::Transfer { .. } => None,
            Order::Withdrawal { method } | Order::Purchase { method, .. } => Some(method),
        }
    }
}

fn expose_password<S: Serializer>(password: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(password.expose_secret())
}

#[derive(Debug, Serialize)]
pub struct TransferSubmission {
    pub recipient_account_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub commission_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(serialize_with = "expose_password")]
    pub password: SecretString,
    pub idempotency_key: Uuid,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalSubmission {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(flatten)]
    pub method: PaymentMethod,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub referral_commission: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(serialize_with = "expose_password")]
    pub password: SecretString,
    pub idempotency_key: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PaymentSubmission {
    #[serde(flatten)]
    pub purpose: PaymentPurpose,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(flatten)]
    pub method: PaymentMethod,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(serialize_with = "expose_password")]
    pub password: SecretString,
    pub idempotency_key: Uuid,
}

/// A fully computed order awaiting the user's password.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub breakdown: FeeBreakdown,
    pub order: Order,
    pub recipient: Option<Recipient>,
    pub idempotency_key: Uuid,
}

/// A submission ready to be sent, tagged by operation.
#[derive(Debug)]
pub enum Submission {
    Transfer(TransferSubmission),
    Withdrawal(WithdrawalSubmission),
    Payment(PaymentSubmission),
}

impl Submission {
    pub fn idempotency_key(&self) -> Uuid {
        match self {
            Submission::Transfer(s) => s.idempotency_key,
            Submission::Withdrawal(s) => s.idempotency_key,
            Submission::Payment(s) => s.idempotency_key,
        }
    }

    pub fn total(&self) -> (Currency, Decimal) {
        match self {
            Submission::Transfer(s) => (s.currency, s.total_amount),
            Submission::Withdrawal(s) => (s.currency, s.total_amount),
            Submission::Payment(s) => (s.currency, s.total_amount),
        }
    }
}

impl Confirmation {
    /// Builds the wire submission for this confirmation.
    ///
    /// Returns `None` for a transfer without a recipient, which the checkout
    /// never confirms.
    pub fn to_submission(&self, password: SecretString) -> Option<Submission> {
        let b = &self.breakdown;
        let submission = match &self.order {
            Order::Transfer { note } => Submission::Transfer(TransferSubmission {
                recipient_account_id: self.recipient.as_ref()?.account_id.clone(),
                amount: b.amount,
                currency: b.currency,
                note: note.clone().filter(|n| !n.trim().is_empty()),
                fee_amount: b.fee,
                commission_amount: b.commission,
                total_amount: b.total,
                password,
                idempotency_key: self.idempotency_key,
            }),
            Order::Withdrawal { method } => Submission::Withdrawal(WithdrawalSubmission {
                amount: b.amount,
                currency: b.currency,
                method: method.clone(),
                fee_amount: b.fee,
                referral_commission: b.commission,
                total_amount: b.total,
                password,
                idempotency_key: self.idempotency_key,
            }),
            Order::Purchase { purpose, method } => Submission::Payment(PaymentSubmission {
                purpose: purpose.clone(),
                amount: b.amount,
                currency: b.currency,
                method: method.clone(),
                fee_amount: b.fee,
                total_amount: b.total,
                password,
                idempotency_key: self.idempotency_key,
            }),
        };
        Some(submission)
    }
}

/// The server's acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub message: String,
    pub reference: Option<String>,
    pub idempotency_key: Uuid,
}
