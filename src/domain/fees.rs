use super::money::{Amount, Currency, Percentage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which fee schedule applies to a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeKind {
    Transfer,
    Purchase,
    Withdrawal,
}

impl fmt::Display for FeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeeKind::Transfer => "transfer",
            FeeKind::Purchase => "purchase",
            FeeKind::Withdrawal => "withdrawal",
        })
    }
}

/// Percentages charged on top of the base amount.
///
/// `commission` is the referral commission for withdrawals and the platform
/// commission for transfers. Purchases carry no commission.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub fee: Percentage,
    pub commission: Percentage,
}

impl FeeSchedule {
    pub fn new(fee: Percentage, commission: Percentage) -> Self {
        Self { fee, commission }
    }

    /// Computes the breakdown for `amount`.
    ///
    /// Fee and commission are rounded to cents individually. `Amount` is
    /// already in whole cents, so every returned value has at most two decimals
    /// and `total == amount + fee + commission` holds exactly.
    pub fn apply(&self, amount: Amount, currency: Currency) -> FeeBreakdown {
        let fee = self.fee.of(amount);
        let commission = self.commission.of(amount);
        FeeBreakdown {
            currency,
            amount: amount.value(),
            fee,
            commission,
            total: amount.value() + fee + commission,
        }
    }
}

/// The result of applying a [`FeeSchedule`] to an amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub currency: Currency,
    pub amount: Decimal,
    pub fee: Decimal,
    pub commission: Decimal,
    pub total: Decimal,
}

impl FeeBreakdown {
    pub fn total_fees(&self) -> Decimal {
        self.fee + self.commission
    }
}

impl fmt::Display for FeeBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.currency;
        writeln!(f, "amount:     {:.2} {c}", self.amount)?;
        writeln!(f, "fee:        {:.2} {c}", self.fee)?;
        writeln!(f, "commission: {:.2} {c}", self.commission)?;
        write!(f, "total:      {:.2} {c}", self.total)
    }
}
