use crate::application::validator::ValidationIssue;
use crate::error::WalletError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Number of decimal places every displayed or submitted money value carries.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a single order may carry, in either currency.
///
/// Keeps fee arithmetic far from `Decimal::MAX`: with percentages capped at
/// [`MAX_PERCENTAGE`] no product or sum can overflow.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

pub const MAX_PERCENTAGE: Decimal = dec!(100);

/// Rounds a money value to cents, midpoint away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// The two wallet currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Cdf,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cdf => "CDF",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "CDF" => Ok(Currency::Cdf),
            other => Err(WalletError::Config(format!("unsupported currency '{other}'"))),
        }
    }
}

/// A wallet balance. May be zero; never produced negative by this crate.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// A strictly positive amount entered by the user, in whole cents, at most
/// [`MAX_AMOUNT`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, WalletError> {
        match Self::issue(value) {
            None => Ok(Self(value)),
            Some(issue) => Err(WalletError::Validation(vec![issue])),
        }
    }

    /// Why `value` is not a valid amount, if it is not.
    pub fn issue(value: Decimal) -> Option<ValidationIssue> {
        if value <= Decimal::ZERO {
            Some(ValidationIssue::NonPositiveAmount)
        } else if value > MAX_AMOUNT {
            Some(ValidationIssue::AmountTooLarge(MAX_AMOUNT))
        } else if value.normalize().scale() > MONEY_SCALE {
            Some(ValidationIssue::TooManyDecimals)
        } else {
            None
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = WalletError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// A percentage between 0 and [`MAX_PERCENTAGE`], such as `2.5` for 2.5%.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, WalletError> {
        if (value.is_sign_negative() && !value.is_zero()) || value > MAX_PERCENTAGE {
            return Err(WalletError::InvalidResponse(format!(
                "percentage must be between 0 and {MAX_PERCENTAGE}, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// The share of `amount` this percentage represents, rounded to cents.
    pub fn of(&self, amount: Amount) -> Decimal {
        round_money(amount.value() * self.0 / Decimal::ONE_HUNDRED)
    }
}

impl TryFrom<Decimal> for Percentage {
    type Error = WalletError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentage> for Decimal {
    fn from(p: Percentage) -> Self {
        p.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}
