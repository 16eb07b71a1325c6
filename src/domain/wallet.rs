use super::money::{Balance, Currency};
use serde::{Deserialize, Serialize};

/// Balances of the user's wallet in both currencies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WalletBalance {
    #[serde(rename = "balance_usd")]
    pub usd: Balance,
    #[serde(rename = "balance_cdf")]
    pub cdf: Balance,
}

impl WalletBalance {
    pub fn new(usd: Balance, cdf: Balance) -> Self {
        Self { usd, cdf }
    }

    pub fn available(&self, currency: Currency) -> Balance {
        match currency {
            Currency::Usd => self.usd,
            Currency::Cdf => self.cdf,
        }
    }

    pub fn available_mut(&mut self, currency: Currency) -> &mut Balance {
        match currency {
            Currency::Usd => &mut self.usd,
            Currency::Cdf => &mut self.cdf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_available_by_currency() {
        let wallet = WalletBalance::new(Balance::new(dec!(10)), Balance::new(dec!(25000)));
        assert_eq!(wallet.available(Currency::Usd), Balance::new(dec!(10)));
        assert_eq!(wallet.available(Currency::Cdf), Balance::new(dec!(25000)));
    }

    #[test]
    fn test_deserializes_numbers_and_strings() {
        let wallet: WalletBalance =
            serde_json::from_str(r#"{"balance_usd": 12.5, "balance_cdf": "30000.00"}"#).unwrap();
        assert_eq!(wallet.usd, Balance::new(dec!(12.5)));
        assert_eq!(wallet.cdf, Balance::new(dec!(30000)));
    }
}
