use crate::domain::money::Amount;
use crate::error::{Result, WalletError};
use reqwest::Url;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use std::env;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
/// Nominal amount fee schedules are quoted against.
pub const DEFAULT_REFERENCE_AMOUNT: Decimal = dec!(100);

/// Connection settings for the wallet API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Always ends with `/` so that relative endpoints join under it.
    pub base_url: Url,
    pub token: Option<SecretString>,
    pub timeout: Duration,
    pub reference_amount: Amount,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            reference_amount: Amount::new(DEFAULT_REFERENCE_AMOUNT)?,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(WalletError::Config("timeout must be greater than zero".to_string()));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_reference_amount(mut self, amount: Decimal) -> Result<Self> {
        self.reference_amount = Amount::new(amount).map_err(|_| {
            WalletError::Config(format!("reference amount must be positive, got {amount}"))
        })?;
        Ok(self)
    }

    /// Reads `PACKWALLET_API_URL` (required), `PACKWALLET_TOKEN`,
    /// `PACKWALLET_TIMEOUT_SECS` and `PACKWALLET_REFERENCE_AMOUNT`.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("PACKWALLET_API_URL")
            .map_err(|_| WalletError::Config("PACKWALLET_API_URL is not set".to_string()))?;
        let timeout = match env::var("PACKWALLET_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| WalletError::Config(format!("invalid PACKWALLET_TIMEOUT_SECS '{raw}'")))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        let reference = match env::var("PACKWALLET_REFERENCE_AMOUNT") {
            Ok(raw) => raw.parse().map_err(|_| {
                WalletError::Config(format!("invalid PACKWALLET_REFERENCE_AMOUNT '{raw}'"))
            })?,
            Err(_) => DEFAULT_REFERENCE_AMOUNT,
        };

        Self::new(&base_url)?
            .with_token(env::var("PACKWALLET_TOKEN").ok())
            .with_timeout(Duration::from_secs(timeout))?
            .with_reference_amount(reference)
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| WalletError::Config(format!("invalid API URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(WalletError::Config(format!(
            "API URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
