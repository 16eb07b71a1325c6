#![allow(dead_code)]

use packwallet::config::ClientConfig;
use packwallet::domain::fees::{FeeKind, FeeSchedule};
use packwallet::domain::money::{Amount, Balance, Percentage};
use packwallet::domain::request::Recipient;
use packwallet::domain::wallet::WalletBalance;
use packwallet::infrastructure::http::HttpWalletApi;
use packwallet::infrastructure::in_memory::InMemoryBackend;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use wiremock::MockServer;

pub const RECIPIENT_ID: &str = "ACC-42";

pub fn schedule(fee: Decimal, commission: Decimal) -> FeeSchedule {
    FeeSchedule::new(
        Percentage::new(fee).unwrap(),
        Percentage::new(commission).unwrap(),
    )
}

pub fn reference() -> Amount {
    Amount::new(dec!(100)).unwrap()
}

/// 200 USD and 500 000 CDF, transfer 2% + 1%, withdrawal 3% + 1.5%, purchase 2%.
pub fn backend() -> InMemoryBackend {
    InMemoryBackend::new(WalletBalance::new(
        Balance::new(dec!(200)),
        Balance::new(dec!(500000)),
    ))
    .with_schedule(FeeKind::Transfer, schedule(dec!(2), dec!(1)))
    .with_schedule(FeeKind::Withdrawal, schedule(dec!(3), dec!(1.5)))
    .with_schedule(FeeKind::Purchase, schedule(dec!(2), dec!(0)))
    .with_recipient(Recipient {
        account_id: RECIPIENT_ID.to_string(),
        name: "Grace Mbuyi".to_string(),
        email: Some("grace@example.com".to_string()),
        phone: None,
    })
}

pub fn password() -> SecretString {
    SecretString::from("correct horse".to_string())
}

pub async fn mock_api(token: Option<&str>) -> (MockServer, HttpWalletApi) {
    let server = MockServer::start().await;
    let config = ClientConfig::new(&server.uri())
        .unwrap()
        .with_token(token.map(str::to_string));
    let api = HttpWalletApi::new(&config).unwrap();
    (server, api)
}
