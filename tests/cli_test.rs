use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn wallet_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/getTransferFees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "fee_percentage": 2,
            "fee_commission": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/userwallet/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "balance_usd": 150,
            "balance_cdf": "25000.5"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/transaction-fees/withdrawal"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "success": false,
            "message": "Fee service down"
        })))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_cli_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("packwallet"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("quote"))
        .stdout(predicate::str::contains("withdraw"))
        .stdout(predicate::str::contains("--api-url"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_quote_transfer() -> Result<(), Box<dyn std::error::Error>> {
    let server = wallet_server().await;

    let mut cmd = Command::new(cargo_bin!("packwallet"));
    cmd.args(["--api-url", &server.uri()])
        .args(["quote", "--kind", "transfer", "--amount", "100"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("fee:        2.00 USD"))
        .stdout(predicate::str::contains("commission: 1.00 USD"))
        .stdout(predicate::str::contains("total:      103.00 USD"))
        .stdout(predicate::str::contains("balance sufficient"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_quote_reports_insufficient_balance() -> Result<(), Box<dyn std::error::Error>> {
    let server = wallet_server().await;

    let mut cmd = Command::new(cargo_bin!("packwallet"));
    cmd.args(["--api-url", &server.uri()])
        .args(["quote", "--kind", "transfer", "--amount", "150"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("total:      154.50 USD"))
        .stdout(predicate::str::contains("insufficient balance"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_balance() -> Result<(), Box<dyn std::error::Error>> {
    let server = wallet_server().await;

    let mut cmd = Command::new(cargo_bin!("packwallet"));
    cmd.args(["--api-url", &server.uri(), "balance"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("USD: 150.00"))
        .stdout(predicate::str::contains("CDF: 25000.50"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_fails_when_fees_unavailable() -> Result<(), Box<dyn std::error::Error>> {
    let server = wallet_server().await;

    let mut cmd = Command::new(cargo_bin!("packwallet"));
    cmd.args(["--api-url", &server.uri()])
        .args(["quote", "--kind", "withdrawal", "--amount", "10"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Fee service down"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_rejects_out_of_range_amounts() -> Result<(), Box<dyn std::error::Error>> {
    let server = wallet_server().await;

    for (amount, expected) in [
        ("79228162514264337593543950335", "amount must not exceed"),
        ("10.005", "at most two decimal places"),
    ] {
        let mut cmd = Command::new(cargo_bin!("packwallet"));
        cmd.args(["--api-url", &server.uri()])
            .args(["quote", "--kind", "transfer", "--amount", amount]);

        cmd.assert()
            .failure()
            .stderr(predicate::str::contains(expected));
    }

    Ok(())
}

#[test]
fn test_cli_rejects_unknown_currency() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("packwallet"));
    cmd.args(["quote", "--kind", "transfer", "--amount", "10", "--currency", "EUR"]);

    cmd.assert().failure();

    Ok(())
}
