use crate::config::ClientConfig;
use crate::domain::fees::{FeeKind, FeeSchedule};
use crate::domain::money::{Amount, Percentage};
use crate::domain::ports::{
    FeeSource, PaymentGateway, RecipientDirectory, ReferralSource, WalletSource, WithdrawalDesk,
    WithdrawalScope,
};
use crate::domain::referral::{Generation, PackStats, Referral};
use crate::domain::request::{Receipt, Recipient, Submission};
use crate::domain::wallet::WalletBalance;
use crate::domain::withdrawal::{Page, WithdrawalAction, WithdrawalRecord};
use crate::error::{GENERIC_FAILURE, Result, WalletError};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const DEFAULT_RECEIPT_MESSAGE: &str = "Operation completed successfully";

/// Client for the wallet platform's JSON API.
///
/// Every port is implemented on top of one shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpWalletApi {
    http: Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpWalletApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: &ClientConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| WalletError::Config(format!("invalid endpoint '{path}': {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "api request");
        let builder = self.http.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        })
    }

    /// Sends `request` and decodes the payload of a successful envelope.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let resp = request.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let body: Option<Value> = serde_json::from_slice(&bytes).ok();

        let success = body
            .as_ref()
            .and_then(|b| b.get("success"))
            .and_then(Value::as_bool);
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);

        if !status.is_success() || success == Some(false) {
            warn!(%status, what, message = ?message, "api call rejected");
            return Err(WalletError::Api(
                message.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            ));
        }

        let body = body.ok_or_else(|| WalletError::InvalidResponse(format!("{what}: body is not JSON")))?;
        serde_json::from_value(body).map_err(|e| WalletError::InvalidResponse(format!("{what}: {e}")))
    }

    async fn send_message(&self, request: RequestBuilder, what: &str) -> Result<MessagePayload> {
        self.send(request, what).await
    }
}

/// Body of the purchase and withdrawal fee endpoints.
#[derive(Debug, Serialize)]
struct FeeQuery {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

/// Servers send the percentages under either name, sometimes under both.
#[derive(Debug, Deserialize)]
struct FeePayload {
    #[serde(default)]
    fee_percentage: Option<Decimal>,
    #[serde(default)]
    percentage: Option<Decimal>,
    #[serde(default)]
    fee_commission: Option<Decimal>,
    #[serde(default)]
    commission_percentage: Option<Decimal>,
    /// Absolute fee for the reference amount, used when no percentage is given.
    #[serde(default)]
    fee: Option<Decimal>,
}

impl FeePayload {
    fn into_schedule(self, reference: Amount) -> Result<FeeSchedule> {
        let unavailable = |reason: String| WalletError::FeeScheduleUnavailable(reason);
        let fee = match self.fee_percentage.or(self.percentage) {
            Some(percentage) => percentage,
            None => {
                let fee = self
                    .fee
                    .ok_or_else(|| unavailable("response has no fee percentage".to_string()))?;
                fee.checked_mul(Decimal::ONE_HUNDRED)
                    .and_then(|scaled| scaled.checked_div(reference.value()))
                    .ok_or_else(|| unavailable(format!("fee {fee} is out of range")))?
            }
        };
        let commission = self
            .fee_commission
            .or(self.commission_percentage)
            .unwrap_or(Decimal::ZERO);

        let invalid = |e: WalletError| unavailable(e.to_string());
        Ok(FeeSchedule::new(
            Percentage::new(fee).map_err(invalid)?,
            Percentage::new(commission).map_err(invalid)?,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct RecipientPayload {
    #[serde(default)]
    recipient: Option<Recipient>,
    #[serde(default)]
    user: Option<Recipient>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reference: Option<Value>,
    #[serde(default)]
    transaction_id: Option<Value>,
    #[serde(default)]
    withdrawal_id: Option<Value>,
}

impl MessagePayload {
    fn reference(&self) -> Option<String> {
        let value = self
            .reference
            .as_ref()
            .or(self.transaction_id.as_ref())
            .or(self.withdrawal_id.as_ref())?;
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn message(self) -> String {
        self.message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RECEIPT_MESSAGE.to_string())
    }
}

/// The page arrives under one of several keys; the first present wins.
#[derive(Debug, Deserialize)]
struct WithdrawalsPayload {
    #[serde(default)]
    withdrawal_requests: Option<Page<WithdrawalRecord>>,
    #[serde(default)]
    requests: Option<Page<WithdrawalRecord>>,
    #[serde(default)]
    withdrawals: Option<Page<WithdrawalRecord>>,
}

impl WithdrawalsPayload {
    fn into_page(self) -> Result<Page<WithdrawalRecord>> {
        self.withdrawal_requests
            .or(self.requests)
            .or(self.withdrawals)
            .ok_or_else(|| WalletError::InvalidResponse("withdrawal listing: no requests".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct StatsPayload {
    #[serde(default)]
    stats: Option<PackStats>,
    #[serde(default)]
    data: Option<PackStats>,
}

impl StatsPayload {
    fn into_stats(self) -> Result<PackStats> {
        self.stats
            .or(self.data)
            .ok_or_else(|| WalletError::InvalidResponse("pack statistics: no stats".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ReferralEntry {
    id: u64,
    name: String,
    #[serde(default)]
    pack_name: Option<String>,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    joined_at: Option<String>,
}

/// Referrals arrive either as one flat list or grouped by generation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReferralsShape {
    Flat(Vec<Referral>),
    ByGeneration(BTreeMap<String, Vec<ReferralEntry>>),
}

#[derive(Debug, Deserialize)]
struct ReferralsPayload {
    referrals: ReferralsShape,
}

impl ReferralsShape {
    fn flatten(self) -> Result<Vec<Referral>> {
        match self {
            ReferralsShape::Flat(referrals) => Ok(referrals),
            ReferralsShape::ByGeneration(groups) => {
                let mut referrals = Vec::new();
                for (level, entries) in groups {
                    let generation = level.parse().ok().and_then(Generation::new).ok_or_else(|| {
                        WalletError::InvalidResponse(format!("unknown referral generation {level}"))
                    })?;
                    referrals.extend(entries.into_iter().map(|e| Referral {
                        id: e.id,
                        name: e.name,
                        generation,
                        pack_name: e.pack_name,
                        active: e.active,
                        joined_at: e.joined_at,
                    }));
                }
                Ok(referrals)
            }
        }
    }
}

#[async_trait]
impl FeeSource for HttpWalletApi {
    async fn fee_schedule(&self, kind: FeeKind, reference: Amount) -> Result<FeeSchedule> {
        let request = match kind {
            FeeKind::Transfer => self
                .request(Method::GET, "api/getTransferFees")?
                .query(&[("amount", reference.value().to_string())]),
            FeeKind::Purchase => self
                .request(Method::POST, "api/transaction-fees/purchase")?
                .json(&FeeQuery { amount: reference.value() }),
            FeeKind::Withdrawal => self
                .request(Method::POST, "api/transaction-fees/withdrawal")?
                .json(&FeeQuery { amount: reference.value() }),
        };
        let payload: FeePayload = self.send(request, "fee schedule").await?;
        payload.into_schedule(reference)
    }
}

#[async_trait]
impl WalletSource for HttpWalletApi {
    async fn balance(&self) -> Result<WalletBalance> {
        let request = self.request(Method::GET, "api/userwallet/balance")?;
        self.send(request, "wallet balance").await
    }
}

#[async_trait]
impl RecipientDirectory for HttpWalletApi {
    async fn lookup(&self, account_id: &str) -> Result<Recipient> {
        let mut url = self.endpoint("api/recipient-info/")?;
        url.path_segments_mut()
            .map_err(|_| WalletError::Config("base URL cannot have path segments".to_string()))?
            .pop_if_empty()
            .push(account_id);
        debug!(%url, "api request");
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let payload: RecipientPayload = self.send(request, "recipient lookup").await?;
        payload
            .recipient
            .or(payload.user)
            .ok_or_else(|| WalletError::InvalidResponse("recipient lookup: no recipient in response".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for HttpWalletApi {
    async fn submit(&self, submission: Submission) -> Result<Receipt> {
        let idempotency_key = submission.idempotency_key();
        let request = match &submission {
            Submission::Transfer(body) => self.request(Method::POST, "api/funds-transfer")?.json(body),
            Submission::Withdrawal(body) => self.request(Method::POST, "api/withdrawal/request")?.json(body),
            Submission::Payment(body) => self.request(Method::POST, "api/serdipay/payment")?.json(body),
        }
        .header(IDEMPOTENCY_HEADER, idempotency_key.to_string());

        let payload = self.send_message(request, "submission").await?;
        let reference = payload.reference();
        Ok(Receipt {
            message: payload.message(),
            reference,
            idempotency_key,
        })
    }
}

#[async_trait]
impl WithdrawalDesk for HttpWalletApi {
    async fn list(&self, scope: WithdrawalScope, page: u32) -> Result<Page<WithdrawalRecord>> {
        let page = page.max(1).to_string();
        let request = match scope {
            WithdrawalScope::Own => self
                .request(Method::GET, "api/withdrawal/requests")?
                .query(&[("page", page)]),
            WithdrawalScope::Admin { status } => {
                let mut query = vec![("page", page)];
                if let Some(status) = status {
                    query.push(("status", status.to_string()));
                }
                self.request(Method::GET, "api/admin/withdrawal/requests")?
                    .query(&query)
            }
        };
        let payload: WithdrawalsPayload = self.send(request, "withdrawal listing").await?;
        payload.into_page()
    }

    async fn act(&self, id: u64, action: WithdrawalAction) -> Result<String> {
        let request = match &action {
            WithdrawalAction::Cancel => {
                self.request(Method::POST, &format!("api/withdrawal/requests/{id}/cancel"))?
            }
            WithdrawalAction::Approve => self.request(
                Method::POST,
                &format!("api/admin/withdrawal/requests/{id}/approve"),
            )?,
            WithdrawalAction::Reject { reason } => self
                .request(
                    Method::POST,
                    &format!("api/admin/withdrawal/requests/{id}/reject"),
                )?
                .json(&json!({ "reason": reason })),
            WithdrawalAction::Delete => self.request(
                Method::DELETE,
                &format!("api/admin/withdrawal/requests/{id}"),
            )?,
        };
        let payload = self.send_message(request, action.name()).await?;
        Ok(payload.message())
    }
}

#[async_trait]
impl ReferralSource for HttpWalletApi {
    async fn pack_stats(&self, pack_id: u64) -> Result<PackStats> {
        let request = self.request(Method::GET, &format!("api/packs/{pack_id}/detailed-stats"))?;
        let payload: StatsPayload = self.send(request, "pack statistics").await?;
        payload.into_stats()
    }

    async fn referrals(&self, pack_id: u64) -> Result<Vec<Referral>> {
        let request = self.request(Method::GET, &format!("api/packs/{pack_id}/referrals"))?;
        let payload: ReferralsPayload = self.send(request, "pack referrals").await?;
        payload.referrals.flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_payload_aliases() {
        let payload: FeePayload =
            serde_json::from_value(json!({"percentage": 3.5, "fee": 3.5})).unwrap();
        let schedule = payload.into_schedule(Amount::new(dec!(100)).unwrap()).unwrap();
        assert_eq!(schedule.fee.value(), dec!(3.5));
        assert_eq!(schedule.commission.value(), Decimal::ZERO);
    }

    #[test]
    fn test_fee_payload_with_both_key_names() {
        let payload: FeePayload = serde_json::from_value(json!({
            "fee_percentage": 2,
            "percentage": 2,
            "fee_commission": 1,
            "commission_percentage": 1
        }))
        .unwrap();
        let schedule = payload.into_schedule(Amount::new(dec!(100)).unwrap()).unwrap();
        assert_eq!(schedule.fee.value(), dec!(2));
        assert_eq!(schedule.commission.value(), dec!(1));
    }

    #[test]
    fn test_huge_absolute_fee_is_unavailable() {
        let payload: FeePayload =
            serde_json::from_value(json!({"fee": "79228162514264337593543950335"})).unwrap();
        assert!(matches!(
            payload.into_schedule(Amount::new(dec!(100)).unwrap()),
            Err(WalletError::FeeScheduleUnavailable(_))
        ));
    }

    #[test]
    fn test_receipt_reference_from_any_key() {
        let payload: MessagePayload = serde_json::from_value(json!({
            "message": "ok",
            "transaction_id": 981,
            "withdrawal_id": 12
        }))
        .unwrap();
        assert_eq!(payload.reference().as_deref(), Some("981"));

        let payload: MessagePayload =
            serde_json::from_value(json!({"withdrawal_id": "W-12"})).unwrap();
        assert_eq!(payload.reference().as_deref(), Some("W-12"));
        assert_eq!(payload.message(), DEFAULT_RECEIPT_MESSAGE);
    }

    #[test]
    fn test_listing_under_several_keys() {
        let page = json!({"data": [], "current_page": 1, "last_page": 1, "total": 0});
        let payload: WithdrawalsPayload = serde_json::from_value(json!({
            "success": true,
            "withdrawal_requests": page,
            "withdrawals": page
        }))
        .unwrap();
        assert_eq!(payload.into_page().unwrap().total, 0);

        let payload: WithdrawalsPayload = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(matches!(payload.into_page(), Err(WalletError::InvalidResponse(_))));

        let stats = json!({"pack_id": 4, "generations": []});
        let payload: StatsPayload =
            serde_json::from_value(json!({"stats": stats, "data": stats})).unwrap();
        assert_eq!(payload.into_stats().unwrap().pack_id, 4);
    }

    #[test]
    fn test_fee_percentage_derived_from_absolute_fee() {
        let payload: FeePayload = serde_json::from_value(json!({"fee": 4})).unwrap();
        let schedule = payload.into_schedule(Amount::new(dec!(200)).unwrap()).unwrap();
        assert_eq!(schedule.fee.value(), dec!(2));
    }

    #[test]
    fn test_fee_payload_without_fee_is_unavailable() {
        let payload: FeePayload = serde_json::from_value(json!({"fee_commission": 1})).unwrap();
        assert!(matches!(
            payload.into_schedule(Amount::new(dec!(100)).unwrap()),
            Err(WalletError::FeeScheduleUnavailable(_))
        ));
    }

    #[test]
    fn test_grouped_referrals_are_flattened() {
        let payload: ReferralsPayload = serde_json::from_value(json!({
            "referrals": {
                "1": [{"id": 1, "name": "A"}],
                "3": [{"id": 2, "name": "B"}, {"id": 3, "name": "C", "active": true}]
            }
        }))
        .unwrap();
        let referrals = payload.referrals.flatten().unwrap();
        assert_eq!(referrals.len(), 3);
        assert_eq!(referrals[2].generation.level(), 3);
    }
}
