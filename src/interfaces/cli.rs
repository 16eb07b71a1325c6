use crate::application::checkout::Checkout;
use crate::application::validator::{self, Draft, ValidationIssue};
use crate::config::{ClientConfig, DEFAULT_REFERENCE_AMOUNT, DEFAULT_TIMEOUT_SECS};
use crate::domain::fees::FeeKind;
use crate::domain::money::Currency;
use crate::domain::ports::{ReferralSource, WalletSource, WithdrawalDesk, WithdrawalScope};
use crate::domain::referral::{Generation, MAX_GENERATION, filter_generation};
use crate::domain::request::{MobileOperator, Order, PaymentMethod, PaymentPurpose};
use crate::domain::withdrawal::{WithdrawalAction, WithdrawalStatus};
use crate::error::WalletError;
use crate::infrastructure::http::HttpWalletApi;
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Wallet transfers, withdrawals and pack payments", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Base URL of the wallet API
    #[arg(long, global = true, env = "PACKWALLET_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Bearer token sent with every request
    #[arg(long, global = true, env = "PACKWALLET_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "PACKWALLET_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Amount fee schedules are quoted against
    #[arg(long, global = true, env = "PACKWALLET_REFERENCE_AMOUNT", default_value_t = DEFAULT_REFERENCE_AMOUNT)]
    pub reference_amount: Decimal,
}

impl ConnectionArgs {
    pub fn to_config(&self) -> Result<ClientConfig, WalletError> {
        ClientConfig::new(&self.api_url)?
            .with_token(self.token.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))?
            .with_reference_amount(self.reference_amount)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show wallet balances
    Balance,
    /// Show the fee breakdown for an amount
    Quote {
        #[arg(long, value_enum)]
        kind: KindArg,
        #[command(flatten)]
        money: MoneyArgs,
    },
    /// Transfer funds to another member
    Transfer {
        /// Account id of the recipient
        #[arg(long)]
        recipient: String,
        #[command(flatten)]
        money: MoneyArgs,
        #[arg(long)]
        note: Option<String>,
        #[command(flatten)]
        password: PasswordArg,
    },
    /// Request a withdrawal
    Withdraw {
        #[command(flatten)]
        money: MoneyArgs,
        #[command(flatten)]
        method: MethodArgs,
        #[command(flatten)]
        password: PasswordArg,
    },
    /// Buy a pack
    Purchase {
        #[command(flatten)]
        pack: PackArgs,
        #[command(flatten)]
        money: MoneyArgs,
        #[command(flatten)]
        method: MethodArgs,
        #[command(flatten)]
        password: PasswordArg,
    },
    /// Renew a pack
    Renew {
        #[command(flatten)]
        pack: PackArgs,
        #[command(flatten)]
        money: MoneyArgs,
        #[command(flatten)]
        method: MethodArgs,
        #[command(flatten)]
        password: PasswordArg,
    },
    /// Buy virtual currency
    BuyVirtual {
        #[command(flatten)]
        money: MoneyArgs,
        #[command(flatten)]
        method: MethodArgs,
        #[command(flatten)]
        password: PasswordArg,
    },
    /// Manage your own withdrawal requests
    Withdrawals {
        #[command(subcommand)]
        action: WithdrawalsCommand,
    },
    /// Administer withdrawal requests
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },
    /// Show referral statistics for a pack
    PackStats { pack_id: u64 },
    /// List referrals of a pack
    Referrals {
        pack_id: u64,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=MAX_GENERATION as i64))]
        generation: Option<u8>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WithdrawalsCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Cancel { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// List withdrawal requests of every member
    Withdrawals {
        #[arg(long)]
        status: Option<WithdrawalStatus>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Approve { id: u64 },
    Reject {
        id: u64,
        #[arg(long)]
        reason: String,
    },
    Delete { id: u64 },
}

#[derive(Args, Debug)]
pub struct MoneyArgs {
    #[arg(long)]
    pub amount: Decimal,
    #[arg(long, default_value = "USD")]
    pub currency: Currency,
}

#[derive(Args, Debug)]
pub struct PackArgs {
    #[arg(long = "pack")]
    pub pack_id: u64,
    #[arg(long, default_value_t = 1)]
    pub months: u32,
}

#[derive(Args, Debug)]
pub struct PasswordArg {
    /// Account password, required to confirm the operation
    #[arg(long, env = "PACKWALLET_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct MethodArgs {
    #[arg(long, value_enum)]
    pub method: MethodArg,
    #[arg(long, value_enum)]
    pub operator: Option<OperatorArg>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub card_number: Option<String>,
    #[arg(long)]
    pub card_holder: Option<String>,
    #[arg(long)]
    pub expiry: Option<String>,
    #[arg(long)]
    pub cvv: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    Transfer,
    Purchase,
    Withdrawal,
}

impl From<KindArg> for FeeKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Transfer => FeeKind::Transfer,
            KindArg::Purchase => FeeKind::Purchase,
            KindArg::Withdrawal => FeeKind::Withdrawal,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum MethodArg {
    MobileMoney,
    Card,
    Wallet,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OperatorArg {
    OrangeMoney,
    AirtelMoney,
    Mpesa,
    Afrimoney,
}

impl From<OperatorArg> for MobileOperator {
    fn from(op: OperatorArg) -> Self {
        match op {
            OperatorArg::OrangeMoney => MobileOperator::OrangeMoney,
            OperatorArg::AirtelMoney => MobileOperator::AirtelMoney,
            OperatorArg::Mpesa => MobileOperator::Mpesa,
            OperatorArg::Afrimoney => MobileOperator::Afrimoney,
        }
    }
}

impl MethodArgs {
    /// Builds the payment method. Empty details are left for the validator to report.
    pub fn into_method(self) -> Result<PaymentMethod, WalletError> {
        Ok(match self.method {
            MethodArg::Wallet => PaymentMethod::Wallet,
            MethodArg::MobileMoney => PaymentMethod::MobileMoney {
                operator: self
                    .operator
                    .ok_or(WalletError::Validation(vec![ValidationIssue::MissingField(
                        "operator",
                    )]))?
                    .into(),
                phone_number: self.phone.unwrap_or_default(),
            },
            MethodArg::Card => PaymentMethod::Card {
                card_number: self.card_number.unwrap_or_default(),
                card_holder: self.card_holder.unwrap_or_default(),
                expiry_date: self.expiry.unwrap_or_default(),
                cvv: self.cvv.unwrap_or_default(),
            },
        })
    }
}

/// Executes `cli`, writing human-readable output to `out`.
pub async fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let config = cli.connection.to_config().into_diagnostic()?;
    let api = Arc::new(HttpWalletApi::new(&config).into_diagnostic()?);

    match cli.command {
        Command::Balance => {
            let wallet = api.balance().await.into_diagnostic()?;
            writeln!(out, "USD: {:.2}", wallet.usd.value()).into_diagnostic()?;
            writeln!(out, "CDF: {:.2}", wallet.cdf.value()).into_diagnostic()?;
        }
        Command::Quote { kind, money } => {
            let checkout = Checkout::open(api, kind.into(), config.reference_amount)
                .await
                .into_diagnostic()?;
            let schedule = checkout.schedule();
            let breakdown = checkout
                .quote(money.amount, money.currency)
                .into_diagnostic()?;
            writeln!(out, "fee rate:   {}", schedule.fee).into_diagnostic()?;
            writeln!(out, "commission rate: {}", schedule.commission).into_diagnostic()?;
            writeln!(out, "{breakdown}").into_diagnostic()?;
            let verdict = match validator::check_balance(&breakdown, checkout.wallet()) {
                Some(issue) => issue.to_string(),
                None => "balance sufficient".to_string(),
            };
            writeln!(out, "{verdict}").into_diagnostic()?;
        }
        Command::Transfer {
            recipient,
            money,
            note,
            password,
        } => {
            let draft = Draft {
                amount: money.amount,
                currency: money.currency,
                order: Order::Transfer { note },
            };
            confirm_and_submit(api, &config, draft, Some(recipient), password, out).await?;
        }
        Command::Withdraw {
            money,
            method,
            password,
        } => {
            let draft = Draft {
                amount: money.amount,
                currency: money.currency,
                order: Order::Withdrawal {
                    method: method.into_method().into_diagnostic()?,
                },
            };
            confirm_and_submit(api, &config, draft, None, password, out).await?;
        }
        Command::Purchase {
            pack,
            money,
            method,
            password,
        } => {
            let purpose = PaymentPurpose::PackPurchase {
                pack_id: pack.pack_id,
                duration_months: pack.months,
            };
            let draft = purchase_draft(purpose, money, method)?;
            confirm_and_submit(api, &config, draft, None, password, out).await?;
        }
        Command::Renew {
            pack,
            money,
            method,
            password,
        } => {
            let purpose = PaymentPurpose::PackRenewal {
                pack_id: pack.pack_id,
                duration_months: pack.months,
            };
            let draft = purchase_draft(purpose, money, method)?;
            confirm_and_submit(api, &config, draft, None, password, out).await?;
        }
        Command::BuyVirtual {
            money,
            method,
            password,
        } => {
            let draft = purchase_draft(PaymentPurpose::VirtualPurchase, money, method)?;
            confirm_and_submit(api, &config, draft, None, password, out).await?;
        }
        Command::Withdrawals { action } => match action {
            WithdrawalsCommand::List { page } => {
                list_withdrawals(api.as_ref(), WithdrawalScope::Own, page, out).await?;
            }
            WithdrawalsCommand::Cancel { id } => {
                let message = api.act(id, WithdrawalAction::Cancel).await.into_diagnostic()?;
                writeln!(out, "{message}").into_diagnostic()?;
            }
        },
        Command::Admin { action } => {
            let (id, action) = match action {
                AdminCommand::Withdrawals { status, page } => {
                    let scope = WithdrawalScope::Admin { status };
                    return list_withdrawals(api.as_ref(), scope, page, out).await;
                }
                AdminCommand::Approve { id } => (id, WithdrawalAction::Approve),
                AdminCommand::Reject { id, reason } => (id, WithdrawalAction::Reject { reason }),
                AdminCommand::Delete { id } => (id, WithdrawalAction::Delete),
            };
            let message = api.act(id, action).await.into_diagnostic()?;
            writeln!(out, "{message}").into_diagnostic()?;
        }
        Command::PackStats { pack_id } => {
            let stats = api.pack_stats(pack_id).await.into_diagnostic()?;
            let title = stats.pack_name.clone().unwrap_or_else(|| format!("pack {pack_id}"));
            writeln!(out, "{title}").into_diagnostic()?;
            for generation in Generation::all() {
                let g = stats.generation(generation);
                writeln!(
                    out,
                    "generation {}: {} referrals ({} active), commission {:.2}",
                    generation.level(),
                    g.referrals,
                    g.active_referrals,
                    g.commission
                )
                .into_diagnostic()?;
            }
            writeln!(
                out,
                "total: {} referrals, commission {:.2}",
                stats.total_referrals(),
                stats.total_commission()
            )
            .into_diagnostic()?;
        }
        Command::Referrals {
            pack_id,
            generation,
        } => {
            let referrals = api.referrals(pack_id).await.into_diagnostic()?;
            let referrals = filter_generation(referrals, generation.and_then(Generation::new));
            for r in &referrals {
                writeln!(
                    out,
                    "#{} {} (generation {}){}",
                    r.id,
                    r.name,
                    r.generation.level(),
                    if r.active { "" } else { " inactive" }
                )
                .into_diagnostic()?;
            }
            writeln!(out, "{} referrals", referrals.len()).into_diagnostic()?;
        }
    }

    Ok(())
}

fn purchase_draft(purpose: PaymentPurpose, money: MoneyArgs, method: MethodArgs) -> Result<Draft> {
    Ok(Draft {
        amount: money.amount,
        currency: money.currency,
        order: Order::Purchase {
            purpose,
            method: method.into_method().into_diagnostic()?,
        },
    })
}

async fn confirm_and_submit<W: Write>(
    api: Arc<HttpWalletApi>,
    config: &ClientConfig,
    draft: Draft,
    recipient: Option<String>,
    password: PasswordArg,
    out: &mut W,
) -> Result<()> {
    let mut checkout = Checkout::open(api, draft.order.fee_kind(), config.reference_amount)
        .await
        .into_diagnostic()?;

    if let Some(account_id) = recipient {
        let found = checkout.lookup_recipient(&account_id).await.into_diagnostic()?;
        writeln!(out, "recipient:  {} ({})", found.name, found.account_id).into_diagnostic()?;
    }

    let confirmation = checkout.review(draft).into_diagnostic()?;
    writeln!(out, "{}", confirmation.breakdown).into_diagnostic()?;

    let receipt = checkout
        .submit(SecretString::from(password.password))
        .await
        .into_diagnostic()?;
    writeln!(out, "{}", receipt.message).into_diagnostic()?;
    if let Some(reference) = &receipt.reference {
        writeln!(out, "reference:  {reference}").into_diagnostic()?;
    }
    writeln!(out, "idempotency key: {}", receipt.idempotency_key).into_diagnostic()?;
    Ok(())
}

async fn list_withdrawals<W: Write>(
    desk: &dyn WithdrawalDesk,
    scope: WithdrawalScope,
    page: u32,
    out: &mut W,
) -> Result<()> {
    let page = desk.list(scope, page).await.into_diagnostic()?;
    for w in &page.data {
        writeln!(
            out,
            "#{} {:.2} {} {} {}",
            w.id,
            w.amount,
            w.currency,
            w.status,
            w.payment_method.as_deref().unwrap_or("-")
        )
        .into_diagnostic()?;
    }
    writeln!(
        out,
        "page {}/{} ({} total)",
        page.current_page, page.last_page, page.total
    )
    .into_diagnostic()?;
    Ok(())
}
