use packwallet::application::checkout::Checkout;
use packwallet::application::validator::Draft;
use packwallet::domain::fees::FeeKind;
use packwallet::domain::money::{Amount, Balance, Currency};
use packwallet::domain::ports::{
    CheckoutBackendRef, PaymentGateway, ReferralSource, WalletSource, WithdrawalDesk,
    WithdrawalScope,
};
use packwallet::domain::referral::{Generation, GenerationStats, PackStats};
use packwallet::domain::request::{Confirmation, Order};
use packwallet::error::WalletError;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_ports_as_shared_trait_objects() {
    let backend = Arc::new(common::backend().with_pack(
        PackStats {
            pack_id: 4,
            pack_name: Some("Gold".to_string()),
            generations: vec![GenerationStats {
                generation: Generation::new(1).unwrap(),
                referrals: 2,
                active_referrals: 1,
                commission: dec!(5),
            }],
        },
        vec![],
    ));
    let desk: Arc<dyn WithdrawalDesk> = backend.clone();
    let referrals: Arc<dyn ReferralSource> = backend.clone();
    let wallet: Arc<dyn WalletSource> = backend;

    // Verify Send + Sync by spawning tasks
    let desk_handle = tokio::spawn(async move { desk.list(WithdrawalScope::Own, 1).await.unwrap() });
    let stats_handle = tokio::spawn(async move { referrals.pack_stats(4).await.unwrap() });
    let wallet_handle = tokio::spawn(async move { wallet.balance().await.unwrap() });

    assert_eq!(desk_handle.await.unwrap().total, 0);
    assert_eq!(stats_handle.await.unwrap().total_commission(), dec!(5));
    assert_eq!(wallet_handle.await.unwrap().usd, Balance::new(dec!(200)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_never_overdraw() {
    let backend = Arc::new(common::backend());
    let shared: CheckoutBackendRef = backend.clone();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let shared = shared.clone();
        handles.push(tokio::spawn(async move {
            let mut checkout = Checkout::open(shared, FeeKind::Transfer, common::reference()).await?;
            checkout.lookup_recipient(common::RECIPIENT_ID).await?;
            checkout.review(Draft {
                amount: dec!(50),
                currency: Currency::Usd,
                order: Order::Transfer { note: None },
            })?;
            let receipt = checkout.submit(common::password()).await?;
            Ok::<_, WalletError>(receipt)
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            // Rejected at review, before submission, or by the server.
            Err(
                WalletError::Validation(_)
                | WalletError::InsufficientBalance { .. }
                | WalletError::Api(_),
            ) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    // 3 x 51.50 fits in 200, a fourth does not.
    assert_eq!(succeeded, 3);
    assert_eq!(backend.applied_submissions().await, 3);
    assert_eq!(backend.balance().await.unwrap().usd, Balance::new(dec!(45.50)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duplicate_key_applied_once_under_concurrency() {
    let backend = Arc::new(common::backend());
    let gateway: Arc<dyn PaymentGateway> = backend.clone();

    let confirmation = Confirmation {
        breakdown: common::schedule(dec!(2), dec!(1))
            .apply(Amount::new(dec!(20)).unwrap(), Currency::Usd),
        order: Order::Transfer { note: None },
        recipient: Some(backend_recipient()),
        idempotency_key: Uuid::new_v4(),
    };

    let first = confirmation.to_submission(common::password()).unwrap();
    let second = confirmation.to_submission(common::password()).unwrap();
    let (a, b) = tokio::join!(
        {
            let gateway = gateway.clone();
            async move { gateway.submit(first).await }
        },
        async move { gateway.submit(second).await }
    );

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(backend.applied_submissions().await, 1);
    assert_eq!(backend.balance().await.unwrap().usd, Balance::new(dec!(179.40)));
}

fn backend_recipient() -> packwallet::domain::request::Recipient {
    packwallet::domain::request::Recipient {
        account_id: common::RECIPIENT_ID.to_string(),
        name: "Grace Mbuyi".to_string(),
        email: None,
        phone: None,
    }
}
