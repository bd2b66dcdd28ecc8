use land_options::domain::NewUser;
use land_options::ledger::DemoData;
use land_options::{
    init_db, ConversionError, ConversionService, Decimal, LandType, LedgerError, MemoryLedger,
    MissingRecordPolicy, PaymentId, Repository, RewardLedger, RoundingPolicy, ServiceError,
    SqliteLedger, UserId,
};
use std::sync::Arc;
use tempfile::TempDir;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn alex() -> UserId {
    UserId::new("employee_001")
}

async fn sqlite_ledger(policy: MissingRecordPolicy) -> (Arc<SqliteLedger>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let ledger = SqliteLedger::new(Repository::new(pool), policy);
    ledger.seed(&DemoData::standard()).await.unwrap();
    (Arc::new(ledger), temp_dir)
}

/// Runs the same flow against any ledger backend.
async fn bonus_then_claim(ledger: Arc<dyn RewardLedger>) {
    let service = ConversionService::new(ledger.clone(), RoundingPolicy::WholeUnitsOnly);

    let outcome = service
        .convert_bonus(&alex(), d("3000"), LandType::JunglePlot)
        .await
        .unwrap();
    assert_eq!(outcome.result.units, d("3"));
    assert_eq!(outcome.balance.count, d("3"));

    let claim = service
        .claim_reward(&alex(), LandType::JunglePlot)
        .await
        .unwrap();
    assert_eq!(claim.square.id, "employee_001_0_0");
    assert_eq!(claim.balance.count, d("2"));

    let claim = service
        .claim_reward(&alex(), LandType::JunglePlot)
        .await
        .unwrap();
    assert_eq!(claim.square.id, "employee_001_1_0");

    let game = service.game_data(&alex()).await.unwrap();
    assert_eq!(game.owned_squares.len(), 8);
    assert_eq!(game.completion_percentage, 32);
    let jungle = game
        .available_rewards
        .iter()
        .find(|b| b.land_type == LandType::JunglePlot)
        .unwrap();
    assert_eq!(jungle.count, d("1"));
}

#[tokio::test]
async fn test_bonus_and_claim_on_memory_ledger() {
    let ledger = Arc::new(MemoryLedger::demo(MissingRecordPolicy::CreateOnAbsent));
    bonus_then_claim(ledger).await;
}

#[tokio::test]
async fn test_bonus_and_claim_on_sqlite_ledger() {
    let (ledger, _temp) = sqlite_ledger(MissingRecordPolicy::CreateOnAbsent).await;
    bonus_then_claim(ledger).await;
}

#[tokio::test]
async fn test_reject_policy_needs_existing_row() {
    let ledger = Arc::new(
        MemoryLedger::new(MissingRecordPolicy::RejectOnAbsent).with_user(
            land_options::domain::UserProfile {
                user_id: alex(),
                name: "Alex Johnson".to_string(),
                email: "alex@company.com".to_string(),
                streak_days: 0,
                total_earnings: Decimal::zero(),
            },
        ),
    );
    let service = ConversionService::new(ledger.clone(), RoundingPolicy::WholeUnitsOnly);

    let err = service
        .convert_bonus(&alex(), d("1000"), LandType::Forest)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Ledger(LedgerError::NotFound(_))));
    assert_eq!(
        ledger
            .get_reward_balance(&alex(), LandType::Forest)
            .await
            .unwrap(),
        Decimal::zero()
    );
}

#[tokio::test]
async fn test_reject_policy_works_for_created_users() {
    let (ledger, _temp) = sqlite_ledger(MissingRecordPolicy::RejectOnAbsent).await;
    let service = ConversionService::new(ledger, RoundingPolicy::FractionalUnitsAllowed);
    let investor = UserId::new("investor_001");
    service
        .create_user(NewUser {
            user_id: investor.clone(),
            name: "Dana Investor".to_string(),
            email: "dana@fund.com".to_string(),
        })
        .await
        .unwrap();

    let mut tracker = service.start_investment(d("250000")).unwrap();
    tracker.set_units(LandType::Flathouse, d("1")).unwrap();
    tracker.set_units(LandType::FlathouseMini, d("1")).unwrap();
    let receipt = service
        .commit_investment(&investor, &mut tracker)
        .await
        .unwrap();

    assert_eq!(receipt.balances.len(), 2);
    assert_eq!(receipt.summary.total_invested, d("250000"));
    assert!(tracker.is_committed());
}

#[tokio::test]
async fn test_investment_is_audited() {
    let ledger = Arc::new(MemoryLedger::demo(MissingRecordPolicy::CreateOnAbsent));
    let service = ConversionService::new(ledger.clone(), RoundingPolicy::WholeUnitsOnly);

    let mut tracker = service.start_investment(d("60000")).unwrap();
    tracker.quick_fill_remaining(LandType::JunglePlot).unwrap();
    service
        .commit_investment(&alex(), &mut tracker)
        .await
        .unwrap();

    let log = ledger.investment_log().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].amount, d("60000"));
    assert_eq!(log[0].units, d("60"));
}

#[tokio::test]
async fn test_failed_commit_leaves_tracker_open() {
    let ledger = Arc::new(MemoryLedger::demo(MissingRecordPolicy::CreateOnAbsent));
    let service = ConversionService::new(ledger.clone(), RoundingPolicy::WholeUnitsOnly);

    let mut tracker = service.start_investment(d("150000")).unwrap();
    tracker.set_units(LandType::Flathouse, d("1")).unwrap();
    let err = service
        .commit_investment(&UserId::new("nobody"), &mut tracker)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Ledger(LedgerError::NotFound(_))));
    assert!(!tracker.is_committed());
    assert_eq!(
        ledger
            .get_reward_balance(&alex(), LandType::Flathouse)
            .await
            .unwrap(),
        Decimal::zero()
    );

    service
        .commit_investment(&alex(), &mut tracker)
        .await
        .unwrap();
    assert_eq!(
        ledger
            .get_reward_balance(&alex(), LandType::Flathouse)
            .await
            .unwrap(),
        d("1")
    );
    let err = service
        .commit_investment(&alex(), &mut tracker)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conversion(ConversionError::AlreadyCommitted)
    ));
}

fn investor_profile() -> land_options::domain::UserProfile {
    land_options::domain::UserProfile {
        user_id: alex(),
        name: "Alex Johnson".to_string(),
        email: "alex@company.com".to_string(),
        streak_days: 0,
        total_earnings: Decimal::zero(),
    }
}

#[tokio::test]
async fn test_commit_with_one_missing_row_credits_nothing() {
    let ledger = Arc::new(
        MemoryLedger::new(MissingRecordPolicy::RejectOnAbsent)
            .with_user(investor_profile())
            .with_reward(&alex(), LandType::JunglePlot, Decimal::zero()),
    );
    let service = ConversionService::new(ledger.clone(), RoundingPolicy::WholeUnitsOnly);

    let mut tracker = service.start_investment(d("200000")).unwrap();
    tracker.set_units(LandType::Flathouse, d("1")).unwrap();
    tracker.set_units(LandType::JunglePlot, d("50")).unwrap();
    let err = service
        .commit_investment(&alex(), &mut tracker)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Ledger(LedgerError::NotFound(_))));
    assert!(!tracker.is_committed());
    assert_eq!(
        ledger
            .get_reward_balance(&alex(), LandType::JunglePlot)
            .await
            .unwrap(),
        Decimal::zero()
    );
    assert!(ledger.investment_log().await.is_empty());

    // Retrying with only the jungle line credits it exactly once.
    tracker.set_units(LandType::Flathouse, Decimal::zero()).unwrap();
    tracker.set_budget(d("50000")).unwrap();
    service
        .commit_investment(&alex(), &mut tracker)
        .await
        .unwrap();
    assert_eq!(
        ledger
            .get_reward_balance(&alex(), LandType::JunglePlot)
            .await
            .unwrap(),
        d("50")
    );
    assert_eq!(ledger.investment_log().await.len(), 1);
}

#[tokio::test]
async fn test_commit_rolls_back_on_sqlite() {
    let (ledger, _temp) = sqlite_ledger(MissingRecordPolicy::RejectOnAbsent).await;
    let service = ConversionService::new(ledger.clone(), RoundingPolicy::WholeUnitsOnly);
    let repo = ledger.repo();
    sqlx::query("DELETE FROM rewards WHERE user_id = ? AND land_type = ?")
        .bind("employee_001")
        .bind("flathouse")
        .execute(repo.pool())
        .await
        .unwrap();

    let mut tracker = service.start_investment(d("200000")).unwrap();
    tracker.set_units(LandType::Flathouse, d("1")).unwrap();
    tracker.set_units(LandType::JunglePlot, d("50")).unwrap();
    let err = service
        .commit_investment(&alex(), &mut tracker)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Ledger(LedgerError::NotFound(_))));
    assert!(!tracker.is_committed());
    assert_eq!(
        ledger
            .get_reward_balance(&alex(), LandType::JunglePlot)
            .await
            .unwrap(),
        Decimal::zero()
    );
}

#[tokio::test]
async fn test_concurrent_bonuses_on_sqlite() {
    let (ledger, _temp) = sqlite_ledger(MissingRecordPolicy::CreateOnAbsent).await;
    let service = Arc::new(ConversionService::new(
        ledger.clone(),
        RoundingPolicy::WholeUnitsOnly,
    ));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .convert_bonus(&alex(), d("1000"), LandType::JunglePlot)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(
        ledger
            .get_reward_balance(&alex(), LandType::JunglePlot)
            .await
            .unwrap(),
        d("50")
    );
}

#[tokio::test]
async fn test_payment_conversion_on_sqlite() {
    let (ledger, _temp) = sqlite_ledger(MissingRecordPolicy::CreateOnAbsent).await;
    let service = ConversionService::new(ledger.clone(), RoundingPolicy::WholeUnitsOnly);

    let outcome = service
        .convert_payment(&alex(), &PaymentId::new("pay_002"))
        .await
        .unwrap_err();
    assert!(matches!(
        outcome,
        ServiceError::Conversion(ConversionError::BelowMinimum { .. })
    ));

    let outcome = service
        .convert_payment(&alex(), &PaymentId::new("pay_001"))
        .await
        .unwrap();
    assert_eq!(outcome.result.units, d("1"));
    assert_eq!(outcome.balance.count, d("2"));

    let pending = service.pending_payments(&alex()).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, PaymentId::new("pay_002"));
}

#[tokio::test]
async fn test_grid_full() {
    let ledger = Arc::new(MemoryLedger::new(MissingRecordPolicy::CreateOnAbsent));
    let service = ConversionService::new(ledger.clone(), RoundingPolicy::WholeUnitsOnly);
    let user = UserId::new("employee_042");
    service
        .create_user(NewUser {
            user_id: user.clone(),
            name: "Grid Filler".to_string(),
            email: "filler@company.com".to_string(),
        })
        .await
        .unwrap();
    ledger
        .set_reward_balance(&user, LandType::Tree, Decimal::from_i64(26))
        .await
        .unwrap();

    for _ in 0..25 {
        service.claim_reward(&user, LandType::Tree).await.unwrap();
    }
    let err = service
        .claim_reward(&user, LandType::Tree)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::GridFull));

    let game = service.game_data(&user).await.unwrap();
    assert_eq!(game.total_land_parcels, 1);
    assert_eq!(game.completion_percentage, 100);
    assert_eq!(game.next_parcel_progress, 0);
}
