use campaign_ledger::{
    AdLedger, CampaignParams, EpochSource, LedgerConfig, LedgerError, ManualClock,
    PublisherVerification, ViewRequest, WallClock,
};
use std::sync::Arc;

const ADMIN: &str = "admin";
const ADVERTISER: &str = "advertiser-1";
const ORACLE: &str = "oracle";

fn ledger_at(epoch: u64) -> (AdLedger, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(epoch));
    let ledger = AdLedger::new(LedgerConfig::default(), clock.clone()).expect("valid config");
    (ledger, clock)
}

fn standard_campaign() -> CampaignParams {
    CampaignParams::new("banner", 1_000_000, 10_000, 100)
}

#[test]
fn create_campaign_charges_two_percent() {
    let (ledger, _) = ledger_at(42);
    let created = ledger
        .create_campaign(ADVERTISER, standard_campaign())
        .expect("campaign created");
    assert_eq!(created.platform_fee, 20_000);
    assert_eq!(created.campaign_id, 1);
    assert_eq!(created.start_epoch, 42);
    assert_eq!(created.end_epoch, 142);

    let metrics = ledger.get_campaign_metrics(1).expect("metrics");
    assert_eq!(metrics.remaining_budget, 1_000_000);
    assert_eq!(metrics.total_budget, 1_000_000);
    assert_eq!(metrics.owner, ADVERTISER);
    assert_eq!(ledger.treasury_fees(), 20_000);
}

#[test]
fn bulk_create_assigns_sequential_ids() {
    let (ledger, _) = ledger_at(0);
    let outcome = ledger
        .bulk_create_campaigns(
            ADVERTISER,
            vec![
                CampaignParams::new("banner", 1_000_000, 10_000, 100),
                CampaignParams::new("video", 2_000_000, 15_000, 150),
            ],
        )
        .expect("batch created");
    assert_eq!(outcome.total, 2);
    let fees: Vec<_> = outcome.results.iter().map(|r| r.platform_fee).collect();
    let ids: Vec<_> = outcome.results.iter().map(|r| r.campaign_id).collect();
    assert_eq!(fees, vec![20_000, 40_000]);
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(outcome.results[1].end_epoch, 150);

    let next = ledger
        .create_campaign(ADVERTISER, standard_campaign())
        .expect("single after batch");
    assert_eq!(next.campaign_id, 3);
}

#[test]
fn recorded_view_debits_cost_per_view() {
    let (ledger, _) = ledger_at(0);
    ledger
        .create_campaign(ADVERTISER, standard_campaign())
        .expect("campaign");
    ledger
        .verify_publisher(ADMIN, "P1", 80)
        .expect("publisher verified");
    let record = ledger
        .record_view(ORACLE, 1, "P1", None)
        .expect("view recorded");
    assert_eq!(record.amount_paid, 10_000);
    assert_eq!(record.campaign_id, 1);
    assert_eq!(record.publisher_id, "P1");
    let metrics = ledger.get_campaign_metrics(1).expect("metrics");
    assert_eq!(metrics.remaining_budget, 990_000);
    assert_eq!(metrics.views_recorded, 1);
}

#[test]
fn eleventh_view_hits_daily_limit() {
    let (ledger, clock) = ledger_at(0);
    ledger
        .create_campaign(ADVERTISER, standard_campaign().with_daily_view_limit(10))
        .expect("campaign");
    ledger.verify_publisher(ADMIN, "P1", 80).expect("verified");
    for _ in 0..10 {
        ledger.record_view(ORACLE, 1, "P1", None).expect("within cap");
    }
    let before = ledger.get_campaign_metrics(1).expect("metrics").remaining_budget;
    assert_eq!(before, 900_000);
    let err = ledger.record_view(ORACLE, 1, "P1", None).unwrap_err();
    assert!(matches!(err, LedgerError::ViewLimitReached { limit: 10, .. }));
    assert_eq!(err.code(), 406);
    assert_eq!(
        ledger.get_campaign_metrics(1).expect("metrics").remaining_budget,
        before
    );
    assert_eq!(ledger.daily_view_count(1, "P1"), 10);

    clock.advance(1);
    ledger
        .record_view(ORACLE, 1, "P1", None)
        .expect("new epoch, new allowance");
}

#[test]
fn bulk_verify_with_bad_score_verifies_nobody() {
    let (ledger, _) = ledger_at(0);
    let err = ledger
        .bulk_verify_publishers(
            ADMIN,
            vec![
                PublisherVerification::new("P1", 80),
                PublisherVerification::new("P2", 150),
            ],
        )
        .unwrap_err();
    assert_eq!(err.code(), 400);
    assert!(!ledger.is_verified("P1"));
    assert!(!ledger.is_verified("P2"));
}

#[test]
fn bulk_views_roll_back_on_unknown_campaign() {
    let (ledger, _) = ledger_at(0);
    ledger
        .create_campaign(ADVERTISER, standard_campaign())
        .expect("campaign");
    ledger
        .bulk_verify_publishers(
            ADMIN,
            vec![
                PublisherVerification::new("P1", 80),
                PublisherVerification::new("P2", 60),
            ],
        )
        .expect("publishers verified");
    let before = ledger.get_campaign_metrics(1).expect("metrics");
    let err = ledger
        .bulk_record_views(
            ORACLE,
            vec![ViewRequest::new(1, "P1"), ViewRequest::new(999, "P2")],
        )
        .unwrap_err();
    assert_eq!(err, LedgerError::NotFound(999));
    assert_eq!(err.code(), 404);
    let after = ledger.get_campaign_metrics(1).expect("metrics");
    assert_eq!(after.remaining_budget, before.remaining_budget);
    assert_eq!(after.views_recorded, 0);
    assert_eq!(ledger.daily_view_count(1, "P1"), 0);
    assert_eq!(ledger.pending_view_records(), 0);
}

#[test]
fn batch_size_bounds_are_enforced() {
    let (ledger, _) = ledger_at(0);
    let too_many_campaigns = (0..6).map(|_| standard_campaign()).collect();
    assert_eq!(
        ledger
            .bulk_create_campaigns(ADVERTISER, too_many_campaigns)
            .unwrap_err()
            .code(),
        400
    );
    assert_eq!(
        ledger
            .bulk_create_campaigns(ADVERTISER, Vec::new())
            .unwrap_err()
            .code(),
        400
    );
    assert!(ledger.campaign_ids().is_empty());

    let too_many_views = (0..11).map(|_| ViewRequest::new(1, "P1")).collect();
    assert_eq!(
        ledger
            .bulk_record_views(ORACLE, too_many_views)
            .unwrap_err()
            .code(),
        400
    );

    // size is checked before authorization
    let too_many_publishers = (0..11)
        .map(|i| PublisherVerification::new(format!("P{i}"), 50))
        .collect();
    assert_eq!(
        ledger
            .bulk_verify_publishers("not-admin", too_many_publishers)
            .unwrap_err()
            .code(),
        400
    );

    let five = (0..5).map(|_| standard_campaign()).collect();
    let outcome = ledger
        .bulk_create_campaigns(ADVERTISER, five)
        .expect("five fit");
    assert_eq!(outcome.total, 5);
}

#[test]
fn view_checks_report_distinct_errors() {
    let (ledger, clock) = ledger_at(0);
    ledger
        .create_campaign(ADVERTISER, CampaignParams::new("native", 25_000, 10_000, 10))
        .expect("campaign");
    assert_eq!(
        ledger.record_view(ORACLE, 1, "P1", None).unwrap_err().code(),
        407
    );
    ledger.verify_publisher(ADMIN, "P1", 10).expect("verified");
    ledger.record_view(ORACLE, 1, "P1", None).expect("first");
    ledger.record_view(ORACLE, 1, "P1", None).expect("second");
    assert_eq!(
        ledger.record_view(ORACLE, 1, "P1", None).unwrap_err().code(),
        409
    );
    clock.advance(11);
    assert_eq!(
        ledger.record_view(ORACLE, 1, "P1", None).unwrap_err().code(),
        408
    );
    let metrics = ledger.get_campaign_metrics(1).expect("metrics");
    assert_eq!(metrics.remaining_budget, 5_000);
}

#[test]
fn non_admin_cannot_verify() {
    let (ledger, _) = ledger_at(0);
    let err = ledger.verify_publisher(ADVERTISER, "P1", 50).unwrap_err();
    assert_eq!(err.code(), 401);
    assert!(ledger.publisher("P1").is_none());
}

#[test]
fn unregistered_type_needs_admin_registration() {
    let (ledger, _) = ledger_at(0);
    let params = CampaignParams::new("audio", 1_000, 10, 10);
    assert_eq!(
        ledger
            .create_campaign(ADVERTISER, params.clone())
            .unwrap_err()
            .code(),
        400
    );
    ledger
        .register_campaign_type(ADMIN, "audio")
        .expect("type registered");
    let created = ledger
        .create_campaign(ADVERTISER, params.refundable(true).with_targeting("geo:eu"))
        .expect("campaign created");
    assert_eq!(created.campaign_id, 1);
    let campaign = ledger.campaign(1).expect("campaign");
    assert!(campaign.refundable);
    assert_eq!(campaign.targeting_data.as_deref(), Some("geo:eu"));
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let clock = Arc::new(ManualClock::new(0));
    let config = LedgerConfig {
        admin: "  ".into(),
        ..LedgerConfig::default()
    };
    let err = AdLedger::new(config, clock.clone())
        .err()
        .expect("empty admin rejected");
    assert_eq!(err.code(), 400);

    let config = LedgerConfig {
        view_operators: vec!["".into()],
        ..LedgerConfig::default()
    };
    assert!(AdLedger::new(config, clock).is_err());
}

#[test]
fn wall_clock_drives_campaign_windows() {
    let clock = Arc::new(WallClock::daily(0));
    let ledger = AdLedger::new(LedgerConfig::default(), clock.clone()).expect("valid config");
    let before = clock.current_epoch();
    let created = ledger
        .create_campaign(ADVERTISER, standard_campaign())
        .expect("campaign created");
    let after = ledger.current_epoch();
    assert!(before > 0);
    assert!(created.start_epoch >= before && created.start_epoch <= after);
    assert_eq!(created.end_epoch, created.start_epoch + 100);
}
