use chrono::{Duration, Utc};
use rent_payment_engine::{
    db_types::{TenantCategory, UnitStatus},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{insert_tenant, insert_unit, TenantFixture},
    },
    SqliteDatabase,
    TenantDirectory,
    TenantMonitorApi,
};
use rpg_common::Ugx;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[tokio::test]
async fn monitoring_pass_recategorises_tenants() {
    let db = new_db().await;
    let today = Utc::now().date_naive();
    let rent = Ugx::from(500_000);

    let unit_overdue = insert_unit(&db, 1, "H1", rent).await;
    let overdue = insert_tenant(
        &db,
        TenantFixture::new(1, unit_overdue, "0701000001", rent).due_on(today - Duration::days(10)),
    )
    .await;
    let unit_due = insert_unit(&db, 1, "H2", rent).await;
    let due = insert_tenant(
        &db,
        TenantFixture::new(1, unit_due, "0701000002", rent).due_on(today - Duration::days(3)),
    )
    .await;
    let unit_pending = insert_unit(&db, 1, "H3", rent).await;
    let pending = insert_tenant(
        &db,
        TenantFixture::new(1, unit_pending, "0701000003", rent).due_on(today + Duration::days(5)),
    )
    .await;
    let unit_vacated = insert_unit(&db, 1, "H4", rent).await;
    let vacated = insert_tenant(
        &db,
        TenantFixture::new(1, unit_vacated, "0701000004", rent)
            .due_on(today - Duration::days(20))
            .moving_out_on(today - Duration::days(1)),
    )
    .await;

    let api = TenantMonitorApi::new(db.clone());
    let summary = api.run_monitoring_pass(today).await.unwrap();
    assert_eq!(summary.total_processed, 4);
    assert_eq!(summary.overdue_updated, 1);
    assert_eq!(summary.due_updated, 1);
    // the pending tenant was already Pending, so nothing to persist
    assert_eq!(summary.pending_updated, 0);
    assert_eq!(summary.moved_out_updated, 1);
    assert!(summary.errors.is_empty());

    assert_eq!(db.tenant_by_id(overdue).await.unwrap().unwrap().category, TenantCategory::Overdue);
    assert_eq!(db.tenant_by_id(due).await.unwrap().unwrap().category, TenantCategory::Due);
    assert_eq!(db.tenant_by_id(pending).await.unwrap().unwrap().category, TenantCategory::Pending);

    // the move-out cascades: tenant deactivated, unit released
    let moved = db.tenant_by_id(vacated).await.unwrap().unwrap();
    assert_eq!(moved.category, TenantCategory::MovedOut);
    assert!(!moved.is_active);
    assert_eq!(db.unit_by_id(unit_vacated).await.unwrap().unwrap().status, UnitStatus::Available);
}

#[tokio::test]
async fn monitoring_pass_is_idempotent() {
    let db = new_db().await;
    let today = Utc::now().date_naive();
    let rent = Ugx::from(400_000);
    let unit = insert_unit(&db, 1, "H5", rent).await;
    insert_tenant(&db, TenantFixture::new(1, unit, "0701000005", rent).due_on(today - Duration::days(12)))
        .await;
    let unit2 = insert_unit(&db, 1, "H6", rent).await;
    insert_tenant(
        &db,
        TenantFixture::new(1, unit2, "0701000006", rent)
            .due_on(today)
            .moving_out_on(today - Duration::days(2)),
    )
    .await;

    let api = TenantMonitorApi::new(db.clone());
    let first = api.run_monitoring_pass(today).await.unwrap();
    assert_eq!(first.overdue_updated, 1);
    assert_eq!(first.moved_out_updated, 1);

    // a re-run (or an overlapping run) changes nothing further
    let second = api.run_monitoring_pass(today).await.unwrap();
    assert_eq!(second.overdue_updated, 0);
    assert_eq!(second.due_updated, 0);
    assert_eq!(second.pending_updated, 0);
    assert_eq!(second.moved_out_updated, 0);
    // the moved-out tenant is inactive now and no longer processed at all
    assert_eq!(second.total_processed, 1);
}

#[tokio::test]
async fn summary_counts_amounts_per_category() {
    let db = new_db().await;
    let today = Utc::now().date_naive();
    let rent = Ugx::from(600_000);
    let unit_a = insert_unit(&db, 1, "H7", rent).await;
    insert_tenant(&db, TenantFixture::new(1, unit_a, "0701000007", rent).due_on(today - Duration::days(30)))
        .await;
    let unit_b = insert_unit(&db, 1, "H8", rent).await;
    insert_tenant(&db, TenantFixture::new(1, unit_b, "0701000008", rent).due_on(today - Duration::days(2)))
        .await;

    let api = TenantMonitorApi::new(db);
    let summary = api.payment_summary(today).await.unwrap();
    assert_eq!(summary.total_tenants, 2);
    assert_eq!(summary.overdue_count, 1);
    assert_eq!(summary.due_count, 1);
    assert_eq!(summary.total_overdue_amount, rent);
    assert_eq!(summary.total_due_amount, rent);
    assert_eq!(summary.total_pending_amount, Ugx::from(0));
}
