use chrono::Utc;
use rent_payment_engine::{
    db_types::{NewPaymentRequest, Provider, TenantCategory},
    events::EventProducers,
    providers::{GatewayRegistry, GatewaySettings},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{insert_tenant, insert_unit, TenantFixture},
    },
    ConfirmationOutcome,
    InitiatePayment,
    PaymentFlowApi,
    PaymentStore,
    Period,
    ProviderConfirmation,
    ReconciliationApi,
    SqliteDatabase,
    TenantDirectory,
};
use rpg_common::Ugx;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn flow_api(db: SqliteDatabase) -> PaymentFlowApi<SqliteDatabase> {
    let gateways = GatewayRegistry::from_settings(&GatewaySettings {
        merchant_name: "Kampala Heights".into(),
        mtn_payment_number: Some("0772 000 111".into()),
        airtel_payment_number: Some("0752 000 222".into()),
        ..Default::default()
    });
    PaymentFlowApi::new(db, gateways, EventProducers::default())
}

/// Issues, initiates and confirms one payment. `tenant_id = None` produces an unlinked
/// transaction, as a walk-up payer scanning a unit QR would.
async fn confirmed_payment(
    api: &PaymentFlowApi<SqliteDatabase>,
    unit_id: i64,
    tenant_id: Option<i64>,
    payer_phone: &str,
    amount: Ugx,
    months_advance: i64,
) -> String {
    let mut request = NewPaymentRequest::new(unit_id, 1, amount, "ACC-100".into(), Provider::Mtn);
    if let Some(tenant) = tenant_id {
        request = request.for_tenant(tenant);
    }
    let issued = api.issue_request(request).await.unwrap();
    let params = InitiatePayment {
        payer_phone: payer_phone.into(),
        amount,
        months_advance,
        is_prepayment: false,
    };
    let tx = api.initiate(issued.request.id, params).await.unwrap();
    let confirmation = ProviderConfirmation {
        provider: Provider::Mtn,
        external_id: Some(tx.external_id.clone()),
        provider_tx_id: None,
        outcome: ConfirmationOutcome::Success { provider_status: "SUCCESSFUL".into() },
        raw: serde_json::json!({"externalId": tx.external_id, "status": "SUCCESSFUL"}),
    };
    api.apply_confirmation(confirmation).await.unwrap();
    tx.external_id
}

#[tokio::test]
async fn seven_of_ten_tenants_paid_in_full() {
    let db = new_db().await;
    let api = flow_api(db.clone());
    let rent = Ugx::from(500_000);
    let mut households = Vec::new();
    for i in 0..10 {
        let unit = insert_unit(&db, 1, &format!("C{i}"), rent).await;
        let phone = format!("070100000{i}");
        let tenant = insert_tenant(&db, TenantFixture::new(1, unit, &phone, rent)).await;
        households.push((unit, tenant));
    }
    for (i, (unit, tenant)) in households.iter().take(7).enumerate() {
        confirmed_payment(&api, *unit, Some(*tenant), &format!("070100000{i}"), rent, 1).await;
    }

    let report = ReconciliationApi::new(db)
        .reconcile(Period::containing(Utc::now().date_naive()), None)
        .await
        .unwrap();
    assert_eq!(report.total_transactions, 7);
    assert_eq!(report.total_expected, 10);
    assert_eq!(report.matched, 7);
    assert_eq!(report.unmatched_expected, 3);
    assert_eq!(report.unmatched_mobile, 0);
    assert_eq!(report.amount_discrepancies, 0);
    assert_eq!(report.total_received, rent * 7);
    assert_eq!(report.total_expected_amount, rent * 10);
    assert_eq!(report.unpaid_tenants.len(), 3);
}

#[tokio::test]
async fn underpayment_is_reported_with_signed_difference() {
    let db = new_db().await;
    let api = flow_api(db.clone());
    let rent = Ugx::from(500_000);
    let unit = insert_unit(&db, 1, "D1", rent).await;
    let tenant = insert_tenant(&db, TenantFixture::new(1, unit, "0701222333", rent)).await;
    confirmed_payment(&api, unit, Some(tenant), "0701222333", Ugx::from(450_000), 1).await;

    let report = ReconciliationApi::new(db)
        .reconcile(Period::containing(Utc::now().date_naive()), None)
        .await
        .unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.amount_discrepancies, 1);
    let discrepancy = &report.discrepancies[0];
    assert_eq!(discrepancy.expected, rent);
    assert_eq!(discrepancy.paid, Ugx::from(450_000));
    assert_eq!(discrepancy.difference, Ugx::from(-50_000));
}

#[tokio::test]
async fn multi_month_payments_reconcile_cleanly() {
    let db = new_db().await;
    let api = flow_api(db.clone());
    let rent = Ugx::from(500_000);
    let unit = insert_unit(&db, 1, "D2", rent).await;
    let tenant = insert_tenant(&db, TenantFixture::new(1, unit, "0701333444", rent)).await;
    confirmed_payment(&api, unit, Some(tenant), "0701333444", Ugx::from(1_000_000), 2).await;

    let report = ReconciliationApi::new(db)
        .reconcile(Period::containing(Utc::now().date_naive()), None)
        .await
        .unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.amount_discrepancies, 0);
}

#[tokio::test]
async fn property_filter_narrows_the_expected_set() {
    let db = new_db().await;
    let rent = Ugx::from(500_000);
    let unit_a = insert_unit(&db, 1, "E1", rent).await;
    let unit_b = insert_unit(&db, 2, "F1", rent).await;
    insert_tenant(&db, TenantFixture::new(1, unit_a, "0701444555", rent)).await;
    insert_tenant(&db, TenantFixture::new(2, unit_b, "0701555666", rent)).await;

    let report = ReconciliationApi::new(db)
        .reconcile(Period::containing(Utc::now().date_naive()), Some(1))
        .await
        .unwrap();
    assert_eq!(report.total_expected, 1);
    assert_eq!(report.unmatched_expected, 1);
}

#[tokio::test]
async fn auto_match_links_a_unique_close_candidate() {
    let db = new_db().await;
    let api = flow_api(db.clone());
    let rent = Ugx::from(500_000);
    let unit = insert_unit(&db, 1, "G1", rent).await;
    let tenant = insert_tenant(&db, TenantFixture::new(1, unit, "0701 666 777", rent)).await;
    // 0.95 x rent, from the tenant's own phone, but the request carried no tenant link
    let external_id = confirmed_payment(&api, unit, None, "0701666777", Ugx::from(475_000), 1).await;

    let outcome = ReconciliationApi::new(db.clone()).auto_match(None).await.unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.unmatched, 0);
    assert!(outcome.ambiguous.is_empty());

    let tx = db.fetch_transaction_by_external_id(&external_id).await.unwrap().unwrap();
    assert_eq!(tx.tenant_id, Some(tenant));
    let tenant = db.tenant_by_id(tenant).await.unwrap().unwrap();
    assert_eq!(tenant.category, TenantCategory::Paid);
    assert!(tenant.next_payment_due.is_some());
    assert!(tenant.last_payment_date.is_some());
}

#[tokio::test]
async fn auto_match_leaves_distant_amounts_alone() {
    let db = new_db().await;
    let api = flow_api(db.clone());
    let rent = Ugx::from(500_000);
    let unit = insert_unit(&db, 1, "G2", rent).await;
    let tenant = insert_tenant(&db, TenantFixture::new(1, unit, "0701777888", rent)).await;
    // 0.7 x rent is outside the 10% variance
    let external_id = confirmed_payment(&api, unit, None, "0701777888", Ugx::from(350_000), 1).await;

    let outcome = ReconciliationApi::new(db.clone()).auto_match(None).await.unwrap();
    assert_eq!(outcome.matched, 0);
    assert_eq!(outcome.unmatched, 1);
    let tx = db.fetch_transaction_by_external_id(&external_id).await.unwrap().unwrap();
    assert_eq!(tx.tenant_id, None);
    let tenant = db.tenant_by_id(tenant).await.unwrap().unwrap();
    assert_eq!(tenant.next_payment_due, None);
}

#[tokio::test]
async fn auto_match_reports_ambiguity_instead_of_guessing() {
    let db = new_db().await;
    let api = flow_api(db.clone());
    let unit_a = insert_unit(&db, 1, "G3", Ugx::from(500_000)).await;
    let unit_b = insert_unit(&db, 1, "G4", Ugx::from(510_000)).await;
    // two tenants share a phone (spouses paying from one wallet) with near-identical rents
    let t1 = insert_tenant(&db, TenantFixture::new(1, unit_a, "0701888999", Ugx::from(500_000))).await;
    let t2 = insert_tenant(&db, TenantFixture::new(1, unit_b, "0701888999", Ugx::from(510_000))).await;
    let external_id = confirmed_payment(&api, unit_a, None, "0701888999", Ugx::from(500_000), 1).await;

    let outcome = ReconciliationApi::new(db.clone()).auto_match(None).await.unwrap();
    assert_eq!(outcome.matched, 0);
    assert_eq!(outcome.ambiguous.len(), 1);
    let ambiguous = &outcome.ambiguous[0];
    assert_eq!(ambiguous.external_id, external_id);
    assert_eq!(ambiguous.candidate_tenant_ids, vec![t1, t2]);
    // the transaction stays unlinked and both tenants untouched
    let tx = db.fetch_transaction_by_external_id(&external_id).await.unwrap().unwrap();
    assert_eq!(tx.tenant_id, None);
    assert_eq!(db.tenant_by_id(t1).await.unwrap().unwrap().next_payment_due, None);
    assert_eq!(db.tenant_by_id(t2).await.unwrap().unwrap().next_payment_due, None);
}

#[tokio::test]
async fn unlinked_payments_appear_in_the_report() {
    let db = new_db().await;
    let api = flow_api(db.clone());
    let unit = insert_unit(&db, 1, "G5", Ugx::from(500_000)).await;
    confirmed_payment(&api, unit, None, "0701999000", Ugx::from(500_000), 1).await;

    let report = ReconciliationApi::new(db)
        .reconcile(Period::containing(Utc::now().date_naive()), None)
        .await
        .unwrap();
    assert_eq!(report.unmatched_mobile, 1);
    assert_eq!(report.unmatched_payments.len(), 1);
    assert_eq!(report.matched, 0);
}
