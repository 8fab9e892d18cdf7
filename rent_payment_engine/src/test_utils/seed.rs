//! Row-seeding helpers for integration tests. These write directly to the directory tables, which
//! in production belong to the CRUD layer.

use chrono::NaiveDate;
use rpg_common::Ugx;

use crate::{db_types::TenantCategory, SqliteDatabase};

pub struct TenantFixture {
    pub property_id: i64,
    pub unit_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub monthly_rent: Ugx,
    pub next_payment_due: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub category: TenantCategory,
}

impl TenantFixture {
    pub fn new(property_id: i64, unit_id: i64, phone: &str, monthly_rent: Ugx) -> Self {
        Self {
            property_id,
            unit_id,
            first_name: "Test".into(),
            last_name: format!("Tenant{unit_id}"),
            phone: phone.into(),
            monthly_rent,
            next_payment_due: None,
            move_out_date: None,
            category: TenantCategory::Pending,
        }
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.next_payment_due = Some(date);
        self
    }

    pub fn moving_out_on(mut self, date: NaiveDate) -> Self {
        self.move_out_date = Some(date);
        self
    }
}

pub async fn insert_unit(db: &SqliteDatabase, property_id: i64, unit_number: &str, monthly_rent: Ugx) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO units (property_id, unit_number, monthly_rent) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(property_id)
    .bind(unit_number)
    .bind(monthly_rent)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding unit");
    id
}

pub async fn insert_tenant(db: &SqliteDatabase, fixture: TenantFixture) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        r#"
            INSERT INTO tenants
                (property_id, unit_id, first_name, last_name, phone, monthly_rent, next_payment_due,
                 move_out_date, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id;
        "#,
    )
    .bind(fixture.property_id)
    .bind(fixture.unit_id)
    .bind(fixture.first_name)
    .bind(fixture.last_name)
    .bind(fixture.phone)
    .bind(fixture.monthly_rent)
    .bind(fixture.next_payment_due)
    .bind(fixture.move_out_date)
    .bind(fixture.category)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding tenant");
    id
}

/// Pushes a request's expiry two days into the past, so expiry paths can be exercised without
/// waiting.
pub async fn age_request(db: &SqliteDatabase, request_id: i64) {
    sqlx::query("UPDATE payment_requests SET expires_at = datetime('now', '-2 days') WHERE id = ?")
        .bind(request_id)
        .execute(db.pool())
        .await
        .expect("Error aging request");
}

pub async fn transaction_count(db: &SqliteDatabase) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mobile_transactions")
        .fetch_one(db.pool())
        .await
        .expect("Error counting transactions");
    count
}
