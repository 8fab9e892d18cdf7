use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rpg_common::Ugx;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub const DEFAULT_REQUEST_EXPIRY_DAYS: i64 = 7;
pub const MAX_REQUEST_EXPIRY_DAYS: i64 = 30;
/// A rent period is billed as 30 days, regardless of the calendar month.
pub const DAYS_PER_RENT_PERIOD: i64 = 30;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------      Provider       ---------------------------------------------------------
/// The mobile-money providers the gateway can collect through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(alias = "mtn_mobile_money")]
    Mtn,
    #[serde(alias = "airtel_money")]
    Airtel,
}

impl Provider {
    /// The identifier used in QR payloads and configuration keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Provider::Mtn => "mtn_mobile_money",
            Provider::Airtel => "airtel_money",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Mtn => write!(f, "MTN Mobile Money"),
            Provider::Airtel => write!(f, "Airtel Money"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mtn" | "mtn_mobile_money" => Ok(Self::Mtn),
            "airtel" | "airtel_money" => Ok(Self::Airtel),
            s => Err(ConversionError(format!("Unknown mobile money provider: {s}"))),
        }
    }
}

//--------------------------------------    RequestStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// The request can still be scanned and paid.
    Active,
    /// A successful transaction has consumed this request.
    Used,
    /// The expiry sweep retired this request after its expiry timestamp passed.
    Expired,
    /// An operator cancelled the request before it was paid.
    Cancelled,
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Active => write!(f, "Active"),
            RequestStatus::Used => write!(f, "Used"),
            RequestStatus::Expired => write!(f, "Expired"),
            RequestStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Used" => Ok(Self::Used),
            "Expired" => Ok(Self::Expired),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid request status: {s}"))),
        }
    }
}

//--------------------------------------  TransactionStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Initiated with the provider; waiting for the customer to approve on their handset.
    Pending,
    /// The provider confirmed the money movement.
    Paid,
    /// The provider reported failure, or initiation itself failed.
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Paid => write!(f, "Paid"),
            TransactionStatus::Failed => write!(f, "Failed"),
        }
    }
}

//--------------------------------------    TenantCategory    ---------------------------------------------------------
/// A tenant's derived payment category. Recomputed from date arithmetic by the monitor; `Paid` is
/// only ever set by the confirmation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantCategory {
    Overdue,
    Due,
    Pending,
    Paid,
    MovedOut,
}

impl Display for TenantCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantCategory::Overdue => write!(f, "overdue"),
            TenantCategory::Due => write!(f, "due"),
            TenantCategory::Pending => write!(f, "pending"),
            TenantCategory::Paid => write!(f, "paid"),
            TenantCategory::MovedOut => write!(f, "moved_out"),
        }
    }
}

//--------------------------------------      UnitStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Available,
    Occupied,
    Maintenance,
}

//--------------------------------------    PaymentRequest    ---------------------------------------------------------
/// A scannable, time-boxed request for a specific amount, tied to a unit and optionally a tenant.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentRequest {
    pub id: i64,
    pub unit_id: i64,
    pub tenant_id: Option<i64>,
    pub payer_id: i64,
    pub amount: Ugx,
    /// The account the payer is asked to send money to.
    pub account_number: String,
    pub provider: Provider,
    /// The scannable payload. Empty between the insert and the payload write-back; thereafter it
    /// always decodes to this row's id.
    pub payload: String,
    pub status: RequestStatus,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// An active, unexpired request can accept an initiation.
    pub fn is_payable(&self, now: DateTime<Utc>) -> bool {
        self.status == RequestStatus::Active && !self.is_expired(now)
    }
}

//--------------------------------------  NewPaymentRequest   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentRequest {
    pub unit_id: i64,
    pub tenant_id: Option<i64>,
    pub payer_id: i64,
    pub amount: Ugx,
    pub account_number: String,
    pub provider: Provider,
    pub expires_in_days: i64,
}

impl NewPaymentRequest {
    pub fn new(unit_id: i64, payer_id: i64, amount: Ugx, account_number: String, provider: Provider) -> Self {
        Self {
            unit_id,
            tenant_id: None,
            payer_id,
            amount,
            account_number,
            provider,
            expires_in_days: DEFAULT_REQUEST_EXPIRY_DAYS,
        }
    }

    pub fn for_tenant(mut self, tenant_id: i64) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn expires_in_days(mut self, days: i64) -> Self {
        self.expires_in_days = days;
        self
    }

    pub fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.expires_in_days)
    }
}

//-------------------------------------- MobileTransaction    ---------------------------------------------------------
/// One attempt to move money via a mobile-money provider.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MobileTransaction {
    pub id: i64,
    pub request_id: Option<i64>,
    pub unit_id: i64,
    pub tenant_id: Option<i64>,
    pub payer_id: i64,
    pub amount: Ugx,
    pub currency: String,
    pub provider: Provider,
    /// Caller-generated idempotency key. Assigned once, before any provider call, and the sole
    /// anchor for matching confirmation callbacks.
    pub external_id: String,
    /// The provider's own transaction id, once the provider has acknowledged the initiation.
    pub provider_tx_id: Option<String>,
    pub payer_phone: String,
    pub payee_phone: String,
    pub status: TransactionStatus,
    /// Status string as the provider reports it, verbatim.
    pub provider_status: Option<String>,
    pub failure_reason: Option<String>,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    /// Raw provider response from initiation, kept for audit.
    pub provider_response: Option<String>,
    /// Raw confirmation callback body, kept for audit.
    pub callback_payload: Option<String>,
    pub reference: String,
    pub description: Option<String>,
    pub months_advance: i64,
    pub is_prepayment: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//-------------------------------------- NewMobileTransaction ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewMobileTransaction {
    pub request_id: Option<i64>,
    pub unit_id: i64,
    pub tenant_id: Option<i64>,
    pub payer_id: i64,
    pub amount: Ugx,
    pub provider: Provider,
    pub external_id: String,
    pub payer_phone: String,
    pub payee_phone: String,
    pub reference: String,
    pub description: Option<String>,
    pub months_advance: i64,
    pub is_prepayment: bool,
}

//--------------------------------------       Tenant         ---------------------------------------------------------
/// A tenant row as the engine sees it. The wider tenant record (documents, emergency contacts and
/// so on) belongs to the CRUD layer; the engine reads and writes only the payment-relevant fields.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tenant {
    pub id: i64,
    pub property_id: i64,
    pub unit_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub monthly_rent: Ugx,
    pub is_active: bool,
    pub last_payment_date: Option<NaiveDate>,
    pub next_payment_due: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub category: TenantCategory,
}

impl Tenant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

//--------------------------------------        Unit          ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Unit {
    pub id: i64,
    pub property_id: i64,
    pub unit_number: String,
    pub monthly_rent: Ugx,
    pub status: UnitStatus,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn provider_parsing() {
        assert_eq!("mtn".parse::<Provider>().unwrap(), Provider::Mtn);
        assert_eq!("mtn_mobile_money".parse::<Provider>().unwrap(), Provider::Mtn);
        assert_eq!("AIRTEL".parse::<Provider>().unwrap(), Provider::Airtel);
        assert_eq!("airtel_money".parse::<Provider>().unwrap(), Provider::Airtel);
        assert!("m-pesa".parse::<Provider>().is_err());
    }

    #[test]
    fn request_payability() {
        let now = Utc::now();
        let req = PaymentRequest {
            id: 1,
            unit_id: 10,
            tenant_id: None,
            payer_id: 1,
            amount: Ugx::from(250_000),
            account_number: "ACC-001".into(),
            provider: Provider::Mtn,
            payload: String::new(),
            status: RequestStatus::Active,
            expires_at: now + Duration::days(7),
            used_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(req.is_payable(now));
        assert!(!req.is_payable(now + Duration::days(8)));
        let used = PaymentRequest { status: RequestStatus::Used, ..req };
        assert!(!used.is_payable(now));
    }
}
