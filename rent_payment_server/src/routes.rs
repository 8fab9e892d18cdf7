//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into
//! a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are async; anything that touches the database or a provider suspends rather than
//! blocking the worker thread.
use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use rent_payment_engine::{
    InitiatePayment,
    PaymentFlowApi,
    Period,
    ReconciliationApi,
    SqliteDatabase,
    TenantMonitorApi,
};

use crate::{
    data_objects::{
        AutoMatchParams,
        IssueRequestParams,
        ReconcileParams,
        ResolveParams,
        TransactionStatusResponse,
    },
    errors::ServerError,
};

pub type FlowApi = PaymentFlowApi<SqliteDatabase>;
pub type ReconApi = ReconciliationApi<SqliteDatabase>;
pub type MonitorApi = TenantMonitorApi<SqliteDatabase>;

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------  Requests  ----------------------------------------------------
/// Issues a new scannable payment request and returns it with its rendered QR image.
#[post("/requests")]
pub async fn issue_request(
    body: web::Json<IssueRequestParams>,
    api: web::Data<FlowApi>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST issue payment request for unit {}", params.unit_id);
    let issued = api.issue_request(params.into()).await?;
    Ok(HttpResponse::Ok().json(issued))
}

/// Resolves a scanned payload back to its request. Register before `get_request` so the literal
/// segment wins over the `{id}` match.
#[get("/requests/resolve")]
pub async fn resolve_payload(
    query: web::Query<ResolveParams>,
    api: web::Data<FlowApi>,
) -> Result<HttpResponse, ServerError> {
    let request = api.request_for_payload(&query.into_inner().payload).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[get("/requests/{id}")]
pub async fn get_request(path: web::Path<i64>, api: web::Data<FlowApi>) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let request = api.fetch_request(id).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Operator cancellation of a still-active request.
#[post("/requests/{id}/cancel")]
pub async fn cancel_request(
    path: web::Path<i64>,
    api: web::Data<FlowApi>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ POST cancel payment request #{id}");
    let request = api.cancel_request(id).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Payment-request history for one unit.
#[get("/units/{id}/requests")]
pub async fn unit_requests(path: web::Path<i64>, api: web::Data<FlowApi>) -> Result<HttpResponse, ServerError> {
    let requests = api.requests_for_unit(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Starts a mobile transaction against an active request. Failures carry the provider's reason
/// straight back to the caller; confirmation itself arrives later via the webhook.
#[post("/requests/{id}/initiate")]
pub async fn initiate_payment(
    path: web::Path<i64>,
    body: web::Json<InitiatePayment>,
    api: web::Data<FlowApi>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let params = body.into_inner();
    debug!("💻️ POST initiate payment against request #{id}");
    let tx = api.initiate(id, params).await?;
    Ok(HttpResponse::Ok().json(TransactionStatusResponse::from(tx)))
}

// ----------------------------------------------  Status query  ------------------------------------------------
/// Polling fallback for clients that missed (or cannot receive) the confirmation outcome.
#[get("/transactions/{external_id}")]
pub async fn transaction_status(
    path: web::Path<String>,
    api: web::Data<FlowApi>,
) -> Result<HttpResponse, ServerError> {
    let external_id = path.into_inner();
    let tx = api.transaction_status(&external_id).await?;
    Ok(HttpResponse::Ok().json(TransactionStatusResponse::from(tx)))
}

// ----------------------------------------------  Reconciliation  ----------------------------------------------
#[post("/reconciliation/run")]
pub async fn run_reconciliation(
    query: web::Query<ReconcileParams>,
    api: web::Data<ReconApi>,
) -> Result<HttpResponse, ServerError> {
    let params = query.into_inner();
    let today = Utc::now().date_naive();
    let default_period = Period::containing(today);
    let period = Period::new(
        params.year.unwrap_or(default_period.year),
        params.month.unwrap_or(default_period.month),
    );
    debug!("💻️ POST reconcile {}-{:02}", period.year, period.month);
    let report = api.reconcile(period, params.property_id).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[post("/reconciliation/auto-match")]
pub async fn run_auto_match(
    query: web::Query<AutoMatchParams>,
    api: web::Data<ReconApi>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST auto-match unlinked payments");
    let outcome = api.auto_match(query.into_inner().property_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

// ----------------------------------------------  Monitoring  --------------------------------------------------
/// Manual monitoring pass, for operators who do not want to wait for the scheduler.
#[post("/monitoring/run")]
pub async fn run_monitoring(api: web::Data<MonitorApi>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST manual monitoring pass");
    let summary = api.run_monitoring_pass(Utc::now().date_naive()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Active tenants grouped by computed payment category, for dashboards.
#[get("/monitoring/categories")]
pub async fn tenant_categories(api: web::Data<MonitorApi>) -> Result<HttpResponse, ServerError> {
    let categories = api.tenant_categories(Utc::now().date_naive()).await?;
    Ok(HttpResponse::Ok().json(categories))
}

/// Headline counts and amounts per payment category.
#[get("/monitoring/summary")]
pub async fn payment_summary(api: web::Data<MonitorApi>) -> Result<HttpResponse, ServerError> {
    let summary = api.payment_summary(Utc::now().date_naive()).await?;
    Ok(HttpResponse::Ok().json(summary))
}
