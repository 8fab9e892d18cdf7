use std::sync::Arc;

use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use log::*;
use rent_payment_engine::{
    events::EventHandlers,
    providers::GatewayRegistry,
    PaymentFlowApi,
    ReconciliationApi,
    SqliteDatabase,
    TenantMonitorApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    notify::{confirmation_hooks, SmsLogNotifier},
    routes::{
        cancel_request,
        get_request,
        health,
        initiate_payment,
        issue_request,
        payment_summary,
        resolve_payload,
        run_auto_match,
        run_monitoring,
        run_reconciliation,
        tenant_categories,
        transaction_status,
        unit_requests,
        FlowApi,
        MonitorApi,
        ReconApi,
    },
    scheduler::{default_cadences, Scheduler},
    webhook_routes::{airtel_webhook, mtn_webhook},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let handlers = EventHandlers::new(128, confirmation_hooks(Arc::new(SmsLogNotifier)));
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let gateways = GatewayRegistry::from_settings(&config.gateway_settings());
    let flow = PaymentFlowApi::new(db.clone(), gateways, producers);
    let recon = ReconciliationApi::new(db.clone())
        .with_tolerances(config.discrepancy_tolerance, config.auto_match_variance);
    let monitor = TenantMonitorApi::new(db);

    let mut scheduler = Scheduler::new(flow.clone(), recon.clone(), monitor.clone(), default_cadences(&config));
    scheduler.start();

    let srv = create_server_instance(config, flow, recon, monitor)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    scheduler.stop().await;
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    flow: FlowApi,
    recon: ReconApi,
    monitor: MonitorApi,
) -> Result<Server, ServerError> {
    info!("💻️ Binding server to {}:{}", config.host, config.port);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("rpg::access_log"))
            .app_data(web::Data::new(flow.clone()))
            .app_data(web::Data::new(recon.clone()))
            .app_data(web::Data::new(monitor.clone()))
            .service(health)
            .service(issue_request)
            .service(resolve_payload)
            .service(get_request)
            .service(initiate_payment)
            .service(cancel_request)
            .service(unit_requests)
            .service(transaction_status)
            .service(mtn_webhook)
            .service(airtel_webhook)
            .service(run_reconciliation)
            .service(run_auto_match)
            .service(run_monitoring)
            .service(tenant_categories)
            .service(payment_summary)
    })
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
