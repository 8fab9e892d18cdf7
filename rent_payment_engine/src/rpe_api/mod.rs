//! The engine's public API surface: the payment flow (issue / initiate / confirm), the
//! reconciliation engine, and the tenant status monitor.

pub mod monitor_api;
pub mod payment_flow_api;
pub mod reconciliation_api;
pub mod report_objects;
