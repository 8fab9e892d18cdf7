//! # Rent payment server
//!
//! This crate hosts the HTTP face of the rent payment gateway. It is responsible for:
//! * issuing scannable payment requests and resolving scans,
//! * accepting payment initiations and status polls from payers,
//! * listening for confirmation callbacks from the mobile-money providers and feeding them to the
//!   engine,
//! * triggering reconciliation and monitoring runs, both on demand and on the scheduler's
//!   cadences.
//!
//! ## Configuration
//! The server is configured via `RPG_*` environment variables. See [config](config/index.html).
//!
//! ## Routes
//! * `GET  /health`
//! * `POST /requests`, `GET /requests/{id}`, `POST /requests/{id}/initiate`
//! * `GET  /transactions/{external_id}`
//! * `POST /webhook/mtn`, `POST /webhook/airtel`
//! * `POST /reconciliation/run`, `POST /reconciliation/auto-match`
//! * `POST /monitoring/run`

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod notify;
pub mod routes;
pub mod scheduler;
pub mod server;
pub mod webhook_routes;
