use std::{env, time::Duration};

use log::*;
use rent_payment_engine::providers::GatewaySettings;
use rpg_common::{Secret, Ugx};

pub const DEFAULT_RPG_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPG_PORT: u16 = 8370;
const DEFAULT_MERCHANT_NAME: &str = "Rent Payment Gateway";
/// Daily tenant-status monitoring, per the original operations cadence.
const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Reconciliation runs on the long cadence: every 30 days.
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
/// Stale QR requests are swept hourly.
const DEFAULT_EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_DISCREPANCY_TOLERANCE_UGX: i64 = 1;
const DEFAULT_AUTO_MATCH_VARIANCE: f64 = 0.10;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Merchant name shown to payers in provider prompts.
    pub merchant_name: String,
    /// Collection numbers per provider. A provider without a number stays unconfigured and
    /// initiations against it are rejected.
    pub mtn_payment_number: Option<String>,
    pub mtn_api_key: Secret<String>,
    pub airtel_payment_number: Option<String>,
    pub airtel_api_key: Secret<String>,
    pub monitor_interval: Duration,
    pub reconcile_interval: Duration,
    pub expiry_sweep_interval: Duration,
    /// Reconciliation amount tolerance, in whole shillings.
    pub discrepancy_tolerance: Ugx,
    /// Auto-match accepts amounts within this fraction of the monthly rent.
    pub auto_match_variance: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPG_HOST.to_string(),
            port: DEFAULT_RPG_PORT,
            database_url: String::default(),
            merchant_name: DEFAULT_MERCHANT_NAME.to_string(),
            mtn_payment_number: None,
            mtn_api_key: Secret::default(),
            airtel_payment_number: None,
            airtel_api_key: Secret::default(),
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            expiry_sweep_interval: DEFAULT_EXPIRY_SWEEP_INTERVAL,
            discrepancy_tolerance: Ugx::from(DEFAULT_DISCREPANCY_TOLERANCE_UGX),
            auto_match_variance: DEFAULT_AUTO_MATCH_VARIANCE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RPG_HOST").ok().unwrap_or_else(|| DEFAULT_RPG_HOST.into());
        let port = env::var("RPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for RPG_PORT. {e} Using the default, {DEFAULT_RPG_PORT}, instead."
                    );
                    DEFAULT_RPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_RPG_PORT);
        let database_url = env::var("RPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ RPG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let merchant_name = env::var("RPG_MERCHANT_NAME").ok().unwrap_or_else(|| {
            info!("🪛️ RPG_MERCHANT_NAME is not set. Using \"{DEFAULT_MERCHANT_NAME}\".");
            DEFAULT_MERCHANT_NAME.into()
        });
        let mtn_payment_number = payment_number_from_env("RPG_MTN_PAYMENT_NUMBER", "MTN Mobile Money");
        let airtel_payment_number = payment_number_from_env("RPG_AIRTEL_PAYMENT_NUMBER", "Airtel Money");
        let mtn_api_key = Secret::new(env::var("RPG_MTN_API_KEY").unwrap_or_default());
        let airtel_api_key = Secret::new(env::var("RPG_AIRTEL_API_KEY").unwrap_or_default());
        let monitor_interval = interval_from_env("RPG_MONITOR_INTERVAL_SECS", DEFAULT_MONITOR_INTERVAL);
        let reconcile_interval = interval_from_env("RPG_RECONCILE_INTERVAL_SECS", DEFAULT_RECONCILE_INTERVAL);
        let expiry_sweep_interval =
            interval_from_env("RPG_EXPIRY_SWEEP_INTERVAL_SECS", DEFAULT_EXPIRY_SWEEP_INTERVAL);
        let discrepancy_tolerance = env::var("RPG_DISCREPANCY_TOLERANCE_UGX")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid value for RPG_DISCREPANCY_TOLERANCE_UGX. {e}"))
                    .ok()
            })
            .map(Ugx::from)
            .unwrap_or(Ugx::from(DEFAULT_DISCREPANCY_TOLERANCE_UGX));
        let auto_match_variance = env::var("RPG_AUTO_MATCH_VARIANCE")
            .ok()
            .and_then(|s| {
                s.parse::<f64>().map_err(|e| warn!("🪛️ Invalid value for RPG_AUTO_MATCH_VARIANCE. {e}")).ok()
            })
            .unwrap_or(DEFAULT_AUTO_MATCH_VARIANCE);
        Self {
            host,
            port,
            database_url,
            merchant_name,
            mtn_payment_number,
            mtn_api_key,
            airtel_payment_number,
            airtel_api_key,
            monitor_interval,
            reconcile_interval,
            expiry_sweep_interval,
            discrepancy_tolerance,
            auto_match_variance,
        }
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            merchant_name: self.merchant_name.clone(),
            mtn_payment_number: self.mtn_payment_number.clone(),
            mtn_api_key: self.mtn_api_key.clone(),
            airtel_payment_number: self.airtel_payment_number.clone(),
            airtel_api_key: self.airtel_api_key.clone(),
        }
    }
}

fn payment_number_from_env(var: &str, provider_label: &str) -> Option<String> {
    match env::var(var) {
        Ok(number) if !number.trim().is_empty() => Some(number),
        _ => {
            info!("🪛️ {var} is not set. {provider_label} collections are disabled until it is configured.");
            None
        },
    }
}

fn interval_from_env(var: &str, default: Duration) -> Duration {
    env::var(var)
        .map_err(|_| info!("🪛️ {var} is not set. Using the default of {}s.", default.as_secs()))
        .and_then(|s| {
            s.parse::<u64>().map(Duration::from_secs).map_err(|e| warn!("🪛️ Invalid value for {var}. {e}"))
        })
        .ok()
        .unwrap_or(default)
}
