// lib/src/config/config_structs.rs

use serde::{Deserialize, Serialize};

use models::medical::Priority;

use crate::config::config_defaults::*;

/// Everything a client app needs to talk to the shared backend.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CareConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub pricing: PriceTable,
    #[serde(default)]
    pub care_plans: CarePlanConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token obtained by the app's login screen.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// No timeout is set unless configured; the transport default applies.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: default_base_url(),
            auth_token: None,
            request_timeout_secs: None,
        }
    }
}

/// Nursing fee per priority tier.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct PriceTable {
    #[serde(default = "default_low_price")]
    pub low: u64,
    #[serde(default = "default_medium_price")]
    pub medium: u64,
    #[serde(default = "default_high_price")]
    pub high: u64,
}

impl PriceTable {
    pub fn price(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
        }
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        PriceTable {
            low: default_low_price(),
            medium: default_medium_price(),
            high: default_high_price(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CarePlanConfig {
    /// Length of a plan when the applicant gives no end date.
    #[serde(default = "default_plan_duration_days")]
    pub default_duration_days: i64,
    /// Attach the last known `updatedAt` to plan mutations so the backend can
    /// reject stale writes.
    #[serde(default = "default_send_last_known_version")]
    pub send_last_known_version: bool,
}

impl Default for CarePlanConfig {
    fn default() -> Self {
        CarePlanConfig {
            default_duration_days: default_plan_duration_days(),
            send_last_known_version: default_send_last_known_version(),
        }
    }
}
