// lib/src/config/config_defaults.rs

use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "care_config.yaml";
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";

pub const DEFAULT_LOW_PRIORITY_PRICE: u64 = 500;
pub const DEFAULT_MEDIUM_PRIORITY_PRICE: u64 = 1000;
pub const DEFAULT_HIGH_PRIORITY_PRICE: u64 = 2000;

pub const DEFAULT_PLAN_DURATION_DAYS: i64 = 7;

pub const ENV_BACKEND_URL: &str = "CARE_BACKEND_URL";
pub const ENV_AUTH_TOKEN: &str = "CARE_AUTH_TOKEN";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CARE_REQUEST_TIMEOUT_SECS";

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE_NAME)
}

pub fn default_base_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

pub fn default_low_price() -> u64 { DEFAULT_LOW_PRIORITY_PRICE }
pub fn default_medium_price() -> u64 { DEFAULT_MEDIUM_PRIORITY_PRICE }
pub fn default_high_price() -> u64 { DEFAULT_HIGH_PRIORITY_PRICE }

pub fn default_plan_duration_days() -> i64 { DEFAULT_PLAN_DURATION_DAYS }

// The backend has not confirmed it honours a version field, so it stays off
// until it does.
pub fn default_send_last_known_version() -> bool { false }
