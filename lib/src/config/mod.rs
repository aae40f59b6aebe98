// lib/src/config/mod.rs

pub mod config_defaults;
pub mod config_structs;

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::Deserialize;

pub use config_defaults::*;
pub use config_structs::{BackendConfig, CareConfig, CarePlanConfig, PriceTable};

// Matches the top-level 'care:' key of the YAML file.
#[derive(Debug, Deserialize)]
struct CareConfigWrapper {
    care: CareConfig,
}

/// Loads the client configuration.
///
/// Reads `care_config.yaml` (or the given path) when it exists and falls back
/// to defaults otherwise. Environment variables, including those from a
/// `.env` file, override the file.
pub fn load_care_config(config_file_path: Option<PathBuf>) -> Result<CareConfig> {
    dotenvy::dotenv().ok();

    let path = config_file_path.unwrap_or_else(default_config_path);
    let mut config = if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read care config file {}", path.display()))?;
        parse_care_config(&content)
            .with_context(|| format!("Failed to parse care config file {}", path.display()))?
    } else {
        info!("No care config at {}, using defaults", path.display());
        CareConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    debug!("Loaded care config: {:?}", config);
    Ok(config)
}

pub fn parse_care_config(content: &str) -> Result<CareConfig> {
    let wrapper: CareConfigWrapper = serde_yaml2::from_str(content)
        .map_err(|e| anyhow!("Invalid care config: {}", e))?;
    Ok(wrapper.care)
}

/// Applies `CARE_*` overrides. `lookup` is `std::env::var` outside of tests.
pub fn apply_env_overrides<F>(config: &mut CareConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
        config.backend.base_url = url.trim().to_string();
    }
    if let Some(token) = lookup(ENV_AUTH_TOKEN).filter(|v| !v.trim().is_empty()) {
        config.backend.auth_token = Some(token.trim().to_string());
    }
    if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
        let secs = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a number of seconds, got '{}'", ENV_REQUEST_TIMEOUT_SECS, raw))?;
        config.backend.request_timeout_secs = Some(secs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_price_table() {
        let config = CareConfig::default();
        assert_eq!(config.pricing.low, 500);
        assert_eq!(config.pricing.medium, 1000);
        assert_eq!(config.pricing.high, 2000);
        assert_eq!(config.care_plans.default_duration_days, 7);
        assert!(!config.care_plans.send_last_known_version);
        assert_eq!(config.backend.request_timeout_secs, None);
    }

    #[test]
    fn parses_partial_yaml_with_defaults() {
        let yaml = "care:\n  backend:\n    base_url: \"http://care.local:9000\"\n  pricing:\n    high: 2500\n";
        let config = parse_care_config(yaml).unwrap();
        assert_eq!(config.backend.base_url, "http://care.local:9000");
        assert_eq!(config.pricing.high, 2500);
        assert_eq!(config.pricing.medium, 1000);
        assert_eq!(config.care_plans, CarePlanConfig::default());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "care:\n  care_plans:\n    default_duration_days: 14").unwrap();
        let config = load_care_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.care_plans.default_duration_days, 14);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_care_config(Some(dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(config.pricing, PriceTable::default());
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BACKEND_URL, "https://api.example.org"),
            (ENV_AUTH_TOKEN, "token-1"),
            (ENV_REQUEST_TIMEOUT_SECS, "15"),
        ]);
        let mut config = CareConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.backend.base_url, "https://api.example.org");
        assert_eq!(config.backend.auth_token.as_deref(), Some("token-1"));
        assert_eq!(config.backend.request_timeout_secs, Some(15));
    }

    #[test]
    fn rejects_bad_timeout() {
        let mut config = CareConfig::default();
        let result = apply_env_overrides(&mut config, |key| {
            (key == ENV_REQUEST_TIMEOUT_SECS).then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
