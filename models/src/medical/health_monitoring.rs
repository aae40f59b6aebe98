// models/src/medical/health_monitoring.rs
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::identifiers::ResidentId;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum HealthStatus {
    #[default]
    Normal,
    Abnormal,
}

impl FromStr for HealthStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(HealthStatus::Normal),
            "abnormal" => Ok(HealthStatus::Abnormal),
            _ => Err(ValidationError::UnknownVariant("health status", s.to_string())),
        }
    }
}

/// One vital-sign reading. The resident views only ever show the latest one.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMonitoringRecord {
    pub monitoring_id: i64,
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
    pub monitoring_date: String,
    pub heart_rate: i64,
    /// "systolic/diastolic", empty when the reading had no pressure.
    pub blood_pressure: String,
    pub oxygen_level: f64,
    pub temperature: f64,
    pub status: HealthStatus,
}

impl HealthMonitoringRecord {
    /// Splits the pressure string back into its two numbers.
    pub fn blood_pressure_parts(&self) -> Option<(i64, i64)> {
        let (high, low) = self.blood_pressure.split_once('/')?;
        Some((high.trim().parse().ok()?, low.trim().parse().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_blood_pressure() {
        let record = HealthMonitoringRecord {
            blood_pressure: "128/84".to_string(),
            ..Default::default()
        };
        assert_eq!(record.blood_pressure_parts(), Some((128, 84)));
        assert_eq!(HealthMonitoringRecord::default().blood_pressure_parts(), None);
    }
}
