// lib/src/normalizer/transforms.rs
//
// Value transforms used by the field tables. A transform turns one raw field
// into the canonical serialized form of that field, or `None` when the raw
// value cannot be read. Derivations look at the whole record.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{json, Map, Number, Value};

use models::medical::{CareType, HealthStatus, PaymentStatus, PlanStatus, Priority};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Non-empty text. Numbers and booleans are rendered as text.
pub fn text(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(Value::String(s.trim().to_string())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

pub fn integer(value: &Value) -> Option<Value> {
    as_i64(value).map(Value::from)
}

pub fn number(value: &Value) -> Option<Value> {
    as_f64(value).and_then(Number::from_f64).map(Value::Number)
}

/// An identifier that may legitimately be unassigned. 0 counts as unassigned.
pub fn optional_id(value: &Value) -> Option<Value> {
    as_i64(value).filter(|id| *id > 0).map(Value::from)
}

pub fn flag(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "n" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

/// Any readable date or date-time, rewritten as `TIMESTAMP_FORMAT`.
/// Unreadable text is kept as sent.
pub fn timestamp(value: &Value) -> Option<Value> {
    parse_timestamp(value)
        .map(|ts| Value::String(format_timestamp(&ts)))
        .or_else(|| text(value))
}

pub fn health_status(value: &Value) -> Option<Value> {
    variant::<HealthStatus>(value)
}

pub fn plan_status(value: &Value) -> Option<Value> {
    variant::<PlanStatus>(value)
}

pub fn priority(value: &Value) -> Option<Value> {
    variant::<Priority>(value)
}

pub fn care_type(value: &Value) -> Option<Value> {
    variant::<CareType>(value)
}

pub fn payment_status(value: &Value) -> Option<Value> {
    variant::<PaymentStatus>(value)
}

fn variant<T: FromStr + Serialize>(value: &Value) -> Option<Value> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    T::from_str(&raw).ok().and_then(|v| serde_json::to_value(v).ok())
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => flag(value).and_then(|v| v.as_bool()).unwrap_or(!s.trim().is_empty()),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Reads the date shapes the backend is known to send: ISO-like strings with
/// or without seconds, date-only strings, epoch seconds or milliseconds, and
/// `[y, m, d, h, min, s]` arrays.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_local());
            }
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .or_else(|| {
                    DATE_FORMATS
                        .iter()
                        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
        }
        Value::Number(n) => {
            let raw = n.as_i64()?;
            let dt = if raw.unsigned_abs() >= 100_000_000_000 {
                DateTime::from_timestamp_millis(raw)
            } else {
                DateTime::from_timestamp(raw, 0)
            };
            dt.map(|d| d.naive_utc())
        }
        Value::Array(parts) => {
            let parts: Vec<i64> = parts.iter().map(as_i64).collect::<Option<_>>()?;
            let at = |i: usize| parts.get(i).copied().unwrap_or(0);
            if parts.len() < 3 {
                return None;
            }
            NaiveDate::from_ymd_opt(at(0) as i32, at(1) as u32, at(2) as u32)?
                .and_hms_opt(at(3) as u32, at(4) as u32, at(5) as u32)
        }
        _ => None,
    }
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn first<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| record.get(*k).filter(|v| !v.is_null()))
}

fn first_f64(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| record.get(*k).and_then(as_f64))
}

/// `"high/low"` from split systolic/diastolic readings.
pub fn blood_pressure_from_parts(record: &Map<String, Value>) -> Option<Value> {
    let high = first(record, &["bloodPressureHigh", "blood_pressure_high", "systolic"]).and_then(as_i64)?;
    let low = first(record, &["bloodPressureLow", "blood_pressure_low", "diastolic"]).and_then(as_i64)?;
    Some(Value::String(format!("{}/{}", high, low)))
}

/// `Abnormal` when the record carries a truthy abnormal flag.
pub fn status_from_abnormal_flag(record: &Map<String, Value>) -> Option<Value> {
    first(record, &["abnormalFlag", "abnormal_flag", "isAbnormal"])
        .filter(|v| is_truthy(v))
        .map(|_| json!("Abnormal"))
}

pub fn unpaid_from_amounts(record: &Map<String, Value>) -> Option<Value> {
    let total = first_f64(record, &["totalAmount", "total_amount", "totalFee"])?;
    let paid = first_f64(record, &["paidAmount", "paid_amount"]).unwrap_or(0.0);
    Number::from_f64((total - paid).max(0.0)).map(Value::Number)
}

pub fn payment_status_from_amounts(record: &Map<String, Value>) -> Option<Value> {
    let total = first_f64(record, &["totalAmount", "total_amount", "totalFee"])?;
    let paid = first_f64(record, &["paidAmount", "paid_amount"]).unwrap_or(0.0);
    let unpaid = first_f64(record, &["unpaidAmount", "unpaid_amount"]).unwrap_or(total - paid);
    let status = if unpaid <= 0.0 {
        PaymentStatus::Paid
    } else if paid > 0.0 {
        PaymentStatus::PartiallyPaid
    } else {
        PaymentStatus::Unpaid
    };
    serde_json::to_value(status).ok()
}

/// Participation rows that nest the activity instead of flattening its id.
pub fn activity_id_from_nested(record: &Map<String, Value>) -> Option<Value> {
    let activity = record.get("activity")?.as_object()?;
    first(activity, &["activityId", "activity_id", "id"]).and_then(integer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn text_skips_blank_strings() {
        assert_eq!(text(&json!("  ")), None);
        assert_eq!(text(&json!(" Low salt ")), Some(json!("Low salt")));
        assert_eq!(text(&json!(12)), Some(json!("12")));
        assert_eq!(text(&Value::Null), None);
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        assert_eq!(integer(&json!("72")), Some(json!(72)));
        assert_eq!(integer(&json!(72.9)), Some(json!(72)));
        assert_eq!(number(&json!("36.6")), Some(json!(36.6)));
        assert_eq!(number(&json!("n/a")), None);
        assert_eq!(optional_id(&json!(0)), None);
        assert_eq!(optional_id(&json!("17")), Some(json!(17)));
    }

    #[test]
    fn timestamps_are_rewritten_to_one_format() {
        assert_eq!(timestamp(&json!("2026-03-01 08:15:00")), Some(json!("2026-03-01T08:15:00")));
        assert_eq!(timestamp(&json!("2026-03-01")), Some(json!("2026-03-01T00:00:00")));
        assert_eq!(timestamp(&json!([2026, 3, 1, 8, 15])), Some(json!("2026-03-01T08:15:00")));
        assert_eq!(timestamp(&json!(1_772_352_900_000_i64)), Some(json!("2026-03-01T08:15:00")));
        assert_eq!(timestamp(&json!("last tuesday")), Some(json!("last tuesday")));
    }

    #[test]
    fn extreme_epoch_numbers_do_not_parse() {
        assert_eq!(parse_timestamp(&json!(i64::MIN)), None);
        assert_eq!(parse_timestamp(&json!(i64::MAX)), None);
        assert_eq!(parse_timestamp(&json!(-99_999_999_999_i64)), None);
    }

    #[test]
    fn enum_transforms_use_canonical_names() {
        assert_eq!(priority(&json!("Basic")), Some(json!("Low")));
        assert_eq!(priority(&json!(3)), Some(json!("High")));
        assert_eq!(plan_status(&json!("SCHEDULED")), Some(json!("Scheduled")));
        assert_eq!(payment_status(&json!("partially_paid")), Some(json!("PartiallyPaid")));
        assert_eq!(care_type(&json!("urgent")), Some(json!("Emergency")));
        assert_eq!(health_status(&json!("unknown")), None);
    }

    #[test]
    fn blood_pressure_needs_both_parts() {
        let full = record(json!({"bloodPressureHigh": "130", "bloodPressureLow": 85}));
        assert_eq!(blood_pressure_from_parts(&full), Some(json!("130/85")));
        let half = record(json!({"bloodPressureHigh": 130}));
        assert_eq!(blood_pressure_from_parts(&half), None);
    }

    #[test]
    fn abnormal_flag_spellings() {
        assert_eq!(status_from_abnormal_flag(&record(json!({"abnormalFlag": 1}))), Some(json!("Abnormal")));
        assert_eq!(status_from_abnormal_flag(&record(json!({"abnormalFlag": "true"}))), Some(json!("Abnormal")));
        assert_eq!(status_from_abnormal_flag(&record(json!({"abnormalFlag": false}))), None);
        assert_eq!(status_from_abnormal_flag(&record(json!({}))), None);
    }

    #[test]
    fn billing_amounts_derive_balance_and_status() {
        let partial = record(json!({"totalAmount": 900, "paidAmount": "300"}));
        assert_eq!(unpaid_from_amounts(&partial), Some(json!(600.0)));
        assert_eq!(payment_status_from_amounts(&partial), Some(json!("PartiallyPaid")));

        let settled = record(json!({"totalAmount": 900, "paidAmount": 900}));
        assert_eq!(payment_status_from_amounts(&settled), Some(json!("Paid")));
        assert_eq!(payment_status_from_amounts(&record(json!({}))), None);
    }
}
