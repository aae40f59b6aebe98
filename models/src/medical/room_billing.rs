// models/src/medical/room_billing.rs
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::identifiers::{BillingId, ResidentId};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl PaymentStatus {
    /// Rows a payer is shown.
    pub fn is_payable(self) -> bool {
        matches!(self, PaymentStatus::Unpaid | PaymentStatus::PartiallyPaid)
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partiallypaid" | "partial" | "partlypaid" => Ok(PaymentStatus::PartiallyPaid),
            "paid" => Ok(PaymentStatus::Paid),
            _ => Err(ValidationError::UnknownVariant("payment status", s.to_string())),
        }
    }
}

/// One row of the room-occupancy ledger. Amounts are whatever the backend
/// reports, the client never recomputes a balance after paying.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBillingRecord {
    pub billing_id: BillingId,
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
    pub room_number: String,
    pub start_date: String,
    pub end_date: String,
    pub daily_rate: f64,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub unpaid_amount: f64,
    pub payment_status: PaymentStatus,
}

/// Body of `PUT /RoomOccupancy/billing/{id}/payment`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayment {
    pub payment_amount: f64,
    #[serde(with = "payment_date_format")]
    pub payment_date: NaiveDateTime,
    pub method: String,
    pub remarks: String,
}

mod payment_date_format {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_payment_status_spellings() {
        assert_eq!("PARTIALLY_PAID".parse(), Ok(PaymentStatus::PartiallyPaid));
        assert_eq!("Partially Paid".parse(), Ok(PaymentStatus::PartiallyPaid));
        assert_eq!("paid".parse(), Ok(PaymentStatus::Paid));
        assert!(!PaymentStatus::Paid.is_payable());
        assert!(PaymentStatus::PartiallyPaid.is_payable());
    }

    #[test]
    fn payment_serializes_date_without_offset() {
        let payment = RoomPayment {
            payment_amount: 450.0,
            payment_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(9, 30, 0).unwrap(),
            method: "WeChat".to_string(),
            remarks: String::new(),
        };
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["paymentDate"], "2026-03-01T09:30:00");
        assert_eq!(json["paymentAmount"], 450.0);
    }
}
