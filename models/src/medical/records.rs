// models/src/medical/records.rs
//
// Display-only records. They are normalized like everything else but carry
// no lifecycle.

use serde::{Deserialize, Serialize};

use crate::identifiers::{ResidentId, StaffId};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DietRecommendation {
    pub recommendation_id: i64,
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
    pub recommendation_date: String,
    pub diet_type: String,
    pub recommended_food: String,
    pub avoid_food: String,
    pub remarks: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalOrder {
    pub order_id: i64,
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
    pub staff_id: Option<StaffId>,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub order_date: String,
    pub duration: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAssessment {
    pub assessment_id: i64,
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
    pub assessment_date: String,
    pub physical_function: String,
    pub psychological_function: String,
    pub cognitive_function: String,
    pub health_grade: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub reminder_id: i64,
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
    pub reminder_time: String,
    pub content: String,
    pub acknowledged: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRecord {
    pub event_id: i64,
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
    pub event_type: String,
    pub event_time: String,
    pub handling_result: String,
    pub status: String,
}
