// lib/src/normalizer/tables.rs
//
// One table per canonical record. Sources are tried in order, the first that
// yields a value wins. Canonical names are the serialized field names of the
// record types in `models`.

use models::medical::{
    Activity, ActivityParticipation, CarePlan, DietRecommendation, EmergencyRecord, HealthAssessment,
    HealthMonitoringRecord, MedicalOrder, Reminder, ResidentProfile, RoomBillingRecord,
};

use super::transforms::{
    activity_id_from_nested, blood_pressure_from_parts, care_type, flag, health_status, integer, number,
    optional_id, payment_status, payment_status_from_amounts, plan_status, priority, status_from_abnormal_flag,
    text, timestamp, unpaid_from_amounts,
};
use super::{Canonical, EntityTable, Fallback, FieldRule, Source};
use crate::backend::endpoints;

const RESIDENT_ID: FieldRule = FieldRule {
    canonical: "elderlyId",
    sources: &[
        Source::Field("elderlyId", integer),
        Source::Field("elderly_id", integer),
        Source::Field("residentId", integer),
    ],
    fallback: Fallback::Zero,
};

pub static HEALTH_MONITORING: EntityTable = EntityTable {
    entity: "health monitoring record",
    candidate_keys: &[
        "monitoring",
        "healthMonitoring",
        "latestMonitoring",
        "latestHealthMonitoring",
        "healthMonitorings",
    ],
    recency_keys: &["monitoringDate", "recordTime", "monitoring_date", "record_time"],
    history: Some(endpoints::health_history),
    fields: &[
        FieldRule {
            canonical: "monitoringId",
            sources: &[
                Source::Field("monitoringId", integer),
                Source::Field("monitoring_id", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        RESIDENT_ID,
        FieldRule {
            canonical: "monitoringDate",
            sources: &[
                Source::Field("monitoringDate", timestamp),
                Source::Field("recordTime", timestamp),
                Source::Field("monitoring_date", timestamp),
                Source::Field("record_time", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "heartRate",
            sources: &[
                Source::Field("heartRate", integer),
                Source::Field("heart_rate", integer),
                Source::Field("pulse", integer),
            ],
            fallback: Fallback::Zero,
        },
        FieldRule {
            canonical: "bloodPressure",
            sources: &[
                Source::Field("bloodPressure", text),
                Source::Field("blood_pressure", text),
                Source::Derived(blood_pressure_from_parts),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "oxygenLevel",
            sources: &[
                Source::Field("oxygenLevel", number),
                Source::Field("oxygen_level", number),
                Source::Field("bloodOxygen", number),
                Source::Field("spo2", number),
            ],
            fallback: Fallback::ZeroFloat,
        },
        FieldRule {
            canonical: "temperature",
            sources: &[
                Source::Field("temperature", number),
                Source::Field("bodyTemperature", number),
                Source::Field("body_temperature", number),
            ],
            fallback: Fallback::ZeroFloat,
        },
        FieldRule {
            canonical: "status",
            sources: &[
                Source::Field("status", health_status),
                Source::Field("healthStatus", health_status),
                Source::Derived(status_from_abnormal_flag),
            ],
            fallback: Fallback::Tag("Normal"),
        },
    ],
};

/// Care plans are always listed through their own endpoint, the aggregate
/// record is never probed for them.
pub static CARE_PLAN: EntityTable = EntityTable {
    entity: "care plan",
    candidate_keys: &[],
    recency_keys: &["startDate", "start_date", "planStartDate"],
    history: Some(endpoints::resident_plans),
    fields: &[
        FieldRule {
            canonical: "planId",
            sources: &[
                Source::Field("planId", integer),
                Source::Field("plan_id", integer),
                Source::Field("nursingPlanId", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        RESIDENT_ID,
        FieldRule {
            canonical: "staffId",
            sources: &[
                Source::Field("staffId", optional_id),
                Source::Field("staff_id", optional_id),
                Source::Field("nurseId", optional_id),
            ],
            fallback: Fallback::Null,
        },
        FieldRule {
            canonical: "startDate",
            sources: &[
                Source::Field("startDate", timestamp),
                Source::Field("start_date", timestamp),
                Source::Field("planStartDate", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "endDate",
            sources: &[
                Source::Field("endDate", timestamp),
                Source::Field("end_date", timestamp),
                Source::Field("planEndDate", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "careType",
            sources: &[
                Source::Field("careType", care_type),
                Source::Field("care_type", care_type),
                Source::Field("nursingType", care_type),
            ],
            fallback: Fallback::Tag("Normal"),
        },
        FieldRule {
            canonical: "priority",
            sources: &[
                Source::Field("priority", priority),
                Source::Field("priorityLevel", priority),
                Source::Field("nursingLevel", priority),
            ],
            fallback: Fallback::Tag("Low"),
        },
        FieldRule {
            canonical: "evaluationStatus",
            sources: &[
                Source::Field("evaluationStatus", plan_status),
                Source::Field("evaluation_status", plan_status),
                Source::Field("status", plan_status),
                Source::Field("planStatus", plan_status),
            ],
            fallback: Fallback::Tag("Pending"),
        },
        // Kept verbatim, it is compared back by the backend.
        FieldRule {
            canonical: "updatedAt",
            sources: &[
                Source::Field("updatedAt", text),
                Source::Field("updated_at", text),
                Source::Field("updateTime", text),
            ],
            fallback: Fallback::Empty,
        },
    ],
};

pub static DIET_RECOMMENDATION: EntityTable = EntityTable {
    entity: "diet recommendation",
    candidate_keys: &["dietRecommendation", "latestDietRecommendation", "dietRecommendations", "diet"],
    recency_keys: &["recommendationDate", "recommendation_date", "createTime"],
    history: Some(endpoints::diet_recommendation),
    fields: &[
        FieldRule {
            canonical: "recommendationId",
            sources: &[
                Source::Field("recommendationId", integer),
                Source::Field("recommendation_id", integer),
                Source::Field("dietId", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        RESIDENT_ID,
        FieldRule {
            canonical: "recommendationDate",
            sources: &[
                Source::Field("recommendationDate", timestamp),
                Source::Field("recommendation_date", timestamp),
                Source::Field("createTime", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "dietType",
            sources: &[Source::Field("dietType", text), Source::Field("diet_type", text)],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "recommendedFood",
            sources: &[
                Source::Field("recommendedFood", text),
                Source::Field("recommended_food", text),
                Source::Field("recommendFood", text),
                Source::Field("suitableFood", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "avoidFood",
            sources: &[
                Source::Field("avoidFood", text),
                Source::Field("avoid_food", text),
                Source::Field("forbiddenFood", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "remarks",
            sources: &[Source::Field("remarks", text), Source::Field("remark", text), Source::Field("note", text)],
            fallback: Fallback::Empty,
        },
    ],
};

pub static MEDICAL_ORDER: EntityTable = EntityTable {
    entity: "medical order",
    candidate_keys: &["medicalOrders", "medicalOrder", "latestMedicalOrder", "orders"],
    recency_keys: &["orderDate", "order_date", "createTime"],
    history: Some(endpoints::medical_orders),
    fields: &[
        FieldRule {
            canonical: "orderId",
            sources: &[
                Source::Field("orderId", integer),
                Source::Field("order_id", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        RESIDENT_ID,
        FieldRule {
            canonical: "staffId",
            sources: &[
                Source::Field("staffId", optional_id),
                Source::Field("staff_id", optional_id),
                Source::Field("doctorId", optional_id),
            ],
            fallback: Fallback::Null,
        },
        FieldRule {
            canonical: "medicineId",
            sources: &[Source::Field("medicineId", integer), Source::Field("medicine_id", integer)],
            fallback: Fallback::Zero,
        },
        FieldRule {
            canonical: "medicineName",
            sources: &[
                Source::Field("medicineName", text),
                Source::Field("medicine_name", text),
                Source::Field("drugName", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "dosage",
            sources: &[Source::Field("dosage", text), Source::Field("dose", text)],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "frequency",
            sources: &[Source::Field("frequency", text)],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "orderDate",
            sources: &[
                Source::Field("orderDate", timestamp),
                Source::Field("order_date", timestamp),
                Source::Field("createTime", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "duration",
            sources: &[Source::Field("duration", text), Source::Field("durationDays", text)],
            fallback: Fallback::Empty,
        },
    ],
};

pub static HEALTH_ASSESSMENT: EntityTable = EntityTable {
    entity: "health assessment",
    candidate_keys: &["healthAssessments", "healthAssessment", "latestAssessment", "assessments"],
    recency_keys: &["assessmentDate", "assessment_date"],
    history: Some(endpoints::health_assessments),
    fields: &[
        FieldRule {
            canonical: "assessmentId",
            sources: &[
                Source::Field("assessmentId", integer),
                Source::Field("assessment_id", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        RESIDENT_ID,
        FieldRule {
            canonical: "assessmentDate",
            sources: &[
                Source::Field("assessmentDate", timestamp),
                Source::Field("assessment_date", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "physicalFunction",
            sources: &[
                Source::Field("physicalFunction", text),
                Source::Field("physical_function", text),
                Source::Field("physicalHealth", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "psychologicalFunction",
            sources: &[
                Source::Field("psychologicalFunction", text),
                Source::Field("psychological_function", text),
                Source::Field("mentalHealth", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "cognitiveFunction",
            sources: &[
                Source::Field("cognitiveFunction", text),
                Source::Field("cognitive_function", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "healthGrade",
            sources: &[
                Source::Field("healthGrade", text),
                Source::Field("health_grade", text),
                Source::Field("grade", text),
            ],
            fallback: Fallback::Empty,
        },
    ],
};

pub static REMINDER: EntityTable = EntityTable {
    entity: "reminder",
    candidate_keys: &["reminders", "reminderList"],
    recency_keys: &["reminderTime", "reminder_time"],
    history: Some(endpoints::reminders),
    fields: &[
        FieldRule {
            canonical: "reminderId",
            sources: &[
                Source::Field("reminderId", integer),
                Source::Field("reminder_id", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        RESIDENT_ID,
        FieldRule {
            canonical: "reminderTime",
            sources: &[
                Source::Field("reminderTime", timestamp),
                Source::Field("reminder_time", timestamp),
                Source::Field("remindTime", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "content",
            sources: &[
                Source::Field("content", text),
                Source::Field("reminderContent", text),
                Source::Field("message", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "acknowledged",
            sources: &[
                Source::Field("acknowledged", flag),
                Source::Field("isRead", flag),
                Source::Field("read", flag),
            ],
            fallback: Fallback::False,
        },
    ],
};

pub static EMERGENCY_RECORD: EntityTable = EntityTable {
    entity: "emergency record",
    candidate_keys: &["emergencyServices", "emergencyRecords", "emergencies"],
    recency_keys: &["eventTime", "event_time", "callTime"],
    history: Some(endpoints::emergency_history),
    fields: &[
        FieldRule {
            canonical: "eventId",
            sources: &[
                Source::Field("eventId", integer),
                Source::Field("event_id", integer),
                Source::Field("emergencyId", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        RESIDENT_ID,
        FieldRule {
            canonical: "eventType",
            sources: &[Source::Field("eventType", text), Source::Field("event_type", text)],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "eventTime",
            sources: &[
                Source::Field("eventTime", timestamp),
                Source::Field("event_time", timestamp),
                Source::Field("callTime", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "handlingResult",
            sources: &[
                Source::Field("handlingResult", text),
                Source::Field("handling_result", text),
                Source::Field("result", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "status",
            sources: &[Source::Field("status", text), Source::Field("eventStatus", text)],
            fallback: Fallback::Empty,
        },
    ],
};

/// The aggregate record is usually the profile itself, older deployments
/// nest it under one of the candidate keys.
pub static RESIDENT_PROFILE: EntityTable = EntityTable {
    entity: "resident profile",
    candidate_keys: &["elderly", "elderlyInfo", "elderlyRecord", "profile"],
    recency_keys: &[],
    history: None,
    fields: &[
        FieldRule {
            canonical: "elderlyId",
            sources: &[
                Source::Field("elderlyId", integer),
                Source::Field("elderly_id", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        FieldRule {
            canonical: "name",
            sources: &[
                Source::Field("name", text),
                Source::Field("elderlyName", text),
                Source::Field("elderly_name", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "gender",
            sources: &[Source::Field("gender", text), Source::Field("sex", text)],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "birthDate",
            sources: &[
                Source::Field("birthDate", text),
                Source::Field("birth_date", text),
                Source::Field("birthday", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "idCardNumber",
            sources: &[
                Source::Field("idCardNumber", text),
                Source::Field("id_card_number", text),
                Source::Field("idCard", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "phone",
            sources: &[
                Source::Field("phone", text),
                Source::Field("phoneNumber", text),
                Source::Field("contactPhone", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "address",
            sources: &[Source::Field("address", text)],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "roomNumber",
            sources: &[
                Source::Field("roomNumber", text),
                Source::Field("room_number", text),
                Source::Field("roomNo", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "emergencyContact",
            sources: &[
                Source::Field("emergencyContact", text),
                Source::Field("emergency_contact", text),
                Source::Field("emergencyContactName", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "emergencyPhone",
            sources: &[
                Source::Field("emergencyPhone", text),
                Source::Field("emergency_phone", text),
                Source::Field("emergencyContactPhone", text),
            ],
            fallback: Fallback::Empty,
        },
    ],
};

pub static ROOM_BILLING: EntityTable = EntityTable {
    entity: "room billing record",
    candidate_keys: &["billingRecords", "roomBilling"],
    recency_keys: &["startDate", "start_date", "checkInDate"],
    history: Some(endpoints::billing_records),
    fields: &[
        FieldRule {
            canonical: "billingId",
            sources: &[
                Source::Field("billingId", integer),
                Source::Field("billing_id", integer),
                Source::Field("occupancyId", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        RESIDENT_ID,
        FieldRule {
            canonical: "roomNumber",
            sources: &[
                Source::Field("roomNumber", text),
                Source::Field("room_number", text),
                Source::Field("roomNo", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "startDate",
            sources: &[
                Source::Field("startDate", timestamp),
                Source::Field("start_date", timestamp),
                Source::Field("checkInDate", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "endDate",
            sources: &[
                Source::Field("endDate", timestamp),
                Source::Field("end_date", timestamp),
                Source::Field("checkOutDate", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "dailyRate",
            sources: &[
                Source::Field("dailyRate", number),
                Source::Field("daily_rate", number),
                Source::Field("roomRate", number),
            ],
            fallback: Fallback::ZeroFloat,
        },
        FieldRule {
            canonical: "totalAmount",
            sources: &[
                Source::Field("totalAmount", number),
                Source::Field("total_amount", number),
                Source::Field("totalFee", number),
            ],
            fallback: Fallback::ZeroFloat,
        },
        FieldRule {
            canonical: "paidAmount",
            sources: &[Source::Field("paidAmount", number), Source::Field("paid_amount", number)],
            fallback: Fallback::ZeroFloat,
        },
        FieldRule {
            canonical: "unpaidAmount",
            sources: &[
                Source::Field("unpaidAmount", number),
                Source::Field("unpaid_amount", number),
                Source::Derived(unpaid_from_amounts),
            ],
            fallback: Fallback::ZeroFloat,
        },
        FieldRule {
            canonical: "paymentStatus",
            sources: &[
                Source::Field("paymentStatus", payment_status),
                Source::Field("payment_status", payment_status),
                Source::Derived(payment_status_from_amounts),
            ],
            fallback: Fallback::Tag("Unpaid"),
        },
    ],
};

pub static ACTIVITY: EntityTable = EntityTable {
    entity: "activity",
    candidate_keys: &["activities"],
    recency_keys: &["activityDate", "activity_date", "startTime"],
    history: None,
    fields: &[
        FieldRule {
            canonical: "activityId",
            sources: &[
                Source::Field("activityId", integer),
                Source::Field("activity_id", integer),
                Source::Field("id", integer),
            ],
            fallback: Fallback::Zero,
        },
        FieldRule {
            canonical: "activityName",
            sources: &[
                Source::Field("activityName", text),
                Source::Field("activity_name", text),
                Source::Field("name", text),
                Source::Field("title", text),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "activityDate",
            sources: &[
                Source::Field("activityDate", timestamp),
                Source::Field("activity_date", timestamp),
                Source::Field("startTime", timestamp),
            ],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "location",
            sources: &[Source::Field("location", text), Source::Field("place", text)],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "description",
            sources: &[Source::Field("description", text), Source::Field("content", text)],
            fallback: Fallback::Empty,
        },
        FieldRule {
            canonical: "maxParticipants",
            sources: &[
                Source::Field("maxParticipants", integer),
                Source::Field("max_participants", integer),
                Source::Field("capacity", integer),
            ],
            fallback: Fallback::Zero,
        },
    ],
};

pub static ACTIVITY_PARTICIPATION: EntityTable = EntityTable {
    entity: "activity participation",
    candidate_keys: &["participations", "activityParticipations"],
    recency_keys: &[],
    history: Some(endpoints::registered_activities),
    fields: &[
        FieldRule {
            canonical: "activityId",
            sources: &[
                Source::Field("activityId", integer),
                Source::Field("activity_id", integer),
                Source::Derived(activity_id_from_nested),
            ],
            fallback: Fallback::Zero,
        },
        RESIDENT_ID,
    ],
};

macro_rules! canonical {
    ($($record:ty => $table:ident),* $(,)?) => {
        $(
            impl Canonical for $record {
                fn table() -> &'static EntityTable {
                    &$table
                }
            }
        )*
    };
}

canonical! {
    HealthMonitoringRecord => HEALTH_MONITORING,
    CarePlan => CARE_PLAN,
    DietRecommendation => DIET_RECOMMENDATION,
    MedicalOrder => MEDICAL_ORDER,
    HealthAssessment => HEALTH_ASSESSMENT,
    Reminder => REMINDER,
    EmergencyRecord => EMERGENCY_RECORD,
    ResidentProfile => RESIDENT_PROFILE,
    RoomBillingRecord => ROOM_BILLING,
    Activity => ACTIVITY,
    ActivityParticipation => ACTIVITY_PARTICIPATION,
}
