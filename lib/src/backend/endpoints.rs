// lib/src/backend/endpoints.rs
//
// Paths on the shared backend. The casing is the backend's, not ours.

use models::{BillingId, PlanId, ResidentId};

pub const NURSING_PLANS: &str = "/staff-info/nursing-plans";
pub const ACTIVITY_PARTICIPATION: &str = "/ActivityParticipation";
pub const OPEN_ACTIVITIES: &str = "/Activity/open";

pub fn elderly_record(resident_id: ResidentId) -> String {
    format!("/ElderlyRecord/{}", resident_id)
}

pub fn health_history(resident_id: ResidentId) -> String {
    format!("/HealthMonitoring/elderly/{}/history", resident_id)
}

pub fn health_assessments(resident_id: ResidentId) -> String {
    format!("/HealthAssessment/elderly/{}", resident_id)
}

pub fn medical_orders(resident_id: ResidentId) -> String {
    format!("/MedicalOrder/elderly/{}", resident_id)
}

pub fn diet_recommendation(resident_id: ResidentId) -> String {
    format!("/DietRecommendation/{}", resident_id)
}

pub fn reminders(resident_id: ResidentId) -> String {
    format!("/Reminder/elderly/{}", resident_id)
}

pub fn emergency_history(resident_id: ResidentId) -> String {
    format!("/EmergencyService/elderly/{}", resident_id)
}

pub fn resident_plans(resident_id: ResidentId) -> String {
    format!("{}/elderly/{}", NURSING_PLANS, resident_id)
}

pub fn nursing_plan(plan_id: PlanId) -> String {
    format!("{}/{}", NURSING_PLANS, plan_id)
}

pub fn nursing_plan_payment(plan_id: PlanId) -> String {
    format!("{}/{}/payment", NURSING_PLANS, plan_id)
}

pub fn registered_activities(resident_id: ResidentId) -> String {
    format!("{}/elderly/{}", ACTIVITY_PARTICIPATION, resident_id)
}

pub fn billing_records(resident_id: ResidentId) -> String {
    format!("/RoomOccupancy/elderly/{}/billing/records", resident_id)
}

pub fn billing_payment(billing_id: BillingId) -> String {
    format!("/RoomOccupancy/billing/{}/payment", billing_id)
}
