// models/src/medical/mod.rs

pub mod activity;
pub mod actor;
pub mod care_plan;
pub mod health_monitoring;
pub mod records;
pub mod resident;
pub mod room_billing;

pub use activity::{Activity, ActivityParticipation, ActivityView};
pub use actor::Actor;
pub use care_plan::{CarePlan, CareType, PlanStatus, Priority};
pub use health_monitoring::{HealthMonitoringRecord, HealthStatus};
pub use records::{DietRecommendation, EmergencyRecord, HealthAssessment, MedicalOrder, Reminder};
pub use resident::ResidentProfile;
pub use room_billing::{PaymentStatus, RoomBillingRecord, RoomPayment};
