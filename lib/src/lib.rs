// lib/src/lib.rs

//! Shared client layer for the eldercare apps.
//!
//! Every surface (resident, family, staff, visitor) goes through the same
//! normalizer, loader and mutation coordinators, so a plan or a bill reads the
//! same way everywhere regardless of which backend shape produced it.

pub mod activity;
pub mod backend;
pub mod billing;
pub mod care_plan;
pub mod config;
pub mod loader;
pub mod normalizer;
pub mod session;

pub use activity::ActivityRegistrationCoordinator;
pub use backend::{CareBackend, HttpBackend, InMemoryBackend};
pub use billing::BillingReconciler;
pub use care_plan::{CarePlanLifecycle, PlanApplication};
pub use config::{load_care_config, CareConfig};
pub use loader::{ActivityBoard, DataLoadCoordinator, ResidentSnapshot, Slice, SliceState};
pub use session::CareSession;

pub use models::medical::{
    Activity, ActivityView, Actor, CarePlan, CareType, HealthMonitoringRecord, HealthStatus, PaymentStatus,
    PlanStatus, Priority, ResidentProfile, RoomBillingRecord,
};
pub use models::{
    ActivityId, BillingId, CareError, CareResult, DomainConflict, PlanId, ResidentId, StaffId, TransportError,
};
