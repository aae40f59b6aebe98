// models/src/lib.rs

//! Canonical records shared by the resident, family, staff and visitor apps.
//! Everything a presentation surface renders is one of these types, whatever
//! shape the backend sent.

pub mod errors;
pub mod identifiers;
pub mod medical;

pub use errors::{CareError, CareResult, DomainConflict, ShapeError, TransportError, ValidationError};
pub use identifiers::{ActivityId, BillingId, PlanId, ResidentId, StaffId};
