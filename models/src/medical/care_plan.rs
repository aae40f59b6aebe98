// models/src/medical/care_plan.rs
use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::identifiers::{PlanId, ResidentId, StaffId};

/// Evaluation status of a care plan.
///
/// `Unpaid → {Pending, Completed}`, `Pending → Scheduled`,
/// `Scheduled → Completed`. Cancelling is only legal from `Pending` and
/// removes the plan instead of moving it to another status.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PlanStatus {
    Unpaid,
    #[default]
    Pending,
    Scheduled,
    Completed,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Unpaid => "Unpaid",
            PlanStatus::Pending => "Pending",
            PlanStatus::Scheduled => "Scheduled",
            PlanStatus::Completed => "Completed",
        }
    }

    pub fn can_transition_to(self, next: PlanStatus) -> bool {
        matches!(
            (self, next),
            (PlanStatus::Unpaid, PlanStatus::Pending)
                | (PlanStatus::Unpaid, PlanStatus::Completed)
                | (PlanStatus::Pending, PlanStatus::Scheduled)
                | (PlanStatus::Scheduled, PlanStatus::Completed)
        )
    }

    pub fn can_cancel(self) -> bool {
        self == PlanStatus::Pending
    }

    pub fn is_terminal(self) -> bool {
        self == PlanStatus::Completed
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(PlanStatus::Unpaid),
            "pending" => Ok(PlanStatus::Pending),
            "scheduled" => Ok(PlanStatus::Scheduled),
            "completed" => Ok(PlanStatus::Completed),
            _ => Err(ValidationError::UnknownVariant("plan status", s.to_string())),
        }
    }
}

/// Priority tier. The apps disagree on the names of the lower two tiers
/// (Low/Basic, Medium/Normal), the tiers themselves are the same.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "basic" | "1" => Ok(Priority::Low),
            "medium" | "normal" | "2" => Ok(Priority::Medium),
            "high" | "3" => Ok(Priority::High),
            _ => Err(ValidationError::UnknownVariant("priority", s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CareType {
    #[default]
    Normal,
    Emergency,
}

impl CareType {
    pub fn as_str(self) -> &'static str {
        match self {
            CareType::Normal => "Normal",
            CareType::Emergency => "Emergency",
        }
    }
}

impl FromStr for CareType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "routine" => Ok(CareType::Normal),
            "emergency" | "urgent" => Ok(CareType::Emergency),
            _ => Err(ValidationError::UnknownVariant("care type", s.to_string())),
        }
    }
}

/// Canonical care plan. Serialized field names are the ones the nursing-plan
/// endpoints accept on create and replace.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarePlan {
    pub plan_id: PlanId,
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
    pub staff_id: Option<StaffId>,
    pub start_date: String,
    pub end_date: String,
    pub care_type: CareType,
    pub priority: Priority,
    #[serde(rename = "evaluationStatus")]
    pub status: PlanStatus,
    /// Last modification stamp reported by the backend, empty when unknown.
    pub updated_at: String,
}

impl CarePlan {
    pub fn is_unpaid(&self) -> bool {
        self.status == PlanStatus::Unpaid
    }
}
