// models/src/medical/activity.rs
use serde::{Deserialize, Serialize};

use crate::identifiers::{ActivityId, ResidentId};

/// An entry of the open-activity catalog.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub activity_id: ActivityId,
    pub activity_name: String,
    pub activity_date: String,
    pub location: String,
    pub description: String,
    pub max_participants: i64,
}

/// Registration row. Its existence is the registration, any status column
/// the backend sends along is ignored.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityParticipation {
    pub activity_id: ActivityId,
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
}

/// Catalog entry joined with the resident's registration state.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivityView {
    pub activity: Activity,
    pub registered: bool,
}
