// models/src/medical/resident.rs
use serde::{Deserialize, Serialize};

use crate::identifiers::ResidentId;

/// Identity and contact data of a resident, mirrored for the active session.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentProfile {
    #[serde(rename = "elderlyId")]
    pub resident_id: ResidentId,
    pub name: String,
    pub gender: String,
    pub birth_date: String,
    pub id_card_number: String,
    pub phone: String,
    pub address: String,
    pub room_number: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
}
