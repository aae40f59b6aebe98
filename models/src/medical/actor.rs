// models/src/medical/actor.rs
use core::fmt;

use crate::identifiers::{ResidentId, StaffId};

/// Who is driving a mutation. Each of the four client apps acts as exactly
/// one of these.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Actor {
    Resident(ResidentId),
    /// A family member acting on behalf of one resident.
    Family { resident_id: ResidentId },
    Staff(StaffId),
    Visitor,
}

impl Actor {
    pub fn is_resident(&self, resident_id: ResidentId) -> bool {
        matches!(self, Actor::Resident(id) if *id == resident_id)
    }

    /// The resident themself or a family member linked to them.
    pub fn acts_for(&self, resident_id: ResidentId) -> bool {
        match self {
            Actor::Resident(id) => *id == resident_id,
            Actor::Family { resident_id: linked } => *linked == resident_id,
            Actor::Staff(_) | Actor::Visitor => false,
        }
    }

    /// Residents pay their own bills, family members pay for the resident
    /// they are linked to.
    pub fn may_pay_for(&self, resident_id: ResidentId) -> bool {
        self.acts_for(resident_id)
    }

    pub fn staff_id(&self) -> Option<StaffId> {
        match self {
            Actor::Staff(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Resident(id) => write!(f, "resident {}", id),
            Actor::Family { resident_id } => write!(f, "family of resident {}", resident_id),
            Actor::Staff(id) => write!(f, "staff {}", id),
            Actor::Visitor => f.write_str("visitor"),
        }
    }
}
