// models/src/identifiers.rs

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Declares a numeric backend identifier. The backend hands out plain
/// integers for every entity, the newtypes keep a plan id from being passed
/// where a resident id is expected.
macro_rules! numeric_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn value(self) -> i64 {
                self.0
            }

            /// The backend uses 0 for "never assigned".
            pub fn is_unset(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidIdentifier($label, s.to_string()))
            }
        }
    };
}

numeric_identifier!(
    /// Identifies a resident (the backend calls them "elderly").
    ResidentId,
    "resident"
);
numeric_identifier!(
    /// Caller-chosen care plan number. Never generated on the client.
    PlanId,
    "plan"
);
numeric_identifier!(StaffId, "staff");
numeric_identifier!(ActivityId, "activity");
numeric_identifier!(BillingId, "billing");
