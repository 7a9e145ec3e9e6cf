//! Strongly-typed identifiers for CMP records
//!
//! All IDs are UUID-based and wrapped in newtype structs so a cluster id can
//! never be passed where an instance id is expected. `Display` renders a
//! kind prefix (`cluster:<uuid>`); parsing accepts the prefixed and the bare
//! form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when an identifier string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {value}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(raw).map(Self).map_err(|_| IdParseError {
                    kind: $prefix,
                    value: s.to_string(),
                })
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a tenant
    TenantId,
    "tenant"
);

uuid_id!(
    /// Unique identifier for a cluster
    ClusterId,
    "cluster"
);

uuid_id!(
    /// Unique identifier for an instance
    InstanceId,
    "instance"
);
