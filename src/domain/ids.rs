//! Domain identifier types
//!
//! Newtype wrappers keep job, tool and user identifiers from being mixed up.
//! Tool and user ids are opaque strings owned by external CRUD services, so
//! construction never fails; blank values are rejected by the permission hook.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Export job identifier
///
/// Generated once when the job record is created and never changed.
///
/// # Examples
///
/// ```
/// use toolpack::domain::ids::JobId;
/// use std::str::FromStr;
///
/// let id = JobId::generate();
/// let parsed = JobId::from_str(&id.to_string()).unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random job id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| format!("Invalid job id '{s}': {e}"))
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty or whitespace only
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Consumes self and returns the inner String
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a tool in the tool registry
    ToolId
);

string_id!(
    /// Identifier of the user initiating or owning an export
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_roundtrip_through_string() {
        let id = JobId::generate();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_job_id_rejects_garbage() {
        let err = JobId::from_str("not-a-uuid").unwrap_err();
        assert!(err.contains("Invalid job id"));
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::generate(), JobId::generate());
    }

    #[test]
    fn test_string_ids_blank_detection() {
        assert!(ToolId::new("").is_blank());
        assert!(UserId::new("   ").is_blank());
        assert!(!ToolId::new("contact-form").is_blank());
    }

    #[test]
    fn test_string_id_serde_is_transparent() {
        let id = ToolId::new("onboarding-workflow");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"onboarding-workflow\"");
        let back: ToolId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
