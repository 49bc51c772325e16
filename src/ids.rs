//! Identifiers
//!
//! Participants and options are opaque strings supplied by the caller. They are
//! wrapped in newtypes so the two can never be mixed up when building the model.

use std::{borrow::Borrow, fmt};

use serde::Deserialize;

/// Opaque participant identifier, unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

/// Opaque option identifier, unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct OptionId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Create a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(ParticipantId);
string_id!(OptionId);

/// Build a list of participant identifiers from string slices.
pub fn participants(ids: &[&str]) -> Vec<ParticipantId> {
    ids.iter().copied().map(ParticipantId::from).collect()
}

/// Build a list of option identifiers from string slices.
pub fn options(ids: &[&str]) -> Vec<OptionId> {
    ids.iter().copied().map(OptionId::from).collect()
}
