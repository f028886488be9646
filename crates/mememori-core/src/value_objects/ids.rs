//! Identifier newtypes
//!
//! The backend hands out plain integer ids. Each kind of id gets its own type so a
//! message id can never be passed where a thread id is expected. Ids serialize as JSON
//! numbers and deserialize from either numbers or numeric strings, since form-encoded
//! and query-string round trips turn them into text.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Error when parsing an id from its string form
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("invalid id format")]
    InvalidFormat,
}

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(i64);

        impl $name {
            /// Create an id from its raw value
            #[inline]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw value
            #[inline]
            pub const fn into_inner(self) -> i64 {
                self.0
            }

            /// Parse from string representation
            pub fn parse(s: &str) -> Result<Self, IdParseError> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| IdParseError::InvalidFormat)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_i64(self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer
                    .deserialize_any(IntegerIdVisitor($what))
                    .map(Self)
            }
        }
    };
}

struct IntegerIdVisitor(&'static str);

impl<'de> serde::de::Visitor<'de> for IntegerIdVisitor {
    type Value = i64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a string or integer representing a {}", self.0)
    }

    fn visit_i64<E>(self, value: i64) -> Result<i64, E>
    where
        E: serde::de::Error,
    {
        Ok(value)
    }

    fn visit_u64<E>(self, value: u64) -> Result<i64, E>
    where
        E: serde::de::Error,
    {
        i64::try_from(value).map_err(|_| E::custom(format!("{} out of range", self.0)))
    }

    fn visit_str<E>(self, value: &str) -> Result<i64, E>
    where
        E: serde::de::Error,
    {
        value
            .trim()
            .parse::<i64>()
            .map_err(|_| E::custom(format!("invalid {} string", self.0)))
    }
}

integer_id!(
    /// Discussion thread id (one thread per item)
    ThreadId,
    "thread id"
);
integer_id!(
    /// Chat message id, assigned by the server
    MessageId,
    "message id"
);
integer_id!(
    /// Attachment id, assigned by the server on upload
    AttachmentId,
    "attachment id"
);
integer_id!(
    /// Account id of a chat participant
    UserId,
    "user id"
);

/// Catalog item id
///
/// Items are addressed by the page route, so the id stays opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
