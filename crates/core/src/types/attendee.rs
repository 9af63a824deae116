//! Attendee identifier type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`AttendeeId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AttendeeIdError {
    /// The input string is empty.
    #[error("attendee ID cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("attendee ID must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains control characters.
    #[error("attendee ID cannot contain control characters")]
    ControlCharacter,
    /// The input is `.` or `..`, which cannot appear as a URL path segment.
    #[error("attendee ID cannot be \".\" or \"..\"")]
    DotSegment,
}

/// Externally assigned identifier of a registrant (the employee ID).
///
/// This is the value embedded in the attendee's QR code and used as the
/// lookup key at the entrance. Surrounding whitespace is trimmed; case is
/// preserved.
///
/// ```
/// use summit_core::AttendeeId;
///
/// assert_eq!(AttendeeId::parse(" E100 ").unwrap().as_str(), "E100");
/// assert!(AttendeeId::parse("").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AttendeeId(String);

impl AttendeeId {
    /// Maximum length of an attendee ID (matches the `emp_id` column).
    pub const MAX_LENGTH: usize = 50;

    /// Parse an `AttendeeId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than 50
    /// characters, contains control characters, or is a dot segment
    /// (`.` or `..`).
    pub fn parse(s: &str) -> Result<Self, AttendeeIdError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(AttendeeIdError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(AttendeeIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(char::is_control) {
            return Err(AttendeeIdError::ControlCharacter);
        }

        if matches!(s, "." | "..") {
            return Err(AttendeeIdError::DotSegment);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `AttendeeId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AttendeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AttendeeId {
    type Err = AttendeeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for AttendeeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "sqlite")]
impl sqlx::Type<sqlx::Sqlite> for AttendeeId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

#[cfg(feature = "sqlite")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for AttendeeId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "sqlite")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for AttendeeId {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
    }
}
