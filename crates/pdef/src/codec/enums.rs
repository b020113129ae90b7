//! Enum ordinal <-> name conversion for the text and JSON forms.
//!
//! The binary codec never calls into this module: ordinals travel as raw
//! bytes so values written by other schema revisions survive a round trip.

use std::borrow::Cow;

use crate::error::EnumError;
use crate::model::EnumDef;

impl EnumDef {
    /// Number of declared members.
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Returns true if `ordinal` names a declared member.
    pub fn contains(&self, ordinal: u8) -> bool {
        usize::from(ordinal) < self.values.len()
    }

    /// Returns the member name for `ordinal`.
    pub fn name(&self, ordinal: u8) -> Result<&str, EnumError> {
        self.values
            .get(usize::from(ordinal))
            .map(String::as_str)
            .ok_or_else(|| EnumError::InvalidOrdinal {
                name: self.name.clone(),
                ordinal,
            })
    }

    /// Parses a member name into its ordinal.
    pub fn ordinal(&self, value: &str) -> Result<u8, EnumError> {
        self.values
            .iter()
            .position(|v| v == value)
            .and_then(|i| u8::try_from(i).ok())
            .ok_or_else(|| EnumError::InvalidName {
                name: self.name.clone(),
                value: value.to_string(),
            })
    }

    /// Human-readable form: the member name, or the decimal ordinal when
    /// it is out of range.
    pub fn display(&self, ordinal: u8) -> Cow<'_, str> {
        match self.name(ordinal) {
            Ok(name) => Cow::Borrowed(name),
            Err(_) => Cow::Owned(ordinal.to_string()),
        }
    }
}
