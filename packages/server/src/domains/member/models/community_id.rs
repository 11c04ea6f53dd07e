//! Community identifiers - the externally visible member identity.
//!
//! Format: `LLL-PP{class}{sequence}`, e.g. `MAN-ESL0307` is location `MAN`,
//! program `ESL`, class 3, sequence 7.
//!
//! Class numbers below 100 are padded to two digits, which is the format
//! printed on QR badges. Class numbers 100-999 widen the class field to three
//! digits. The sequence is always the last two digits, so a parse never has
//! to guess where the class field ends.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domains::member::errors::RegistrationError;

pub const MIN_CLASS_NUMBER: i16 = 1;
pub const MAX_CLASS_NUMBER: i16 = 999;
pub const MIN_SEQUENCE: i16 = 1;
pub const MAX_SEQUENCE: i16 = 99;

/// Published identifier format (two-digit class field).
pub const COMMUNITY_ID_PATTERN: &str = r"^[A-Z]{3}-[A-Z]{2,4}\d{2}\d{2}$";

/// Every identifier this crate produces, including widened class fields.
pub const COMMUNITY_ID_PATTERN_WIDE: &str = r"^[A-Z]{3}-[A-Z]{2,4}(?:\d{2}|[1-9]\d{2})\d{2}$";

lazy_static! {
    static ref COMMUNITY_ID_REGEX: Regex = Regex::new(COMMUNITY_ID_PATTERN_WIDE).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid community identifier: {0:?}")]
pub struct InvalidCommunityId(pub String);

/// The (location, program, class) key sequence numbers are allocated within.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub location_code: String,
    pub program_code: String,
    pub class_number: i16,
}

impl GroupKey {
    /// Normalize raw registration input into a group key.
    ///
    /// - location: first 3 characters of the trimmed name, uppercased
    /// - program: trimmed and uppercased, 2-4 letters
    /// - class: 1-999
    pub fn normalize(
        location_raw: &str,
        program_raw: &str,
        class_number: i32,
    ) -> Result<Self, RegistrationError> {
        if !(i32::from(MIN_CLASS_NUMBER)..=i32::from(MAX_CLASS_NUMBER)).contains(&class_number) {
            return Err(RegistrationError::InvalidClassNumber {
                input: class_number.to_string(),
            });
        }

        let location_code: String = location_raw
            .trim()
            .chars()
            .take(3)
            .collect::<String>()
            .to_uppercase();
        if location_code.len() != 3 || !location_code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(RegistrationError::InvalidGroupKey(format!(
                "location {:?} must start with three letters",
                location_raw.trim()
            )));
        }

        let program_code = program_raw.trim().to_uppercase();
        if !(2..=4).contains(&program_code.len())
            || !program_code.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(RegistrationError::InvalidGroupKey(format!(
                "program {:?} must be 2-4 letters",
                program_raw.trim()
            )));
        }

        Ok(Self {
            location_code,
            program_code,
            // Range checked above
            class_number: class_number as i16,
        })
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}{:02}",
            self.location_code, self.program_code, self.class_number
        )
    }
}

/// Parse a class number submitted as a string of digits.
pub fn parse_class_number(raw: &str) -> Result<i32, RegistrationError> {
    let trimmed = raw.trim();
    let invalid = || RegistrationError::InvalidClassNumber {
        input: trimmed.to_string(),
    };

    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: i32 = trimmed.parse().map_err(|_| invalid())?;
    if !(i32::from(MIN_CLASS_NUMBER)..=i32::from(MAX_CLASS_NUMBER)).contains(&value) {
        return Err(invalid());
    }
    Ok(value)
}

/// A member's community identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommunityId {
    group: GroupKey,
    sequence: i16,
}

impl CommunityId {
    /// Compose an identifier. Returns `None` if the sequence is outside 1-99.
    pub fn new(group: GroupKey, sequence: i16) -> Option<Self> {
        (MIN_SEQUENCE..=MAX_SEQUENCE)
            .contains(&sequence)
            .then_some(Self { group, sequence })
    }

    pub fn group(&self) -> &GroupKey {
        &self.group
    }

    pub fn sequence(&self) -> i16 {
        self.sequence
    }

    /// Parse user-supplied input (QR payloads, lookup boxes).
    ///
    /// Input is trimmed and uppercased before matching.
    pub fn parse(raw: &str) -> Result<Self, InvalidCommunityId> {
        Self::parse_canonical(&raw.trim().to_uppercase())
    }

    /// Parse a stored identifier exactly as written.
    pub fn parse_canonical(s: &str) -> Result<Self, InvalidCommunityId> {
        let invalid = || InvalidCommunityId(s.to_string());

        if !COMMUNITY_ID_REGEX.is_match(s) {
            return Err(invalid());
        }

        // The regex guarantees ASCII, a dash at index 3 and a letters-then-digits tail
        let location_code = &s[..3];
        let tail = &s[4..];
        let digits_at = tail
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (program_code, digits) = tail.split_at(digits_at);

        // Fixed-width split: the sequence is always the final two digits
        let (class_digits, sequence_digits) = digits.split_at(digits.len() - 2);
        let class_number: i16 = class_digits.parse().map_err(|_| invalid())?;
        let sequence: i16 = sequence_digits.parse().map_err(|_| invalid())?;

        if !(MIN_CLASS_NUMBER..=MAX_CLASS_NUMBER).contains(&class_number) {
            return Err(invalid());
        }

        let group = GroupKey {
            location_code: location_code.to_string(),
            program_code: program_code.to_string(),
            class_number,
        };
        Self::new(group, sequence).ok_or_else(invalid)
    }

    /// Whether `raw` (after trimming and uppercasing) is a well-formed identifier.
    pub fn is_valid_format(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.group, self.sequence)
    }
}

impl FromStr for CommunityId {
    type Err = InvalidCommunityId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CommunityId {
    type Error = InvalidCommunityId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CommunityId> for String {
    fn from(id: CommunityId) -> Self {
        id.to_string()
    }
}
