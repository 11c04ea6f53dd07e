use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domains::member::models::GroupKey;

/// Which contact field collided with an existing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Email,
    Phone,
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactField::Email => f.write_str("email"),
            ContactField::Phone => f.write_str("phone number"),
        }
    }
}

/// Errors surfaced by member registration.
///
/// Every variant except `Database` and `CredentialHash` is user-addressable:
/// the caller fixes the input (or resubmits, for `TransientConflict`).
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("An email address or phone number is required")]
    MissingContact,

    #[error("An account with this {field} already exists")]
    DuplicateContact { field: ContactField },

    #[error("Invalid class number {input:?}: expected a whole number from 1 to 999")]
    InvalidClassNumber { input: String },

    #[error("Invalid group: {0}")]
    InvalidGroupKey(String),

    #[error("Group {group} has no sequence numbers left")]
    CapacityExceeded { group: GroupKey },

    #[error("Registration collided with concurrent registrations {attempts} times, please resubmit")]
    TransientConflict { attempts: u32 },

    #[error("Failed to hash credential: {0}")]
    CredentialHash(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RegistrationError {
    /// Stable machine-readable kind, for API and CLI responses.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistrationError::MissingContact => "missing_contact",
            RegistrationError::DuplicateContact { .. } => "duplicate_contact",
            RegistrationError::InvalidClassNumber { .. } => "invalid_class_number",
            RegistrationError::InvalidGroupKey(_) => "invalid_group_key",
            RegistrationError::CapacityExceeded { .. } => "capacity_exceeded",
            RegistrationError::TransientConflict { .. } => "transient_conflict",
            RegistrationError::CredentialHash(_) => "internal",
            RegistrationError::Database(_) => "internal",
        }
    }
}
