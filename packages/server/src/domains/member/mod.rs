//! Member domain - registration and community identifier allocation
//!
//! Registration writes an account and its member profile in one transaction.
//! The community identifier is allocated inside that transaction; see
//! `allocator` for the concurrency contract.

pub mod actions;
pub mod allocator;
pub mod errors;
pub mod models;

// Re-export commonly used types
pub use actions::{register_member, Registration, RegistrationInput, RegistrationPolicy};
pub use errors::{ContactField, RegistrationError};
pub use models::{CommunityId, GroupKey, Member};
