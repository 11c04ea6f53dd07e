//! Auth domain - accounts, privilege tiers and credential hashing
//!
//! Token issuance and sign-in flows live outside this crate; they consume
//! `Account` lookups and `verify_credential`.

pub mod models;
pub mod password;

pub use models::{Account, NewAccount, Role};
pub use password::{hash_credential, verify_credential};
