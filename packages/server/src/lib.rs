// Community Roster - Core
//
// Member registration with community identifier allocation, and check-in
// window evaluation for one-off and recurring events. Backed by Postgres.
//
// Each domain keeps its SQL in models/ and its business logic beside it.

pub mod common;
pub mod config;
pub mod domains;

pub use config::*;
