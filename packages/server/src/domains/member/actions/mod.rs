//! Member domain actions - business logic functions

mod register_member;

pub use register_member::{register_member, Registration, RegistrationInput, RegistrationPolicy};
