//! Events domain - check-in window evaluation
//!
//! Evaluation is pure: `OccurrenceResolver` turns stored dates and wall-clock
//! times into instants in the civil offset, and `WindowPolicy` classifies an
//! instant against them. The check-in write itself happens elsewhere.

pub mod errors;
pub mod models;
pub mod occurrence;
pub mod window;

pub use errors::WindowError;
pub use models::{CreateEvent, Event};
pub use occurrence::{parse_time_of_day, OccurrenceResolver, CIVIL_OFFSET};
pub use window::{
    can_check_in, classify, order_for_listing, CheckInState, CheckInWindow, DisplayStatus,
    EventSchedule, ListedEvent, WindowPolicy,
};
