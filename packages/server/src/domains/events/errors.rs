use thiserror::Error;

/// Raised when an event's dates and times do not describe a usable window.
///
/// Callers on the check-in path treat this as "not eligible" rather than
/// propagating it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("Invalid event window: {0}")]
    InvalidEventWindow(String),
}
