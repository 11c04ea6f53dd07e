//! Helpers for classifying database errors.

/// The name of the unique constraint (or unique index) a statement violated.
///
/// Returns `None` for any other kind of error.
pub fn violated_unique_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}
