//! Contact identifiers (emails and phone numbers) used to sign in.

/// Normalize an optional email: trimmed and lowercased, empty treated as absent.
pub fn normalize_email(email: Option<&str>) -> Option<String> {
    email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_lowercase)
}

/// Normalize an optional phone number: whitespace removed, empty treated as absent.
pub fn normalize_phone(phone: Option<&str>) -> Option<String> {
    phone
        .map(|p| p.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|p| !p.is_empty())
}

/// Check if a contact identifier is an operator-designated super admin.
///
/// - For emails: case-insensitive matching
/// - For phone numbers: exact match once whitespace is removed (E.164 format)
pub fn is_super_admin_identifier(identifier: &str, super_admin_identifiers: &[String]) -> bool {
    super_admin_identifiers.iter().any(|admin_id| {
        if identifier.contains('@') && admin_id.contains('@') {
            admin_id.trim().eq_ignore_ascii_case(identifier)
        } else {
            normalize_phone(Some(admin_id)).as_deref() == Some(identifier)
        }
    })
}
