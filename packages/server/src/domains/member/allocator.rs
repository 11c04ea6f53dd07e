//! Community identifier allocation.
//!
//! The next sequence number of a group is derived by scanning the identifiers
//! already stored for that group and taking the highest suffix plus one. A
//! stored identifier that no longer parses still holds its `sequence` column,
//! so the column stands in for its suffix. The
//! scan is only safe together with the `members_group_sequence_key` unique
//! constraint: a concurrent writer that read the same maximum fails its insert
//! and the registrar re-runs allocation in a fresh transaction.

use sqlx::PgConnection;
use tracing::{debug, warn};

use super::errors::RegistrationError;
use super::models::{CommunityId, GroupKey, GroupSlot, Member, MAX_SEQUENCE};

/// Allocate the next identifier for raw registration input.
///
/// Must run on the connection of the transaction that will insert the member.
pub async fn allocate(
    location_raw: &str,
    program_raw: &str,
    class_number: i32,
    conn: &mut PgConnection,
) -> Result<CommunityId, RegistrationError> {
    let group = GroupKey::normalize(location_raw, program_raw, class_number)?;
    allocate_for_group(&group, conn).await
}

/// Allocate the next identifier for an already normalized group.
pub async fn allocate_for_group(
    group: &GroupKey,
    conn: &mut PgConnection,
) -> Result<CommunityId, RegistrationError> {
    let existing = Member::slots_in_group(group, &mut *conn).await?;
    let sequence = next_sequence(group, &existing)?;

    debug!(
        group = %group,
        existing = existing.len(),
        sequence,
        "Allocated community id sequence"
    );

    CommunityId::new(group.clone(), sequence).ok_or_else(|| RegistrationError::CapacityExceeded {
        group: group.clone(),
    })
}

/// Next free sequence number given the slots already taken in a group.
pub fn next_sequence(group: &GroupKey, existing: &[GroupSlot]) -> Result<i16, RegistrationError> {
    let highest = existing
        .iter()
        .map(|slot| match sequence_suffix(&slot.community_id) {
            Some(sequence) => sequence.max(slot.sequence),
            None => {
                warn!(
                    group = %group,
                    stored = %slot.community_id,
                    sequence = slot.sequence,
                    "Malformed community id, using its stored sequence"
                );
                slot.sequence
            }
        })
        .max()
        .unwrap_or(0);

    if highest >= MAX_SEQUENCE {
        return Err(RegistrationError::CapacityExceeded {
            group: group.clone(),
        });
    }
    Ok(highest + 1)
}

/// The fixed-width two-digit sequence suffix of a stored identifier.
fn sequence_suffix(stored: &str) -> Option<i16> {
    CommunityId::parse_canonical(stored)
        .ok()
        .map(|id| id.sequence())
}
