use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgExecutor;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use super::community_id::{CommunityId, GroupKey};

pub const MEMBERS_COMMUNITY_ID_KEY: &str = "members_community_id_key";
pub const MEMBERS_GROUP_SEQUENCE_KEY: &str = "members_group_sequence_key";

/// Member profile - SQL persistence layer
///
/// `community_id` is written once at registration and never updated.
/// Members are deactivated, never deleted, so identifiers are never reused.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Member {
    pub id: Uuid,
    pub account_id: Uuid,
    pub community_id: String,
    pub first_name: String,
    pub last_name: String,
    pub location_name: String,
    pub location_code: String,
    pub program_code: String,
    pub class_number: i16,
    pub sequence: i16,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A stored identifier together with the sequence column written beside it.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct GroupSlot {
    pub community_id: String,
    pub sequence: i16,
}

#[derive(TypedBuilder)]
pub struct NewMember<'a> {
    pub account_id: Uuid,
    pub community_id: &'a CommunityId,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub location_name: &'a str,
}

// =============================================================================
// SQL Queries
// =============================================================================

impl Member {
    /// Find member by ID
    pub async fn find_by_id<'e>(id: Uuid, executor: impl PgExecutor<'e>) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Find member by community identifier (QR payloads, lookup APIs)
    pub async fn find_by_community_id<'e>(
        community_id: &CommunityId,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM members WHERE community_id = $1")
            .bind(community_id.to_string())
            .fetch_optional(executor)
            .await
    }

    /// Find the member profile owned by an account
    pub async fn find_by_account_id<'e>(
        account_id: Uuid,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM members WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(executor)
            .await
    }

    /// All members of a group, oldest first. Includes deactivated members.
    pub async fn find_in_group<'e>(
        group: &GroupKey,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members
            WHERE location_code = $1 AND program_code = $2 AND class_number = $3
            ORDER BY created_at ASC
            "#,
        )
        .bind(&group.location_code)
        .bind(&group.program_code)
        .bind(group.class_number)
        .fetch_all(executor)
        .await
    }

    /// Identifier slots already taken in a group, oldest first. Used for sequence allocation.
    pub async fn slots_in_group<'e>(
        group: &GroupKey,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Vec<GroupSlot>> {
        sqlx::query_as::<_, GroupSlot>(
            r#"
            SELECT community_id, sequence FROM members
            WHERE location_code = $1 AND program_code = $2 AND class_number = $3
            ORDER BY created_at ASC
            "#,
        )
        .bind(&group.location_code)
        .bind(&group.program_code)
        .bind(group.class_number)
        .fetch_all(executor)
        .await
    }

    /// Insert a new member.
    ///
    /// `created_at` is the wall-clock insert time rather than the transaction
    /// start, so creation order follows the order sequences were taken in.
    ///
    /// Fails with a unique violation on `members_group_sequence_key` or
    /// `members_community_id_key` if a concurrent registration took the same
    /// sequence number first.
    pub async fn insert<'e>(
        params: &NewMember<'_>,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Self> {
        let group = params.community_id.group();

        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO members (
                id, account_id, community_id, first_name, last_name, location_name,
                location_code, program_code, class_number, sequence, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, clock_timestamp())
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(params.account_id)
        .bind(params.community_id.to_string())
        .bind(params.first_name.trim())
        .bind(params.last_name.trim())
        .bind(params.location_name.trim())
        .bind(&group.location_code)
        .bind(&group.program_code)
        .bind(group.class_number)
        .bind(params.community_id.sequence())
        .fetch_one(executor)
        .await
    }

    /// Soft-deactivate a member. The community identifier stays reserved.
    pub async fn deactivate<'e>(id: Uuid, executor: impl PgExecutor<'e>) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>("UPDATE members SET active = false WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Parsed community identifier
    pub fn parsed_community_id(&self) -> Option<CommunityId> {
        CommunityId::parse_canonical(&self.community_id).ok()
    }
}
