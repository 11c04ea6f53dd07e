//! Register member action - creates an account and its member profile atomically

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};

use crate::common::db::violated_unique_constraint;
use crate::config::{Config, DEFAULT_REGISTRATION_MAX_ATTEMPTS};
use crate::domains::auth::models::{
    is_super_admin_identifier, normalize_email, normalize_phone, Account, NewAccount, Role,
    ACCOUNTS_EMAIL_KEY, ACCOUNTS_PHONE_KEY,
};
use crate::domains::auth::password::hash_credential;
use crate::domains::member::allocator::allocate_for_group;
use crate::domains::member::errors::{ContactField, RegistrationError};
use crate::domains::member::models::{
    parse_class_number, GroupKey, Member, NewMember, MEMBERS_COMMUNITY_ID_KEY,
    MEMBERS_GROUP_SEQUENCE_KEY,
};

/// Advisory lock key serializing the "first account ever" check.
const BOOTSTRAP_LOCK_KEY: i64 = 0x726f_7374_6572;

/// Registration form as submitted by the client.
#[derive(Clone, Deserialize)]
pub struct RegistrationInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub secret: String,
    pub first_name: String,
    pub last_name: String,
    pub location_raw: String,
    pub program_raw: String,
    /// Digits only, 1-999
    pub class_number: String,
}

/// Operator settings that shape registration.
#[derive(Debug, Clone)]
pub struct RegistrationPolicy {
    pub super_admin_identifiers: Vec<String>,
    pub max_attempts: u32,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            super_admin_identifiers: Vec::new(),
            max_attempts: DEFAULT_REGISTRATION_MAX_ATTEMPTS,
        }
    }
}

impl From<&Config> for RegistrationPolicy {
    fn from(config: &Config) -> Self {
        Self {
            super_admin_identifiers: config.super_admin_identifiers.clone(),
            max_attempts: config.registration_max_attempts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub account: Account,
    pub member: Member,
}

/// Validated registration, ready to be written.
struct Draft<'a> {
    email: Option<String>,
    phone: Option<String>,
    credential_hash: String,
    grant_super_admin: bool,
    group: GroupKey,
    input: &'a RegistrationInput,
}

/// Outcome of a single transactional attempt.
enum AttemptError {
    /// Another registration took the same sequence number first
    Collision(String),
    Fatal(RegistrationError),
}

impl From<RegistrationError> for AttemptError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Database(db_err) => classify_db_error(db_err),
            other => AttemptError::Fatal(other),
        }
    }
}

impl From<sqlx::Error> for AttemptError {
    fn from(err: sqlx::Error) -> Self {
        classify_db_error(err)
    }
}

fn classify_db_error(err: sqlx::Error) -> AttemptError {
    match violated_unique_constraint(&err).as_deref() {
        Some(constraint @ (MEMBERS_GROUP_SEQUENCE_KEY | MEMBERS_COMMUNITY_ID_KEY)) => {
            AttemptError::Collision(constraint.to_string())
        }
        Some(ACCOUNTS_EMAIL_KEY) => AttemptError::Fatal(RegistrationError::DuplicateContact {
            field: ContactField::Email,
        }),
        Some(ACCOUNTS_PHONE_KEY) => AttemptError::Fatal(RegistrationError::DuplicateContact {
            field: ContactField::Phone,
        }),
        _ => AttemptError::Fatal(RegistrationError::Database(err)),
    }
}

/// Register a new member.
///
/// This action:
/// 1. Validates contact details and the group key before touching the database
/// 2. Rejects contacts already bound to an account
/// 3. Hashes the credential
/// 4. Inserts account + member in one transaction, allocating the community id
///    inside it
///
/// A sequence collision with a concurrent registration rolls the attempt back
/// and retries, up to `policy.max_attempts`, before surfacing
/// `TransientConflict`. Every other error is returned as-is.
pub async fn register_member(
    input: &RegistrationInput,
    policy: &RegistrationPolicy,
    pool: &PgPool,
) -> Result<Registration, RegistrationError> {
    let email = normalize_email(input.email.as_deref());
    let phone = normalize_phone(input.phone.as_deref());
    if email.is_none() && phone.is_none() {
        return Err(RegistrationError::MissingContact);
    }

    let class_number = parse_class_number(&input.class_number)?;
    let group = GroupKey::normalize(&input.location_raw, &input.program_raw, class_number)?;

    if let Some(email) = &email {
        if Account::find_by_email(email, pool).await?.is_some() {
            return Err(RegistrationError::DuplicateContact {
                field: ContactField::Email,
            });
        }
    }
    if let Some(phone) = &phone {
        if Account::find_by_phone(phone, pool).await?.is_some() {
            return Err(RegistrationError::DuplicateContact {
                field: ContactField::Phone,
            });
        }
    }

    let secret = input.secret.clone();
    let credential_hash = tokio::task::spawn_blocking(move || hash_credential(&secret))
        .await
        .map_err(|e| RegistrationError::CredentialHash(e.to_string()))?
        .map_err(|e| RegistrationError::CredentialHash(e.to_string()))?;

    let grant_super_admin = [email.as_deref(), phone.as_deref()]
        .into_iter()
        .flatten()
        .any(|contact| is_super_admin_identifier(contact, &policy.super_admin_identifiers));

    let draft = Draft {
        email,
        phone,
        credential_hash,
        grant_super_admin,
        group,
        input,
    };

    let max_attempts = policy.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match try_register(&draft, pool).await {
            Ok(registration) => {
                info!(
                    member_id = %registration.member.id,
                    community_id = %registration.member.community_id,
                    role = ?registration.account.role,
                    attempt,
                    "Member registered"
                );
                return Ok(registration);
            }
            Err(AttemptError::Collision(constraint)) => {
                warn!(
                    group = %draft.group,
                    constraint = %constraint,
                    attempt,
                    max_attempts,
                    "Community id allocation collided with a concurrent registration"
                );
                if attempt < max_attempts {
                    tokio::time::sleep(retry_backoff(attempt)).await;
                }
            }
            Err(AttemptError::Fatal(err)) => return Err(err),
        }
    }

    Err(RegistrationError::TransientConflict {
        attempts: max_attempts,
    })
}

/// One transactional attempt. Dropping the transaction on any error rolls it back.
async fn try_register(draft: &Draft<'_>, pool: &PgPool) -> Result<Registration, AttemptError> {
    let mut tx = pool.begin().await?;

    let role = decide_role(draft.grant_super_admin, &mut tx).await?;

    let account = Account::insert(
        &NewAccount::builder()
            .email(draft.email.as_deref())
            .phone(draft.phone.as_deref())
            .credential_hash(&draft.credential_hash)
            .role(role)
            .build(),
        &mut *tx,
    )
    .await?;

    let community_id = allocate_for_group(&draft.group, &mut tx).await?;

    let member = Member::insert(
        &NewMember::builder()
            .account_id(account.id)
            .community_id(&community_id)
            .first_name(&draft.input.first_name)
            .last_name(&draft.input.last_name)
            .location_name(&draft.input.location_raw)
            .build(),
        &mut *tx,
    )
    .await?;

    tx.commit().await?;

    Ok(Registration { account, member })
}

/// Super admin for configured override contacts and for the first account ever.
async fn decide_role(grant_super_admin: bool, conn: &mut PgConnection) -> sqlx::Result<Role> {
    if grant_super_admin {
        return Ok(Role::SuperAdmin);
    }
    if Account::count(&mut *conn).await? > 0 {
        return Ok(Role::Member);
    }

    // Held until commit, so a concurrent first registration re-counts after we are visible
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(BOOTSTRAP_LOCK_KEY)
        .execute(&mut *conn)
        .await?;

    if Account::count(&mut *conn).await? == 0 {
        Ok(Role::SuperAdmin)
    } else {
        Ok(Role::Member)
    }
}

fn retry_backoff(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..20);
    Duration::from_millis(u64::from(attempt) * 10 + jitter)
}
