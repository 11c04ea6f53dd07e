//! Test fixtures for creating test data.
//!
//! Seeding goes through the model methods directly, skipping credential
//! hashing so large groups can be set up quickly.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use roster_core::domains::auth::models::{Account, NewAccount};
use roster_core::domains::events::{CreateEvent, Event};
use roster_core::domains::member::models::{CommunityId, GroupKey, Member, NewMember};
use roster_core::domains::member::RegistrationInput;
use sqlx::PgPool;

/// A complete registration form for the given contact and group.
pub fn registration(
    email: Option<&str>,
    phone: Option<&str>,
    location: &str,
    program: &str,
    class_number: &str,
) -> RegistrationInput {
    RegistrationInput {
        email: email.map(String::from),
        phone: phone.map(String::from),
        secret: "correct horse battery staple".to_string(),
        first_name: "Test".to_string(),
        last_name: "Member".to_string(),
        location_raw: location.to_string(),
        program_raw: program.to_string(),
        class_number: class_number.to_string(),
    }
}

/// Insert `count` members into a group with sequences 1..=count.
pub async fn seed_group(pool: &PgPool, group: &GroupKey, count: i16) -> Result<()> {
    for sequence in 1..=count {
        let email = format!("seed-{}-{}@example.com", group, sequence).to_lowercase();
        let account = Account::insert(
            &NewAccount::builder()
                .email(Some(email.as_str()))
                .credential_hash("seeded")
                .build(),
            pool,
        )
        .await?;

        let community_id =
            CommunityId::new(group.clone(), sequence).context("sequence out of range")?;
        Member::insert(
            &NewMember::builder()
                .account_id(account.id)
                .community_id(&community_id)
                .first_name("Seeded")
                .last_name("Member")
                .location_name(&group.location_code)
                .build(),
            pool,
        )
        .await?;
    }
    Ok(())
}

pub async fn count_accounts(pool: &PgPool) -> Result<i64> {
    Ok(Account::count(pool).await?)
}

pub async fn count_members(pool: &PgPool) -> Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
        .fetch_one(pool)
        .await?)
}

/// Create an event with the given dates and times.
pub async fn create_event(
    pool: &PgPool,
    title: &str,
    start_date: &str,
    end_date: &str,
    start_time: Option<&str>,
    end_time: Option<&str>,
    is_recurring: bool,
) -> Result<Event> {
    let start_date: NaiveDate = start_date.parse()?;
    let end_date: NaiveDate = end_date.parse()?;

    Event::create(
        &CreateEvent::builder()
            .title(title)
            .category("service")
            .start_date(start_date)
            .end_date(end_date)
            .start_time(start_time)
            .end_time(end_time)
            .is_recurring(is_recurring)
            .build(),
        pool,
    )
    .await
}

/// Wait until at least `count` sessions on this database are blocked on a lock.
pub async fn wait_for_lock_waiters(pool: &PgPool, count: i64) -> Result<()> {
    for _ in 0..200 {
        let waiting = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM pg_stat_activity
            WHERE datname = current_database() AND wait_event_type = 'Lock'
            "#,
        )
        .fetch_one(pool)
        .await?;
        if waiting >= count {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    bail!("no session blocked on a lock after 5s")
}
