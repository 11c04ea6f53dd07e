use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::domains::events::window::{order_for_listing, EventSchedule, ListedEvent, WindowPolicy};

/// An event as edited by organisers.
///
/// - **One-off event**: `start_date`..`end_date`, times optional
/// - **Recurring event**: template edited in place each cycle; `end_date` is
///   advisory and the current occurrence is always on `start_date`
///
/// Times are kept as entered (`HH:MM` / `HH:MM:SS`) and may be malformed;
/// evaluation treats malformed times as "not eligible".
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_recurring: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct CreateEvent<'a> {
    pub title: &'a str,
    pub category: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[builder(default)]
    pub start_time: Option<&'a str>,
    #[builder(default)]
    pub end_time: Option<&'a str>,
    #[builder(default = false)]
    pub is_recurring: bool,
}

impl Event {
    /// The fields that determine this event's check-in window
    pub fn schedule(&self) -> EventSchedule {
        EventSchedule {
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            is_recurring: self.is_recurring,
            category: self.category.clone(),
        }
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM events ORDER BY start_date DESC, created_at DESC")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(params: &CreateEvent<'_>, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO events (
                id, title, category, start_date, end_date, start_time, end_time, is_recurring
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(params.title)
        .bind(params.category)
        .bind(params.start_date)
        .bind(params.end_date)
        .bind(params.start_time)
        .bind(params.end_time)
        .bind(params.is_recurring)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// All events evaluated at `now`, in check-in listing order
    pub async fn list_for_check_in(
        policy: &WindowPolicy,
        now: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Vec<ListedEvent<Self>>> {
        let mut listed: Vec<ListedEvent<Self>> = Self::find_all(pool)
            .await?
            .into_iter()
            .map(|event| {
                let schedule = event.schedule();
                policy.evaluate(event, &schedule, now)
            })
            .collect();

        order_for_listing(&mut listed);
        Ok(listed)
    }
}
