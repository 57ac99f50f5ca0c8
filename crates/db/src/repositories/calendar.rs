use conclave_core::domain::calendar::CalendarEvent;
use conclave_core::services::CalendarService;
use conclave_core::ServiceError;

use super::{encode_json, storage};
use crate::DbPool;

pub struct SqlCalendarService {
    pool: DbPool,
}

impl SqlCalendarService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CalendarService for SqlCalendarService {
    async fn create_event(&self, event: &CalendarEvent) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO calendar_events (
                id, title, description, starts_at, ends_at, attendee_ids, session_id
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.starts_at.to_rfc3339())
        .bind(event.ends_at.to_rfc3339())
        .bind(encode_json("attendee_ids", &event.attendee_ids)?)
        .bind(&event.session_id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}
