use sqlx::{sqlite::SqliteRow, Row};

use conclave_core::domain::package::ResolutionMode;
use conclave_core::domain::session::{Session, SessionMetadata};
use conclave_core::services::SessionService;
use conclave_core::ServiceError;

use super::{decode, decode_json, encode_json, parse_timestamp, storage};
use crate::DbPool;

pub struct SqlSessionService {
    pool: DbPool,
}

impl SqlSessionService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionService for SqlSessionService {
    async fn get_session(&self, session_id: &str) -> Result<Session, ServiceError> {
        let row = sqlx::query(
            "SELECT id, title, description, mode, participant_ids, metadata, created_at
             FROM sessions
             WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => session_from_row(row),
            None => Err(ServiceError::NotFound(format!("session `{session_id}`"))),
        }
    }

    async fn create_session(&self, session: &Session) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO sessions (
                id, title, description, mode, participant_ids, metadata, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.title)
        .bind(&session.description)
        .bind(session.mode.as_str())
        .bind(encode_json("participant_ids", &session.participant_ids)?)
        .bind(encode_json("metadata", &session.metadata)?)
        .bind(session.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn update_metadata(
        &self,
        session_id: &str,
        metadata: &SessionMetadata,
    ) -> Result<(), ServiceError> {
        let outcome = sqlx::query("UPDATE sessions SET metadata = ? WHERE id = ?")
            .bind(encode_json("metadata", metadata)?)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if outcome.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("session `{session_id}`")));
        }
        Ok(())
    }
}

fn session_from_row(row: SqliteRow) -> Result<Session, ServiceError> {
    let mode_raw = row.try_get::<String, _>("mode").map_err(storage)?;
    let mode = ResolutionMode::parse(&mode_raw)
        .ok_or_else(|| decode(format!("unknown resolution mode `{mode_raw}`")))?;

    let participants_raw = row.try_get::<String, _>("participant_ids").map_err(storage)?;
    let metadata_raw = row.try_get::<String, _>("metadata").map_err(storage)?;

    Ok(Session {
        id: row.try_get("id").map_err(storage)?,
        title: row.try_get("title").map_err(storage)?,
        description: row.try_get("description").map_err(storage)?,
        mode,
        participant_ids: decode_json("participant_ids", &participants_raw)?,
        metadata: decode_json("metadata", &metadata_raw)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at").map_err(storage)?)?,
    })
}
