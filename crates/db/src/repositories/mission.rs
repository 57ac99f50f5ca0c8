use conclave_core::domain::mission::Mission;
use conclave_core::services::MissionService;
use conclave_core::ServiceError;

use super::storage;
use crate::DbPool;

pub struct SqlMissionService {
    pool: DbPool,
}

impl SqlMissionService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MissionService for SqlMissionService {
    async fn create_mission(&self, mission: &Mission) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO missions (
                id, title, description, agent_id, priority, phase, scheduled_at, session_id
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&mission.id)
        .bind(&mission.title)
        .bind(&mission.description)
        .bind(&mission.agent_id)
        .bind(mission.priority.as_str())
        .bind(mission.phase.as_str())
        .bind(mission.scheduled_at.to_rfc3339())
        .bind(&mission.session_id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn mission_exists(&self, mission_id: &str) -> Result<bool, ServiceError> {
        let row = sqlx::query("SELECT 1 FROM missions WHERE id = ?")
            .bind(mission_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row.is_some())
    }
}
