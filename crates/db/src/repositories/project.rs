use conclave_core::domain::project::Project;
use conclave_core::services::ProjectService;
use conclave_core::ServiceError;

use super::storage;
use crate::DbPool;

pub struct SqlProjectService {
    pool: DbPool,
}

impl SqlProjectService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProjectService for SqlProjectService {
    async fn create_project(&self, project: &Project) -> Result<(), ServiceError> {
        sqlx::query("INSERT INTO projects (id, name, description) VALUES (?, ?, ?)")
            .bind(&project.id)
            .bind(&project.name)
            .bind(&project.description)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(())
    }

    async fn link_missions(
        &self,
        project_id: &str,
        mission_ids: &[String],
    ) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        for mission_id in mission_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO project_missions (project_id, mission_id) VALUES (?, ?)",
            )
            .bind(project_id)
            .bind(mission_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        Ok(())
    }
}
