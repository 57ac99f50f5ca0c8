use sqlx::Row;

use conclave_core::domain::session::AgentProfile;
use conclave_core::services::AgentRoster;
use conclave_core::ServiceError;

use super::storage;
use crate::DbPool;

pub struct SqlAgentRoster {
    pool: DbPool,
}

impl SqlAgentRoster {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AgentRoster for SqlAgentRoster {
    async fn list_agents(&self) -> Result<Vec<AgentProfile>, ServiceError> {
        let rows = sqlx::query("SELECT id, display_name FROM agents ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.into_iter()
            .map(|row| {
                Ok(AgentProfile {
                    id: row.try_get("id").map_err(storage)?,
                    display_name: row.try_get("display_name").map_err(storage)?,
                })
            })
            .collect()
    }
}
