use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "agents",
        "sessions",
        "resolution_packages",
        "missions",
        "companies",
        "contacts",
        "pipelines",
        "pipeline_stages",
        "deals",
        "calendar_events",
        "quotes",
        "quote_lines",
        "projects",
        "project_missions",
        "feedback_entries",
        "idx_missions_session_id",
        "idx_quotes_created_at",
        "idx_feedback_entries_session_id",
        "idx_pipeline_stages_pipeline_id",
    ];

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        pool
    }

    /// Managed object name mapped to its kind and DDL, so signature
    /// comparison catches silently-divergent column definitions too.
    async fn managed_objects(pool: &DbPool) -> BTreeMap<String, (String, String)> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT name, type, IFNULL(sql, '')
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects");

        rows.into_iter()
            .filter(|(name, _, _)| MANAGED_SCHEMA_OBJECTS.contains(&name.as_str()))
            .map(|(name, kind, ddl)| (name, (kind, ddl)))
            .collect()
    }

    #[tokio::test]
    async fn migrations_create_every_managed_object() {
        let pool = migrated_pool().await;
        let objects = managed_objects(&pool).await;

        for expected in MANAGED_SCHEMA_OBJECTS {
            assert!(objects.contains_key(*expected), "missing schema object `{expected}`");
        }
    }

    #[tokio::test]
    async fn undo_then_rerun_restores_the_same_schema() {
        let pool = migrated_pool().await;
        let before = managed_objects(&pool).await;
        assert_eq!(before.len(), MANAGED_SCHEMA_OBJECTS.len());

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        assert!(managed_objects(&pool).await.is_empty(), "full undo leaves managed objects");

        run_pending(&pool).await.expect("re-run migrations");
        assert_eq!(managed_objects(&pool).await, before);
    }
}
