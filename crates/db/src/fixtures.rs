//! Deterministic seed dataset and its verification contract.

use sqlx::Executor;

use conclave_core::ServiceError;

use crate::connection::DbPool;
use crate::repositories::storage;

const SEED_AGENT_IDS: &[&str] =
    &["agent-coordinator", "agent-ops", "agent-sales", "agent-research"];

const SEED_SESSION_ID: &str = "sess-roadmap-001";
const SEED_SESSION_MODE: &str = "propose";
const SEED_COMPANY_IDS: &[&str] = &["co-acme", "co-globex"];
const SEED_CONTACT_ID: &str = "ct-dana";
const SEED_DEFAULT_PIPELINE_ID: &str = "pl-sales";
const SEED_PIPELINE_STAGE_COUNT: i64 = 3;
const SEED_LAST_QUOTE_NUMBER: &str = "QT-0041";

/// Seed dataset giving a fresh database a roster, one resolvable session,
/// a CRM snapshot with a default pipeline, and one prior quote.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Loads the dataset. Safe to call repeatedly; rows are replaced.
    pub async fn load(pool: &DbPool) -> Result<(), ServiceError> {
        let mut tx = pool.begin().await.map_err(storage)?;
        tx.execute(sqlx::query(Self::SQL)).await.map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    /// Verifies the loaded dataset against the seed contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, ServiceError> {
        let mut checks = Vec::new();

        let agents_present = all_rows_present(pool, "agents", SEED_AGENT_IDS).await?;
        checks.push(("roster-agents", agents_present));

        let session_ok: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1 AND mode = ?2)",
        )
        .bind(SEED_SESSION_ID)
        .bind(SEED_SESSION_MODE)
        .fetch_one(pool)
        .await
        .map_err(storage)?;
        checks.push(("resolvable-session", session_ok == 1));

        let companies_present = all_rows_present(pool, "companies", SEED_COMPANY_IDS).await?;
        checks.push(("crm-companies", companies_present));

        let contact_ok: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM contacts WHERE id = ?1)")
                .bind(SEED_CONTACT_ID)
                .fetch_one(pool)
                .await
                .map_err(storage)?;
        checks.push(("crm-contact", contact_ok == 1));

        let default_pipeline_ok: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pipelines WHERE id = ?1 AND is_default = 1)",
        )
        .bind(SEED_DEFAULT_PIPELINE_ID)
        .fetch_one(pool)
        .await
        .map_err(storage)?;
        checks.push(("default-pipeline", default_pipeline_ok == 1));

        let stage_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM pipeline_stages WHERE pipeline_id = ?1")
                .bind(SEED_DEFAULT_PIPELINE_ID)
                .fetch_one(pool)
                .await
                .map_err(storage)?;
        checks.push(("pipeline-stages", stage_count == SEED_PIPELINE_STAGE_COUNT));

        let last_number: Option<String> = sqlx::query_scalar(
            "SELECT number FROM quotes ORDER BY created_at DESC, number DESC LIMIT 1",
        )
        .fetch_optional(pool)
        .await
        .map_err(storage)?;
        checks.push(("prior-quote-number", last_number.as_deref() == Some(SEED_LAST_QUOTE_NUMBER)));

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// One bound `EXISTS` probe per id. `table` is a compile-time constant
/// at every call site; only the id values are bound.
async fn all_rows_present(pool: &DbPool, table: &str, ids: &[&str]) -> Result<bool, ServiceError> {
    for id in ids {
        let present: i64 =
            sqlx::query_scalar(&format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"))
                .bind(id)
                .fetch_one(pool)
                .await
                .map_err(storage)?;
        if present != 1 {
            return Ok(false);
        }
    }
    Ok(true)
}
