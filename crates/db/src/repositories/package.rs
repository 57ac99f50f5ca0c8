use chrono::Utc;
use sqlx::Row;

use conclave_core::domain::package::ResolutionPackage;
use conclave_core::services::PackageRepository;
use conclave_core::ServiceError;

use super::{decode_json, encode_json, storage};
use crate::DbPool;

/// Whole-snapshot package store. `save` replaces the prior row for the
/// session, matching the replace-on-write persistence contract.
pub struct SqlPackageStore {
    pool: DbPool,
}

impl SqlPackageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PackageRepository for SqlPackageStore {
    async fn find_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ResolutionPackage>, ServiceError> {
        let row = sqlx::query("SELECT snapshot FROM resolution_packages WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(|row| {
            let snapshot = row.try_get::<String, _>("snapshot").map_err(storage)?;
            decode_json("snapshot", &snapshot)
        })
        .transpose()
    }

    async fn save(&self, package: &ResolutionPackage) -> Result<(), ServiceError> {
        let snapshot = encode_json("snapshot", package)?;

        sqlx::query(
            "INSERT INTO resolution_packages (session_id, package_id, snapshot, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET
                package_id = excluded.package_id,
                snapshot = excluded.snapshot,
                updated_at = excluded.updated_at",
        )
        .bind(&package.session_id)
        .bind(&package.id)
        .bind(snapshot)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}
