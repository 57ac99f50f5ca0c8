use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use conclave_core::domain::package::ResolutionItem;
use conclave_core::services::{FeedbackVerdict, FeedbackWriter};
use conclave_core::ServiceError;

use super::{encode_json, storage};
use crate::DbPool;

/// Appends decision records to the shared feedback store. Rows are
/// append-only; nothing in the engine reads them back.
pub struct SqlFeedbackWriter {
    pool: DbPool,
}

impl SqlFeedbackWriter {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn append(
        &self,
        session_id: &str,
        session_title: &str,
        kind: &str,
        payload: String,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO feedback_entries (
                id, session_id, session_title, kind, payload, recorded_at
             ) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(session_id)
        .bind(session_title)
        .bind(kind)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl FeedbackWriter for SqlFeedbackWriter {
    async fn record_item_verdict(
        &self,
        session_id: &str,
        session_title: &str,
        item: &ResolutionItem,
        verdict: FeedbackVerdict,
    ) -> Result<(), ServiceError> {
        let payload = encode_json(
            "payload",
            &json!({
                "verdict": verdict,
                "item": item,
            }),
        )?;
        self.append(session_id, session_title, "item_verdict", payload).await
    }

    async fn record_batch_outcome(
        &self,
        session_id: &str,
        session_title: &str,
        items: &[ResolutionItem],
    ) -> Result<(), ServiceError> {
        let payload = encode_json("payload", &json!({ "items": items }))?;
        self.append(session_id, session_title, "batch_outcome", payload).await
    }
}
