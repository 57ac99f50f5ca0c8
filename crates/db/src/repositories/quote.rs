use sqlx::Row;

use conclave_core::domain::quote::Quote;
use conclave_core::services::QuoteService;
use conclave_core::ServiceError;

use super::storage;
use crate::DbPool;

pub struct SqlQuoteService {
    pool: DbPool,
}

impl SqlQuoteService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuoteService for SqlQuoteService {
    async fn last_quote_number(&self) -> Result<Option<String>, ServiceError> {
        let row = sqlx::query(
            "SELECT number FROM quotes ORDER BY created_at DESC, number DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(|row| row.try_get("number").map_err(storage)).transpose()
    }

    async fn create_quote(&self, quote: &Quote) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query(
            "INSERT INTO quotes (
                id, number, customer_kind, customer_id, description, subtotal, total, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.id)
        .bind(&quote.number)
        .bind(quote.customer.kind.as_str())
        .bind(&quote.customer.id)
        .bind(&quote.description)
        .bind(quote.subtotal.to_string())
        .bind(quote.total.to_string())
        .bind(quote.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        for (index, line) in quote.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quote_lines (quote_id, line_index, description, quantity, unit_price)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&quote.id)
            .bind(index as i64)
            .bind(&line.description)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.to_string())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        Ok(())
    }
}
