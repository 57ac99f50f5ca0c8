use sqlx::{sqlite::SqliteRow, Row};

use conclave_core::domain::crm::{Company, Contact, CrmSnapshot, Deal, Pipeline, PipelineStage};
use conclave_core::domain::package::{CrmDetails, CrmKind};
use conclave_core::services::CrmService;
use conclave_core::ServiceError;

use super::{decode, storage};
use crate::DbPool;

pub struct SqlCrmService {
    pool: DbPool,
}

impl SqlCrmService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_pipelines(&self, only_default: bool) -> Result<Vec<Pipeline>, ServiceError> {
        let sql = if only_default {
            "SELECT id, name FROM pipelines WHERE is_default = 1 ORDER BY id ASC LIMIT 1"
        } else {
            "SELECT id, name FROM pipelines ORDER BY id ASC"
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await.map_err(storage)?;

        let mut pipelines = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(storage)?;
            let name: String = row.try_get("name").map_err(storage)?;

            let stage_rows = sqlx::query(
                "SELECT id, name, position FROM pipeline_stages
                 WHERE pipeline_id = ?
                 ORDER BY position ASC",
            )
            .bind(&id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

            let stages = stage_rows
                .into_iter()
                .map(stage_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            pipelines.push(Pipeline { id, name, stages });
        }
        Ok(pipelines)
    }
}

#[async_trait::async_trait]
impl CrmService for SqlCrmService {
    async fn snapshot(&self) -> Result<CrmSnapshot, ServiceError> {
        let company_rows =
            sqlx::query("SELECT id, name, email, phone, website FROM companies ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(storage)?;
        let companies = company_rows
            .into_iter()
            .map(company_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let contact_rows = sqlx::query(
            "SELECT id, first_name, last_name, email, phone, company_id
             FROM contacts
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        let contacts = contact_rows
            .into_iter()
            .map(contact_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let pipelines = self.load_pipelines(false).await?;

        Ok(CrmSnapshot { companies, contacts, pipelines })
    }

    async fn create_company(&self, company: &Company) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO companies (id, name, email, phone, website) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(company.email.as_deref())
        .bind(company.phone.as_deref())
        .bind(company.website.as_deref())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn create_contact(&self, contact: &Contact) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO contacts (id, first_name, last_name, email, phone, company_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&contact.id)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(contact.email.as_deref())
        .bind(contact.phone.as_deref())
        .bind(contact.company_id.as_deref())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn create_deal(&self, deal: &Deal) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO deals (id, name, amount, stage_id, pipeline_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&deal.id)
        .bind(&deal.name)
        .bind(deal.amount.as_deref())
        .bind(&deal.stage_id)
        .bind(&deal.pipeline_id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn update_entity(
        &self,
        kind: CrmKind,
        entity_id: &str,
        details: &CrmDetails,
    ) -> Result<(), ServiceError> {
        let outcome = match kind {
            CrmKind::Company => sqlx::query(
                "UPDATE companies SET
                    email = COALESCE(?, email),
                    phone = COALESCE(?, phone),
                    website = COALESCE(?, website)
                 WHERE id = ?",
            )
            .bind(details.email.as_deref())
            .bind(details.phone.as_deref())
            .bind(details.website.as_deref())
            .bind(entity_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?,
            CrmKind::Contact => sqlx::query(
                "UPDATE contacts SET
                    email = COALESCE(?, email),
                    phone = COALESCE(?, phone)
                 WHERE id = ?",
            )
            .bind(details.email.as_deref())
            .bind(details.phone.as_deref())
            .bind(entity_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?,
            CrmKind::Deal => sqlx::query(
                "UPDATE deals SET amount = COALESCE(?, amount) WHERE id = ?",
            )
            .bind(details.amount.as_deref())
            .bind(entity_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?,
        };

        if outcome.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("{} `{entity_id}`", kind_label(kind))));
        }
        Ok(())
    }

    async fn default_pipeline(&self) -> Result<Option<Pipeline>, ServiceError> {
        Ok(self.load_pipelines(true).await?.into_iter().next())
    }
}

fn kind_label(kind: CrmKind) -> &'static str {
    match kind {
        CrmKind::Company => "company",
        CrmKind::Contact => "contact",
        CrmKind::Deal => "deal",
    }
}

fn company_from_row(row: SqliteRow) -> Result<Company, ServiceError> {
    Ok(Company {
        id: row.try_get("id").map_err(storage)?,
        name: row.try_get("name").map_err(storage)?,
        email: row.try_get("email").map_err(storage)?,
        phone: row.try_get("phone").map_err(storage)?,
        website: row.try_get("website").map_err(storage)?,
    })
}

fn contact_from_row(row: SqliteRow) -> Result<Contact, ServiceError> {
    Ok(Contact {
        id: row.try_get("id").map_err(storage)?,
        first_name: row.try_get("first_name").map_err(storage)?,
        last_name: row.try_get("last_name").map_err(storage)?,
        email: row.try_get("email").map_err(storage)?,
        phone: row.try_get("phone").map_err(storage)?,
        company_id: row.try_get("company_id").map_err(storage)?,
    })
}

fn stage_from_row(row: SqliteRow) -> Result<PipelineStage, ServiceError> {
    let position: i64 = row.try_get("position").map_err(storage)?;
    Ok(PipelineStage {
        id: row.try_get("id").map_err(storage)?,
        name: row.try_get("name").map_err(storage)?,
        position: u32::try_from(position)
            .map_err(|_| decode(format!("negative stage position {position}")))?,
    })
}
