use sqlx::{sqlite::SqliteRow, Row};

use rately_core::domain::approval::ApprovalId;
use rately_core::domain::lookup::{ConfidenceLevel, EffortLevel, Priority, QuoteCreator};
use rately_core::domain::quote::{Quote, QuoteId};
use rately_core::domain::ticket::TicketId;

use super::{
    parse_decimal, parse_optional_decimal, parse_timestamp, QuoteRepository, RepositoryError,
};
use crate::DbPool;

const VERSION_CONFLICT_RETRIES: u32 = 3;

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Version allocation and insert happen in one statement, so sqlite's
    /// single-writer discipline makes the sequence gapless.
    async fn try_insert(&self, quote: &Quote) -> Result<Quote, sqlx::Error> {
        sqlx::query(
            "INSERT INTO quotes (id, ticket_id, version, estimated_hours_minimum,
                                 estimated_hours_maximum, estimated_resolution_time,
                                 hourly_rate, estimated_cost, fixed_cost, final_cost,
                                 confidence_level, approval_id, suggested_priority,
                                 effort_level, created_by, created_at)
             VALUES (?, ?,
                     (SELECT COALESCE(MAX(version), 0) + 1 FROM quotes WHERE ticket_id = ?),
                     ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.id.0)
        .bind(&quote.ticket_id.0)
        .bind(&quote.ticket_id.0)
        .bind(quote.estimated_hours_minimum.to_string())
        .bind(quote.estimated_hours_maximum.to_string())
        .bind(quote.estimated_resolution_time.to_string())
        .bind(quote.hourly_rate.to_string())
        .bind(quote.estimated_cost.to_string())
        .bind(quote.fixed_cost.map(|d| d.to_string()))
        .bind(quote.final_cost.map(|d| d.to_string()))
        .bind(quote.confidence_level.stable_key())
        .bind(quote.approval_id.as_ref().map(|id| id.0.as_str()))
        .bind(quote.suggested_priority.stable_key())
        .bind(quote.effort_level.stable_key())
        .bind(quote.created_by.stable_key())
        .bind(quote.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let version: i64 = sqlx::query("SELECT version FROM quotes WHERE id = ?")
            .bind(&quote.id.0)
            .fetch_one(&self.pool)
            .await?
            .get("version");

        Ok(Quote { version: version as u32, ..quote.clone() })
    }
}

fn is_version_conflict(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn decode<T>(
    result: Result<T, rately_core::domain::lookup::UnknownLookupKey>,
) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_quote(row: &SqliteRow) -> Result<Quote, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let ticket_id: String =
        row.try_get("ticket_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let version: i64 =
        row.try_get("version").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let hours_min: String = row
        .try_get("estimated_hours_minimum")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let hours_max: String = row
        .try_get("estimated_hours_maximum")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let resolution_time: String = row
        .try_get("estimated_resolution_time")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let hourly_rate: String =
        row.try_get("hourly_rate").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let estimated_cost: String =
        row.try_get("estimated_cost").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let fixed_cost: Option<String> =
        row.try_get("fixed_cost").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let final_cost: Option<String> =
        row.try_get("final_cost").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let confidence_level: String =
        row.try_get("confidence_level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approval_id: Option<String> =
        row.try_get("approval_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let suggested_priority: String =
        row.try_get("suggested_priority").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effort_level: String =
        row.try_get("effort_level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_by: String =
        row.try_get("created_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Quote {
        id: QuoteId(id),
        ticket_id: TicketId(ticket_id),
        version: version as u32,
        estimated_hours_minimum: parse_decimal(&hours_min, "estimated_hours_minimum")?,
        estimated_hours_maximum: parse_decimal(&hours_max, "estimated_hours_maximum")?,
        estimated_resolution_time: parse_decimal(&resolution_time, "estimated_resolution_time")?,
        hourly_rate: parse_decimal(&hourly_rate, "hourly_rate")?,
        estimated_cost: parse_decimal(&estimated_cost, "estimated_cost")?,
        fixed_cost: parse_optional_decimal(fixed_cost, "fixed_cost")?,
        final_cost: parse_optional_decimal(final_cost, "final_cost")?,
        confidence_level: decode(ConfidenceLevel::from_stable_key(&confidence_level))?,
        approval_id: approval_id.map(ApprovalId),
        suggested_priority: decode(Priority::from_stable_key(&suggested_priority))?,
        effort_level: decode(EffortLevel::from_stable_key(&effort_level))?,
        created_by: decode(QuoteCreator::from_stable_key(&created_by))?,
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

const QUOTE_COLUMNS: &str = "id, ticket_id, version, estimated_hours_minimum,
    estimated_hours_maximum, estimated_resolution_time, hourly_rate, estimated_cost,
    fixed_cost, final_cost, confidence_level, approval_id, suggested_priority,
    effort_level, created_by, created_at";

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn insert_quote(&self, quote: Quote) -> Result<Quote, RepositoryError> {
        let mut attempt = 0;
        loop {
            match self.try_insert(&quote).await {
                Ok(stored) => return Ok(stored),
                Err(error) if is_version_conflict(&error) => {
                    attempt += 1;
                    if attempt >= VERSION_CONFLICT_RETRIES {
                        return Err(RepositoryError::Conflict(format!(
                            "version allocation for ticket `{}` lost {attempt} races",
                            quote.ticket_id.0
                        )));
                    }
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn update_quote(&self, quote: &Quote) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE quotes SET approval_id = ?, final_cost = ? WHERE id = ?",
        )
        .bind(quote.approval_id.as_ref().map(|id| id.0.as_str()))
        .bind(quote.final_cost.map(|d| d.to_string()))
        .bind(&quote.id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_quote(r)?)),
            None => Ok(None),
        }
    }

    async fn find_latest(&self, ticket_id: &TicketId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes
             WHERE ticket_id = ?
             ORDER BY version DESC
             LIMIT 1"
        ))
        .bind(&ticket_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_quote(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_ticket(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes
             WHERE ticket_id = ?
             ORDER BY version ASC"
        ))
        .bind(&ticket_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_quote).collect()
    }
}
