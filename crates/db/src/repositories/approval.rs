use sqlx::{sqlite::SqliteRow, Row};

use rately_core::domain::approval::{ApprovalId, ApprovalStatus, QuoteApproval};
use rately_core::domain::quote::QuoteId;
use rately_core::domain::ticket::UserId;

use super::{parse_optional_timestamp, ApprovalRepository, RepositoryError};
use crate::DbPool;

pub struct SqlApprovalRepository {
    pool: DbPool,
}

impl SqlApprovalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_approval(row: &SqliteRow) -> Result<QuoteApproval, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quote_id: String =
        row.try_get("quote_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved_by_user_id: Option<String> =
        row.try_get("approved_by_user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_role: Option<String> =
        row.try_get("user_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: Option<String> =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved_at: Option<String> =
        row.try_get("approved_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let status = ApprovalStatus::from_stable_key(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown approval status `{status}`")))?;

    Ok(QuoteApproval {
        id: ApprovalId(id),
        quote_id: QuoteId(quote_id),
        approved_by_user_id: approved_by_user_id.map(UserId),
        user_role,
        status,
        comment,
        approved_at: parse_optional_timestamp(approved_at, "approved_at")?,
    })
}

#[async_trait::async_trait]
impl ApprovalRepository for SqlApprovalRepository {
    async fn find_by_id(
        &self,
        id: &ApprovalId,
    ) -> Result<Option<QuoteApproval>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, quote_id, approved_by_user_id, user_role, status, comment, approved_at
             FROM quote_approvals WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_approval(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, approval: QuoteApproval) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quote_approvals (id, quote_id, approved_by_user_id, user_role,
                                          status, comment, approved_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 approved_by_user_id = excluded.approved_by_user_id,
                 user_role = excluded.user_role,
                 status = excluded.status,
                 comment = excluded.comment,
                 approved_at = excluded.approved_at",
        )
        .bind(&approval.id.0)
        .bind(&approval.quote_id.0)
        .bind(approval.approved_by_user_id.as_ref().map(|id| id.0.as_str()))
        .bind(&approval.user_role)
        .bind(approval.status.stable_key())
        .bind(&approval.comment)
        .bind(approval.approved_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_quote_id(
        &self,
        quote_id: &QuoteId,
    ) -> Result<Vec<QuoteApproval>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, quote_id, approved_by_user_id, user_role, status, comment, approved_at
             FROM quote_approvals WHERE quote_id = ? ORDER BY id",
        )
        .bind(&quote_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_approval).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use rately_core::domain::approval::{ApprovalId, ApprovalStatus, QuoteApproval};
    use rately_core::domain::lookup::{ConfidenceLevel, EffortLevel, Priority, QuoteCreator};
    use rately_core::domain::quote::{Quote, QuoteId};
    use rately_core::domain::ticket::{TicketId, UserId};

    use super::SqlApprovalRepository;
    use crate::repositories::{ApprovalRepository, QuoteRepository, SqlQuoteRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    /// Insert a parent quote record so that FK constraints are satisfied.
    async fn insert_quote(pool: &sqlx::SqlitePool, quote_id: &str, ticket_id: &str) {
        let repo = SqlQuoteRepository::new(pool.clone());
        let quote = Quote {
            id: QuoteId(quote_id.to_string()),
            ticket_id: TicketId(ticket_id.to_string()),
            version: 1,
            estimated_hours_minimum: Decimal::new(4, 0),
            estimated_hours_maximum: Decimal::new(8, 0),
            estimated_resolution_time: Decimal::new(6, 0),
            hourly_rate: Decimal::new(10_000, 2),
            estimated_cost: Decimal::new(90_000, 2),
            fixed_cost: None,
            final_cost: None,
            confidence_level: ConfidenceLevel::Medium,
            approval_id: None,
            suggested_priority: Priority::P2,
            effort_level: EffortLevel::Medium,
            created_by: QuoteCreator::System,
            created_at: Utc::now(),
        };
        repo.insert_quote(quote).await.expect("insert parent quote");
    }

    #[tokio::test]
    async fn save_and_find_pending_approval() {
        let pool = setup().await;
        insert_quote(&pool, "q-1", "t-1").await;

        let repo = SqlApprovalRepository::new(pool);
        let approval =
            QuoteApproval::pending(ApprovalId("apr-1".to_string()), QuoteId("q-1".to_string()));
        repo.save(approval.clone()).await.expect("save");

        let found = repo
            .find_by_id(&ApprovalId("apr-1".to_string()))
            .await
            .expect("query")
            .expect("exists");
        assert_eq!(found, approval);
        assert_eq!(found.status, ApprovalStatus::Pending);
    }

    #[tokio::test]
    async fn save_upserts_the_decision_fields() {
        let pool = setup().await;
        insert_quote(&pool, "q-1", "t-1").await;

        let repo = SqlApprovalRepository::new(pool);
        let pending =
            QuoteApproval::pending(ApprovalId("apr-1".to_string()), QuoteId("q-1".to_string()));
        repo.save(pending.clone()).await.expect("save pending");

        let now = Utc::now();
        let mut decided = pending;
        decided.status = ApprovalStatus::Approved;
        decided.approved_by_user_id = Some(UserId("u-mgr".to_string()));
        decided.user_role = Some("support_manager".to_string());
        decided.comment = Some("within budget".to_string());
        decided.approved_at = Some(now);
        repo.save(decided.clone()).await.expect("upsert decision");

        let found = repo
            .find_by_id(&ApprovalId("apr-1".to_string()))
            .await
            .expect("query")
            .expect("exists");
        assert_eq!(found, decided);
    }

    #[tokio::test]
    async fn find_by_quote_id_isolates_quotes() {
        let pool = setup().await;
        insert_quote(&pool, "q-1", "t-1").await;
        insert_quote(&pool, "q-2", "t-2").await;

        let repo = SqlApprovalRepository::new(pool);
        repo.save(QuoteApproval::pending(
            ApprovalId("apr-1".to_string()),
            QuoteId("q-1".to_string()),
        ))
        .await
        .expect("save 1");
        repo.save(QuoteApproval::pending(
            ApprovalId("apr-2".to_string()),
            QuoteId("q-2".to_string()),
        ))
        .await
        .expect("save 2");

        let results =
            repo.find_by_quote_id(&QuoteId("q-1".to_string())).await.expect("find by quote");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.0, "apr-1");
    }
}
