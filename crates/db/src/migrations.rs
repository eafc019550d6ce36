use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies pending migrations and reports the latest applied version,
/// or 0 on a database with no migrations recorded.
pub async fn run_pending(pool: &DbPool) -> Result<i64, MigrateError> {
    MIGRATOR.run(pool).await?;
    let version =
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations")
            .fetch_one(pool)
            .await?;
    Ok(version)
}

/// Highest migration version this binary ships.
pub fn latest_version() -> i64 {
    MIGRATOR.migrations.iter().map(|migration| migration.version).max().unwrap_or(0)
}

/// Latest applied version, or `None` when no migration has run (including
/// a database where the migrations table does not exist yet).
pub async fn applied_version(pool: &DbPool) -> Option<i64> {
    sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(version) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_TABLES: &[&str] = &[
        "rate_profiles",
        "calculation_rules",
        "effort_levels",
        "sla_policies",
        "quotes",
        "quote_approvals",
    ];

    async fn managed_table_count(pool: &sqlx::SqlitePool) -> usize {
        sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await
            .expect("load schema objects")
            .into_iter()
            .filter(|row| MANAGED_TABLES.contains(&row.get::<String, _>("name").as_str()))
            .count()
    }

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        let version = run_pending(&pool).await.expect("run migrations");

        assert_eq!(version, 1);
        assert_eq!(managed_table_count(&pool).await, MANAGED_TABLES.len());
    }

    #[tokio::test]
    async fn applied_version_tracks_the_shipped_baseline() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        assert_eq!(super::applied_version(&pool).await, None);

        run_pending(&pool).await.expect("run migrations");
        assert_eq!(super::applied_version(&pool).await, Some(super::latest_version()));
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        assert_eq!(managed_table_count(&pool).await, 0);

        run_pending(&pool).await.expect("re-run migrations");
        assert_eq!(managed_table_count(&pool).await, MANAGED_TABLES.len());
    }
}
