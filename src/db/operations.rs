use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::RateLimitRecord;

pub struct RateLimitOperations;

impl RateLimitOperations {
    pub async fn get_record(
        pool: &PgPool,
        key: &str,
    ) -> Result<Option<RateLimitRecord>, sqlx::Error> {
        sqlx::query_as::<_, RateLimitRecord>(
            "SELECT key, attempts, updated_at FROM rate_limits WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    /// Insert a first-attempt record unless one already exists.
    /// Returns `true` when this call inserted the row.
    pub async fn create_if_absent(
        pool: &PgPool,
        record: &RateLimitRecord,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO rate_limits (key, attempts, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(&record.key)
        .bind(record.attempts)
        .bind(record.updated_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Conditional update: only applies if the row still holds `expected`.
    pub async fn compare_and_swap(
        pool: &PgPool,
        expected: &RateLimitRecord,
        next: &RateLimitRecord,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE rate_limits
            SET attempts = $2, updated_at = $3
            WHERE key = $1 AND attempts = $4 AND updated_at = $5
            "#,
        )
        .bind(&expected.key)
        .bind(next.attempts)
        .bind(next.updated_at)
        .bind(expected.attempts)
        .bind(expected.updated_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE updated_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
