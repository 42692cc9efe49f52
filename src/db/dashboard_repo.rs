// src/db/dashboard_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::dashboard::{RecentApplication, StatusCount},
};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn total_applications<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applications")
            .fetch_one(executor)
            .await?;

        Ok(total)
    }

    pub async fn status_counts<'e, E>(&self, executor: E) -> Result<Vec<StatusCount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let counts = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count \
             FROM applications \
             GROUP BY status \
             ORDER BY count DESC",
        )
        .fetch_all(executor)
        .await?;

        Ok(counts)
    }

    /// Aplicações com pelo menos um pedido de reenvio ainda aberto
    /// (lista nova OU campos legados de pedido único).
    pub async fn awaiting_resubmission<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM applications \
             WHERE status IN ('resubmission', 'additional_info_required') \
               AND ( \
                 EXISTS ( \
                     SELECT 1 FROM jsonb_array_elements(resubmission_requests) AS req \
                     WHERE req->>'fulfilledAt' IS NULL \
                 ) \
                 OR requested_field_ids IS NOT NULL \
               )",
        )
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    pub async fn recent<'e, E>(
        &self,
        executor: E,
        limit: i64,
    ) -> Result<Vec<RecentApplication>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let recent = sqlx::query_as::<_, RecentApplication>(
            "SELECT a.id, a.display_id, u.full_name AS customer_name, a.status, a.updated_at \
             FROM applications a \
             INNER JOIN users u ON u.id = a.customer_id \
             ORDER BY a.updated_at DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(recent)
    }
}
