// src/services/dashboard_service.rs

use sqlx::{Acquire, Postgres};

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::DashboardSummary,
};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn get_summary<'e, E>(&self, executor: E) -> Result<DashboardSummary, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let total_applications = self.repo.total_applications(&mut *conn).await?;
        let by_status = self.repo.status_counts(&mut *conn).await?;
        let awaiting_resubmission = self.repo.awaiting_resubmission(&mut *conn).await?;
        let recent = self.repo.recent(&mut *conn, 10).await?;

        Ok(DashboardSummary {
            total_applications,
            by_status,
            awaiting_resubmission,
            recent,
        })
    }
}
