// src/models/dashboard.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::application::ApplicationStatus;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentApplication {
    pub id: Uuid,
    pub display_id: i32,
    pub customer_name: String,
    pub status: ApplicationStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_applications: i64,
    pub by_status: Vec<StatusCount>,
    // Aplicações com pelo menos um pedido de reenvio em aberto
    pub awaiting_resubmission: i64,
    pub recent: Vec<RecentApplication>,
}
