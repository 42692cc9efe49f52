// src/db/application_repo.rs

use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::application::{Application, ApplicationStatus},
};

const APPLICATION_COLUMNS: &str = "id, display_id, customer_id, product_id, visa_type, \
     processing_option, status, adhoc_fields, min_adhoc_field_id, resubmission_requests, \
     resubmission_target, resubmission_traveler_id, requested_field_ids, resubmission_note, \
     form_responses, created_at, updated_at";

#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_application<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        product_id: Uuid,
        visa_type: &str,
        processing_option: &str,
    ) -> Result<Application, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO applications (customer_id, product_id, visa_type, processing_option) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {APPLICATION_COLUMNS}"
        );

        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(customer_id)
            .bind(product_id)
            .bind(visa_type)
            .bind(processing_option)
            .fetch_one(executor)
            .await?;

        Ok(application)
    }

    pub async fn get_by_id<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
    ) -> Result<Option<Application>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1");

        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(application_id)
            .fetch_optional(executor)
            .await?;

        Ok(application)
    }

    /// Trava a raiz do agregado. Toda mutação do workflow (submissão de
    /// respostas, pedido de reenvio, fulfillment) passa por aqui para que
    /// submissões concorrentes de viajantes diferentes não corram na lista
    /// de pedidos nem nas marcas d'água.
    pub async fn get_for_update<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
    ) -> Result<Option<Application>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql =
            format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1 FOR UPDATE");

        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(application_id)
            .fetch_optional(executor)
            .await?;

        Ok(application)
    }

    pub async fn list_by_customer<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Vec<Application>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE customer_id = $1 \
             ORDER BY created_at DESC"
        );

        let applications = sqlx::query_as::<_, Application>(&sql)
            .bind(customer_id)
            .fetch_all(executor)
            .await?;

        Ok(applications)
    }

    /// Persiste o estado do workflow inteiro de uma vez: status, registro
    /// ad hoc, marca d'água, lista de pedidos, campos legados e o mapa de
    /// respostas da aplicação.
    pub async fn save_workflow_state<'e, E>(
        &self,
        executor: E,
        app: &Application,
    ) -> Result<Application, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE applications SET \
                status = $2, \
                adhoc_fields = $3, \
                min_adhoc_field_id = $4, \
                resubmission_requests = $5, \
                resubmission_target = $6, \
                resubmission_traveler_id = $7, \
                requested_field_ids = $8, \
                resubmission_note = $9, \
                form_responses = $10, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {APPLICATION_COLUMNS}"
        );

        let saved = sqlx::query_as::<_, Application>(&sql)
            .bind(app.id)
            .bind(app.status)
            .bind(Json(&*app.adhoc_fields))
            .bind(app.min_adhoc_field_id)
            .bind(Json(&*app.resubmission_requests))
            .bind(&app.resubmission_target)
            .bind(app.resubmission_traveler_id)
            .bind(&app.requested_field_ids)
            .bind(&app.resubmission_note)
            .bind(Json(&*app.form_responses))
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", app.id)))?;

        Ok(saved)
    }

    /// Escrita simples de status (usada pelas transições administrativas).
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE applications SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(application_id)
            .bind(status)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn delete<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(application_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
