// src/db/traveler_repo.rs

use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::application::Traveler};

const TRAVELER_COLUMNS: &str = "id, application_id, full_name, passport_number, \
     passport_expiry_date, residence_country, has_schengen_visa, form_responses, \
     created_at, updated_at";

#[derive(Clone)]
pub struct TravelerRepository {
    pool: PgPool,
}

impl TravelerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        full_name: &str,
    ) -> Result<Traveler, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO travelers (application_id, full_name) \
             VALUES ($1, $2) \
             RETURNING {TRAVELER_COLUMNS}"
        );

        let traveler = sqlx::query_as::<_, Traveler>(&sql)
            .bind(application_id)
            .bind(full_name)
            .fetch_one(executor)
            .await?;

        Ok(traveler)
    }

    pub async fn list_by_application<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
    ) -> Result<Vec<Traveler>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {TRAVELER_COLUMNS} FROM travelers \
             WHERE application_id = $1 \
             ORDER BY id ASC"
        );

        let travelers = sqlx::query_as::<_, Traveler>(&sql)
            .bind(application_id)
            .fetch_all(executor)
            .await?;

        Ok(travelers)
    }

    pub async fn get<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        traveler_id: i32,
    ) -> Result<Option<Traveler>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {TRAVELER_COLUMNS} FROM travelers WHERE application_id = $1 AND id = $2"
        );

        let traveler = sqlx::query_as::<_, Traveler>(&sql)
            .bind(application_id)
            .bind(traveler_id)
            .fetch_optional(executor)
            .await?;

        Ok(traveler)
    }

    /// Trava a linha do viajante junto com a da aplicação na mesma transação.
    pub async fn get_for_update<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        traveler_id: i32,
    ) -> Result<Option<Traveler>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {TRAVELER_COLUMNS} FROM travelers \
             WHERE application_id = $1 AND id = $2 FOR UPDATE"
        );

        let traveler = sqlx::query_as::<_, Traveler>(&sql)
            .bind(application_id)
            .bind(traveler_id)
            .fetch_optional(executor)
            .await?;

        Ok(traveler)
    }

    /// Grava o mapa de respostas e os atributos estruturados de passaporte do
    /// viajante de uma vez (as duas representações andam juntas).
    pub async fn save_responses<'e, E>(
        &self,
        executor: E,
        traveler: &Traveler,
    ) -> Result<Traveler, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE travelers SET \
                form_responses = $3, \
                passport_number = $4, \
                passport_expiry_date = $5, \
                residence_country = $6, \
                has_schengen_visa = $7, \
                updated_at = NOW() \
             WHERE application_id = $1 AND id = $2 \
             RETURNING {TRAVELER_COLUMNS}"
        );

        let saved = sqlx::query_as::<_, Traveler>(&sql)
            .bind(traveler.application_id)
            .bind(traveler.id)
            .bind(Json(&*traveler.form_responses))
            .bind(&traveler.passport_number)
            .bind(traveler.passport_expiry_date)
            .bind(&traveler.residence_country)
            .bind(traveler.has_schengen_visa)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("viajante {}", traveler.id)))?;

        Ok(saved)
    }
}
