// src/db/user_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::User};

const USER_COLUMNS: &str = "id, full_name, email, password_hash, is_admin, \
     passport_number, passport_expiry_date, residence_country, has_schengen_visa, \
     created_at, updated_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        full_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO users (full_name, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(full_name)
            .bind(email)
            .bind(password_hash)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                // Tratamento de erro de chave duplicada (e-mail único)
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::EmailAlreadyExists;
                    }
                }
                e.into()
            })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Grava os atributos estruturados de passaporte do cliente (Viajante 1).
    /// O espelhamento no mapa de respostas é responsabilidade do serviço, na
    /// mesma transação.
    pub async fn update_passport<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        passport_number: Option<&str>,
        passport_expiry_date: Option<NaiveDate>,
        residence_country: Option<&str>,
        has_schengen_visa: Option<bool>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE users SET \
                passport_number = COALESCE($2, passport_number), \
                passport_expiry_date = COALESCE($3, passport_expiry_date), \
                residence_country = COALESCE($4, residence_country), \
                has_schengen_visa = COALESCE($5, has_schengen_visa), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(passport_number)
            .bind(passport_expiry_date)
            .bind(residence_country)
            .bind(has_schengen_visa)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("usuário {}", user_id)))?;

        Ok(user)
    }
}
