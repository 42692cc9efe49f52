// src/db/product_repo.rs

use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{FieldDefinition, ProcessingOption, VisaProduct, VisaTypeOption},
};

const PRODUCT_COLUMNS: &str = "id, name, country_code, visa_types, processing_options, \
     max_field_id, is_active, created_at, updated_at";

const FIELD_COLUMNS: &str = "product_id, id, field_type, question, placeholder, is_required, \
     display_order, options, allowed_file_types, max_file_size_mb, min_length, max_length, \
     is_active";

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PRODUTOS
    // =========================================================================

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        name: &str,
        country_code: &str,
        visa_types: &[VisaTypeOption],
        processing_options: &[ProcessingOption],
    ) -> Result<VisaProduct, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO visa_products (name, country_code, visa_types, processing_options) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {PRODUCT_COLUMNS}"
        );

        let product = sqlx::query_as::<_, VisaProduct>(&sql)
            .bind(name)
            .bind(country_code)
            .bind(Json(visa_types))
            .bind(Json(processing_options))
            .fetch_one(executor)
            .await?;

        Ok(product)
    }

    pub async fn list_products<'e, E>(
        &self,
        executor: E,
        include_inactive: bool,
    ) -> Result<Vec<VisaProduct>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM visa_products \
             WHERE ($1 OR is_active) \
             ORDER BY country_code, name"
        );

        let products = sqlx::query_as::<_, VisaProduct>(&sql)
            .bind(include_inactive)
            .fetch_all(executor)
            .await?;

        Ok(products)
    }

    pub async fn get_product<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<Option<VisaProduct>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM visa_products WHERE id = $1");

        let product = sqlx::query_as::<_, VisaProduct>(&sql)
            .bind(product_id)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    /// Trava a linha do produto: a alocação de id de campo lê a marca d'água
    /// e insere na mesma transação.
    pub async fn get_product_for_update<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<Option<VisaProduct>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM visa_products WHERE id = $1 FOR UPDATE");

        let product = sqlx::query_as::<_, VisaProduct>(&sql)
            .bind(product_id)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    pub async fn set_max_field_id<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        max_field_id: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE visa_products SET max_field_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .bind(max_field_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    // =========================================================================
    //  CATÁLOGO DE CAMPOS
    // =========================================================================

    pub async fn insert_field<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        def: &FieldDefinition,
    ) -> Result<FieldDefinition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO product_fields ( \
                product_id, id, field_type, question, placeholder, is_required, \
                display_order, options, allowed_file_types, max_file_size_mb, \
                min_length, max_length, is_active \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {FIELD_COLUMNS}"
        );

        let field = sqlx::query_as::<_, FieldDefinition>(&sql)
            .bind(product_id)
            .bind(def.id)
            .bind(def.field_type)
            .bind(&def.question)
            .bind(&def.placeholder)
            .bind(def.is_required)
            .bind(def.display_order)
            .bind(&def.options)
            .bind(&def.allowed_file_types)
            .bind(def.max_file_size_mb)
            .bind(def.min_length)
            .bind(def.max_length)
            .bind(def.is_active)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::UniqueConstraintViolation(format!(
                            "campo {} já existe no produto",
                            def.id
                        ));
                    }
                }
                e.into()
            })?;

        Ok(field)
    }

    /// Atualização da definição inteira (o serviço já aplicou o patch).
    pub async fn update_field<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        def: &FieldDefinition,
    ) -> Result<FieldDefinition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE product_fields SET \
                field_type = $3, question = $4, placeholder = $5, is_required = $6, \
                display_order = $7, options = $8, allowed_file_types = $9, \
                max_file_size_mb = $10, min_length = $11, max_length = $12, is_active = $13 \
             WHERE product_id = $1 AND id = $2 \
             RETURNING {FIELD_COLUMNS}"
        );

        let field = sqlx::query_as::<_, FieldDefinition>(&sql)
            .bind(product_id)
            .bind(def.id)
            .bind(def.field_type)
            .bind(&def.question)
            .bind(&def.placeholder)
            .bind(def.is_required)
            .bind(def.display_order)
            .bind(&def.options)
            .bind(&def.allowed_file_types)
            .bind(def.max_file_size_mb)
            .bind(def.min_length)
            .bind(def.max_length)
            .bind(def.is_active)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("campo {} do produto", def.id)))?;

        Ok(field)
    }

    /// Remove a definição. Respostas históricas que referenciam o id ficam
    /// intactas nos mapas das aplicações.
    pub async fn delete_field<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        field_id: i32,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM product_fields WHERE product_id = $1 AND id = $2")
            .bind(product_id)
            .bind(field_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn get_field<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        field_id: i32,
    ) -> Result<Option<FieldDefinition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql =
            format!("SELECT {FIELD_COLUMNS} FROM product_fields WHERE product_id = $1 AND id = $2");

        let field = sqlx::query_as::<_, FieldDefinition>(&sql)
            .bind(product_id)
            .bind(field_id)
            .fetch_optional(executor)
            .await?;

        Ok(field)
    }

    /// Campos na ordem de criação (id crescente). A ordenação por
    /// display_order — e o reparo de lotes invertidos — acontece no serviço.
    pub async fn list_fields<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<FieldDefinition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {FIELD_COLUMNS} FROM product_fields \
             WHERE product_id = $1 AND ($2 OR is_active) \
             ORDER BY id ASC"
        );

        let fields = sqlx::query_as::<_, FieldDefinition>(&sql)
            .bind(product_id)
            .bind(include_inactive)
            .fetch_all(executor)
            .await?;

        Ok(fields)
    }
}
