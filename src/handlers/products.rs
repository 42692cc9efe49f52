// src/handlers/products.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::catalog::{
        FieldDefinition, FieldType, ProcessingOption, VisaProduct, VisaTypeOption,
    },
    services::catalog_service::FieldPatch,
};

// =============================================================================
//  ÁREA 1: PRODUTOS DE VISTO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 2, message = "required"))]
    #[schema(example = "Visto Índia e-Tourist")]
    pub name: String,

    #[validate(length(equal = 2, message = "invalid_country_code"))]
    #[schema(example = "IN")]
    pub country_code: String,

    pub visa_types: Vec<VisaTypeOption>,
    pub processing_options: Vec<ProcessingOption>,
}

// POST /api/admin/products
#[utoipa::path(
    post,
    path = "/api/admin/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = VisaProduct),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .create_product(
            &app_state.db_pool,
            &payload.name,
            &payload.country_code,
            &payload.visa_types,
            &payload.processing_options,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    params(
        ("includeInactive" = Option<bool>, Query, description = "Inclui produtos desativados")
    ),
    responses(
        (status = 200, description = "Lista de produtos", body = Vec<VisaProduct>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .catalog_service
        .list_products(&app_state.db_pool, query.include_inactive)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(products)))
}

// =============================================================================
//  ÁREA 2: CATÁLOGO DE CAMPOS DO PRODUTO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFieldPayload {
    #[schema(example = "text")]
    pub field_type: FieldType,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Qual o motivo da viagem?")]
    pub question: String,

    pub placeholder: Option<String>,

    #[serde(default)]
    #[schema(example = true)]
    pub is_required: bool,

    #[serde(default)]
    pub display_order: i32,

    #[schema(example = json!(["Turismo", "Negócios"]))]
    pub options: Option<Vec<String>>,

    #[schema(example = json!(["jpg", "png", "pdf"]))]
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size_mb: Option<i32>,

    pub min_length: Option<i32>,
    pub max_length: Option<i32>,
}

impl CreateFieldPayload {
    fn into_definition(self) -> FieldDefinition {
        FieldDefinition {
            product_id: None,
            id: 0, // alocado pelo serviço a partir da marca d'água
            field_type: self.field_type,
            question: self.question,
            placeholder: self.placeholder,
            is_required: self.is_required,
            display_order: self.display_order,
            options: self.options,
            allowed_file_types: self.allowed_file_types,
            max_file_size_mb: self.max_file_size_mb,
            min_length: self.min_length,
            max_length: self.max_length,
            is_active: true,
        }
    }
}

// POST /api/admin/products/{id}/fields
#[utoipa::path(
    post,
    path = "/api/admin/products/{id}/fields",
    tag = "Products",
    request_body = CreateFieldPayload,
    params(
        ("id" = Uuid, Path, description = "ID do produto")
    ),
    responses(
        (status = 201, description = "Campo criado com id estável", body = FieldDefinition),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_field(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<CreateFieldPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let field = app_state
        .catalog_service
        .add_field(&app_state.db_pool, product_id, payload.into_definition())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(field)))
}

// GET /api/products/{id}/fields
#[utoipa::path(
    get,
    path = "/api/products/{id}/fields",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("includeInactive" = Option<bool>, Query, description = "Inclui campos desativados")
    ),
    responses(
        (status = 200, description = "Catálogo ordenado do produto", body = Vec<FieldDefinition>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_fields(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(product_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = app_state
        .catalog_service
        .list_fields(&app_state.db_pool, product_id, query.include_inactive)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(fields)))
}

// PATCH /api/admin/products/{id}/fields/{field_id}
#[utoipa::path(
    patch,
    path = "/api/admin/products/{id}/fields/{field_id}",
    tag = "Products",
    request_body = FieldPatch,
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("field_id" = i32, Path, description = "ID do campo")
    ),
    responses(
        (status = 200, description = "Campo atualizado", body = FieldDefinition),
        (status = 404, description = "Campo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_field(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((product_id, field_id)): Path<(Uuid, i32)>,
    Json(patch): Json<FieldPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let field = app_state
        .catalog_service
        .update_field(&app_state.db_pool, product_id, field_id, patch)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(field)))
}

// DELETE /api/admin/products/{id}/fields/{field_id}
// O id nunca volta ao pool; respostas históricas continuam recuperáveis.
#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}/fields/{field_id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("field_id" = i32, Path, description = "ID do campo")
    ),
    responses(
        (status = 204, description = "Campo removido"),
        (status = 404, description = "Campo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_field(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((product_id, field_id)): Path<(Uuid, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .catalog_service
        .delete_field(&app_state.db_pool, product_id, field_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
