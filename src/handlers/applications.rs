// src/handlers/applications.rs

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::application::{Application, ApplicationStatus, FieldKey, Traveler},
    models::auth::UpdatePassportPayload,
    models::catalog::FieldType,
    services::response_service::{IncomingAnswer, SubmissionOutcome},
    services::upload_service::StoredFile,
    services::visibility_service::{ViewMode, VisibleField},
};

// =============================================================================
//  ÁREA 1: CICLO DE VIDA DA APLICAÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationPayload {
    pub product_id: Uuid,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Turismo 30 dias")]
    pub visa_type: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Normal")]
    pub processing_option: String,
}

// POST /api/applications
#[utoipa::path(
    post,
    path = "/api/applications",
    tag = "Applications",
    request_body = CreateApplicationPayload,
    responses(
        (status = 201, description = "Aplicação criada em rascunho", body = Application),
        (status = 400, description = "Combinação de visto/processamento inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_application(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let application = app_state
        .application_service
        .create_application(
            &app_state.db_pool,
            &user,
            payload.product_id,
            &payload.visa_type,
            &payload.processing_option,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(application)))
}

// GET /api/applications
#[utoipa::path(
    get,
    path = "/api/applications",
    tag = "Applications",
    responses(
        (status = 200, description = "Aplicações do cliente autenticado", body = Vec<Application>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_applications(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let applications = app_state
        .application_service
        .list_by_customer(&app_state.db_pool, user.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(applications)))
}

// GET /api/applications/{id}
#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 200, description = "Aplicação", body = Application),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_application(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(application_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let application = app_state
        .application_service
        .get_authorized(&app_state.db_pool, application_id, &user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(application)))
}

// DELETE /api/applications/{id}
#[utoipa::path(
    delete,
    path = "/api/applications/{id}",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 204, description = "Removida"),
        (status = 409, description = "Estado não permite remoção pelo cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_application(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(application_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .application_service
        .delete_application(&app_state.db_pool, application_id, &user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    pub status: ApplicationStatus,
}

// PATCH /api/admin/applications/{id}/status
// Escrever o status atual é no-op com sucesso (idempotente).
#[utoipa::path(
    patch,
    path = "/api/admin/applications/{id}/status",
    tag = "Admin",
    request_body = UpdateStatusPayload,
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 200, description = "Status atualizado (ou inalterado)", body = Application),
        (status = 409, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let application = app_state
        .application_service
        .update_status(&app_state.db_pool, application_id, payload.status)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(application)))
}

// =============================================================================
//  ÁREA 2: VIAJANTES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddTravelerPayload {
    #[validate(length(min = 2, message = "required"))]
    #[schema(example = "João da Silva")]
    pub full_name: String,
}

// POST /api/applications/{id}/travelers
#[utoipa::path(
    post,
    path = "/api/applications/{id}/travelers",
    tag = "Travelers",
    request_body = AddTravelerPayload,
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 201, description = "Viajante adicionado", body = Traveler)
    ),
    security(("api_jwt" = []))
)]
pub async fn add_traveler(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<AddTravelerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let traveler = app_state
        .application_service
        .add_traveler(&app_state.db_pool, application_id, &user, &payload.full_name)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(traveler)))
}

// GET /api/applications/{id}/travelers
#[utoipa::path(
    get,
    path = "/api/applications/{id}/travelers",
    tag = "Travelers",
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 200, description = "Viajantes 2..N (o requerente é o cliente)", body = Vec<Traveler>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_travelers(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(application_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let travelers = app_state
        .application_service
        .list_travelers(&app_state.db_pool, application_id, &user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(travelers)))
}

// PUT /api/applications/{id}/travelers/{traveler_id}/passport
#[utoipa::path(
    put,
    path = "/api/applications/{id}/travelers/{traveler_id}/passport",
    tag = "Travelers",
    request_body = UpdatePassportPayload,
    params(
        ("id" = Uuid, Path, description = "ID da aplicação"),
        ("traveler_id" = i32, Path, description = "ID do viajante")
    ),
    responses(
        (status = 200, description = "Passaporte do viajante atualizado", body = Traveler)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_traveler_passport(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((application_id, traveler_id)): Path<(Uuid, i32)>,
    Json(payload): Json<UpdatePassportPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let traveler = app_state
        .application_service
        .update_traveler_passport(
            &app_state.db_pool,
            application_id,
            traveler_id,
            &user,
            payload.passport_number,
            payload.passport_expiry_date,
            payload.residence_country,
            payload.has_schengen_visa,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(traveler)))
}

// =============================================================================
//  ÁREA 3: FORMULÁRIO DINÂMICO (resolver + respostas)
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldsQuery {
    pub traveler_id: Option<i32>,
    pub view: Option<ViewMode>,
}

// GET /api/applications/{id}/fields
// O resolver de visibilidade: o que mostrar para este escopo, nesta visão.
#[utoipa::path(
    get,
    path = "/api/applications/{id}/fields",
    tag = "Responses",
    params(
        ("id" = Uuid, Path, description = "ID da aplicação"),
        ("travelerId" = Option<i32>, Query, description = "Escopo: viajante (ausente = requerente)"),
        ("view" = Option<String>, Query, description = "user (padrão) ou admin")
    ),
    responses(
        (status = 200, description = "Campos visíveis com respostas resolvidas", body = Vec<VisibleField>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_fields_with_responses(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(application_id): Path<Uuid>,
    Query(query): Query<FieldsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // Checagem de dono antes de resolver qualquer coisa
    app_state
        .application_service
        .get_authorized(&app_state.db_pool, application_id, &user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    let mode = match query.view {
        Some(ViewMode::Admin) => {
            if !user.is_admin {
                return Err(AppError::AdminOnly.to_api_error(&locale, app_state.i18n_store));
            }
            ViewMode::Admin
        }
        Some(ViewMode::User) | None => ViewMode::User,
    };

    let fields = app_state
        .visibility_service
        .list_fields_with_responses(&app_state.db_pool, application_id, query.traveler_id, mode)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(fields)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponsesPayload {
    /// Escopo da submissão (ausente = requerente / nível da aplicação)
    pub traveler_id: Option<i32>,
    /// Chaves: id numérico (positivo/negativo) ou pseudo-chave de passaporte
    #[schema(value_type = Object)]
    pub responses: HashMap<String, IncomingAnswer>,
}

// POST /api/applications/{id}/responses
#[utoipa::path(
    post,
    path = "/api/applications/{id}/responses",
    tag = "Responses",
    request_body = SubmitResponsesPayload,
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 200, description = "Respostas gravadas; pedidos atendidos fechados", body = SubmissionOutcome),
        (status = 400, description = "Resposta inválida ou obrigatório ausente"),
        (status = 409, description = "Estado não aceita respostas")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_responses(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<SubmitResponsesPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = app_state
        .response_service
        .submit_responses(
            &app_state.db_pool,
            application_id,
            payload.traveler_id,
            payload.responses,
            &user,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(outcome)))
}

// =============================================================================
//  ÁREA 4: UPLOADS E DOCUMENTOS
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    /// Campo de upload que receberá o arquivo (id do catálogo ou ad hoc)
    pub field_id: String,
    pub traveler_id: Option<i32>,
}

// POST /api/applications/{id}/uploads
// Valida contra as restrições do campo e devolve a referência durável que a
// resposta deve carregar.
#[utoipa::path(
    post,
    path = "/api/applications/{id}/uploads",
    tag = "Responses",
    params(
        ("id" = Uuid, Path, description = "ID da aplicação"),
        ("fieldId" = String, Query, description = "ID do campo de upload"),
        ("travelerId" = Option<i32>, Query, description = "Escopo do campo ad hoc, se houver")
    ),
    responses(
        (status = 201, description = "Arquivo armazenado", body = StoredFile),
        (status = 400, description = "Arquivo viola as restrições do campo")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_file(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(application_id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |app_err: AppError| app_err.to_api_error(&locale, app_state.i18n_store);

    let application = app_state
        .application_service
        .get_authorized(&app_state.db_pool, application_id, &user)
        .await
        .map_err(to_api)?;

    let key = FieldKey::parse(&query.field_id).ok_or_else(|| {
        to_api(AppError::InvalidInput(format!(
            "id de campo inválido: '{}'",
            query.field_id
        )))
    })?;

    // Resolve a definição do campo (catálogo ou ad hoc)
    let def = match key {
        FieldKey::Field(id) if id > 0 => app_state
            .catalog_service
            .list_fields(&app_state.db_pool, application.product_id, true)
            .await
            .map_err(to_api)?
            .into_iter()
            .find(|f| f.id == id),
        FieldKey::Field(id) => application.find_adhoc(id).map(|f| f.as_definition()),
        FieldKey::Passport(_) => None,
    }
    .ok_or_else(|| to_api(AppError::NotFound(format!("campo {}", key))))?;

    if def.field_type != FieldType::Upload {
        return Err(to_api(AppError::InvalidInput(format!(
            "campo {} não é de upload",
            key
        ))));
    }

    // Lê o primeiro arquivo do multipart
    let field = multipart
        .next_field()
        .await
        .map_err(|e| to_api(AppError::InvalidInput(format!("multipart inválido: {}", e))))?
        .ok_or_else(|| to_api(AppError::InvalidInput("nenhum arquivo enviado".to_string())))?;

    let file_name = field
        .file_name()
        .map(|s| s.to_string())
        .ok_or_else(|| to_api(AppError::InvalidInput("arquivo sem nome".to_string())))?;

    let bytes = field
        .bytes()
        .await
        .map_err(|e| to_api(AppError::InvalidInput(format!("falha lendo o arquivo: {}", e))))?;

    let stored = app_state
        .upload_service
        .store_for_field(&def, &file_name, &bytes)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(stored)))
}

// GET /api/applications/{id}/summary.pdf
#[utoipa::path(
    get,
    path = "/api/applications/{id}/summary.pdf",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 200, description = "PDF de resumo da aplicação", content_type = "application/pdf")
    ),
    security(("api_jwt" = []))
)]
pub async fn summary_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(application_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pdf = app_state
        .document_service
        .generate_summary_pdf(&app_state.db_pool, application_id, &user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok(([(header::CONTENT_TYPE, "application/pdf")], pdf))
}
