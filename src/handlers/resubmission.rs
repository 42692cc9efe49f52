// src/handlers/resubmission.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::application::{AdHocField, Application, ResubmissionRequest},
    services::resubmission_service::{NewAdHocFieldInput, ResubmissionRequestInput},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestResubmissionPayload {
    /// Um pedido por alvo; viajantes diferentes são rastreados e atendidos
    /// de forma independente
    pub requests: Vec<ResubmissionRequestInput>,
}

// POST /api/admin/applications/{id}/resubmissions
#[utoipa::path(
    post,
    path = "/api/admin/applications/{id}/resubmissions",
    tag = "Resubmission",
    request_body = RequestResubmissionPayload,
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 200, description = "Pedidos abertos; aplicação em resubmission", body = Application),
        (status = 409, description = "Estado não permite pedido de reenvio")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_resubmission(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<RequestResubmissionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let application = app_state
        .resubmission_service
        .request_resubmission(&app_state.db_pool, application_id, payload.requests)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(application)))
}

// GET /api/applications/{id}/resubmissions
// Pedidos em aberto (o legado aparece sintetizado como um pedido).
#[utoipa::path(
    get,
    path = "/api/applications/{id}/resubmissions",
    tag = "Resubmission",
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 200, description = "Pedidos de reenvio em aberto", body = Vec<ResubmissionRequest>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_active_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(application_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // Cliente só enxerga os pedidos da própria aplicação
    app_state
        .application_service
        .get_authorized(&app_state.db_pool, application_id, &user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    let requests = app_state
        .resubmission_service
        .get_active_requests(&app_state.db_pool, application_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(requests)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddAdHocFieldsPayload {
    /// Ausente = escopo da aplicação; presente = um viajante específico
    pub traveler_id: Option<i32>,
    pub fields: Vec<NewAdHocFieldInput>,
}

// POST /api/admin/applications/{id}/adhoc-fields
#[utoipa::path(
    post,
    path = "/api/admin/applications/{id}/adhoc-fields",
    tag = "Resubmission",
    request_body = AddAdHocFieldsPayload,
    params(("id" = Uuid, Path, description = "ID da aplicação")),
    responses(
        (status = 201, description = "Campos ad hoc criados com ids negativos", body = Vec<AdHocField>)
    ),
    security(("api_jwt" = []))
)]
pub async fn add_adhoc_fields(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<AddAdHocFieldsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = app_state
        .resubmission_service
        .add_adhoc_fields(
            &app_state.db_pool,
            application_id,
            payload.traveler_id,
            payload.fields,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(fields)))
}

// DELETE /api/admin/applications/{id}/adhoc-fields/{field_id}
// Remove do registro; respostas já gravadas com o id não são invalidadas.
#[utoipa::path(
    delete,
    path = "/api/admin/applications/{id}/adhoc-fields/{field_id}",
    tag = "Resubmission",
    params(
        ("id" = Uuid, Path, description = "ID da aplicação"),
        ("field_id" = i32, Path, description = "ID (negativo) do campo ad hoc")
    ),
    responses(
        (status = 204, description = "Campo removido"),
        (status = 404, description = "Campo não encontrado no registro")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_adhoc_field(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((application_id, field_id)): Path<(Uuid, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .resubmission_service
        .remove_adhoc_field(&app_state.db_pool, application_id, field_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
