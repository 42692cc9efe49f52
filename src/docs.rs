// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::update_my_passport,

        // --- Products & Catálogo ---
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::add_field,
        handlers::products::list_fields,
        handlers::products::update_field,
        handlers::products::delete_field,

        // --- Applications ---
        handlers::applications::create_application,
        handlers::applications::list_my_applications,
        handlers::applications::get_application,
        handlers::applications::delete_application,
        handlers::applications::update_status,
        handlers::applications::summary_pdf,

        // --- Travelers ---
        handlers::applications::add_traveler,
        handlers::applications::list_travelers,
        handlers::applications::update_traveler_passport,

        // --- Responses / Formulário dinâmico ---
        handlers::applications::list_fields_with_responses,
        handlers::applications::submit_responses,
        handlers::applications::upload_file,

        // --- Resubmission ---
        handlers::resubmission::request_resubmission,
        handlers::resubmission::get_active_requests,
        handlers::resubmission::add_adhoc_fields,
        handlers::resubmission::remove_adhoc_field,

        // --- Admin / Dashboard ---
        handlers::dashboard::get_summary,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::UpdatePassportPayload,

            // --- Catálogo ---
            models::catalog::FieldType,
            models::catalog::FieldDefinition,
            models::catalog::VisaTypeOption,
            models::catalog::ProcessingOption,
            models::catalog::VisaProduct,

            // --- Aplicações ---
            models::application::ApplicationStatus,
            models::application::Answer,
            models::application::AdHocField,
            models::application::RequestTarget,
            models::application::ResubmissionRequest,
            models::application::Application,
            models::application::Traveler,

            // --- Dashboard ---
            models::dashboard::StatusCount,
            models::dashboard::RecentApplication,
            models::dashboard::DashboardSummary,

            // --- Serviços (entradas/saídas) ---
            services::catalog_service::FieldPatch,
            services::resubmission_service::NewAdHocFieldInput,
            services::resubmission_service::ResubmissionRequestInput,
            services::response_service::IncomingAnswer,
            services::response_service::SubmissionOutcome,
            services::upload_service::StoredFile,
            services::visibility_service::ViewMode,
            services::visibility_service::FieldSource,
            services::visibility_service::VisibleField,

            // --- Payloads ---
            handlers::products::CreateProductPayload,
            handlers::products::CreateFieldPayload,
            handlers::applications::CreateApplicationPayload,
            handlers::applications::UpdateStatusPayload,
            handlers::applications::AddTravelerPayload,
            handlers::applications::SubmitResponsesPayload,
            handlers::resubmission::RequestResubmissionPayload,
            handlers::resubmission::AddAdHocFieldsPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Cliente e Passaporte"),
        (name = "Products", description = "Produtos de Visto e Catálogo de Campos"),
        (name = "Applications", description = "Ciclo de Vida das Aplicações"),
        (name = "Travelers", description = "Viajantes Adicionais"),
        (name = "Responses", description = "Formulário Dinâmico, Respostas e Uploads"),
        (name = "Resubmission", description = "Pedidos de Correção e Campos Ad Hoc"),
        (name = "Admin", description = "Operações do Back-office")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
