// src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::{admin_guard, auth_guard};

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Rotas de usuário (protegidas)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/passport", put(handlers::auth::update_my_passport))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Catálogo visível a qualquer usuário autenticado
    let product_routes = Router::new()
        .route("/", get(handlers::products::list_products))
        .route("/{id}/fields", get(handlers::products::list_fields))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let application_routes = Router::new()
        .route(
            "/",
            post(handlers::applications::create_application)
                .get(handlers::applications::list_my_applications),
        )
        .route(
            "/{id}",
            get(handlers::applications::get_application)
                .delete(handlers::applications::delete_application),
        )
        // O resolver de visibilidade e a loja de respostas
        .route(
            "/{id}/fields",
            get(handlers::applications::list_fields_with_responses),
        )
        .route(
            "/{id}/responses",
            post(handlers::applications::submit_responses),
        )
        .route(
            "/{id}/resubmissions",
            get(handlers::resubmission::get_active_requests),
        )
        // Viajantes
        .route(
            "/{id}/travelers",
            post(handlers::applications::add_traveler)
                .get(handlers::applications::list_travelers),
        )
        .route(
            "/{id}/travelers/{traveler_id}/passport",
            put(handlers::applications::update_traveler_passport),
        )
        // Uploads e documentos
        .route("/{id}/uploads", post(handlers::applications::upload_file))
        .route("/{id}/summary.pdf", get(handlers::applications::summary_pdf))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Back-office: tudo atrás do admin_guard
    let admin_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard::get_summary))
        .route("/products", post(handlers::products::create_product))
        .route("/products/{id}/fields", post(handlers::products::add_field))
        .route(
            "/products/{id}/fields/{field_id}",
            patch(handlers::products::update_field).delete(handlers::products::delete_field),
        )
        .route(
            "/applications/{id}/status",
            patch(handlers::applications::update_status),
        )
        .route(
            "/applications/{id}/resubmissions",
            post(handlers::resubmission::request_resubmission),
        )
        .route(
            "/applications/{id}/adhoc-fields",
            post(handlers::resubmission::add_adhoc_fields),
        )
        .route(
            "/applications/{id}/adhoc-fields/{field_id}",
            delete(handlers::resubmission::remove_adhoc_field),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/products", product_routes)
        .nest("/api/applications", application_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
