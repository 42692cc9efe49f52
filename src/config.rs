// src/config.rs

use std::sync::Arc;
use std::{env, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        ApplicationRepository, DashboardRepository, ProductRepository, TravelerRepository,
        UserRepository,
    },
    services::{
        application_service::ApplicationService,
        auth::AuthService,
        catalog_service::CatalogService,
        dashboard_service::DashboardService,
        document_service::DocumentService,
        notification_service::{LogNotifier, NotificationService},
        response_service::ResponseService,
        resubmission_service::ResubmissionService,
        upload_service::{DiskUploadStore, UploadService},
        visibility_service::VisibilityService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub i18n_store: &'static I18nStore,

    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub application_service: ApplicationService,
    pub response_service: ResponseService,
    pub resubmission_service: ResubmissionService,
    pub visibility_service: VisibilityService,
    pub document_service: DocumentService,
    pub dashboard_service: DashboardService,
    pub upload_service: UploadService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        let tracking_base_url =
            env::var("TRACKING_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let application_repo = ApplicationRepository::new(db_pool.clone());
        let traveler_repo = TravelerRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        let notifications =
            NotificationService::new(Arc::new(LogNotifier), tracking_base_url.clone());

        let auth_service =
            AuthService::new(user_repo.clone(), jwt_secret.clone(), db_pool.clone());
        let catalog_service = CatalogService::new(product_repo.clone());
        let visibility_service = VisibilityService::new(
            application_repo.clone(),
            traveler_repo.clone(),
            user_repo.clone(),
            catalog_service.clone(),
        );
        let application_service = ApplicationService::new(
            application_repo.clone(),
            traveler_repo.clone(),
            product_repo.clone(),
            user_repo.clone(),
            notifications.clone(),
        );
        let response_service = ResponseService::new(
            application_repo.clone(),
            traveler_repo.clone(),
            user_repo.clone(),
            catalog_service.clone(),
            notifications.clone(),
        );
        let resubmission_service = ResubmissionService::new(
            application_repo.clone(),
            traveler_repo.clone(),
            product_repo.clone(),
            user_repo.clone(),
            notifications.clone(),
        );
        let document_service = DocumentService::new(
            application_repo.clone(),
            traveler_repo.clone(),
            user_repo.clone(),
            catalog_service.clone(),
            tracking_base_url,
        );
        let dashboard_service = DashboardService::new(dashboard_repo);
        let upload_service = UploadService::new(Arc::new(DiskUploadStore::new(upload_dir)));

        Ok(Self {
            db_pool,
            jwt_secret,
            i18n_store: I18nStore::global(),
            auth_service,
            catalog_service,
            application_service,
            response_service,
            resubmission_service,
            visibility_service,
            document_service,
            dashboard_service,
            upload_service,
        })
    }
}
