// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// A taxonomia do domínio: NotFound / InvalidInput / StateConflict carregam
// uma mensagem descritiva; o resto é infraestrutura.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso restrito à administração")]
    AdminOnly,

    // Aplicação, viajante, produto ou campo desconhecido
    #[error("Não encontrado: {0}")]
    NotFound(String),

    // Id de campo desconhecido no payload, valor fora do conjunto de opções,
    // campo obrigatório ausente, arquivo violando restrições, combinação
    // tipo-de-visto/taxa malformada
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    // Mutação num estado que não permite a operação
    #[error("Estado não permite a operação: {0}")]
    StateConflict(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    // (status HTTP, código i18n, detalhe dinâmico)
    fn classify(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation", None),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "email_exists", None),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::AdminOnly => (StatusCode::FORBIDDEN, "admin_only", None),
            AppError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, "not_found", Some(detail.clone()))
            }
            AppError::InvalidInput(detail) => {
                (StatusCode::BAD_REQUEST, "invalid_input", Some(detail.clone()))
            }
            AppError::StateConflict(detail) => {
                (StatusCode::CONFLICT, "state_conflict", Some(detail.clone()))
            }
            AppError::UniqueConstraintViolation(detail) => {
                (StatusCode::CONFLICT, "unique_violation", Some(detail.clone()))
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal", None),
        }
    }

    /// Converte para a resposta HTTP localizada. Handlers chamam isso com o
    /// Locale extraído do Accept-Language.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        // Erros de validação viram um mapa campo -> códigos, como o frontend espera.
        if let AppError::ValidationError(errors) = self {
            let mut details = serde_json::Map::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<Value> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| Value::String(m.to_string())))
                    .collect();
                details.insert(field.to_string(), Value::Array(messages));
            }
            return ApiError {
                status: StatusCode::BAD_REQUEST,
                message: store.message(&locale.0, "validation").to_string(),
                details: Some(Value::Object(details)),
            };
        }

        let (status, code, detail) = self.classify();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O `tracing` loga a mensagem detalhada; o cliente recebe o genérico.
            tracing::error!("Erro interno do servidor: {}", self);
        }

        let base = store.message(&locale.0, code);
        let message = match detail {
            Some(d) => format!("{}: {}", base, d),
            None => base.to_string(),
        };
        ApiError { status, message, details: None }
    }
}

// Algumas rotas (middleware de auth, extratores) respondem com AppError
// direto, sem Locale: usa o idioma padrão da loja.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global())
            .into_response()
    }
}

// A forma final que sai pelo fio.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}
