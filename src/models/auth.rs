// src/models/auth.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Representa um usuário vindo do banco de dados (cliente ou admin).
// O cliente é também o "Viajante 1" das suas aplicações: os atributos de
// passaporte abaixo espelham as pseudo-chaves do mapa de respostas.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub is_admin: bool,

    pub passport_number: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub passport_expiry_date: Option<NaiveDate>,
    pub residence_country: Option<String>,
    pub has_schengen_visa: Option<bool>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados para registro de um novo cliente
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 2, message = "O nome deve ter no mínimo 2 caracteres."))]
    #[schema(example = "Maria da Silva")]
    pub full_name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "maria@email.com")]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Atualização dos dados estruturados de passaporte (Diretório de
// Clientes/Viajantes). A escrita aqui espelha no mapa de respostas.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassportPayload {
    #[validate(length(min = 5, message = "Número de passaporte inválido."))]
    #[schema(example = "AB1234567")]
    pub passport_number: Option<String>,
    #[schema(value_type = Option<String>, format = Date, example = "2031-04-12")]
    pub passport_expiry_date: Option<NaiveDate>,
    #[validate(length(equal = 2, message = "invalid_country_code"))]
    #[schema(example = "BR")]
    pub residence_country: Option<String>,
    pub has_schengen_visa: Option<bool>,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}
