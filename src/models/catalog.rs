// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE field_type do banco.
// O mesmo enum serve para campos do catálogo e para campos ad hoc (JSONB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "field_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Upload,
    Dropdown,
    Textarea,
}

// --- DEFINIÇÕES (O Molde) ---

/// Uma pergunta do catálogo de um produto de visto.
/// O `id` é positivo, único dentro do produto e nunca reaproveitado:
/// `visa_products.max_field_id` guarda a marca d'água mesmo após deleções.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    // Ausente quando a definição foi sintetizada (ad hoc / passaporte).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub product_id: Option<Uuid>,

    #[schema(example = 101)]
    pub id: i32,

    pub field_type: FieldType,

    #[schema(example = "Qual o motivo da viagem?")]
    pub question: String,
    pub placeholder: Option<String>,

    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub display_order: i32,

    // Obrigatório quando field_type = dropdown.
    #[schema(example = json!(["Turismo", "Negócios"]))]
    pub options: Option<Vec<String>>,

    // Restrições de upload (extensões sem ponto, tamanho em MB).
    #[schema(example = json!(["jpg", "png", "pdf"]))]
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size_mb: Option<i32>,

    pub min_length: Option<i32>,
    pub max_length: Option<i32>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

pub(crate) fn default_true() -> bool {
    true
}

// --- PRODUTOS ---

/// Combinação de tipo de visto com a taxa cobrada.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisaTypeOption {
    #[schema(example = "Turismo 30 dias")]
    pub name: String,
    #[schema(value_type = String, example = "189.90")]
    pub fee: Decimal,
}

/// Velocidade de processamento e a taxa correspondente.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOption {
    #[schema(example = "Urgente")]
    pub name: String,
    #[schema(value_type = String, example = "99.00")]
    pub fee: Decimal,
    pub business_days: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisaProduct {
    pub id: Uuid,
    #[schema(example = "Visto Índia e-Tourist")]
    pub name: String,
    #[schema(example = "IN")]
    pub country_code: String,

    #[schema(value_type = Vec<VisaTypeOption>)]
    pub visa_types: Json<Vec<VisaTypeOption>>,
    #[schema(value_type = Vec<ProcessingOption>)]
    pub processing_options: Json<Vec<ProcessingOption>>,

    // Marca d'água dos ids do catálogo deste produto.
    pub max_field_id: i32,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VisaProduct {
    /// Valida a combinação tipo de visto / velocidade escolhida na aplicação.
    pub fn combination_is_valid(&self, visa_type: &str, processing_option: &str) -> bool {
        self.visa_types.iter().any(|v| v.name == visa_type)
            && self.processing_options.iter().any(|p| p.name == processing_option)
    }
}
