// src/models/application.rs

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::catalog::{default_true, FieldDefinition, FieldType};

// =============================================================================
//  STATUS (a máquina de estados do workflow)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    AdditionalInfoRequired,
    Resubmission,
    Processing,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl ApplicationStatus {
    /// Estados "em andamento": o admin pode puxar qualquer um deles de volta
    /// para `Resubmission` ao pedir correções.
    pub fn is_in_process(self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::AdditionalInfoRequired | Self::Resubmission | Self::Processing
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }

    /// Estados em que o formulário ainda recebe respostas.
    pub fn accepts_responses(self) -> bool {
        matches!(
            self,
            Self::Draft | Self::Submitted | Self::AdditionalInfoRequired | Self::Resubmission
        )
    }

    /// Estados de correção: toda submissão dispara a checagem de fulfillment.
    pub fn awaiting_correction(self) -> bool {
        matches!(self, Self::AdditionalInfoRequired | Self::Resubmission)
    }
}

// =============================================================================
//  CHAVES DE CAMPO (normalizadas na borda)
// =============================================================================

/// As quatro pseudo-chaves reservadas de passaporte. Vivem no mesmo mapa de
/// respostas dos campos numéricos, mas espelham colunas estruturadas no
/// registro do cliente/viajante.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassportField {
    Number,
    ExpiryDate,
    ResidenceCountry,
    HasSchengenVisa,
}

impl PassportField {
    pub const ALL: [PassportField; 4] = [
        PassportField::Number,
        PassportField::ExpiryDate,
        PassportField::ResidenceCountry,
        PassportField::HasSchengenVisa,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PassportField::Number => "_passport_number",
            PassportField::ExpiryDate => "_passport_expiry_date",
            PassportField::ResidenceCountry => "_residence_country",
            PassportField::HasSchengenVisa => "_has_schengen_visa",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "_passport_number" => Some(PassportField::Number),
            "_passport_expiry_date" => Some(PassportField::ExpiryDate),
            "_residence_country" => Some(PassportField::ResidenceCountry),
            "_has_schengen_visa" => Some(PassportField::HasSchengenVisa),
            _ => None,
        }
    }

    /// Ordem-sentinela negativa: campos de passaporte sempre renderizam antes
    /// do catálogo.
    pub fn display_order(self) -> i32 {
        match self {
            PassportField::Number => -1000,
            PassportField::ExpiryDate => -999,
            PassportField::ResidenceCountry => -998,
            PassportField::HasSchengenVisa => -997,
        }
    }

    /// Definição sintetizada usada pelo resolver e pela validação.
    /// O `id` numérico é irrelevante aqui (a identidade é a pseudo-chave).
    pub fn definition(self) -> FieldDefinition {
        let (question, field_type, options) = match self {
            PassportField::Number => ("Número do passaporte", FieldType::Text, None),
            PassportField::ExpiryDate => ("Validade do passaporte", FieldType::Date, None),
            PassportField::ResidenceCountry => ("País de residência", FieldType::Text, None),
            PassportField::HasSchengenVisa => (
                "Já possui visto Schengen?",
                FieldType::Dropdown,
                Some(vec!["yes".to_string(), "no".to_string()]),
            ),
        };
        FieldDefinition {
            product_id: None,
            id: 0,
            field_type,
            question: question.to_string(),
            placeholder: None,
            is_required: false,
            display_order: self.display_order(),
            options,
            allowed_file_types: None,
            max_file_size_mb: None,
            min_length: None,
            max_length: None,
            is_active: true,
        }
    }
}

/// Identificador canônico de campo: inteiro com sinal (positivo = catálogo,
/// negativo = ad hoc) ou uma das pseudo-chaves de passaporte. Payloads chegam
/// com ids como número OU string; o parse acontece uma vez na borda e o resto
/// do código nunca re-interpreta strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Field(i32),
    Passport(PassportField),
}

impl FieldKey {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(p) = PassportField::from_key(raw) {
            return Some(FieldKey::Passport(p));
        }
        raw.parse::<i32>().ok().map(FieldKey::Field)
    }

    /// Forma string usada como chave do mapa de respostas.
    pub fn storage_key(&self) -> String {
        match self {
            FieldKey::Field(id) => id.to_string(),
            FieldKey::Passport(p) => p.key().to_string(),
        }
    }

    pub fn as_passport(&self) -> Option<PassportField> {
        match self {
            FieldKey::Passport(p) => Some(*p),
            FieldKey::Field(_) => None,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Field(id) => write!(f, "{}", id),
            FieldKey::Passport(p) => f.write_str(p.key()),
        }
    }
}

// Serializa como número quando é id numérico e como string quando é
// pseudo-chave; aceita qualquer uma das formas na entrada (a dualidade
// número/string dos clientes legados).
impl Serialize for FieldKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldKey::Field(id) => serializer.serialize_i32(*id),
            FieldKey::Passport(p) => serializer.serialize_str(p.key()),
        }
    }
}

struct FieldKeyVisitor;

impl<'de> Visitor<'de> for FieldKeyVisitor {
    type Value = FieldKey;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("um id de campo (inteiro) ou uma pseudo-chave de passaporte")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldKey, E> {
        i32::try_from(v)
            .map(FieldKey::Field)
            .map_err(|_| E::custom(format!("id de campo fora do intervalo: {}", v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldKey, E> {
        i32::try_from(v)
            .map(FieldKey::Field)
            .map_err(|_| E::custom(format!("id de campo fora do intervalo: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldKey, E> {
        FieldKey::parse(v).ok_or_else(|| E::custom(format!("chave de campo desconhecida: '{}'", v)))
    }
}

impl<'de> Deserialize<'de> for FieldKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldKeyVisitor)
    }
}

// =============================================================================
//  RESPOSTAS
// =============================================================================

/// Uma resposta armazenada: valor textual e/ou referência de arquivo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_size: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Answer {
    /// Uma resposta conta para fulfillment se carrega valor não-vazio ou arquivo.
    pub fn is_filled(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.trim().is_empty())
            || self.file_path.is_some()
    }
}

/// Mapa de respostas de um escopo, chaveado pela forma string do FieldKey.
pub type AnswerMap = HashMap<String, Answer>;

// =============================================================================
//  CAMPOS AD HOC (registro da aplicação)
// =============================================================================

fn admin_source() -> String {
    "admin".to_string()
}

/// Campo criado por um administrador depois da submissão, com id negativo
/// alocado pela marca d'água `min_adhoc_field_id` da aplicação.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdHocField {
    #[schema(example = -1)]
    pub id: i32,

    // Ausente = escopo da aplicação inteira; presente = um viajante só.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub traveler_id: Option<i32>,

    pub field_type: FieldType,
    pub question: String,
    pub placeholder: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub display_order: i32,
    pub options: Option<Vec<String>>,
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size_mb: Option<i32>,
    pub min_length: Option<i32>,
    pub max_length: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default = "admin_source")]
    #[schema(example = "admin")]
    pub source: String,
}

impl AdHocField {
    pub fn as_definition(&self) -> FieldDefinition {
        FieldDefinition {
            product_id: None,
            id: self.id,
            field_type: self.field_type,
            question: self.question.clone(),
            placeholder: self.placeholder.clone(),
            is_required: self.is_required,
            display_order: self.display_order,
            options: self.options.clone(),
            allowed_file_types: self.allowed_file_types.clone(),
            max_file_size_mb: self.max_file_size_mb,
            min_length: self.min_length,
            max_length: self.max_length,
            is_active: self.is_active,
        }
    }
}

// =============================================================================
//  PEDIDOS DE REENVIO
// =============================================================================

/// Escopo de uma submissão ou de um pedido: a aplicação em si (Viajante 1,
/// representado pelo registro do cliente) ou um viajante adicional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseScope {
    Applicant,
    Traveler(i32),
}

impl ResponseScope {
    pub fn from_traveler_id(traveler_id: Option<i32>) -> Self {
        match traveler_id {
            Some(id) => ResponseScope::Traveler(id),
            None => ResponseScope::Applicant,
        }
    }

    pub fn traveler_id(&self) -> Option<i32> {
        match self {
            ResponseScope::Applicant => None,
            ResponseScope::Traveler(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestTarget {
    Application,
    Traveler,
}

/// Um pedido de correção aberto pelo admin: alvo + conjunto de campos + nota.
/// `fulfilled_at`, uma vez preenchido, só volta a limpo num reset completo do
/// workflow (quando todos os pedidos fecham, a lista é zerada).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResubmissionRequest {
    pub id: String,
    pub target: RequestTarget,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub traveler_id: Option<i32>,
    #[schema(value_type = Vec<String>, example = json!([201, -1, "_passport_number"]))]
    pub field_ids: Vec<FieldKey>,
    pub note: Option<String>,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl ResubmissionRequest {
    pub fn is_open(&self) -> bool {
        self.fulfilled_at.is_none()
    }

    /// Um pedido de viajante sem `traveler_id` pertence ao Viajante 1
    /// (que ainda não tem linha própria), ou seja, ao escopo da aplicação.
    pub fn matches_scope(&self, scope: ResponseScope) -> bool {
        match self.target {
            RequestTarget::Application => scope == ResponseScope::Applicant,
            RequestTarget::Traveler => ResponseScope::from_traveler_id(self.traveler_id) == scope,
        }
    }
}

// =============================================================================
//  AGREGADO
// =============================================================================

/// A raiz do agregado: status, registro ad hoc, lista de pedidos, campos
/// legados de pedido único e o mapa de respostas da aplicação moram juntos e
/// são gravados numa única transação.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    #[schema(example = 1024)]
    pub display_id: i32,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub visa_type: String,
    pub processing_option: String,
    pub status: ApplicationStatus,

    #[schema(value_type = Vec<AdHocField>)]
    pub adhoc_fields: Json<Vec<AdHocField>>,
    // Marca d'água dos ids ad hoc (0 = nenhum alocado; só diminui).
    pub min_adhoc_field_id: i32,

    #[schema(value_type = Vec<ResubmissionRequest>)]
    pub resubmission_requests: Json<Vec<ResubmissionRequest>>,

    // Representação legada de pedido único (anterior à lista). O workflow
    // honra as duas; a lista é canônica quando populada.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resubmission_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resubmission_traveler_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_field_ids: Option<Vec<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resubmission_note: Option<String>,

    #[schema(value_type = Object)]
    pub form_responses: Json<AnswerMap>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Número de acompanhamento exibido ao cliente (e usado nas notificações).
    pub fn tracking_number(&self) -> String {
        format!("VF-{:06}", self.display_id)
    }

    pub fn open_requests(&self) -> impl Iterator<Item = &ResubmissionRequest> {
        self.resubmission_requests.iter().filter(|r| r.is_open())
    }

    pub fn all_requests_fulfilled(&self) -> bool {
        self.resubmission_requests.iter().all(|r| !r.is_open())
    }

    pub fn find_adhoc(&self, id: i32) -> Option<&AdHocField> {
        self.adhoc_fields.iter().find(|f| f.id == id)
    }

    /// Campos ad hoc registrados para um escopo (aplicação ou um viajante).
    pub fn adhoc_for_scope(&self, scope: ResponseScope) -> Vec<&AdHocField> {
        self.adhoc_fields
            .iter()
            .filter(|f| ResponseScope::from_traveler_id(f.traveler_id) == scope)
            .collect()
    }

    /// O pedido legado (se configurado) casa com este escopo?
    pub fn legacy_request_matches(&self, scope: ResponseScope) -> bool {
        let has_fields = self
            .requested_field_ids
            .as_ref()
            .is_some_and(|ids| !ids.is_empty());
        if !has_fields {
            return false;
        }
        match self.resubmission_target.as_deref() {
            Some("traveler") => {
                ResponseScope::from_traveler_id(self.resubmission_traveler_id) == scope
            }
            // Alvo ausente ou "application": escopo da aplicação.
            _ => scope == ResponseScope::Applicant,
        }
    }

    pub fn clear_legacy_request(&mut self) {
        self.resubmission_target = None;
        self.resubmission_traveler_id = None;
        self.requested_field_ids = None;
        self.resubmission_note = None;
    }
}

// =============================================================================
//  VIAJANTES
// =============================================================================

/// Viajantes 2..N de uma aplicação. O Viajante 1 (o requerente) é o registro
/// do cliente: suas respostas ficam no mapa da aplicação.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    pub id: i32,
    pub application_id: Uuid,
    pub full_name: String,

    pub passport_number: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub passport_expiry_date: Option<NaiveDate>,
    pub residence_country: Option<String>,
    pub has_schengen_visa: Option<bool>,

    #[schema(value_type = Object)]
    pub form_responses: Json<AnswerMap>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Visão uniforme dos quatro atributos estruturados de passaporte, extraída
/// do cliente (Viajante 1) ou de uma linha de viajante.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassportData {
    pub passport_number: Option<String>,
    pub passport_expiry_date: Option<NaiveDate>,
    pub residence_country: Option<String>,
    pub has_schengen_visa: Option<bool>,
}

impl PassportData {
    pub fn missing_fields(&self) -> Vec<PassportField> {
        let mut missing = Vec::new();
        if self.passport_number.as_deref().map_or(true, |v| v.trim().is_empty()) {
            missing.push(PassportField::Number);
        }
        if self.passport_expiry_date.is_none() {
            missing.push(PassportField::ExpiryDate);
        }
        if self.residence_country.as_deref().map_or(true, |v| v.trim().is_empty()) {
            missing.push(PassportField::ResidenceCountry);
        }
        if self.has_schengen_visa.is_none() {
            missing.push(PassportField::HasSchengenVisa);
        }
        missing
    }

    /// Valor da coluna estruturada na forma string do mapa de respostas.
    pub fn value_for(&self, field: PassportField) -> Option<String> {
        match field {
            PassportField::Number => self.passport_number.clone(),
            PassportField::ExpiryDate => self
                .passport_expiry_date
                .map(|d| d.format("%Y-%m-%d").to_string()),
            PassportField::ResidenceCountry => self.residence_country.clone(),
            PassportField::HasSchengenVisa => {
                self.has_schengen_visa.map(|b| if b { "yes" } else { "no" }.to_string())
            }
        }
    }
}

impl Traveler {
    pub fn passport_data(&self) -> PassportData {
        PassportData {
            passport_number: self.passport_number.clone(),
            passport_expiry_date: self.passport_expiry_date,
            residence_country: self.residence_country.clone(),
            has_schengen_visa: self.has_schengen_visa,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_key_parses_numbers_and_passport_keys() {
        assert_eq!(FieldKey::parse("101"), Some(FieldKey::Field(101)));
        assert_eq!(FieldKey::parse("-3"), Some(FieldKey::Field(-3)));
        assert_eq!(
            FieldKey::parse("_passport_number"),
            Some(FieldKey::Passport(PassportField::Number))
        );
        assert_eq!(FieldKey::parse("abc"), None);
        assert_eq!(FieldKey::parse(""), None);
    }

    #[test]
    fn field_key_serde_accepts_both_number_and_string() {
        // Clientes legados mandam o mesmo id ora como número, ora como string.
        let from_number: FieldKey = serde_json::from_str("101").unwrap();
        let from_string: FieldKey = serde_json::from_str("\"101\"").unwrap();
        assert_eq!(from_number, from_string);

        let passport: FieldKey = serde_json::from_str("\"_has_schengen_visa\"").unwrap();
        assert_eq!(passport, FieldKey::Passport(PassportField::HasSchengenVisa));

        // Na saída, ids numéricos viram números e pseudo-chaves viram strings.
        assert_eq!(serde_json::to_string(&FieldKey::Field(-2)).unwrap(), "-2");
        assert_eq!(
            serde_json::to_string(&FieldKey::Passport(PassportField::Number)).unwrap(),
            "\"_passport_number\""
        );
    }

    #[test]
    fn answer_is_filled_ignores_blank_values() {
        let blank = Answer { value: Some("   ".to_string()), ..Default::default() };
        assert!(!blank.is_filled());

        let with_value = Answer { value: Some("Jane".to_string()), ..Default::default() };
        assert!(with_value.is_filled());

        let with_file = Answer {
            file_path: Some("uploads/x.pdf".to_string()),
            ..Default::default()
        };
        assert!(with_file.is_filled());
    }

    #[test]
    fn traveler_request_without_traveler_id_belongs_to_applicant() {
        let req = ResubmissionRequest {
            id: "r1".to_string(),
            target: RequestTarget::Traveler,
            traveler_id: None,
            field_ids: vec![FieldKey::Field(7)],
            note: None,
            requested_at: Utc::now(),
            fulfilled_at: None,
        };
        assert!(req.matches_scope(ResponseScope::Applicant));
        assert!(!req.matches_scope(ResponseScope::Traveler(5)));
    }

    #[test]
    fn passport_data_reports_missing_attributes() {
        let mut data = PassportData::default();
        assert_eq!(data.missing_fields().len(), 4);

        data.passport_number = Some("AB1234567".to_string());
        data.has_schengen_visa = Some(false);
        let missing = data.missing_fields();
        assert_eq!(missing, vec![PassportField::ExpiryDate, PassportField::ResidenceCountry]);
    }
}
