// src/services/visibility_service.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ApplicationRepository, TravelerRepository, UserRepository},
    models::application::{
        Answer, AnswerMap, Application, FieldKey, PassportData, PassportField, ResponseScope,
    },
    models::catalog::{FieldDefinition, FieldType},
    services::catalog_service::CatalogService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Usuário preenchendo o formulário: a primeira fonte não-vazia vence.
    User,
    /// Auditoria administrativa: união de todas as fontes, somente leitura.
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    Product,
    Admin,
    Passport,
}

/// Um campo resolvido para apresentação: definição + fonte + resposta atual.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisibleField {
    #[schema(value_type = String, example = "101")]
    pub key: FieldKey,
    pub source: FieldSource,
    pub field_type: FieldType,
    pub question: String,
    pub placeholder: Option<String>,
    pub is_required: bool,
    pub display_order: i32,
    pub options: Option<Vec<String>>,
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size_mb: Option<i32>,
    pub min_length: Option<i32>,
    pub max_length: Option<i32>,
    pub editable: bool,
    pub answer: Option<Answer>,
}

impl VisibleField {
    /// Reconstrói a definição (para o motor de validação da submissão).
    pub fn as_definition(&self) -> FieldDefinition {
        FieldDefinition {
            product_id: None,
            id: match self.key {
                FieldKey::Field(id) => id,
                FieldKey::Passport(_) => 0,
            },
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
            is_active: true,
        }
    }

    fn from_definition(
        key: FieldKey,
        def: &FieldDefinition,
        source: FieldSource,
        editable: bool,
        answer: Option<Answer>,
    ) -> Self {
        Self {
            key,
            source,
            field_type: def.field_type,
            question: def.question.clone(),
            placeholder: def.placeholder.clone(),
            is_required: def.is_required,
            display_order: def.display_order,
            options: def.options.clone(),
            allowed_file_types: def.allowed_file_types.clone(),
            max_file_size_mb: def.max_file_size_mb,
            min_length: def.min_length,
            max_length: def.max_length,
            editable,
            answer,
        }
    }
}

/// Tudo que o resolver precisa enxergar de uma vez. O catálogo vem completo
/// (inclusive inativos): um pedido aberto pode referenciar um campo já
/// desativado e ele ainda precisa renderizar.
pub struct VisibilityContext<'a> {
    pub catalog: &'a [FieldDefinition],
    pub app: &'a Application,
    pub scope: ResponseScope,
    pub passport: &'a PassportData,
    pub answers: &'a AnswerMap,
    pub mode: ViewMode,
}

/// O resolver de visibilidade, em ordem de precedência:
///   1. campos nomeados por pedidos de reenvio ABERTOS do escopo
///   2. campos ad hoc registrados para o escopo
///   3. ids do pedido único legado do escopo
///   4. catálogo ativo completo do produto
/// Em modo usuário a primeira fonte não-vazia vence; em modo admin tudo é
/// unido e exposto somente leitura. Pseudo-campos de passaporte entram quando
/// falta dado estruturado, quando já existe resposta armazenada para a
/// pseudo-chave, ou quando um pedido aberto a nomeia.
pub fn resolve_visible_fields(ctx: &VisibilityContext) -> Vec<VisibleField> {
    let editable = ctx.mode == ViewMode::User && ctx.app.status.accepts_responses();

    // Chaves nomeadas por pedidos abertos que casam com o escopo (fonte 1)
    let requested: Vec<FieldKey> = ctx
        .app
        .open_requests()
        .filter(|r| r.matches_scope(ctx.scope))
        .flat_map(|r| r.field_ids.iter().copied())
        .collect();

    let mut keys: Vec<FieldKey> = Vec::new();

    match ctx.mode {
        ViewMode::User => {
            if !requested.is_empty() {
                keys.extend(&requested);
            } else {
                let adhoc = ctx.app.adhoc_for_scope(ctx.scope);
                if !adhoc.is_empty() {
                    keys.extend(adhoc.iter().map(|f| FieldKey::Field(f.id)));
                } else if ctx.app.legacy_request_matches(ctx.scope) {
                    keys.extend(
                        ctx.app
                            .requested_field_ids
                            .iter()
                            .flatten()
                            .map(|id| FieldKey::Field(*id)),
                    );
                } else {
                    keys.extend(
                        ctx.catalog
                            .iter()
                            .filter(|f| f.is_active)
                            .map(|f| FieldKey::Field(f.id)),
                    );
                }
            }
        }
        ViewMode::Admin => {
            // União de todas as fontes
            keys.extend(&requested);
            keys.extend(ctx.app.adhoc_for_scope(ctx.scope).iter().map(|f| FieldKey::Field(f.id)));
            if ctx.app.legacy_request_matches(ctx.scope) {
                keys.extend(
                    ctx.app
                        .requested_field_ids
                        .iter()
                        .flatten()
                        .map(|id| FieldKey::Field(*id)),
                );
            }
            keys.extend(
                ctx.catalog
                    .iter()
                    .filter(|f| f.is_active)
                    .map(|f| FieldKey::Field(f.id)),
            );
        }
    }

    // Pseudo-campos de passaporte
    for p in PassportField::ALL {
        let named_by_request = requested.contains(&FieldKey::Passport(p));
        let has_stored_answer = ctx.answers.contains_key(p.key());
        let missing_data = ctx.passport.missing_fields().contains(&p);
        if named_by_request || has_stored_answer || missing_data {
            keys.push(FieldKey::Passport(p));
        }
    }

    // Dedup por chave (a primeira ocorrência preserva a ordem dos pedidos)
    let mut seen: HashSet<FieldKey> = HashSet::new();
    let mut fields: Vec<VisibleField> = Vec::new();

    for key in keys {
        if !seen.insert(key) {
            continue;
        }
        match build_field(ctx, key, editable) {
            Some(field) => fields.push(field),
            None => {
                tracing::warn!(
                    "campo {} referenciado mas sem definição nem resposta na aplicação {}",
                    key,
                    ctx.app.id
                );
            }
        }
    }

    // Ordenação final: passaporte carrega ordens-sentinela negativas e
    // renderiza primeiro; empates ficam na ordem em que entraram.
    fields.sort_by_key(|f| f.display_order);

    fields
}

fn build_field(ctx: &VisibilityContext, key: FieldKey, editable: bool) -> Option<VisibleField> {
    let stored = ctx.answers.get(&key.storage_key()).cloned();

    match key {
        FieldKey::Passport(p) => {
            // Sem resposta no mapa, a coluna estruturada responde pela
            // pseudo-chave (as duas representações nunca divergem na leitura).
            let answer = stored.or_else(|| {
                ctx.passport.value_for(p).map(|value| Answer {
                    value: Some(value),
                    ..Default::default()
                })
            });
            Some(VisibleField::from_definition(
                key,
                &p.definition(),
                FieldSource::Passport,
                editable,
                answer,
            ))
        }
        FieldKey::Field(id) if id > 0 => {
            match ctx.catalog.iter().find(|f| f.id == id) {
                Some(def) => Some(VisibleField::from_definition(
                    key,
                    def,
                    FieldSource::Product,
                    editable,
                    stored,
                )),
                // Definição deletada: a resposta histórica ainda é recuperável.
                None => stored.map(|answer| {
                    VisibleField::from_definition(
                        key,
                        &orphan_definition(id),
                        FieldSource::Product,
                        editable,
                        Some(answer),
                    )
                }),
            }
        }
        FieldKey::Field(id) => {
            match ctx.app.find_adhoc(id) {
                Some(adhoc) => Some(VisibleField::from_definition(
                    key,
                    &adhoc.as_definition(),
                    FieldSource::Admin,
                    editable,
                    stored,
                )),
                None => stored.map(|answer| {
                    VisibleField::from_definition(
                        key,
                        &orphan_definition(id),
                        FieldSource::Admin,
                        editable,
                        Some(answer),
                    )
                }),
            }
        }
    }
}

/// Definição mínima para um id cuja definição foi removida mas cuja resposta
/// continua armazenada.
fn orphan_definition(id: i32) -> FieldDefinition {
    FieldDefinition {
        product_id: None,
        id,
        field_type: FieldType::Text,
        question: format!("Campo {}", id),
        placeholder: None,
        is_required: false,
        display_order: i32::MAX,
        options: None,
        allowed_file_types: None,
        max_file_size_mb: None,
        min_length: None,
        max_length: None,
        is_active: false,
    }
}

// =============================================================================
//  Serviço (carrega o contexto e delega ao resolver puro)
// =============================================================================

#[derive(Clone)]
pub struct VisibilityService {
    application_repo: ApplicationRepository,
    traveler_repo: TravelerRepository,
    user_repo: UserRepository,
    catalog_service: CatalogService,
}

impl VisibilityService {
    pub fn new(
        application_repo: ApplicationRepository,
        traveler_repo: TravelerRepository,
        user_repo: UserRepository,
        catalog_service: CatalogService,
    ) -> Self {
        Self {
            application_repo,
            traveler_repo,
            user_repo,
            catalog_service,
        }
    }

    pub async fn list_fields_with_responses<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        traveler_id: Option<i32>,
        mode: ViewMode,
    ) -> Result<Vec<VisibleField>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let app = self
            .application_repo
            .get_by_id(&mut *conn, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        let catalog = self
            .catalog_service
            .list_fields(&mut *conn, app.product_id, true)
            .await?;

        let scope = ResponseScope::from_traveler_id(traveler_id);

        // Mapa de respostas + dados de passaporte do escopo
        let (answers, passport) = match scope {
            ResponseScope::Applicant => {
                let customer = self
                    .user_repo
                    .find_by_id(app.customer_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("cliente {}", app.customer_id)))?;
                let passport = PassportData {
                    passport_number: customer.passport_number,
                    passport_expiry_date: customer.passport_expiry_date,
                    residence_country: customer.residence_country,
                    has_schengen_visa: customer.has_schengen_visa,
                };
                (app.form_responses.0.clone(), passport)
            }
            ResponseScope::Traveler(id) => {
                let traveler = self
                    .traveler_repo
                    .get(&mut *conn, application_id, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("viajante {}", id)))?;
                (traveler.form_responses.0.clone(), traveler.passport_data())
            }
        };

        let ctx = VisibilityContext {
            catalog: &catalog,
            app: &app,
            scope,
            passport: &passport,
            answers: &answers,
            mode,
        };

        Ok(resolve_visible_fields(&ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;
    use std::collections::HashMap;

    use crate::models::application::{
        AdHocField, ApplicationStatus, RequestTarget, ResubmissionRequest,
    };

    fn catalog_field(id: i32, display_order: i32, required: bool) -> FieldDefinition {
        FieldDefinition {
            product_id: None,
            id,
            field_type: FieldType::Text,
            question: format!("Pergunta {}", id),
            placeholder: None,
            is_required: required,
            display_order,
            options: None,
            allowed_file_types: None,
            max_file_size_mb: None,
            min_length: None,
            max_length: None,
            is_active: true,
        }
    }

    fn adhoc_field(id: i32, traveler_id: Option<i32>) -> AdHocField {
        AdHocField {
            id,
            traveler_id,
            field_type: FieldType::Text,
            question: format!("Correção {}", id),
            placeholder: None,
            is_required: true,
            display_order: 0,
            options: None,
            allowed_file_types: None,
            max_file_size_mb: None,
            min_length: None,
            max_length: None,
            is_active: true,
            source: "admin".to_string(),
        }
    }

    fn application(status: ApplicationStatus) -> Application {
        Application {
            id: Uuid::new_v4(),
            display_id: 42,
            customer_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            visa_type: "Turismo".to_string(),
            processing_option: "Normal".to_string(),
            status,
            adhoc_fields: Json(Vec::new()),
            min_adhoc_field_id: 0,
            resubmission_requests: Json(Vec::new()),
            resubmission_target: None,
            resubmission_traveler_id: None,
            requested_field_ids: None,
            resubmission_note: None,
            form_responses: Json(HashMap::new()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(traveler_id: Option<i32>, field_ids: Vec<FieldKey>) -> ResubmissionRequest {
        ResubmissionRequest {
            id: Uuid::new_v4().to_string(),
            target: RequestTarget::Traveler,
            traveler_id,
            field_ids,
            note: None,
            requested_at: Utc::now(),
            fulfilled_at: None,
        }
    }

    fn full_passport() -> PassportData {
        PassportData {
            passport_number: Some("AB1234567".to_string()),
            passport_expiry_date: Some("2031-04-12".parse().unwrap()),
            residence_country: Some("BR".to_string()),
            has_schengen_visa: Some(false),
        }
    }

    #[test]
    fn open_request_restricts_user_view_to_requested_fields() {
        let catalog = vec![catalog_field(101, 0, true), catalog_field(102, 1, false)];
        let mut app = application(ApplicationStatus::Resubmission);
        let mut adhoc = adhoc_field(-1, Some(5));
        adhoc.display_order = 99;
        app.adhoc_fields.0.push(adhoc);
        app.resubmission_requests.0.push(request(
            Some(5),
            vec![FieldKey::Field(102), FieldKey::Field(-1)],
        ));

        let answers = HashMap::new();
        let passport = full_passport();
        let ctx = VisibilityContext {
            catalog: &catalog,
            app: &app,
            scope: ResponseScope::Traveler(5),
            passport: &passport,
            answers: &answers,
            mode: ViewMode::User,
        };

        let fields = resolve_visible_fields(&ctx);
        let keys: Vec<FieldKey> = fields.iter().map(|f| f.key).collect();
        assert_eq!(keys, vec![FieldKey::Field(102), FieldKey::Field(-1)]);
        assert!(fields.iter().all(|f| f.editable));
    }

    #[test]
    fn admin_view_unions_catalog_and_adhoc_read_only() {
        let catalog = vec![catalog_field(101, 0, true), catalog_field(102, 1, false)];
        let mut app = application(ApplicationStatus::Resubmission);
        app.adhoc_fields.0.push(adhoc_field(-1, Some(5)));
        app.resubmission_requests.0.push(request(Some(5), vec![FieldKey::Field(102)]));

        let answers = HashMap::new();
        let passport = full_passport();
        let ctx = VisibilityContext {
            catalog: &catalog,
            app: &app,
            scope: ResponseScope::Traveler(5),
            passport: &passport,
            answers: &answers,
            mode: ViewMode::Admin,
        };

        let fields = resolve_visible_fields(&ctx);
        let keys: Vec<FieldKey> = fields.iter().map(|f| f.key).collect();
        assert!(keys.contains(&FieldKey::Field(101)));
        assert!(keys.contains(&FieldKey::Field(102)));
        assert!(keys.contains(&FieldKey::Field(-1)));
        assert!(fields.iter().all(|f| !f.editable));

        // Dedup: o 102 aparece uma vez só, mesmo nomeado pelo pedido e
        // presente no catálogo.
        assert_eq!(keys.iter().filter(|k| **k == FieldKey::Field(102)).count(), 1);
    }

    #[test]
    fn missing_passport_attribute_appends_pseudo_field_in_admin_view() {
        // Cenário D: _passport_number vazio aparece sem nenhum pedido nomeá-lo.
        let catalog = vec![catalog_field(101, 0, true)];
        let app = application(ApplicationStatus::Processing);

        let mut passport = full_passport();
        passport.passport_number = None;
        let answers = HashMap::new();

        let ctx = VisibilityContext {
            catalog: &catalog,
            app: &app,
            scope: ResponseScope::Applicant,
            passport: &passport,
            answers: &answers,
            mode: ViewMode::Admin,
        };

        let fields = resolve_visible_fields(&ctx);
        let first = fields.first().expect("lista não pode ser vazia");
        // Ordem-sentinela negativa: o passaporte renderiza antes do catálogo.
        assert_eq!(first.key, FieldKey::Passport(PassportField::Number));
        assert_eq!(first.source, FieldSource::Passport);
    }

    #[test]
    fn passport_answer_falls_back_to_structured_column() {
        let catalog = vec![catalog_field(101, 0, false)];
        let mut app = application(ApplicationStatus::Resubmission);
        app.resubmission_requests.0.push(ResubmissionRequest {
            id: "r1".to_string(),
            target: RequestTarget::Application,
            traveler_id: None,
            field_ids: vec![FieldKey::Passport(PassportField::Number)],
            note: None,
            requested_at: Utc::now(),
            fulfilled_at: None,
        });

        let passport = full_passport();
        let answers = HashMap::new();
        let ctx = VisibilityContext {
            catalog: &catalog,
            app: &app,
            scope: ResponseScope::Applicant,
            passport: &passport,
            answers: &answers,
            mode: ViewMode::User,
        };

        let fields = resolve_visible_fields(&ctx);
        assert_eq!(fields.len(), 1);
        assert_eq!(
            fields[0].answer.as_ref().and_then(|a| a.value.clone()),
            Some("AB1234567".to_string())
        );
    }

    #[test]
    fn user_without_requests_sees_active_catalog() {
        let mut inactive = catalog_field(103, 2, false);
        inactive.is_active = false;
        let catalog = vec![
            catalog_field(101, 1, true),
            catalog_field(102, 0, false),
            inactive,
        ];
        let app = application(ApplicationStatus::Draft);

        let passport = full_passport();
        let answers = HashMap::new();
        let ctx = VisibilityContext {
            catalog: &catalog,
            app: &app,
            scope: ResponseScope::Applicant,
            passport: &passport,
            answers: &answers,
            mode: ViewMode::User,
        };

        let fields = resolve_visible_fields(&ctx);
        let keys: Vec<FieldKey> = fields.iter().map(|f| f.key).collect();
        // Inativo filtrado; ordenado por display_order
        assert_eq!(keys, vec![FieldKey::Field(102), FieldKey::Field(101)]);
        assert!(fields.iter().all(|f| f.editable));
    }

    #[test]
    fn deleted_field_with_stored_answer_still_renders() {
        let catalog = vec![catalog_field(101, 0, false)];
        let mut app = application(ApplicationStatus::Resubmission);
        app.resubmission_requests.0.push(ResubmissionRequest {
            id: "r1".to_string(),
            target: RequestTarget::Application,
            traveler_id: None,
            field_ids: vec![FieldKey::Field(999)],
            note: None,
            requested_at: Utc::now(),
            fulfilled_at: None,
        });

        let passport = full_passport();
        let mut answers = HashMap::new();
        answers.insert(
            "999".to_string(),
            Answer { value: Some("resposta antiga".to_string()), ..Default::default() },
        );

        let ctx = VisibilityContext {
            catalog: &catalog,
            app: &app,
            scope: ResponseScope::Applicant,
            passport: &passport,
            answers: &answers,
            mode: ViewMode::User,
        };

        let fields = resolve_visible_fields(&ctx);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].key, FieldKey::Field(999));
        assert!(fields[0].answer.is_some());
    }
}
