// src/services/resubmission_service.rs

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::{Acquire, Executor, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ApplicationRepository, ProductRepository, TravelerRepository, UserRepository},
    models::application::{
        AdHocField, Answer, AnswerMap, Application, ApplicationStatus, FieldKey, RequestTarget,
        ResponseScope, ResubmissionRequest,
    },
    models::catalog::FieldType,
    services::catalog_service,
    services::notification_service::{NotificationKind, NotificationService},
};

// =============================================================================
//  PAYLOADS DO SERVIÇO
// =============================================================================

/// Definição inline de um campo ad hoc (o id é alocado pelo registro).
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAdHocFieldInput {
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
}

impl NewAdHocFieldInput {
    fn into_adhoc(self, id: i32, traveler_id: Option<i32>) -> AdHocField {
        AdHocField {
            id,
            traveler_id,
            field_type: self.field_type,
            question: self.question,
            placeholder: self.placeholder,
            is_required: self.is_required,
            display_order: self.display_order,
            options: self.options,
            allowed_file_types: self.allowed_file_types,
            max_file_size_mb: self.max_file_size_mb,
            min_length: self.min_length,
            max_length: self.max_length,
            is_active: true,
            source: "admin".to_string(),
        }
    }
}

/// Um pedido de correção: alvo + campos existentes + definições inline.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResubmissionRequestInput {
    pub target: RequestTarget,
    pub traveler_id: Option<i32>,
    /// Ids já existentes (catálogo, ad hoc ou pseudo-chaves de passaporte)
    #[serde(default)]
    #[schema(value_type = Vec<String>, example = json!([201, "_passport_number"]))]
    pub field_ids: Vec<FieldKey>,
    /// Campos novos a criar no registro ad hoc
    #[serde(default)]
    pub new_fields: Vec<NewAdHocFieldInput>,
    pub note: Option<String>,
}

// =============================================================================
//  FULFILLMENT (puro, roda depois de cada submissão)
// =============================================================================

#[derive(Debug, Default)]
pub struct FulfillmentOutcome {
    pub fulfilled_request_ids: Vec<String>,
    /// true quando o último pedido aberto fechou e o status virou processing
    pub workflow_complete: bool,
}

/// Atribui a submissão recém-mesclada aos pedidos abertos do escopo. Um
/// pedido fecha quando TODOS os seus ids têm resposta preenchida no mapa
/// (a chave canônica cobre a dualidade número/string). Se todos os pedidos
/// da aplicação fecharam, a lista e os campos legados são zerados e o status
/// vira `processing`; senão a aplicação segue em `resubmission` com os
/// pedidos restantes — viajantes independentes corrigem em ritmos próprios.
pub fn apply_fulfillment(
    app: &mut Application,
    scope: ResponseScope,
    scope_answers: &AnswerMap,
    now: DateTime<Utc>,
) -> FulfillmentOutcome {
    let mut outcome = FulfillmentOutcome::default();

    if !app.resubmission_requests.is_empty() {
        for req in app.resubmission_requests.0.iter_mut().filter(|r| r.is_open()) {
            if !req.matches_scope(scope) {
                continue;
            }
            let satisfied = req
                .field_ids
                .iter()
                .all(|key| answer_present(scope_answers, &key.storage_key()));
            if satisfied {
                req.fulfilled_at = Some(now);
                outcome.fulfilled_request_ids.push(req.id.clone());
            }
        }

        if !outcome.fulfilled_request_ids.is_empty() && app.all_requests_fulfilled() {
            // Reset completo do workflow de correção
            app.resubmission_requests.0.clear();
            app.clear_legacy_request();
            app.status = ApplicationStatus::Processing;
            outcome.workflow_complete = true;
        }
        return outcome;
    }

    // Compatibilidade: pedido único legado em campos achatados
    if app.legacy_request_matches(scope) {
        let ids = app.requested_field_ids.clone().unwrap_or_default();
        let satisfied = ids
            .iter()
            .all(|id| answer_present(scope_answers, &id.to_string()));
        if satisfied {
            app.clear_legacy_request();
            app.status = ApplicationStatus::Processing;
            outcome.fulfilled_request_ids.push("legacy".to_string());
            outcome.workflow_complete = true;
        }
    }

    outcome
}

fn answer_present(answers: &AnswerMap, key: &str) -> bool {
    answers.get(key).is_some_and(Answer::is_filled)
}

/// Próximo id ad hoc: um a menos que a marca d'água (0 = nada alocado ainda).
pub fn next_adhoc_id(min_adhoc_field_id: i32) -> i32 {
    min_adhoc_field_id.min(0) - 1
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct ResubmissionService {
    application_repo: ApplicationRepository,
    traveler_repo: TravelerRepository,
    product_repo: ProductRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
}

impl ResubmissionService {
    pub fn new(
        application_repo: ApplicationRepository,
        traveler_repo: TravelerRepository,
        product_repo: ProductRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            application_repo,
            traveler_repo,
            product_repo,
            user_repo,
            notifications,
        }
    }

    /// Abre pedidos de correção (possivelmente vários, para viajantes
    /// distintos), cria os campos ad hoc inline e põe a aplicação em
    /// `resubmission`. Tudo numa transação só.
    pub async fn request_resubmission<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        inputs: Vec<ResubmissionRequestInput>,
    ) -> Result<Application, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if inputs.is_empty() {
            return Err(AppError::InvalidInput("nenhum pedido informado".to_string()));
        }

        let mut tx = executor.begin().await?;

        let mut app = self
            .application_repo
            .get_for_update(&mut *tx, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        if !app.status.is_in_process() {
            return Err(AppError::StateConflict(format!(
                "aplicação em {:?} não aceita pedido de reenvio",
                app.status
            )));
        }

        let catalog = self
            .product_repo
            .list_fields(&mut *tx, app.product_id, true)
            .await?;

        let now = Utc::now();

        for input in inputs {
            let traveler_id = match input.target {
                RequestTarget::Traveler => {
                    // Sem traveler_id = Viajante 1 (registro do cliente)
                    if let Some(id) = input.traveler_id {
                        self.traveler_repo
                            .get(&mut *tx, application_id, id)
                            .await?
                            .ok_or_else(|| AppError::NotFound(format!("viajante {}", id)))?;
                        Some(id)
                    } else {
                        None
                    }
                }
                RequestTarget::Application => None,
            };

            // Ids existentes precisam apontar para algo conhecido
            for key in &input.field_ids {
                match key {
                    FieldKey::Field(id) if *id > 0 => {
                        if !catalog.iter().any(|f| f.id == *id) {
                            return Err(AppError::InvalidInput(format!(
                                "campo {} não existe no catálogo do produto",
                                id
                            )));
                        }
                    }
                    FieldKey::Field(id) => {
                        if app.find_adhoc(*id).is_none() {
                            return Err(AppError::InvalidInput(format!(
                                "campo ad hoc {} não existe nesta aplicação",
                                id
                            )));
                        }
                    }
                    FieldKey::Passport(_) => {}
                }
            }

            let mut field_ids = input.field_ids.clone();

            // Cria os campos inline no registro ad hoc
            for new_field in input.new_fields {
                let id = next_adhoc_id(app.min_adhoc_field_id);
                let adhoc = new_field.into_adhoc(id, traveler_id);
                catalog_service::validate_definition(&adhoc.as_definition())?;
                app.min_adhoc_field_id = id;
                app.adhoc_fields.0.push(adhoc);
                field_ids.push(FieldKey::Field(id));
            }

            if field_ids.is_empty() {
                return Err(AppError::InvalidInput(
                    "pedido de reenvio sem nenhum campo".to_string(),
                ));
            }

            app.resubmission_requests.0.push(ResubmissionRequest {
                id: Uuid::new_v4().to_string(),
                target: input.target,
                traveler_id,
                field_ids,
                note: input.note,
                requested_at: now,
                fulfilled_at: None,
            });
        }

        // Escrita idempotente: se já está em resubmission, não mexe
        if app.status != ApplicationStatus::Resubmission {
            app.status = ApplicationStatus::Resubmission;
        }

        let saved = self.application_repo.save_workflow_state(&mut *tx, &app).await?;

        tx.commit().await?;

        // Notificação best-effort, nunca bloqueia nem desfaz a transição
        if let Ok(Some(customer)) = self.user_repo.find_by_id(saved.customer_id).await {
            self.notifications.notify(
                &customer.email,
                &saved.tracking_number(),
                NotificationKind::ResubmissionRequested,
            );
        }

        Ok(saved)
    }

    /// Pedidos ainda abertos; o pedido único legado aparece sintetizado para
    /// que clientes novos enxerguem as duas representações do mesmo jeito.
    pub async fn get_active_requests<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
    ) -> Result<Vec<ResubmissionRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let app = self
            .application_repo
            .get_by_id(executor, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        if !app.resubmission_requests.is_empty() {
            return Ok(app.open_requests().cloned().collect());
        }

        if let Some(ids) = app.requested_field_ids.as_ref().filter(|ids| !ids.is_empty()) {
            let target = match app.resubmission_target.as_deref() {
                Some("traveler") => RequestTarget::Traveler,
                _ => RequestTarget::Application,
            };
            return Ok(vec![ResubmissionRequest {
                id: "legacy".to_string(),
                target,
                traveler_id: app.resubmission_traveler_id,
                field_ids: ids.iter().map(|id| FieldKey::Field(*id)).collect(),
                note: app.resubmission_note.clone(),
                requested_at: app.updated_at,
                fulfilled_at: None,
            }]);
        }

        Ok(Vec::new())
    }

    // =========================================================================
    //  REGISTRO AD HOC
    // =========================================================================

    pub async fn add_adhoc_fields<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        traveler_id: Option<i32>,
        inputs: Vec<NewAdHocFieldInput>,
    ) -> Result<Vec<AdHocField>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if inputs.is_empty() {
            return Err(AppError::InvalidInput("nenhum campo informado".to_string()));
        }

        let mut tx = executor.begin().await?;

        let mut app = self
            .application_repo
            .get_for_update(&mut *tx, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        if !app.status.is_in_process() {
            return Err(AppError::StateConflict(format!(
                "aplicação em {:?} não aceita campos ad hoc",
                app.status
            )));
        }

        if let Some(id) = traveler_id {
            self.traveler_repo
                .get(&mut *tx, application_id, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("viajante {}", id)))?;
        }

        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let id = next_adhoc_id(app.min_adhoc_field_id);
            let adhoc = input.into_adhoc(id, traveler_id);
            catalog_service::validate_definition(&adhoc.as_definition())?;
            app.min_adhoc_field_id = id;
            app.adhoc_fields.0.push(adhoc.clone());
            created.push(adhoc);
        }

        self.application_repo.save_workflow_state(&mut *tx, &app).await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Remove do registro. Respostas já armazenadas com o id continuam lá.
    pub async fn remove_adhoc_field<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        field_id: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let mut app = self
            .application_repo
            .get_for_update(&mut *tx, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        let before = app.adhoc_fields.len();
        app.adhoc_fields.0.retain(|f| f.id != field_id);
        if app.adhoc_fields.len() == before {
            return Err(AppError::NotFound(format!(
                "campo ad hoc {} na aplicação {}",
                field_id, application_id
            )));
        }

        self.application_repo.save_workflow_state(&mut *tx, &app).await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use std::collections::HashMap;

    fn application(status: ApplicationStatus) -> Application {
        Application {
            id: Uuid::new_v4(),
            display_id: 7,
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

    fn open_request(
        id: &str,
        target: RequestTarget,
        traveler_id: Option<i32>,
        field_ids: Vec<FieldKey>,
    ) -> ResubmissionRequest {
        ResubmissionRequest {
            id: id.to_string(),
            target,
            traveler_id,
            field_ids,
            note: None,
            requested_at: Utc::now(),
            fulfilled_at: None,
        }
    }

    fn filled(value: &str) -> Answer {
        Answer { value: Some(value.to_string()), ..Default::default() }
    }

    #[test]
    fn adhoc_ids_walk_down_from_zero() {
        assert_eq!(next_adhoc_id(0), -1);
        assert_eq!(next_adhoc_id(-1), -2);
        assert_eq!(next_adhoc_id(-7), -8);
        // Marca d'água corrompida para positivo não gera id positivo
        assert_eq!(next_adhoc_id(3), -1);
    }

    #[test]
    fn answering_adhoc_request_completes_workflow() {
        // Cenário B: um pedido de viajante nomeando [-1]; a resposta fecha o
        // pedido e o status vira processing.
        let mut app = application(ApplicationStatus::Resubmission);
        app.resubmission_requests.0.push(open_request(
            "r1",
            RequestTarget::Traveler,
            Some(5),
            vec![FieldKey::Field(-1)],
        ));

        let mut answers = HashMap::new();
        answers.insert("-1".to_string(), filled("valor corrigido"));

        let outcome =
            apply_fulfillment(&mut app, ResponseScope::Traveler(5), &answers, Utc::now());

        assert_eq!(outcome.fulfilled_request_ids, vec!["r1".to_string()]);
        assert!(outcome.workflow_complete);
        assert_eq!(app.status, ApplicationStatus::Processing);
        assert!(app.resubmission_requests.is_empty());
    }

    #[test]
    fn independent_travelers_complete_on_their_own_schedule() {
        // Cenário C: viajante 5 precisa do 201, viajante 6 do 202.
        let mut app = application(ApplicationStatus::Resubmission);
        app.resubmission_requests.0.push(open_request(
            "r5",
            RequestTarget::Traveler,
            Some(5),
            vec![FieldKey::Field(201)],
        ));
        app.resubmission_requests.0.push(open_request(
            "r6",
            RequestTarget::Traveler,
            Some(6),
            vec![FieldKey::Field(202)],
        ));

        // Viajante 5 responde primeiro
        let mut answers5 = HashMap::new();
        answers5.insert("201".to_string(), filled("ok"));
        let outcome =
            apply_fulfillment(&mut app, ResponseScope::Traveler(5), &answers5, Utc::now());

        assert_eq!(outcome.fulfilled_request_ids, vec!["r5".to_string()]);
        assert!(!outcome.workflow_complete);
        assert_eq!(app.status, ApplicationStatus::Resubmission);
        assert!(app.resubmission_requests.0[0].fulfilled_at.is_some());
        assert!(app.resubmission_requests.0[1].fulfilled_at.is_none());

        // Viajante 6 fecha o que falta
        let mut answers6 = HashMap::new();
        answers6.insert("202".to_string(), filled("ok"));
        let outcome =
            apply_fulfillment(&mut app, ResponseScope::Traveler(6), &answers6, Utc::now());

        assert!(outcome.workflow_complete);
        assert_eq!(app.status, ApplicationStatus::Processing);
    }

    #[test]
    fn submission_for_wrong_scope_fulfills_nothing() {
        let mut app = application(ApplicationStatus::Resubmission);
        app.resubmission_requests.0.push(open_request(
            "r5",
            RequestTarget::Traveler,
            Some(5),
            vec![FieldKey::Field(201)],
        ));

        let mut answers = HashMap::new();
        answers.insert("201".to_string(), filled("ok"));

        // Mesmo campo, escopo errado (aplicação em vez do viajante 5)
        let outcome =
            apply_fulfillment(&mut app, ResponseScope::Applicant, &answers, Utc::now());

        assert!(outcome.fulfilled_request_ids.is_empty());
        assert_eq!(app.status, ApplicationStatus::Resubmission);
    }

    #[test]
    fn partial_answers_leave_request_open() {
        let mut app = application(ApplicationStatus::Resubmission);
        app.resubmission_requests.0.push(open_request(
            "r1",
            RequestTarget::Application,
            None,
            vec![FieldKey::Field(101), FieldKey::Field(102)],
        ));

        let mut answers = HashMap::new();
        answers.insert("101".to_string(), filled("só metade"));
        // 102 presente mas vazio não conta
        answers.insert("102".to_string(), Answer::default());

        let outcome =
            apply_fulfillment(&mut app, ResponseScope::Applicant, &answers, Utc::now());

        assert!(outcome.fulfilled_request_ids.is_empty());
        assert_eq!(app.status, ApplicationStatus::Resubmission);
    }

    #[test]
    fn passport_pseudo_key_counts_for_fulfillment() {
        let mut app = application(ApplicationStatus::Resubmission);
        app.resubmission_requests.0.push(open_request(
            "r1",
            RequestTarget::Application,
            None,
            vec![FieldKey::parse("_passport_number").unwrap()],
        ));

        let mut answers = HashMap::new();
        answers.insert("_passport_number".to_string(), filled("AB1234567"));

        let outcome =
            apply_fulfillment(&mut app, ResponseScope::Applicant, &answers, Utc::now());

        assert!(outcome.workflow_complete);
        assert_eq!(app.status, ApplicationStatus::Processing);
    }

    #[test]
    fn legacy_single_request_transitions_directly_to_processing() {
        let mut app = application(ApplicationStatus::AdditionalInfoRequired);
        app.resubmission_target = Some("traveler".to_string());
        app.resubmission_traveler_id = Some(9);
        app.requested_field_ids = Some(vec![301, 302]);
        app.resubmission_note = Some("foto ilegível".to_string());

        let mut answers = HashMap::new();
        answers.insert("301".to_string(), filled("a"));
        answers.insert("302".to_string(), filled("b"));

        let outcome =
            apply_fulfillment(&mut app, ResponseScope::Traveler(9), &answers, Utc::now());

        assert!(outcome.workflow_complete);
        assert_eq!(app.status, ApplicationStatus::Processing);
        assert!(app.requested_field_ids.is_none());
        assert!(app.resubmission_note.is_none());
    }

    #[test]
    fn request_list_wins_over_legacy_fields() {
        // As duas representações populadas: a lista é canônica.
        let mut app = application(ApplicationStatus::Resubmission);
        app.requested_field_ids = Some(vec![301]);
        app.resubmission_requests.0.push(open_request(
            "r1",
            RequestTarget::Application,
            None,
            vec![FieldKey::Field(101)],
        ));

        let mut answers = HashMap::new();
        answers.insert("301".to_string(), filled("responde só o legado"));

        let outcome =
            apply_fulfillment(&mut app, ResponseScope::Applicant, &answers, Utc::now());

        // O legado não fecha nada enquanto a lista existir
        assert!(outcome.fulfilled_request_ids.is_empty());
        assert_eq!(app.status, ApplicationStatus::Resubmission);
    }

    #[test]
    fn fulfillment_clears_legacy_fields_with_the_list() {
        let mut app = application(ApplicationStatus::Resubmission);
        app.requested_field_ids = Some(vec![301]);
        app.resubmission_target = Some("application".to_string());
        app.resubmission_requests.0.push(open_request(
            "r1",
            RequestTarget::Application,
            None,
            vec![FieldKey::Field(101)],
        ));

        let mut answers = HashMap::new();
        answers.insert("101".to_string(), filled("ok"));

        let outcome =
            apply_fulfillment(&mut app, ResponseScope::Applicant, &answers, Utc::now());

        assert!(outcome.workflow_complete);
        assert!(app.requested_field_ids.is_none());
        assert!(app.resubmission_target.is_none());
    }
}
