// src/services/response_service.rs

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ApplicationRepository, TravelerRepository, UserRepository},
    models::application::{
        Answer, AnswerMap, Application, ApplicationStatus, FieldKey, PassportData, PassportField,
        ResponseScope, Traveler,
    },
    models::auth::User,
    models::catalog::{FieldDefinition, FieldType},
    services::catalog_service::CatalogService,
    services::notification_service::{NotificationKind, NotificationService},
    services::resubmission_service::{apply_fulfillment, FulfillmentOutcome},
    services::upload_service,
    services::visibility_service::{resolve_visible_fields, ViewMode, VisibilityContext},
};

// =============================================================================
//  PAYLOADS
// =============================================================================

/// Uma resposta como chega do cliente: valor e/ou referência de arquivo já
/// armazenado no Upload Store. Clientes legados mandam o valor como escalar
/// nu (`{"101": "Jane"}`); os dois formatos são aceitos.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(from = "IncomingAnswerRepr", rename_all = "camelCase")]
pub struct IncomingAnswer {
    pub value: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IncomingAnswerRepr {
    Structured {
        #[serde(default)]
        value: Option<String>,
        #[serde(rename = "filePath", default)]
        file_path: Option<String>,
        #[serde(rename = "fileName", default)]
        file_name: Option<String>,
        #[serde(rename = "fileSize", default)]
        file_size: Option<i64>,
    },
    Scalar(serde_json::Value),
}

impl From<IncomingAnswerRepr> for IncomingAnswer {
    fn from(repr: IncomingAnswerRepr) -> Self {
        match repr {
            IncomingAnswerRepr::Structured { value, file_path, file_name, file_size } => {
                IncomingAnswer { value, file_path, file_name, file_size }
            }
            IncomingAnswerRepr::Scalar(scalar) => {
                let value = match scalar {
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                };
                IncomingAnswer { value, ..Default::default() }
            }
        }
    }
}

impl IncomingAnswer {
    fn into_answer(self, now: DateTime<Utc>) -> Answer {
        Answer {
            value: self.value,
            file_path: self.file_path,
            file_name: self.file_name,
            file_size: self.file_size,
            submitted_at: Some(now),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub application: Application,
    /// Chaves fora do escopo permitido, filtradas em vez de rejeitadas
    pub warnings: Vec<String>,
    pub fulfilled_request_ids: Vec<String>,
}

// =============================================================================
//  MOTOR DE VALIDAÇÃO (puro, despacha pela tag field_type)
// =============================================================================

pub fn validate_answer(def: &FieldDefinition, answer: &IncomingAnswer) -> Result<(), String> {
    if def.field_type == FieldType::Upload {
        let (Some(file_name), Some(_)) = (answer.file_name.as_deref(), answer.file_path.as_deref())
        else {
            return if def.is_required || answer.value.is_some() {
                Err("missing_file".to_string())
            } else {
                Ok(())
            };
        };
        return upload_service::check_file_constraints(def, file_name, answer.file_size)
            .map_err(|code| code.to_string());
    }

    let value = answer.value.as_deref().map(str::trim).unwrap_or("");
    if value.is_empty() {
        return if def.is_required {
            Err("required".to_string())
        } else {
            Ok(())
        };
    }

    match def.field_type {
        FieldType::Number => {
            if value.parse::<f64>().is_err() {
                return Err("invalid_number".to_string());
            }
        }
        FieldType::Date => {
            if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                return Err("invalid_date_format".to_string()); // Espera YYYY-MM-DD
            }
        }
        FieldType::Dropdown => {
            let in_options = def
                .options
                .as_ref()
                .is_some_and(|opts| opts.iter().any(|o| o == value));
            if !in_options {
                return Err("invalid_option".to_string());
            }
        }
        FieldType::Text | FieldType::Textarea => {
            let len = value.chars().count() as i32;
            if def.min_length.is_some_and(|min| len < min) {
                return Err("too_short".to_string());
            }
            if def.max_length.is_some_and(|max| len > max) {
                return Err("too_long".to_string());
            }
        }
        FieldType::Upload => unreachable!("tratado acima"),
    }

    Ok(())
}

// =============================================================================
//  PREPARO DA SUBMISSÃO (puro)
// =============================================================================

#[derive(Debug)]
pub struct PreparedSubmission {
    pub accepted: Vec<(FieldKey, Answer)>,
    pub warnings: Vec<String>,
}

/// Filtra, valida e materializa uma submissão contra o estado atual do escopo:
///   - chave sem definição em lugar nenhum => InvalidInput
///   - chave válida mas fora do escopo visível => filtrada com warning
///   - valor violando a definição => InvalidInput com os códigos por campo
///   - em rascunho, a submissão é o envio do formulário: todo campo
///     obrigatório ativo precisa estar preenchido depois da mesclagem
pub fn prepare_submission(
    catalog: &[FieldDefinition],
    app: &Application,
    scope: ResponseScope,
    passport: &PassportData,
    current: &AnswerMap,
    incoming: Vec<(FieldKey, IncomingAnswer)>,
    now: DateTime<Utc>,
) -> Result<PreparedSubmission, AppError> {
    // O que o usuário enxerga é o que ele pode responder
    let ctx = VisibilityContext {
        catalog,
        app,
        scope,
        passport,
        answers: current,
        mode: ViewMode::User,
    };
    let visible = resolve_visible_fields(&ctx);
    let allowed: HashMap<FieldKey, FieldDefinition> =
        visible.iter().map(|f| (f.key, f.as_definition())).collect();

    let mut warnings = Vec::new();
    let mut accepted: Vec<(FieldKey, IncomingAnswer)> = Vec::new();

    for (key, answer) in incoming {
        if allowed.contains_key(&key) {
            accepted.push((key, answer));
            continue;
        }

        // Fora do escopo visível: se o id existe em alguma fonte, é filtrado
        // com aviso (payloads parciais/legados); se não existe em lugar
        // nenhum, é entrada inválida.
        let known = match key {
            FieldKey::Passport(_) => true,
            FieldKey::Field(id) if id > 0 => catalog.iter().any(|f| f.id == id),
            FieldKey::Field(id) => app.find_adhoc(id).is_some(),
        };
        if known {
            warnings.push(format!("campo fora do escopo atual, ignorado: {}", key));
        } else {
            return Err(AppError::InvalidInput(format!(
                "id de campo desconhecido no payload: {}",
                key
            )));
        }
    }

    // Valida o que sobrou, juntando os códigos por campo
    let mut errors: HashMap<String, String> = HashMap::new();
    for (key, answer) in &accepted {
        let def = &allowed[key];
        if let Err(code) = validate_answer(def, answer) {
            errors.insert(key.storage_key(), code);
        }
    }
    if !errors.is_empty() {
        let mut parts: Vec<String> =
            errors.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        parts.sort();
        return Err(AppError::InvalidInput(parts.join("; ")));
    }

    // Em rascunho a submissão É o envio do formulário completo
    if app.status == ApplicationStatus::Draft {
        let mut missing: Vec<String> = Vec::new();
        for field in &visible {
            if !field.is_required {
                continue;
            }
            let submitted_now = accepted
                .iter()
                .any(|(k, a)| *k == field.key && incoming_is_filled(a));
            let already_there = current
                .get(&field.key.storage_key())
                .is_some_and(Answer::is_filled)
                || field.answer.as_ref().is_some_and(Answer::is_filled);
            if !submitted_now && !already_there {
                missing.push(field.key.storage_key());
            }
        }
        if !missing.is_empty() {
            missing.sort();
            return Err(AppError::InvalidInput(format!(
                "campo obrigatório ausente: {}",
                missing.join(", ")
            )));
        }
    }

    Ok(PreparedSubmission {
        accepted: accepted
            .into_iter()
            .map(|(key, answer)| (key, answer.into_answer(now)))
            .collect(),
        warnings,
    })
}

fn incoming_is_filled(answer: &IncomingAnswer) -> bool {
    answer.value.as_deref().is_some_and(|v| !v.trim().is_empty()) || answer.file_path.is_some()
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct ResponseService {
    application_repo: ApplicationRepository,
    traveler_repo: TravelerRepository,
    user_repo: UserRepository,
    catalog_service: CatalogService,
    notifications: NotificationService,
}

impl ResponseService {
    pub fn new(
        application_repo: ApplicationRepository,
        traveler_repo: TravelerRepository,
        user_repo: UserRepository,
        catalog_service: CatalogService,
        notifications: NotificationService,
    ) -> Self {
        Self {
            application_repo,
            traveler_repo,
            user_repo,
            catalog_service,
            notifications,
        }
    }

    /// Recebe, valida e grava as respostas de um escopo, e roda a checagem de
    /// fulfillment — tudo dentro de uma transação que trava a raiz do
    /// agregado (e a linha do viajante, se houver).
    pub async fn submit_responses<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        traveler_id: Option<i32>,
        responses: HashMap<String, IncomingAnswer>,
        acting_user: &User,
    ) -> Result<SubmissionOutcome, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // Normaliza as chaves na borda; daqui pra dentro só FieldKey
        let mut incoming: Vec<(FieldKey, IncomingAnswer)> = Vec::with_capacity(responses.len());
        for (raw, answer) in responses {
            let key = FieldKey::parse(&raw).ok_or_else(|| {
                AppError::InvalidInput(format!("chave de campo inválida no payload: '{}'", raw))
            })?;
            incoming.push((key, answer));
        }

        let mut tx = executor.begin().await?;

        let mut app = self
            .application_repo
            .get_for_update(&mut *tx, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        if !acting_user.is_admin && app.customer_id != acting_user.id {
            return Err(AppError::NotFound(format!("aplicação {}", application_id)));
        }
        if !app.status.accepts_responses() {
            return Err(AppError::StateConflict(format!(
                "aplicação em {:?} não aceita respostas",
                app.status
            )));
        }

        let scope = ResponseScope::from_traveler_id(traveler_id);

        let mut traveler: Option<Traveler> = match scope {
            ResponseScope::Traveler(id) => Some(
                self.traveler_repo
                    .get_for_update(&mut *tx, application_id, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("viajante {}", id)))?,
            ),
            ResponseScope::Applicant => None,
        };

        let customer = self
            .user_repo
            .find_by_id(app.customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cliente {}", app.customer_id)))?;

        let passport = match &traveler {
            Some(t) => t.passport_data(),
            None => PassportData {
                passport_number: customer.passport_number.clone(),
                passport_expiry_date: customer.passport_expiry_date,
                residence_country: customer.residence_country.clone(),
                has_schengen_visa: customer.has_schengen_visa,
            },
        };

        let catalog = self
            .catalog_service
            .list_fields(&mut *tx, app.product_id, true)
            .await?;

        let current: AnswerMap = match &traveler {
            Some(t) => t.form_responses.0.clone(),
            None => app.form_responses.0.clone(),
        };

        let now = Utc::now();
        let prepared =
            prepare_submission(&catalog, &app, scope, &passport, &current, incoming, now)?;

        // Mescla no mapa do escopo e sincroniza as colunas de passaporte
        let mut passport_updates: Vec<(PassportField, String)> = Vec::new();
        {
            let target: &mut AnswerMap = match traveler.as_mut() {
                Some(t) => &mut t.form_responses.0,
                None => &mut app.form_responses.0,
            };
            for (key, answer) in &prepared.accepted {
                if let (Some(p), Some(value)) = (key.as_passport(), answer.value.as_deref()) {
                    passport_updates.push((p, value.to_string()));
                }
                target.insert(key.storage_key(), answer.clone());
            }
        }

        match traveler.as_mut() {
            Some(t) => {
                for (field, value) in &passport_updates {
                    apply_passport_to_traveler(t, *field, value);
                }
            }
            None => {
                if !passport_updates.is_empty() {
                    let (number, expiry, country, schengen) =
                        split_passport_updates(&passport_updates);
                    self.user_repo
                        .update_passport(
                            &mut *tx,
                            app.customer_id,
                            number.as_deref(),
                            expiry,
                            country.as_deref(),
                            schengen,
                        )
                        .await?;
                }
            }
        }

        // Transições de estado disparadas pela submissão
        let mut outcome = FulfillmentOutcome::default();
        let was_draft = app.status == ApplicationStatus::Draft;
        if was_draft {
            app.status = ApplicationStatus::Submitted;
        } else if app.status.awaiting_correction() {
            let merged: &AnswerMap = match &traveler {
                Some(t) => &t.form_responses.0,
                None => &app.form_responses.0,
            };
            // O mapa mesclado do escopo decide o que foi atendido
            let merged = merged.clone();
            outcome = apply_fulfillment(&mut app, scope, &merged, now);
        }

        if let Some(t) = &traveler {
            self.traveler_repo.save_responses(&mut *tx, t).await?;
        }
        let saved = self.application_repo.save_workflow_state(&mut *tx, &app).await?;

        tx.commit().await?;

        // Notificações best-effort depois do commit
        if was_draft {
            self.notifications.notify(
                &customer.email,
                &saved.tracking_number(),
                NotificationKind::ApplicationSubmitted,
            );
        } else if outcome.workflow_complete {
            self.notifications.notify(
                &customer.email,
                &saved.tracking_number(),
                NotificationKind::ResubmissionCompleted,
            );
        }

        Ok(SubmissionOutcome {
            application: saved,
            warnings: prepared.warnings,
            fulfilled_request_ids: outcome.fulfilled_request_ids,
        })
    }
}

fn apply_passport_to_traveler(traveler: &mut Traveler, field: PassportField, value: &str) {
    match field {
        PassportField::Number => traveler.passport_number = Some(value.to_string()),
        PassportField::ExpiryDate => {
            // Já validado como data pelo motor de validação
            if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                traveler.passport_expiry_date = Some(date);
            }
        }
        PassportField::ResidenceCountry => traveler.residence_country = Some(value.to_string()),
        PassportField::HasSchengenVisa => {
            traveler.has_schengen_visa = Some(parse_yes_no(value));
        }
    }
}

fn split_passport_updates(
    updates: &[(PassportField, String)],
) -> (Option<String>, Option<NaiveDate>, Option<String>, Option<bool>) {
    let mut number = None;
    let mut expiry = None;
    let mut country = None;
    let mut schengen = None;
    for (field, value) in updates {
        match field {
            PassportField::Number => number = Some(value.clone()),
            PassportField::ExpiryDate => {
                expiry = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
            }
            PassportField::ResidenceCountry => country = Some(value.clone()),
            PassportField::HasSchengenVisa => schengen = Some(parse_yes_no(value)),
        }
    }
    (number, expiry, country, schengen)
}

fn parse_yes_no(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "yes" | "sim" | "true" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    use crate::models::application::{RequestTarget, ResubmissionRequest};

    fn catalog_field(id: i32, field_type: FieldType, required: bool) -> FieldDefinition {
        FieldDefinition {
            product_id: None,
            id,
            field_type,
            question: format!("Pergunta {}", id),
            placeholder: None,
            is_required: required,
            display_order: id,
            options: None,
            allowed_file_types: None,
            max_file_size_mb: None,
            min_length: None,
            max_length: None,
            is_active: true,
        }
    }

    fn application(status: ApplicationStatus) -> Application {
        Application {
            id: Uuid::new_v4(),
            display_id: 1,
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

    fn full_passport() -> PassportData {
        PassportData {
            passport_number: Some("AB1234567".to_string()),
            passport_expiry_date: Some("2031-04-12".parse().unwrap()),
            residence_country: Some("BR".to_string()),
            has_schengen_visa: Some(false),
        }
    }

    fn text_answer(value: &str) -> IncomingAnswer {
        IncomingAnswer { value: Some(value.to_string()), ..Default::default() }
    }

    // --- motor de validação ---

    #[test]
    fn number_and_date_fields_validate_their_formats() {
        let number = catalog_field(1, FieldType::Number, true);
        assert!(validate_answer(&number, &text_answer("42.5")).is_ok());
        assert_eq!(
            validate_answer(&number, &text_answer("quarenta")),
            Err("invalid_number".to_string())
        );

        let date = catalog_field(2, FieldType::Date, true);
        assert!(validate_answer(&date, &text_answer("2031-04-12")).is_ok());
        assert_eq!(
            validate_answer(&date, &text_answer("12/04/2031")),
            Err("invalid_date_format".to_string())
        );
    }

    #[test]
    fn dropdown_value_must_be_in_option_set() {
        let mut dropdown = catalog_field(3, FieldType::Dropdown, true);
        dropdown.options = Some(vec!["Turismo".to_string(), "Negócios".to_string()]);

        assert!(validate_answer(&dropdown, &text_answer("Turismo")).is_ok());
        assert_eq!(
            validate_answer(&dropdown, &text_answer("Estudo")),
            Err("invalid_option".to_string())
        );
    }

    #[test]
    fn text_length_limits_are_enforced() {
        let mut text = catalog_field(4, FieldType::Text, false);
        text.min_length = Some(3);
        text.max_length = Some(5);

        assert_eq!(validate_answer(&text, &text_answer("ab")), Err("too_short".to_string()));
        assert_eq!(
            validate_answer(&text, &text_answer("abcdef")),
            Err("too_long".to_string())
        );
        assert!(validate_answer(&text, &text_answer("abcd")).is_ok());
        // Opcional vazio passa
        assert!(validate_answer(&text, &IncomingAnswer::default()).is_ok());
    }

    #[test]
    fn upload_field_checks_type_and_size() {
        let mut upload = catalog_field(5, FieldType::Upload, true);
        upload.allowed_file_types = Some(vec!["jpg".to_string(), "pdf".to_string()]);
        upload.max_file_size_mb = Some(2);

        let ok = IncomingAnswer {
            file_path: Some("uploads/abc.jpg".to_string()),
            file_name: Some("passaporte.JPG".to_string()),
            file_size: Some(1024 * 1024),
            ..Default::default()
        };
        assert!(validate_answer(&upload, &ok).is_ok());

        let wrong_type = IncomingAnswer {
            file_name: Some("passaporte.png".to_string()),
            ..ok.clone()
        };
        assert_eq!(
            validate_answer(&upload, &wrong_type),
            Err("invalid_file_type".to_string())
        );

        let too_big = IncomingAnswer { file_size: Some(3 * 1024 * 1024), ..ok.clone() };
        assert_eq!(validate_answer(&upload, &too_big), Err("file_too_large".to_string()));

        assert_eq!(
            validate_answer(&upload, &IncomingAnswer::default()),
            Err("missing_file".to_string())
        );
    }

    // --- preparo da submissão ---

    #[test]
    fn draft_submission_missing_required_field_fails() {
        // Cenário A: catálogo [101 obrigatório, 102 upload obrigatório];
        // enviar só o 101 falha apontando o 102.
        let catalog = vec![
            catalog_field(101, FieldType::Text, true),
            {
                let mut f = catalog_field(102, FieldType::Upload, true);
                f.allowed_file_types = Some(vec!["jpg".to_string()]);
                f
            },
        ];
        let app = application(ApplicationStatus::Draft);
        let passport = full_passport();
        let current = HashMap::new();

        let err = prepare_submission(
            &catalog,
            &app,
            ResponseScope::Applicant,
            &passport,
            &current,
            vec![(FieldKey::Field(101), text_answer("Jane"))],
            Utc::now(),
        )
        .unwrap_err();

        match err {
            AppError::InvalidInput(msg) => assert!(msg.contains("102"), "mensagem: {}", msg),
            other => panic!("esperava InvalidInput, veio {:?}", other),
        }
    }

    #[test]
    fn out_of_scope_keys_are_filtered_with_warning_not_rejected() {
        let catalog = vec![
            catalog_field(101, FieldType::Text, false),
            catalog_field(102, FieldType::Text, false),
        ];
        let mut app = application(ApplicationStatus::Resubmission);
        app.resubmission_requests.0.push(ResubmissionRequest {
            id: "r1".to_string(),
            target: RequestTarget::Application,
            traveler_id: None,
            field_ids: vec![FieldKey::Field(101)],
            note: None,
            requested_at: Utc::now(),
            fulfilled_at: None,
        });

        let passport = full_passport();
        let current = HashMap::new();

        let prepared = prepare_submission(
            &catalog,
            &app,
            ResponseScope::Applicant,
            &passport,
            &current,
            vec![
                (FieldKey::Field(101), text_answer("pedido")),
                (FieldKey::Field(102), text_answer("fora do escopo")),
            ],
            Utc::now(),
        )
        .unwrap();

        let keys: Vec<FieldKey> = prepared.accepted.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![FieldKey::Field(101)]);
        assert_eq!(prepared.warnings.len(), 1);
        assert!(prepared.warnings[0].contains("102"));
    }

    #[test]
    fn unknown_field_id_is_invalid_input() {
        let catalog = vec![catalog_field(101, FieldType::Text, false)];
        let app = application(ApplicationStatus::Draft);
        let passport = full_passport();
        let current = HashMap::new();

        let err = prepare_submission(
            &catalog,
            &app,
            ResponseScope::Applicant,
            &passport,
            &current,
            vec![(FieldKey::Field(777), text_answer("?"))],
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn accepted_answers_carry_submission_timestamp() {
        let catalog = vec![catalog_field(101, FieldType::Text, false)];
        let app = application(ApplicationStatus::Draft);
        let passport = full_passport();
        let current = HashMap::new();
        let now = Utc::now();

        let prepared = prepare_submission(
            &catalog,
            &app,
            ResponseScope::Applicant,
            &passport,
            &current,
            vec![(FieldKey::Field(101), text_answer("Jane"))],
            now,
        )
        .unwrap();

        assert_eq!(prepared.accepted[0].1.submitted_at, Some(now));
    }

    #[test]
    fn draft_required_check_accepts_previously_saved_answers() {
        let catalog = vec![
            catalog_field(101, FieldType::Text, true),
            catalog_field(102, FieldType::Text, true),
        ];
        let app = application(ApplicationStatus::Draft);
        let passport = full_passport();

        // O 102 já foi respondido numa visita anterior
        let mut current = HashMap::new();
        current.insert(
            "102".to_string(),
            Answer { value: Some("guardado".to_string()), ..Default::default() },
        );

        let prepared = prepare_submission(
            &catalog,
            &app,
            ResponseScope::Applicant,
            &passport,
            &current,
            vec![(FieldKey::Field(101), text_answer("Jane"))],
            Utc::now(),
        );

        assert!(prepared.is_ok());
    }

    #[test]
    fn incoming_answer_accepts_bare_scalars_and_objects() {
        let bare: IncomingAnswer = serde_json::from_str("\"Jane\"").unwrap();
        assert_eq!(bare.value.as_deref(), Some("Jane"));

        let number: IncomingAnswer = serde_json::from_str("42").unwrap();
        assert_eq!(number.value.as_deref(), Some("42"));

        let structured: IncomingAnswer =
            serde_json::from_str(r#"{"value": "Jane", "fileName": "doc.pdf"}"#).unwrap();
        assert_eq!(structured.value.as_deref(), Some("Jane"));
        assert_eq!(structured.file_name.as_deref(), Some("doc.pdf"));
    }

    #[test]
    fn yes_no_parsing_accepts_legacy_variants() {
        assert!(parse_yes_no("yes"));
        assert!(parse_yes_no("Sim"));
        assert!(parse_yes_no("TRUE"));
        assert!(!parse_yes_no("no"));
        assert!(!parse_yes_no("não"));
    }
}
