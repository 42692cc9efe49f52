// src/services/application_service.rs

use chrono::NaiveDate;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ApplicationRepository, ProductRepository, TravelerRepository, UserRepository},
    models::application::{
        Answer, Application, ApplicationStatus, PassportField, Traveler,
    },
    models::auth::User,
    services::notification_service::{NotificationKind, NotificationService},
};

/// A máquina de estados do workflow:
/// draft -> submitted | additional_info_required -> resubmission ->
/// processing -> {approved | rejected | cancelled | completed}.
/// Qualquer estado "em andamento" pode voltar para resubmission.
pub fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;
    match (from, to) {
        (Draft, Submitted) | (Draft, Cancelled) => true,
        (Submitted, Processing)
        | (Submitted, AdditionalInfoRequired)
        | (Submitted, Rejected)
        | (Submitted, Cancelled) => true,
        (AdditionalInfoRequired, Processing) | (AdditionalInfoRequired, Cancelled) => true,
        (Resubmission, Processing) | (Resubmission, Cancelled) => true,
        (Processing, Approved)
        | (Processing, Rejected)
        | (Processing, Cancelled)
        | (Processing, AdditionalInfoRequired) => true,
        (Approved, Completed) => true,
        // Re-entrada em resubmission a partir de qualquer estado em andamento
        (from, Resubmission) if from.is_in_process() => true,
        _ => false,
    }
}

#[derive(Clone)]
pub struct ApplicationService {
    application_repo: ApplicationRepository,
    traveler_repo: TravelerRepository,
    product_repo: ProductRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
}

impl ApplicationService {
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

    /// Cria a aplicação em rascunho, validando a combinação tipo de
    /// visto / velocidade de processamento contra o produto.
    pub async fn create_application<'e, E>(
        &self,
        executor: E,
        customer: &User,
        product_id: Uuid,
        visa_type: &str,
        processing_option: &str,
    ) -> Result<Application, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let product = self
            .product_repo
            .get_product(&mut *tx, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("produto {}", product_id)))?;

        if !product.is_active {
            return Err(AppError::InvalidInput(format!(
                "produto {} não está ativo",
                product_id
            )));
        }
        if !product.combination_is_valid(visa_type, processing_option) {
            return Err(AppError::InvalidInput(format!(
                "combinação inválida de tipo de visto e processamento: '{}' / '{}'",
                visa_type, processing_option
            )));
        }

        let application = self
            .application_repo
            .create_application(&mut *tx, customer.id, product_id, visa_type, processing_option)
            .await?;

        tx.commit().await?;

        Ok(application)
    }

    /// Busca com checagem de dono: cliente só enxerga as próprias aplicações.
    pub async fn get_authorized<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        user: &User,
    ) -> Result<Application, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let app = self
            .application_repo
            .get_by_id(executor, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        if !user.is_admin && app.customer_id != user.id {
            // Não revela a existência de aplicações alheias
            return Err(AppError::NotFound(format!("aplicação {}", application_id)));
        }

        Ok(app)
    }

    pub async fn list_by_customer<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Vec<Application>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.application_repo.list_by_customer(executor, customer_id).await
    }

    /// Transição administrativa de status. Escrever o status atual é um
    /// no-op que reporta sucesso sem tocar em updated_at nem re-notificar.
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        new_status: ApplicationStatus,
    ) -> Result<Application, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let app = self
            .application_repo
            .get_for_update(&mut *tx, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        if app.status == new_status {
            tx.commit().await?;
            return Ok(app);
        }

        if !can_transition(app.status, new_status) {
            return Err(AppError::StateConflict(format!(
                "transição de {:?} para {:?} não é permitida",
                app.status, new_status
            )));
        }

        self.application_repo
            .update_status(&mut *tx, application_id, new_status)
            .await?;

        tx.commit().await?;

        // Decisões notificam o cliente
        if matches!(
            new_status,
            ApplicationStatus::Approved | ApplicationStatus::Rejected | ApplicationStatus::Completed
        ) {
            if let Ok(Some(customer)) = self.user_repo.find_by_id(app.customer_id).await {
                self.notifications.notify(
                    &customer.email,
                    &app.tracking_number(),
                    NotificationKind::StatusChanged(new_status),
                );
            }
        }

        let mut updated = app;
        updated.status = new_status;
        Ok(updated)
    }

    /// Cliente remove rascunhos e submissões recentes; admin remove qualquer.
    pub async fn delete_application<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        user: &User,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let app = self
            .application_repo
            .get_for_update(&mut *tx, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        if !user.is_admin {
            if app.customer_id != user.id {
                return Err(AppError::NotFound(format!("aplicação {}", application_id)));
            }
            if !matches!(app.status, ApplicationStatus::Draft | ApplicationStatus::Submitted) {
                return Err(AppError::StateConflict(format!(
                    "aplicação em {:?} só pode ser removida pela administração",
                    app.status
                )));
            }
        }

        self.application_repo.delete(&mut *tx, application_id).await?;
        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    //  VIAJANTES
    // =========================================================================

    pub async fn add_traveler<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        user: &User,
        full_name: &str,
    ) -> Result<Traveler, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let app = self
            .application_repo
            .get_for_update(&mut *tx, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        if !user.is_admin && app.customer_id != user.id {
            return Err(AppError::NotFound(format!("aplicação {}", application_id)));
        }
        if app.status.is_terminal() {
            return Err(AppError::StateConflict(format!(
                "aplicação em {:?} não aceita novos viajantes",
                app.status
            )));
        }

        let traveler = self
            .traveler_repo
            .insert(&mut *tx, application_id, full_name)
            .await?;

        tx.commit().await?;

        Ok(traveler)
    }

    pub async fn list_travelers<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        user: &User,
    ) -> Result<Vec<Traveler>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        self.get_authorized(&mut *conn, application_id, user).await?;
        self.traveler_repo
            .list_by_application(&mut *conn, application_id)
            .await
    }

    /// Diretório de viajantes: grava as colunas estruturadas de passaporte e
    /// espelha cada valor no mapa de respostas do viajante, na mesma
    /// transação — as duas representações nunca divergem.
    pub async fn update_traveler_passport<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        traveler_id: i32,
        user: &User,
        passport_number: Option<String>,
        passport_expiry_date: Option<NaiveDate>,
        residence_country: Option<String>,
        has_schengen_visa: Option<bool>,
    ) -> Result<Traveler, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let app = self
            .application_repo
            .get_for_update(&mut *tx, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;
        if !user.is_admin && app.customer_id != user.id {
            return Err(AppError::NotFound(format!("aplicação {}", application_id)));
        }

        let mut traveler = self
            .traveler_repo
            .get_for_update(&mut *tx, application_id, traveler_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("viajante {}", traveler_id)))?;

        if let Some(v) = passport_number {
            traveler.passport_number = Some(v);
        }
        if let Some(v) = passport_expiry_date {
            traveler.passport_expiry_date = Some(v);
        }
        if let Some(v) = residence_country {
            traveler.residence_country = Some(v);
        }
        if let Some(v) = has_schengen_visa {
            traveler.has_schengen_visa = Some(v);
        }

        mirror_passport_into_map(&traveler.passport_data(), &mut traveler.form_responses.0);

        let saved = self.traveler_repo.save_responses(&mut *tx, &traveler).await?;
        tx.commit().await?;

        Ok(saved)
    }

    /// Diretório do cliente (Viajante 1): além das colunas do usuário,
    /// espelha nos mapas das aplicações ainda em andamento.
    pub async fn update_customer_passport<'e, E>(
        &self,
        executor: E,
        user: &User,
        passport_number: Option<String>,
        passport_expiry_date: Option<NaiveDate>,
        residence_country: Option<String>,
        has_schengen_visa: Option<bool>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let updated = self
            .user_repo
            .update_passport(
                &mut *tx,
                user.id,
                passport_number.as_deref(),
                passport_expiry_date,
                residence_country.as_deref(),
                has_schengen_visa,
            )
            .await?;

        let passport = crate::models::application::PassportData {
            passport_number: updated.passport_number.clone(),
            passport_expiry_date: updated.passport_expiry_date,
            residence_country: updated.residence_country.clone(),
            has_schengen_visa: updated.has_schengen_visa,
        };

        let applications = self
            .application_repo
            .list_by_customer(&mut *tx, user.id)
            .await?;
        for mut app in applications {
            if app.status.is_terminal() {
                continue;
            }
            mirror_passport_into_map(&passport, &mut app.form_responses.0);
            self.application_repo.save_workflow_state(&mut *tx, &app).await?;
        }

        tx.commit().await?;

        Ok(updated)
    }
}

/// Escrita coluna -> mapa: cada atributo presente vira uma resposta na
/// pseudo-chave correspondente (mantendo o submitted_at anterior, se houver).
fn mirror_passport_into_map(
    passport: &crate::models::application::PassportData,
    map: &mut std::collections::HashMap<String, Answer>,
) {
    for field in PassportField::ALL {
        if let Some(value) = passport.value_for(field) {
            let entry = map.entry(field.key().to_string()).or_default();
            entry.value = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::models::application::PassportData;

    #[test]
    fn lifecycle_follows_the_state_machine() {
        use ApplicationStatus::*;

        assert!(can_transition(Draft, Submitted));
        assert!(can_transition(Submitted, Processing));
        assert!(can_transition(Processing, Approved));
        assert!(can_transition(Approved, Completed));

        // Reentrância em resubmission a partir de qualquer estado em andamento
        assert!(can_transition(Submitted, Resubmission));
        assert!(can_transition(Processing, Resubmission));
        assert!(can_transition(AdditionalInfoRequired, Resubmission));

        // Correção concluída
        assert!(can_transition(Resubmission, Processing));

        // Proibidos
        assert!(!can_transition(Draft, Processing));
        assert!(!can_transition(Draft, Resubmission));
        assert!(!can_transition(Completed, Resubmission));
        assert!(!can_transition(Rejected, Processing));
        assert!(!can_transition(Cancelled, Submitted));
        assert!(!can_transition(Approved, Rejected));
    }

    #[test]
    fn mirror_writes_every_present_attribute() {
        let passport = PassportData {
            passport_number: Some("AB1234567".to_string()),
            passport_expiry_date: Some("2031-04-12".parse().unwrap()),
            residence_country: None,
            has_schengen_visa: Some(true),
        };

        let mut map = HashMap::new();
        mirror_passport_into_map(&passport, &mut map);

        assert_eq!(
            map.get("_passport_number").and_then(|a| a.value.clone()),
            Some("AB1234567".to_string())
        );
        assert_eq!(
            map.get("_passport_expiry_date").and_then(|a| a.value.clone()),
            Some("2031-04-12".to_string())
        );
        assert_eq!(
            map.get("_has_schengen_visa").and_then(|a| a.value.clone()),
            Some("yes".to_string())
        );
        // Atributo ausente não cria resposta
        assert!(!map.contains_key("_residence_country"));
    }
}
