// src/services/notification_service.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::application::ApplicationStatus;

#[derive(Debug, Clone, Copy)]
pub enum NotificationKind {
    ApplicationSubmitted,
    ResubmissionRequested,
    ResubmissionCompleted,
    StatusChanged(ApplicationStatus),
}

/// Um aviso pronto para envio: destinatário, número de acompanhamento e o
/// link que o cliente abre.
#[derive(Debug, Clone)]
pub struct Notification {
    pub recipient: String,
    pub application_number: String,
    pub tracking_link: String,
    pub kind: NotificationKind,
}

/// Fronteira com o provedor de e-mail. A entrega mora fora deste backend;
/// aqui só existe o contrato.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: Notification) -> anyhow::Result<()>;
}

/// Implementação padrão: registra o aviso no log. Suficiente para
/// desenvolvimento e para ambientes sem provedor configurado.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notice: Notification) -> anyhow::Result<()> {
        tracing::info!(
            "📧 [{:?}] aviso para {} sobre {} ({})",
            notice.kind,
            notice.recipient,
            notice.application_number,
            notice.tracking_link
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    tracking_base_url: String,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>, tracking_base_url: String) -> Self {
        Self { notifier, tracking_base_url }
    }

    /// Disparo não aguardado: roda numa task própria e uma falha de envio
    /// nunca desfaz nem atrasa a transição de workflow que a originou.
    pub fn notify(&self, recipient: &str, application_number: &str, kind: NotificationKind) {
        let notice = Notification {
            recipient: recipient.to_string(),
            application_number: application_number.to_string(),
            tracking_link: format!("{}/acompanhar/{}", self.tracking_base_url, application_number),
            kind,
        };
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            if let Err(e) = notifier.send(notice).await {
                tracing::warn!("falha ao enviar notificação (ignorada): {:#}", e);
            }
        });
    }
}
