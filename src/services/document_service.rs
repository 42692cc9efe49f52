// src/services/document_service.rs

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ApplicationRepository, TravelerRepository, UserRepository},
    models::application::{PassportData, ResponseScope},
    models::auth::User,
    services::catalog_service::CatalogService,
    services::visibility_service::{resolve_visible_fields, ViewMode, VisibilityContext, VisibleField},
};

#[derive(Clone)]
pub struct DocumentService {
    application_repo: ApplicationRepository,
    traveler_repo: TravelerRepository,
    user_repo: UserRepository,
    catalog_service: CatalogService,
    tracking_base_url: String,
}

impl DocumentService {
    pub fn new(
        application_repo: ApplicationRepository,
        traveler_repo: TravelerRepository,
        user_repo: UserRepository,
        catalog_service: CatalogService,
        tracking_base_url: String,
    ) -> Self {
        Self {
            application_repo,
            traveler_repo,
            user_repo,
            catalog_service,
            tracking_base_url,
        }
    }

    /// Gera o PDF de resumo da aplicação: cabeçalho, respostas do requerente
    /// e de cada viajante, e o QR Code do link de acompanhamento.
    pub async fn generate_summary_pdf<'e, E>(
        &self,
        executor: E,
        application_id: Uuid,
        user: &User,
    ) -> Result<Vec<u8>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        // 1. Busca os Dados
        let mut conn = executor.acquire().await?;

        let app = self
            .application_repo
            .get_by_id(&mut *conn, application_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("aplicação {}", application_id)))?;

        if !user.is_admin && app.customer_id != user.id {
            return Err(AppError::NotFound(format!("aplicação {}", application_id)));
        }

        let customer = self
            .user_repo
            .find_by_id(app.customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cliente {}", app.customer_id)))?;

        let product = self
            .catalog_service
            .get_product(&mut *conn, app.product_id)
            .await?;

        let catalog = self
            .catalog_service
            .list_fields(&mut *conn, app.product_id, true)
            .await?;

        let travelers = self
            .traveler_repo
            .list_by_application(&mut *conn, application_id)
            .await?;

        // 2. Configura o PDF
        // Carrega a fonte da pasta 'fonts/'
        let font_family = genpdf::fonts::from_files("./fonts", "Roboto", None)
            .map_err(|_| AppError::FontNotFound("Fonte não encontrada na pasta ./fonts".to_string()))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Aplicação {}", app.tracking_number()));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        doc.push(
            elements::Paragraph::new("VISTOFÁCIL")
                .styled(style::Style::new().bold().with_font_size(18)),
        );
        doc.push(elements::Break::new(1.5));

        doc.push(
            elements::Paragraph::new(format!("APLICAÇÃO {}", app.tracking_number()))
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(elements::Paragraph::new(format!(
            "{} — {} / {}",
            product.name, app.visa_type, app.processing_option
        )));
        doc.push(elements::Paragraph::new(format!("Status: {:?}", app.status)));
        doc.push(elements::Paragraph::new(format!(
            "Data: {}",
            app.created_at.format("%d/%m/%Y")
        )));
        doc.push(elements::Paragraph::new(format!("Requerente: {}", customer.full_name)));

        doc.push(elements::Break::new(2));

        // --- RESPOSTAS DO REQUERENTE ---
        let applicant_passport = PassportData {
            passport_number: customer.passport_number.clone(),
            passport_expiry_date: customer.passport_expiry_date,
            residence_country: customer.residence_country.clone(),
            has_schengen_visa: customer.has_schengen_visa,
        };
        let ctx = VisibilityContext {
            catalog: &catalog,
            app: &app,
            scope: ResponseScope::Applicant,
            passport: &applicant_passport,
            answers: &app.form_responses.0,
            mode: ViewMode::Admin,
        };
        push_answers_section(&mut doc, "Requerente", &resolve_visible_fields(&ctx));

        // --- VIAJANTES ADICIONAIS ---
        for traveler in &travelers {
            let passport = traveler.passport_data();
            let ctx = VisibilityContext {
                catalog: &catalog,
                app: &app,
                scope: ResponseScope::Traveler(traveler.id),
                passport: &passport,
                answers: &traveler.form_responses.0,
                mode: ViewMode::Admin,
            };
            push_answers_section(
                &mut doc,
                &format!("Viajante: {}", traveler.full_name),
                &resolve_visible_fields(&ctx),
            );
        }

        // --- QR CODE DE ACOMPANHAMENTO ---
        let tracking_link =
            format!("{}/acompanhar/{}", self.tracking_base_url, app.tracking_number());
        doc.push(
            elements::Paragraph::new("ACOMPANHE SUA APLICAÇÃO")
                .styled(style::Style::new().bold().with_font_size(12)),
        );
        doc.push(elements::Paragraph::new(tracking_link.clone()));
        doc.push(elements::Break::new(1));

        let code = QrCode::new(tracking_link.as_bytes())
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        // Renderiza para imagem
        let image_buffer = code.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

        // Converte para genpdf::Image
        let pdf_image = genpdf::elements::Image::from_dynamic_image(dynamic_image)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?
            .with_scale(genpdf::Scale::new(0.5, 0.5));

        doc.push(pdf_image);

        // 3. Renderiza para Buffer (Memória)
        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        Ok(buffer)
    }
}

fn push_answers_section(doc: &mut genpdf::Document, title: &str, fields: &[VisibleField]) {
    let answered: Vec<&VisibleField> = fields
        .iter()
        .filter(|f| f.answer.as_ref().is_some_and(|a| a.is_filled()))
        .collect();
    if answered.is_empty() {
        return;
    }

    doc.push(
        elements::Paragraph::new(title.to_string())
            .styled(style::Style::new().bold().with_font_size(12)),
    );
    doc.push(elements::Break::new(0.5));

    // Pesos das colunas: Pergunta (3), Resposta (4)
    let mut table = elements::TableLayout::new(vec![3, 4]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let style_bold = style::Style::new().bold();
    table
        .row()
        .element(elements::Paragraph::new("Pergunta").styled(style_bold))
        .element(elements::Paragraph::new("Resposta").styled(style_bold))
        .push()
        .expect("Table error");

    for field in answered {
        let rendered = field
            .answer
            .as_ref()
            .map(|a| match (&a.value, &a.file_name) {
                (Some(value), _) => value.clone(),
                (None, Some(file)) => format!("arquivo: {}", file),
                (None, None) => String::new(),
            })
            .unwrap_or_default();

        table
            .row()
            .element(elements::Paragraph::new(field.question.clone()))
            .element(elements::Paragraph::new(rendered))
            .push()
            .expect("Table row error");
    }

    doc.push(table);
    doc.push(elements::Break::new(1.5));
}
