// src/services/catalog_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProductRepository,
    models::catalog::{FieldDefinition, FieldType, ProcessingOption, VisaProduct, VisaTypeOption},
};

/// Patch parcial de uma definição de campo: `None` = mantém o valor atual.
#[derive(Debug, Default, Clone, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    pub field_type: Option<FieldType>,
    pub question: Option<String>,
    pub placeholder: Option<String>,
    pub is_required: Option<bool>,
    pub display_order: Option<i32>,
    pub options: Option<Vec<String>>,
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size_mb: Option<i32>,
    pub min_length: Option<i32>,
    pub max_length: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct CatalogService {
    repo: ProductRepository,
}

impl CatalogService {
    pub fn new(repo: ProductRepository) -> Self {
        Self { repo }
    }

    // =========================================================================
    //  PRODUTOS
    // =========================================================================

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        name: &str,
        country_code: &str,
        visa_types: &[VisaTypeOption],
        processing_options: &[ProcessingOption],
    ) -> Result<VisaProduct, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if visa_types.is_empty() || processing_options.is_empty() {
            return Err(AppError::InvalidInput(
                "o produto precisa de ao menos um tipo de visto e uma opção de processamento"
                    .to_string(),
            ));
        }
        self.repo
            .create_product(executor, name, country_code, visa_types, processing_options)
            .await
    }

    pub async fn list_products<'e, E>(
        &self,
        executor: E,
        include_inactive: bool,
    ) -> Result<Vec<VisaProduct>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_products(executor, include_inactive).await
    }

    pub async fn get_product<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<VisaProduct, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .get_product(executor, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("produto {}", product_id)))
    }

    // =========================================================================
    //  CATÁLOGO DE CAMPOS
    // =========================================================================

    /// Cria um campo com id novo. O id vem da marca d'água do produto, então
    /// nunca repete um id já usado — mesmo que o campo de maior id tenha sido
    /// deletado.
    pub async fn add_field<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        mut def: FieldDefinition,
    ) -> Result<FieldDefinition, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        validate_definition(&def)?;

        let mut tx = executor.begin().await?;

        let product = self
            .repo
            .get_product_for_update(&mut *tx, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("produto {}", product_id)))?;

        let existing = self.repo.list_fields(&mut *tx, product_id, true).await?;
        def.id = next_field_id(product.max_field_id, &existing);
        def.product_id = Some(product_id);

        let field = self.repo.insert_field(&mut *tx, product_id, &def).await?;
        self.repo
            .set_max_field_id(&mut *tx, product_id, field.id)
            .await?;

        tx.commit().await?;

        Ok(field)
    }

    pub async fn update_field<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        field_id: i32,
        patch: FieldPatch,
    ) -> Result<FieldDefinition, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let mut def = self
            .repo
            .get_field(&mut *tx, product_id, field_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("campo {}", field_id)))?;

        apply_patch(&mut def, patch);
        validate_definition(&def)?;

        let updated = self.repo.update_field(&mut *tx, product_id, &def).await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Deleta a definição, não as respostas históricas. A marca d'água do
    /// produto fica como está: o id nunca volta ao pool.
    pub async fn delete_field<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        field_id: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let deleted = self.repo.delete_field(executor, product_id, field_id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("campo {}", field_id)));
        }
        Ok(())
    }

    /// Campos do produto prontos para apresentação: ordem normalizada
    /// (reparo de lotes invertidos) e ordenados por display_order, com
    /// empates resolvidos pela ordem de criação.
    pub async fn list_fields<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<FieldDefinition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut fields = self
            .repo
            .list_fields(executor, product_id, include_inactive)
            .await?;

        normalize_display_orders(&mut fields);
        fields.sort_by_key(|f| f.display_order); // sort estável: empate fica na ordem de criação

        Ok(fields)
    }
}

/// `max(marca d'água, maior id existente) + 1`. O segundo termo cobre
/// catálogos gravados antes da marca d'água existir.
pub fn next_field_id(max_field_id: i32, existing: &[FieldDefinition]) -> i32 {
    let existing_max = existing.iter().map(|f| f.id).max().unwrap_or(0);
    max_field_id.max(existing_max) + 1
}

/// Reparo do defeito conhecido de entrada de dados: lotes chegam com os
/// display_order invertidos em relação à ordem de criação (o primeiro campo
/// criado carrega a ordem máxima e o último carrega zero). Nesse caso,
/// inverte todas as ordens antes de ordenar.
///
/// TODO: confirmar com tráfego real se o lote invertido ainda acontece na
/// origem; um catálogo legitimamente decrescente seria reordenado aqui.
pub fn normalize_display_orders(fields: &mut [FieldDefinition]) {
    if fields.len() < 2 {
        return;
    }
    // `fields` chega em ordem de criação (id crescente).
    let max = fields.iter().map(|f| f.display_order).max().unwrap_or(0);
    let first = fields[0].display_order;
    let last = fields[fields.len() - 1].display_order;

    if max > 0 && first == max && last == 0 {
        for f in fields.iter_mut() {
            f.display_order = max - f.display_order;
        }
    }
}

fn apply_patch(def: &mut FieldDefinition, patch: FieldPatch) {
    if let Some(v) = patch.field_type {
        def.field_type = v;
    }
    if let Some(v) = patch.question {
        def.question = v;
    }
    if let Some(v) = patch.placeholder {
        def.placeholder = Some(v);
    }
    if let Some(v) = patch.is_required {
        def.is_required = v;
    }
    if let Some(v) = patch.display_order {
        def.display_order = v;
    }
    if let Some(v) = patch.options {
        def.options = Some(v);
    }
    if let Some(v) = patch.allowed_file_types {
        def.allowed_file_types = Some(v);
    }
    if let Some(v) = patch.max_file_size_mb {
        def.max_file_size_mb = Some(v);
    }
    if let Some(v) = patch.min_length {
        def.min_length = Some(v);
    }
    if let Some(v) = patch.max_length {
        def.max_length = Some(v);
    }
    if let Some(v) = patch.is_active {
        def.is_active = v;
    }
}

/// Regras estruturais de uma definição, compartilhadas entre catálogo e ad hoc.
pub fn validate_definition(def: &FieldDefinition) -> Result<(), AppError> {
    if def.question.trim().is_empty() {
        return Err(AppError::InvalidInput("a pergunta não pode ser vazia".to_string()));
    }
    if def.field_type == FieldType::Dropdown
        && def.options.as_ref().map_or(true, |o| o.is_empty())
    {
        return Err(AppError::InvalidInput(
            "campo dropdown precisa de uma lista de opções".to_string(),
        ));
    }
    if let Some(mb) = def.max_file_size_mb {
        if mb <= 0 {
            return Err(AppError::InvalidInput(
                "max_file_size_mb deve ser positivo".to_string(),
            ));
        }
    }
    if let (Some(min), Some(max)) = (def.min_length, def.max_length) {
        if min > max {
            return Err(AppError::InvalidInput(
                "min_length maior que max_length".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: i32, display_order: i32) -> FieldDefinition {
        FieldDefinition {
            product_id: None,
            id,
            field_type: FieldType::Text,
            question: format!("Pergunta {}", id),
            placeholder: None,
            is_required: false,
            display_order,
            options: None,
            allowed_file_types: None,
            max_file_size_mb: None,
            min_length: None,
            max_length: None,
            is_active: true,
        }
    }

    #[test]
    fn next_id_never_reuses_after_deletion() {
        // Catálogo [1, 2, 3] com marca d'água 3; deleta o 3.
        let remaining = vec![field(1, 0), field(2, 1)];
        assert_eq!(next_field_id(3, &remaining), 4);

        // Catálogo antigo sem marca d'água gravada
        assert_eq!(next_field_id(0, &remaining), 3);

        // Catálogo vazio
        assert_eq!(next_field_id(0, &[]), 1);
        assert_eq!(next_field_id(7, &[]), 8);
    }

    #[test]
    fn reversed_batch_is_repaired() {
        // Criados na ordem 10, 11, 12 mas com as ordens invertidas: 2, 1, 0
        let mut fields = vec![field(10, 2), field(11, 1), field(12, 0)];
        normalize_display_orders(&mut fields);

        let orders: Vec<i32> = fields.iter().map(|f| f.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn normal_batch_is_left_alone() {
        let mut fields = vec![field(10, 0), field(11, 5), field(12, 5)];
        normalize_display_orders(&mut fields);

        let orders: Vec<i32> = fields.iter().map(|f| f.display_order).collect();
        assert_eq!(orders, vec![0, 5, 5]);
    }

    #[test]
    fn all_zero_orders_do_not_trigger_repair() {
        let mut fields = vec![field(1, 0), field(2, 0), field(3, 0)];
        normalize_display_orders(&mut fields);
        assert!(fields.iter().all(|f| f.display_order == 0));
    }

    #[test]
    fn ties_keep_creation_order_after_sort() {
        let mut fields = vec![field(1, 5), field(2, 0), field(3, 5)];
        normalize_display_orders(&mut fields);
        fields.sort_by_key(|f| f.display_order);

        let ids: Vec<i32> = fields.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn dropdown_without_options_is_rejected() {
        let mut def = field(1, 0);
        def.field_type = FieldType::Dropdown;
        assert!(validate_definition(&def).is_err());

        def.options = Some(vec!["Sim".to_string(), "Não".to_string()]);
        assert!(validate_definition(&def).is_ok());
    }
}
