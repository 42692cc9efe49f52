// src/services/upload_service.rs

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{common::error::AppError, models::catalog::FieldDefinition};

/// Referência durável devolvida pelo armazenamento — é o que a resposta de
/// um campo de upload carrega.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
}

/// Fronteira com o armazenamento de objetos (CDN em produção). O core só
/// valida restrições e guarda a referência.
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> anyhow::Result<StoredFile>;
}

/// Implementação em disco local para desenvolvimento e testes.
pub struct DiskUploadStore {
    base_dir: PathBuf,
}

impl DiskUploadStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

#[async_trait]
impl UploadStore for DiskUploadStore {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> anyhow::Result<StoredFile> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let safe_name = sanitize_file_name(file_name);
        let stored_name = format!("{}-{}", Uuid::new_v4(), safe_name);
        let path = self.base_dir.join(&stored_name);

        tokio::fs::write(&path, bytes).await?;

        Ok(StoredFile {
            file_path: path.to_string_lossy().into_owned(),
            file_name: file_name.to_string(),
            file_size: bytes.len() as i64,
        })
    }
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Checa um arquivo contra as restrições da definição do campo
/// (extensões permitidas e tamanho máximo em MB).
pub fn check_file_constraints(
    def: &FieldDefinition,
    file_name: &str,
    file_size: Option<i64>,
) -> Result<(), &'static str> {
    if let Some(allowed) = def.allowed_file_types.as_ref().filter(|a| !a.is_empty()) {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        let permitted = allowed
            .iter()
            .any(|a| a.trim_start_matches('.').to_lowercase() == extension);
        if !permitted {
            return Err("invalid_file_type");
        }
    }

    if let Some(max_mb) = def.max_file_size_mb {
        let limit = i64::from(max_mb) * 1024 * 1024;
        if file_size.unwrap_or(0) > limit {
            return Err("file_too_large");
        }
    }

    Ok(())
}

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn UploadStore>,
}

impl UploadService {
    pub fn new(store: Arc<dyn UploadStore>) -> Self {
        Self { store }
    }

    /// Valida contra as restrições do campo ANTES de armazenar.
    pub async fn store_for_field(
        &self,
        def: &FieldDefinition,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, AppError> {
        check_file_constraints(def, file_name, Some(bytes.len() as i64)).map_err(|code| {
            AppError::InvalidInput(format!("arquivo '{}' rejeitado: {}", file_name, code))
        })?;

        let stored = self
            .store
            .store(file_name, bytes)
            .await
            .map_err(AppError::InternalServerError)?;

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::FieldType;

    fn upload_field(allowed: Option<Vec<&str>>, max_mb: Option<i32>) -> FieldDefinition {
        FieldDefinition {
            product_id: None,
            id: 1,
            field_type: FieldType::Upload,
            question: "Foto do passaporte".to_string(),
            placeholder: None,
            is_required: true,
            display_order: 0,
            options: None,
            allowed_file_types: allowed
                .map(|a| a.into_iter().map(|s| s.to_string()).collect()),
            max_file_size_mb: max_mb,
            min_length: None,
            max_length: None,
            is_active: true,
        }
    }

    #[test]
    fn extension_check_is_case_insensitive_and_tolerates_dots() {
        let def = upload_field(Some(vec![".JPG", "pdf"]), None);
        assert!(check_file_constraints(&def, "scan.jpg", None).is_ok());
        assert!(check_file_constraints(&def, "doc.PDF", None).is_ok());
        assert_eq!(check_file_constraints(&def, "doc.png", None), Err("invalid_file_type"));
        // Sem extensão nenhuma
        assert_eq!(check_file_constraints(&def, "semextensao", None), Err("invalid_file_type"));
    }

    #[test]
    fn size_limit_is_in_megabytes() {
        let def = upload_field(None, Some(2));
        assert!(check_file_constraints(&def, "a.jpg", Some(2 * 1024 * 1024)).is_ok());
        assert_eq!(
            check_file_constraints(&def, "a.jpg", Some(2 * 1024 * 1024 + 1)),
            Err("file_too_large")
        );
    }

    #[test]
    fn no_constraints_accepts_anything() {
        let def = upload_field(None, None);
        assert!(check_file_constraints(&def, "qualquer.coisa", Some(999_999_999)).is_ok());
    }
}
