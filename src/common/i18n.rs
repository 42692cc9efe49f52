// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::OnceLock;

// Mensagens de erro por idioma. O código do erro é estável; a frase não.
// Hoje só pt/en — adicionar um idioma é adicionar uma tabela aqui.
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

const DEFAULT_LANG: &str = "pt";

impl I18nStore {
    pub fn new() -> Self {
        let mut messages: HashMap<&'static str, HashMap<&'static str, &'static str>> =
            HashMap::new();

        messages.insert(
            "pt",
            HashMap::from([
                ("validation", "Um ou mais campos são inválidos."),
                ("email_exists", "Este e-mail já está em uso."),
                ("invalid_credentials", "E-mail ou senha inválidos."),
                ("invalid_token", "Token de autenticação inválido ou ausente."),
                ("admin_only", "Esta operação é restrita à administração."),
                ("not_found", "Não encontrado"),
                ("invalid_input", "Entrada inválida"),
                ("state_conflict", "O estado atual não permite a operação"),
                ("unique_violation", "Registro duplicado"),
                ("internal", "Ocorreu um erro inesperado."),
            ]),
        );

        messages.insert(
            "en",
            HashMap::from([
                ("validation", "One or more fields are invalid."),
                ("email_exists", "This e-mail is already in use."),
                ("invalid_credentials", "Invalid e-mail or password."),
                ("invalid_token", "Missing or invalid authentication token."),
                ("admin_only", "This operation is restricted to administrators."),
                ("not_found", "Not found"),
                ("invalid_input", "Invalid input"),
                ("state_conflict", "The current state does not allow this operation"),
                ("unique_violation", "Duplicate record"),
                ("internal", "An unexpected error occurred."),
            ]),
        );

        Self { messages }
    }

    pub fn global() -> &'static I18nStore {
        static STORE: OnceLock<I18nStore> = OnceLock::new();
        STORE.get_or_init(I18nStore::new)
    }

    /// Resolve a mensagem do código no idioma pedido, caindo para o idioma
    /// padrão e, em último caso, para o próprio código.
    pub fn message<'a>(&self, lang: &str, code: &'a str) -> &'a str {
        self.messages
            .get(lang)
            .and_then(|table| table.get(code))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|table| table.get(code)))
            .copied()
            .unwrap_or(code)
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_language_and_code() {
        let store = I18nStore::new();
        assert_eq!(store.message("en", "not_found"), "Not found");
        // Idioma desconhecido cai para pt
        assert_eq!(store.message("de", "not_found"), "Não encontrado");
        // Código desconhecido volta como está
        assert_eq!(store.message("pt", "whatever"), "whatever");
    }
}
