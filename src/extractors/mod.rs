//! # Extração de Parâmetros
//!
//! Preenche o valor que um `InputField` deve digitar.
//!
//! ## Para todos entenderem:
//!
//! "Enter admin as the username" deveria digitar `admin`. Mas não
//! fazemos extração de texto genérica: procuramos apenas alguns tokens
//! de demonstração conhecidos ([`LITERAL_ALLOW_LIST`]). Se nenhum
//! aparece, usamos um valor padrão por tipo de campo.
//!
//! | Campo    | Padrão        |
//! |----------|---------------|
//! | username | `admin`       |
//! | password | `password123` |
//! | genérico | `test_input`  |
//!
//! ## Limitação conhecida
//!
//! "Enter john.doe as the username" digita `admin`. Quem consome o
//! engine pode depender desse fallback, então ele faz parte do contrato.

use serde::Serialize;

use crate::classifier::{self, ActionKind, CanonicalAction, FieldTarget};

/// Tokens reconhecidos literalmente no texto do step.
///
/// Ordem importa: os mais longos vêm primeiro para que `test123`
/// não seja engolido por `test`.
pub const LITERAL_ALLOW_LIST: [&str; 4] = ["password123", "test123", "admin", "test"];

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "password123";
pub const DEFAULT_INPUT: &str = "test_input";

/// De onde veio o valor de um `InputField`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    AllowList,
    Default,
}

/// Valor escolhido para um campo, com a origem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedValue {
    pub value: &'static str,
    pub source: ValueSource,
}

/// Primeiro token da allow-list presente no texto (sem diferenciar maiúsculas).
pub fn extract_literal(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    LITERAL_ALLOW_LIST
        .iter()
        .copied()
        .find(|token| lowered.contains(token))
}

pub fn default_value(target: FieldTarget) -> &'static str {
    match target {
        FieldTarget::Username => DEFAULT_USERNAME,
        FieldTarget::Password => DEFAULT_PASSWORD,
        FieldTarget::Generic => DEFAULT_INPUT,
    }
}

/// Resolve o valor de um campo a partir do texto do step.
pub fn resolve_value(target: FieldTarget, text: &str) -> ExtractedValue {
    match extract_literal(text) {
        Some(value) => ExtractedValue {
            value,
            source: ValueSource::AllowList,
        },
        None => ExtractedValue {
            value: default_value(target),
            source: ValueSource::Default,
        },
    }
}

/// Completa uma ação classificada. Só `InputField` recebe valor.
pub fn enrich(mut action: CanonicalAction) -> CanonicalAction {
    if let ActionKind::InputField(target) = action.kind {
        action.value = Some(resolve_value(target, &action.raw).value.to_string());
    }
    action
}

/// Classificação + extração: o caminho usado pelos dois backends.
pub fn interpret(text: &str) -> CanonicalAction {
    enrich(classifier::classify(text))
}
