//! # Módulo de Erros do Engine
//!
//! Define o enum de erros da biblioteca (`EngineError`) e os códigos
//! estruturados que aparecem nos relatórios de execução.
//!
//! ## Para todos entenderem:
//!
//! Nem todo erro tem o mesmo peso. Alguns impedem qualquer execução
//! (framework desconhecido, navegador que não sobe), outros afetam só
//! um step (elemento não encontrado). O código numérico diz de qual
//! tipo de problema se trata sem precisar ler a mensagem inteira.
//!
//! ## Categorias de Erro
//!
//! | Faixa  | Categoria       | Descrição                           |
//! |--------|-----------------|-------------------------------------|
//! | E1xxx  | Parsing         | Resposta da IA ilegível             |
//! | E2xxx  | Sessão/Step     | Falha ao dirigir o navegador        |
//! | E3xxx  | Verificação     | Resultado esperado não observado    |
//! | E4xxx  | Configuração    | Framework ou ambiente inválido      |
//! | E5xxx  | Interno         | Execução interrompida / bug         |
//!
//! ## Exemplo:
//!
//! ```text
//! [E2002] element not found: id=username
//! ```

use std::fmt;
use thiserror::Error;

// ============================================================================
// CÓDIGO DE ERRO
// ============================================================================

/// Código de erro estruturado com categoria e número.
///
/// O primeiro dígito é a categoria, os três últimos o erro específico.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(u16);

impl ErrorCode {
    // E1xxx: Parsing da resposta upstream

    /// Nenhuma estratégia conseguiu ler a resposta como documento estruturado.
    pub const PARSE_FAILED: Self = Self(1001);

    // E2xxx: Sessão e execução de steps

    /// Não foi possível abrir a sessão de automação.
    pub const SESSION_ACQUISITION: Self = Self(2001);

    /// Elemento não encontrado dentro do implicit wait.
    pub const ELEMENT_NOT_FOUND: Self = Self(2002);

    /// Qualquer outra falha de primitiva (click, digitação, navegação).
    pub const STEP_EXECUTION: Self = Self(2003);

    /// Operação excedeu o timeout por step.
    pub const STEP_TIMEOUT: Self = Self(2004);

    // E3xxx: Verificações

    /// Verificação de resultado falhou.
    pub const VERIFICATION_FAILED: Self = Self(3001);

    // E4xxx: Configuração

    /// Framework de geração de código não suportado.
    pub const UNSUPPORTED_FRAMEWORK: Self = Self(4001);

    // E5xxx: Interno

    /// Execução cancelada antes do fim.
    pub const CANCELLED: Self = Self(5001);

    /// Retorna o código numérico.
    pub fn code(&self) -> u16 {
        self.0
    }

    /// Retorna o código formatado com prefixo "E".
    ///
    /// Exemplo: `ErrorCode::ELEMENT_NOT_FOUND.formatted() == "E2002"`
    pub fn formatted(&self) -> String {
        format!("E{:04}", self.0)
    }

    /// Retorna a categoria do erro baseado no primeiro dígito.
    pub fn category(&self) -> ErrorCategory {
        match self.0 / 1000 {
            1 => ErrorCategory::Parsing,
            2 => ErrorCategory::Session,
            3 => ErrorCategory::Verification,
            4 => ErrorCategory::Configuration,
            5 => ErrorCategory::Internal,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Descrição curta, útil em logs.
    pub fn description(&self) -> &'static str {
        match self.0 {
            1001 => "Resposta sem estrutura reconhecível",
            2001 => "Falha ao abrir sessão",
            2002 => "Elemento não encontrado",
            2003 => "Falha na execução do step",
            2004 => "Timeout do step",
            3001 => "Verificação falhou",
            4001 => "Framework não suportado",
            5001 => "Execução cancelada",
            _ => "Erro desconhecido",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

// ============================================================================
// CATEGORIA DE ERRO
// ============================================================================

/// Categoria de erro baseada no primeiro dígito do código.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// E1xxx
    Parsing,
    /// E2xxx
    Session,
    /// E3xxx
    Verification,
    /// E4xxx
    Configuration,
    /// E5xxx
    Internal,
    /// Código fora das faixas conhecidas.
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsing => write!(f, "Parsing"),
            Self::Session => write!(f, "Sessão"),
            Self::Verification => write!(f, "Verificação"),
            Self::Configuration => write!(f, "Configuração"),
            Self::Internal => write!(f, "Interno"),
            Self::Unknown => write!(f, "Desconhecido"),
        }
    }
}

// ============================================================================
// ERRO DO ENGINE
// ============================================================================

/// Erros produzidos pela biblioteca.
///
/// Só `Configuration` e `SessionAcquisition` chegam a interromper algo
/// maior que um step; o resto é convertido em `StepResult` pelo runner.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported framework '{framework}' (expected one of: pytest, unittest, selenium)")]
    Configuration { framework: String },

    #[error("failed to acquire automation session: {0}")]
    SessionAcquisition(String),

    #[error("element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("step execution failed: {0}")]
    StepExecution(String),

    #[error("operation timed out after {timeout_ms}ms")]
    StepTimeout { timeout_ms: u64 },

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("could not parse response: {0}")]
    Parse(String),

    #[error("run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Código estruturado correspondente à variante.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration { .. } => ErrorCode::UNSUPPORTED_FRAMEWORK,
            Self::SessionAcquisition(_) => ErrorCode::SESSION_ACQUISITION,
            Self::ElementNotFound { .. } => ErrorCode::ELEMENT_NOT_FOUND,
            Self::StepExecution(_) => ErrorCode::STEP_EXECUTION,
            Self::StepTimeout { .. } => ErrorCode::STEP_TIMEOUT,
            Self::Verification(_) => ErrorCode::VERIFICATION_FAILED,
            Self::Parse(_) => ErrorCode::PARSE_FAILED,
            Self::Cancelled => ErrorCode::CANCELLED,
        }
    }

    /// Mensagem com o código na frente, no formato usado nos relatórios.
    pub fn user_message(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_formatting() {
        assert_eq!(ErrorCode::PARSE_FAILED.formatted(), "E1001");
        assert_eq!(ErrorCode::ELEMENT_NOT_FOUND.formatted(), "E2002");
        assert_eq!(ErrorCode::UNSUPPORTED_FRAMEWORK.formatted(), "E4001");
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::PARSE_FAILED.category(), ErrorCategory::Parsing);
        assert_eq!(ErrorCode::STEP_TIMEOUT.category(), ErrorCategory::Session);
        assert_eq!(
            ErrorCode::VERIFICATION_FAILED.category(),
            ErrorCategory::Verification
        );
        assert_eq!(
            ErrorCode::UNSUPPORTED_FRAMEWORK.category(),
            ErrorCategory::Configuration
        );
        assert_eq!(ErrorCode::CANCELLED.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_engine_error_user_message() {
        let err = EngineError::ElementNotFound {
            locator: "id=username".to_string(),
        };
        let msg = err.user_message();
        assert!(msg.starts_with("[E2002]"));
        assert!(msg.contains("id=username"));
    }

    #[test]
    fn test_configuration_error_names_framework() {
        let err = EngineError::Configuration {
            framework: "robot".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::UNSUPPORTED_FRAMEWORK);
        assert!(err.to_string().contains("robot"));
    }
}
