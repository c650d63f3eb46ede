//! # Módulo de Limites de Execução
//!
//! Define pausas, timeouts e o tamanho máximo de um caso. Nenhum limite
//! interrompe a execução inteira: um caso grande demais falha sozinho.
//!
//! ## Para todos entenderem:
//!
//! Uma página web não reage instantaneamente a um clique. O engine faz
//! pausas fixas depois de navegar e clicar, espera um tempo limitado
//! por elementos e nunca fica preso para sempre numa operação.
//!
//! ## Limites configuráveis:
//!
//! | Limite              | Padrão | Descrição                              |
//! |---------------------|--------|----------------------------------------|
//! | max_steps_per_case  | 50     | Caso maior falha sem ser executado     |
//! | implicit_wait       | 10s    | Espera por elementos (lado da sessão)  |
//! | step_timeout        | 30s    | Teto por operação (lado do engine)     |
//! | session_timeout     | 60s    | Teto para abrir e fechar a sessão      |
//!
//! `step_timeout` nunca fica abaixo de `implicit_wait`: senão um elemento
//! ausente apareceria como timeout (E2004) em vez de E2002.
//!
//! ## Pausas (`Pacing`):
//!
//! | Momento        | Padrão |
//! |----------------|--------|
//! | after_navigate | 1s     |
//! | after_submit   | 2s     |
//! | after_click    | 1s     |
//! | wait           | 2s     |
//! | idle           | 1s     |

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::protocol::TestCase;

// ============================================================================
// LIMITES PADRÃO (CONSTANTES)
// ============================================================================

pub const DEFAULT_MAX_STEPS_PER_CASE: usize = 50;

pub const DEFAULT_IMPLICIT_WAIT_SECS: u64 = 10;

pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 60;

/// Folga entre o implicit wait e o teto por operação.
const TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

// ============================================================================
// PAUSAS
// ============================================================================

/// Pausas fixas entre ações, usadas pelos dois backends.
///
/// O gerador de código emite `time.sleep(..)` com estes valores e o
/// runner ao vivo dorme o mesmo tempo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pacing {
    /// Depois de carregar a URL.
    pub after_navigate: Duration,
    /// Depois de clicar em login/registro (a página costuma redirecionar).
    pub after_submit: Duration,
    /// Depois de um clique genérico.
    pub after_click: Duration,
    /// Step "wait".
    pub wait: Duration,
    /// Step sem classificação.
    pub idle: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            after_navigate: Duration::from_secs(1),
            after_submit: Duration::from_secs(2),
            after_click: Duration::from_secs(1),
            wait: Duration::from_secs(2),
            idle: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    /// Sem pausas. Útil em testes.
    pub fn none() -> Self {
        Self {
            after_navigate: Duration::ZERO,
            after_submit: Duration::ZERO,
            after_click: Duration::ZERO,
            wait: Duration::ZERO,
            idle: Duration::ZERO,
        }
    }
}

// ============================================================================
// ESTRUTURA DE LIMITES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLimits {
    pub max_steps_per_case: usize,
    /// Repassado para a sessão logo depois de abri-la.
    pub implicit_wait: Duration,
    /// Teto de cada operação individual no runner.
    pub step_timeout: Duration,
    /// Teto para abrir (`acquire`) e fechar (`quit`) a sessão.
    pub session_timeout: Duration,
    pub pacing: Pacing,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_steps_per_case: DEFAULT_MAX_STEPS_PER_CASE,
            implicit_wait: Duration::from_secs(DEFAULT_IMPLICIT_WAIT_SECS),
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            session_timeout: Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS),
            pacing: Pacing::default(),
        }
    }
}

impl RunLimits {
    /// Cria limites a partir de variáveis de ambiente.
    ///
    /// Variáveis suportadas:
    /// - `STEP_ENGINE_MAX_STEPS`
    /// - `STEP_ENGINE_IMPLICIT_WAIT_SECS`
    /// - `STEP_ENGINE_STEP_TIMEOUT_SECS`
    /// - `STEP_ENGINE_SESSION_TIMEOUT_SECS`
    ///
    /// Valores que não parseiam são ignorados.
    pub fn from_env() -> Self {
        let mut limits = Self::default();

        if let Some(n) = env_parse("STEP_ENGINE_MAX_STEPS") {
            limits.max_steps_per_case = n;
        }

        if let Some(n) = env_parse("STEP_ENGINE_IMPLICIT_WAIT_SECS") {
            limits.implicit_wait = Duration::from_secs(n);
        }

        if let Some(n) = env_parse("STEP_ENGINE_STEP_TIMEOUT_SECS") {
            limits.step_timeout = Duration::from_secs(n);
        }

        if let Some(n) = env_parse("STEP_ENGINE_SESSION_TIMEOUT_SECS") {
            limits.session_timeout = Duration::from_secs(n);
        }

        limits.reconciled()
    }

    /// Garante `step_timeout > implicit_wait`.
    ///
    /// Um teto menor que o implicit wait transformaria "elemento não
    /// encontrado" em timeout.
    pub fn reconciled(mut self) -> Self {
        let floor = self.implicit_wait + TIMEOUT_MARGIN;
        if !self.implicit_wait.is_zero() && self.step_timeout < floor {
            warn!(
                step_timeout_ms = self.step_timeout.as_millis() as u64,
                implicit_wait_ms = self.implicit_wait.as_millis() as u64,
                "step timeout below implicit wait, raising it"
            );
            self.step_timeout = floor;
        }
        self
    }

    /// Sem pausas e com timeouts curtos, para testes.
    pub fn immediate() -> Self {
        Self {
            implicit_wait: Duration::ZERO,
            step_timeout: Duration::from_secs(5),
            session_timeout: Duration::from_secs(5),
            pacing: Pacing::none(),
            ..Self::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|val| val.trim().parse().ok())
}

// ============================================================================
// VALIDAÇÃO DE LIMITES
// ============================================================================

/// Violação de limite detectada.
#[derive(Debug, Clone)]
pub struct LimitViolation {
    pub limit_name: String,
    pub limit_value: String,
    pub actual_value: String,
    pub message: String,
}

/// Verifica se um caso cabe nos limites.
///
/// Uma violação reprova só este caso; os demais seguem normalmente.
pub fn check_case(case: &TestCase, limits: &RunLimits) -> Option<LimitViolation> {
    (case.steps.len() > limits.max_steps_per_case).then(|| LimitViolation {
        limit_name: "max_steps_per_case".to_string(),
        limit_value: limits.max_steps_per_case.to_string(),
        actual_value: case.steps.len().to_string(),
        message: format!(
            "case '{}' has {} steps, at most {} allowed",
            case.id,
            case.steps.len(),
            limits.max_steps_per_case
        ),
    })
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn case_with_steps(id: &str, n: usize) -> TestCase {
        TestCase {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            case_type: Default::default(),
            steps: (0..n).map(|i| format!("Wait {i}")).collect(),
            expected_result: None,
            priority: Default::default(),
        }
    }

    #[test]
    fn test_default_limits() {
        let limits = RunLimits::default();
        assert_eq!(limits.max_steps_per_case, 50);
        assert_eq!(limits.implicit_wait, Duration::from_secs(10));
        assert_eq!(limits.session_timeout, Duration::from_secs(60));
        assert_eq!(limits.pacing.after_submit, Duration::from_secs(2));
    }

    #[test]
    fn test_immediate_has_no_pauses() {
        let limits = RunLimits::immediate();
        assert_eq!(limits.pacing, Pacing::none());
        assert_eq!(limits.max_steps_per_case, DEFAULT_MAX_STEPS_PER_CASE);
    }

    #[test]
    fn test_check_case_within_limit() {
        let case = case_with_steps("TC001", 3);
        assert!(check_case(&case, &RunLimits::default()).is_none());
    }

    #[test]
    fn test_check_case_reports_oversized_case() {
        let limits = RunLimits {
            max_steps_per_case: 2,
            ..RunLimits::default()
        };

        let violation = check_case(&case_with_steps("TC001", 3), &limits).unwrap();
        assert_eq!(violation.limit_name, "max_steps_per_case");
        assert_eq!(violation.actual_value, "3");
        assert!(violation.message.contains("TC001"));
    }

    #[test]
    fn test_step_timeout_raised_above_implicit_wait() {
        let limits = RunLimits {
            implicit_wait: Duration::from_secs(10),
            step_timeout: Duration::from_secs(3),
            ..RunLimits::default()
        }
        .reconciled();
        assert_eq!(limits.step_timeout, Duration::from_secs(11));

        // already larger: untouched
        let limits = RunLimits::default().reconciled();
        assert_eq!(limits.step_timeout, Duration::from_secs(30));

        // no implicit wait: nothing to protect
        let limits = RunLimits::immediate().reconciled();
        assert_eq!(limits.step_timeout, Duration::from_secs(5));
    }
}
