//! # Runner ao Vivo
//!
//! Executa os planos de casos contra uma sessão de navegador real e
//! produz um [`RunSummary`].
//!
//! ## Para todos entenderem:
//!
//! O runner abre **uma** sessão para a execução inteira, roda os casos
//! em sequência e fecha a sessão no final, aconteça o que acontecer.
//!
//! ```text
//! Idle ──(acquire)──> SessionActive ──> [caso 1] ──> [caso 2] ──> ... ──> TornDown
//!   │
//!   └──(falha ou timeout ao abrir sessão)──> Abortado
//! ```
//!
//! ## Regras:
//!
//! - **Fail-fast por caso**: o primeiro step que falha encerra o caso.
//! - **Continua por execução**: o próximo caso roda normalmente.
//! - **Falha de sessão é fatal**: sem sessão não há o que executar.
//! - **Caso acima dos limites** falha sem ser executado; os outros rodam.
//! - Cada operação tem um teto (`limits.step_timeout`). Abrir e fechar a
//!   sessão tem outro (`limits.session_timeout`).
//! - Um caso só passa se todos os steps passaram **e** o resultado
//!   esperado (quando existe) foi observado.

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::limits::check_case;
use crate::planner::{plan_case, CasePlan, Locator, Operation, PlanSettings};
use crate::protocol::{RunSummary, StepResult, TestCase, TestCaseResult};

use super::{wait, CancelFlag, Session, SessionProvider};

// ============================================================================
// GUARDA DA SESSÃO
// ============================================================================

/// Dono exclusivo da sessão durante a execução.
///
/// `release()` fecha a sessão exatamente uma vez. Se a guarda for
/// descartada sem `release()` (pânico, future cancelado), o `Drop`
/// agenda o `quit` no runtime Tokio corrente. Nos dois caminhos o `quit`
/// tem no máximo `quit_timeout` para terminar.
pub struct SessionGuard {
    session: Option<Box<dyn Session>>,
    quit_timeout: Duration,
}

impl SessionGuard {
    pub fn new(session: Box<dyn Session>, quit_timeout: Duration) -> Self {
        Self {
            session: Some(session),
            quit_timeout,
        }
    }

    pub fn session(&mut self) -> Result<&mut dyn Session, EngineError> {
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(EngineError::StepExecution(
                "session already released".to_string(),
            )),
        }
    }

    /// Fecha a sessão. Erros de `quit` são logados, nunca propagados.
    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            match timeout(self.quit_timeout, session.quit()).await {
                Ok(Ok(())) => info!("session closed"),
                Ok(Err(e)) => warn!(error = %e, "failed to quit session"),
                Err(_) => warn!(
                    timeout_ms = self.quit_timeout.as_millis() as u64,
                    "session quit timed out, giving up"
                ),
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        warn!("session guard dropped without release, quitting in background");
        let quit_timeout = self.quit_timeout;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match timeout(quit_timeout, session.quit()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => warn!(error = %e, "background session quit failed"),
                        Err(_) => warn!("background session quit timed out"),
                    }
                });
            }
            Err(_) => error!("no tokio runtime to quit the session, it may be leaked"),
        }
    }
}

// ============================================================================
// RUNNER
// ============================================================================

pub struct LiveRunner<P: SessionProvider> {
    config: EngineConfig,
    provider: P,
    cancel: CancelFlag,
}

impl<P: SessionProvider> LiveRunner<P> {
    pub fn new(config: EngineConfig, provider: P) -> Self {
        Self {
            config,
            provider,
            cancel: CancelFlag::new(),
        }
    }

    /// Usa um flag compartilhado (ex.: acionado por Ctrl+C).
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Executa todos os casos numa única sessão.
    #[instrument(skip_all, fields(cases = cases.len()))]
    pub async fn run(&self, cases: &[TestCase]) -> RunSummary {
        let started_at = Utc::now();
        let session_timeout = self.config.limits.session_timeout;

        let acquired = timeout(session_timeout, self.provider.acquire())
            .await
            .unwrap_or_else(|_| {
                Err(EngineError::SessionAcquisition(format!(
                    "no session after {}ms",
                    session_timeout.as_millis()
                )))
            });
        let session = match acquired {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "could not acquire session");
                return RunSummary::aborted(started_at, e.user_message());
            }
        };
        info!("session acquired");

        let mut guard = SessionGuard::new(session, session_timeout);
        let outcome = match guard.session() {
            Ok(session) => self.run_cases(session, cases).await,
            Err(e) => Err(e),
        };
        guard.release().await;

        let summary = match outcome {
            Ok((results, error)) => RunSummary::from_results(started_at, results, error),
            Err(e) => RunSummary::aborted(started_at, e.user_message()),
        };

        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            "run finished"
        );
        summary
    }

    async fn run_cases(
        &self,
        session: &mut dyn Session,
        cases: &[TestCase],
    ) -> Result<(Vec<TestCaseResult>, Option<String>), EngineError> {
        let limits = &self.config.limits;
        timeout(limits.session_timeout, session.set_implicit_wait(limits.implicit_wait))
            .await
            .map_err(|_| {
                EngineError::SessionAcquisition("implicit wait setup timed out".to_string())
            })?
            .map_err(|e| EngineError::SessionAcquisition(e.to_string()))?;

        let settings = self.config.plan_settings();
        let mut results = Vec::with_capacity(cases.len());

        for case in cases {
            if self.cancel.is_cancelled() {
                break;
            }
            results.push(self.run_case(session, case, &settings).await);
        }

        let run_error = if self.cancel.is_cancelled() {
            warn!(completed = results.len(), "run cancelled");
            Some(EngineError::Cancelled.to_string())
        } else {
            None
        };

        Ok((results, run_error))
    }

    #[instrument(skip_all, fields(case_id = %case.id))]
    async fn run_case(
        &self,
        session: &mut dyn Session,
        case: &TestCase,
        settings: &PlanSettings,
    ) -> TestCaseResult {
        let start = Instant::now();

        if let Some(violation) = check_case(case, &self.config.limits) {
            warn!(limit = %violation.limit_name, "case exceeds limits, not executed");
            return TestCaseResult {
                id: case.id.clone(),
                title: case.title.clone(),
                case_type: case.case_type,
                success: false,
                error: Some(violation.message),
                execution_time_ms: 0,
                steps_results: Vec::new(),
            };
        }

        let plan = plan_case(case, settings);
        info!(
            title = %case.title,
            steps = plan.steps.len(),
            synthesized = plan.synthesized,
            "running case"
        );

        let mut steps_results = Vec::with_capacity(plan.steps.len());
        let failure = self
            .drive_case(session, &plan, settings, &mut steps_results)
            .await;

        match &failure {
            None => info!("case passed"),
            Some(reason) => warn!(%reason, "case failed"),
        }

        TestCaseResult {
            id: case.id.clone(),
            title: case.title.clone(),
            case_type: case.case_type,
            success: failure.is_none(),
            error: failure,
            execution_time_ms: start.elapsed().as_millis() as u64,
            steps_results,
        }
    }

    /// Retorna o motivo da falha do caso, ou `None` se passou.
    async fn drive_case(
        &self,
        session: &mut dyn Session,
        plan: &CasePlan,
        settings: &PlanSettings,
        steps_results: &mut Vec<StepResult>,
    ) -> Option<String> {
        if self.config.open_base_url_per_case {
            let open = Operation::Navigate {
                url: settings.base_url.clone(),
            };
            if let Err(e) = self.apply(session, &open).await {
                return Some(format!("could not open {}: {}", settings.base_url, e.user_message()));
            }
        }

        for step in &plan.steps {
            if self.cancel.is_cancelled() {
                return Some(EngineError::Cancelled.user_message());
            }

            let step_start = Instant::now();
            let outcome = self.apply_all(session, &step.operations).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => steps_results.push(StepResult {
                    step_number: step.number,
                    step: step.text.clone(),
                    success: true,
                    error: None,
                    duration_ms,
                }),
                Err(e) => {
                    let message = e.user_message();
                    warn!(step = step.number, error = %message, "step failed");
                    steps_results.push(StepResult {
                        step_number: step.number,
                        step: step.text.clone(),
                        success: false,
                        error: Some(message.clone()),
                        duration_ms,
                    });
                    return Some(format!("step {} failed: {}", step.number, message));
                }
            }
        }

        if let Some(expectation) = &plan.expectation {
            if let Err(e) = self.apply_all(session, &expectation.operations).await {
                return Some(format!(
                    "expected result not met ({}): {}",
                    expectation.text,
                    e.user_message()
                ));
            }
        }

        None
    }

    async fn apply_all(
        &self,
        session: &mut dyn Session,
        operations: &[Operation],
    ) -> Result<(), EngineError> {
        for operation in operations {
            self.apply(session, operation).await?;
        }
        Ok(())
    }

    /// Executa uma operação sob o timeout por step.
    async fn apply(
        &self,
        session: &mut dyn Session,
        operation: &Operation,
    ) -> Result<(), EngineError> {
        let step_timeout = self.config.limits.step_timeout;
        // Pausas planejadas não contam contra o teto.
        let limit = match operation {
            Operation::Pause { duration } => *duration + step_timeout,
            _ => step_timeout,
        };

        timeout(limit, self.perform(session, operation))
            .await
            .map_err(|_| EngineError::StepTimeout {
                timeout_ms: limit.as_millis() as u64,
            })?
    }

    async fn perform(
        &self,
        session: &mut dyn Session,
        operation: &Operation,
    ) -> Result<(), EngineError> {
        match operation {
            Operation::Navigate { url } => session.navigate(url).await,
            Operation::Fill { locator, value } => {
                let element = session.locate(&locator.css()).await?;
                session.clear(&element).await?;
                session.type_text(&element, value).await
            }
            Operation::Click { locator } => {
                let element = session.locate(&locator.css()).await?;
                session.click(&element).await
            }
            Operation::AssertUrlContains { fragments } => {
                let url = session.current_url().await?;
                if fragments.iter().any(|fragment| url.contains(fragment)) {
                    Ok(())
                } else {
                    Err(EngineError::Verification(format!(
                        "current url '{}' contains none of [{}]",
                        url,
                        fragments.join(", ")
                    )))
                }
            }
            Operation::AssertVisible { locator } => assert_visible(session, locator).await,
            Operation::AssertPlaceholder => Ok(()),
            Operation::Pause { duration } => {
                wait::pause(*duration, &self.cancel).await;
                Ok(())
            }
        }
    }
}

async fn assert_visible(session: &mut dyn Session, locator: &Locator) -> Result<(), EngineError> {
    let element = match session.locate(&locator.css()).await {
        Ok(element) => element,
        Err(EngineError::ElementNotFound { .. }) => {
            return Err(EngineError::Verification(format!("{locator} is not present")));
        }
        Err(e) => return Err(e),
    };

    if session.is_visible(&element).await? {
        Ok(())
    } else {
        Err(EngineError::Verification(format!("{locator} is not visible")))
    }
}

// ============================================================================
// TESTES
// ============================================================================
