//! # Planejador de Casos
//!
//! Traduz cada [`CanonicalAction`] em uma sequência de [`Operation`]s.
//! Esta é a única tabela "ação → comportamento" do engine: o gerador de
//! código transforma operações em texto Python e o runner ao vivo as
//! executa contra uma sessão de navegador.
//!
//! ## Para todos entenderem:
//!
//! Pense numa receita. O classificador diz "é para clicar no login";
//! o planejador escreve a receita concreta: "ache o botão
//! `button[type='submit']`, clique, espere 2 segundos". Os dois backends
//! seguem a mesma receita, um escrevendo-a num script, outro cozinhando.
//!
//! ## Tabela de mapeamento:
//!
//! | Ação                 | Operações                                      |
//! |----------------------|------------------------------------------------|
//! | Navigate             | Navigate(base_url), Pause(after_navigate)      |
//! | InputField(username) | Fill(#username, valor)                         |
//! | InputField(password) | Fill(#password, valor)                         |
//! | InputField(generic)  | Fill(#input_field, valor)                      |
//! | Click(login)         | Click(button[type='submit']), Pause(submit)    |
//! | Click(register)      | Click(#register-button), Pause(submit)         |
//! | Click(generic)       | Click(button), Pause(after_click)              |
//! | Verify(redirect)     | AssertUrlContains(dashboard, home)             |
//! | Verify(error)        | AssertVisible(.alert-danger)                   |
//! | Verify(success)      | AssertVisible(.alert-success)                  |
//! | Verify(generic)      | AssertPlaceholder (sempre passa)               |
//! | Wait                 | Pause(wait)                                    |
//! | Generic              | Pause(idle)                                    |
//!
//! `Verify(generic)` não verifica nada: é uma limitação explícita, não
//! um esquecimento.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::classifier::{self, ActionKind, CanonicalAction, ControlTarget, FieldTarget, Outcome};
use crate::extractors;
use crate::limits::Pacing;
use crate::protocol::{CaseType, TestCase};

// ============================================================================
// LOCALIZADORES E OPERAÇÕES
// ============================================================================

/// Como encontrar um elemento na página.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    Id(&'static str),
    Css(&'static str),
    ClassName(&'static str),
}

impl Locator {
    /// Seletor CSS equivalente (o que a sessão WebDriver recebe).
    pub fn css(&self) -> String {
        match self {
            Self::Id(id) => format!("#{id}"),
            Self::Css(selector) => (*selector).to_string(),
            Self::ClassName(class) => format!(".{class}"),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Css(selector) => write!(f, "css={selector}"),
            Self::ClassName(class) => write!(f, "class={class}"),
        }
    }
}

pub const USERNAME_FIELD: Locator = Locator::Id("username");
pub const PASSWORD_FIELD: Locator = Locator::Id("password");
pub const GENERIC_FIELD: Locator = Locator::Id("input_field");
pub const LOGIN_BUTTON: Locator = Locator::Css("button[type='submit']");
pub const REGISTER_BUTTON: Locator = Locator::Id("register-button");
pub const GENERIC_BUTTON: Locator = Locator::Css("button");
pub const ERROR_INDICATOR: Locator = Locator::ClassName("alert-danger");
pub const SUCCESS_INDICATOR: Locator = Locator::ClassName("alert-success");

/// Fragmentos de URL que indicam uma área de destino conhecida.
pub const LANDING_FRAGMENTS: [&str; 2] = ["dashboard", "home"];

/// Vocabulário fechado interpretado pelos dois backends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Navigate { url: String },
    /// Limpa o campo e digita o valor.
    Fill { locator: Locator, value: String },
    Click { locator: Locator },
    /// Passa se a URL atual contém qualquer um dos fragmentos.
    AssertUrlContains { fragments: Vec<&'static str> },
    AssertVisible { locator: Locator },
    AssertPlaceholder,
    Pause { duration: Duration },
}

/// Parâmetros que o planejamento precisa e que vêm da configuração.
#[derive(Debug, Clone)]
pub struct PlanSettings {
    pub base_url: String,
    pub pacing: Pacing,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            pacing: Pacing::default(),
        }
    }
}

/// Aplica a tabela de mapeamento a uma ação.
pub fn lower(action: &CanonicalAction, settings: &PlanSettings) -> Vec<Operation> {
    let pacing = &settings.pacing;
    let pause = |duration: Duration| Operation::Pause { duration };

    match action.kind {
        ActionKind::Navigate => vec![
            Operation::Navigate {
                url: settings.base_url.clone(),
            },
            pause(pacing.after_navigate),
        ],
        ActionKind::InputField(target) => {
            let locator = match target {
                FieldTarget::Username => USERNAME_FIELD,
                FieldTarget::Password => PASSWORD_FIELD,
                FieldTarget::Generic => GENERIC_FIELD,
            };
            let value = action
                .value
                .clone()
                .unwrap_or_else(|| extractors::resolve_value(target, &action.raw).value.to_string());
            vec![Operation::Fill { locator, value }]
        }
        ActionKind::Click(ControlTarget::Login) => vec![
            Operation::Click {
                locator: LOGIN_BUTTON,
            },
            pause(pacing.after_submit),
        ],
        ActionKind::Click(ControlTarget::Register) => vec![
            Operation::Click {
                locator: REGISTER_BUTTON,
            },
            pause(pacing.after_submit),
        ],
        ActionKind::Click(ControlTarget::Generic) => vec![
            Operation::Click {
                locator: GENERIC_BUTTON,
            },
            pause(pacing.after_click),
        ],
        ActionKind::Verify(outcome) => vec![verification(outcome)],
        ActionKind::Wait => vec![pause(pacing.wait)],
        ActionKind::Generic => vec![pause(pacing.idle)],
    }
}

fn verification(outcome: Outcome) -> Operation {
    match outcome {
        Outcome::Redirect => Operation::AssertUrlContains {
            fragments: LANDING_FRAGMENTS.to_vec(),
        },
        Outcome::Error => Operation::AssertVisible {
            locator: ERROR_INDICATOR,
        },
        Outcome::Success => Operation::AssertVisible {
            locator: SUCCESS_INDICATOR,
        },
        Outcome::Generic => Operation::AssertPlaceholder,
    }
}

// ============================================================================
// PLANO DO CASO
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    /// Começa em 1.
    pub number: usize,
    pub text: String,
    pub action: CanonicalAction,
    pub operations: Vec<Operation>,
}

/// Verificação derivada de `expected_result`.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedExpectation {
    pub text: String,
    pub outcome: Outcome,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CasePlan {
    pub steps: Vec<PlannedStep>,
    pub expectation: Option<PlannedExpectation>,
    /// `true` quando o caso não trouxe steps e usamos [`default_steps`].
    pub synthesized: bool,
}

/// Planeja um caso inteiro, na ordem declarada.
pub fn plan_case(case: &TestCase, settings: &PlanSettings) -> CasePlan {
    let synthesized = case.steps.is_empty();
    let texts: Vec<String> = if synthesized {
        default_steps(case).iter().map(|s| s.to_string()).collect()
    } else {
        case.steps.clone()
    };

    let steps = texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let action = extractors::interpret(&text);
            let operations = lower(&action, settings);
            PlannedStep {
                number: index + 1,
                text,
                action,
                operations,
            }
        })
        .collect();

    let expectation = case.expected_result.as_ref().map(|text| {
        let outcome = classifier::outcome_of(text);
        PlannedExpectation {
            text: text.clone(),
            outcome,
            operations: vec![verification(outcome)],
        }
    });

    CasePlan {
        steps,
        expectation,
        synthesized,
    }
}

// ============================================================================
// STEPS PADRÃO
// ============================================================================

const LOGIN_TITLE: [&str; 2] = ["登入", "login"];
const REGISTER_TITLE: [&str; 2] = ["註冊", "register"];

/// Sequência usada quando o caso chega sem steps.
///
/// Títulos de login e de registro têm fluxos próprios (positivo e
/// não positivo); o resto recebe "abrir, executar, verificar".
pub fn default_steps(case: &TestCase) -> &'static [&'static str] {
    let title = case.title.to_lowercase();
    let positive = case.case_type == CaseType::Positive;

    if LOGIN_TITLE.iter().any(|kw| title.contains(kw)) {
        if positive {
            &[
                "Open the login page",
                "Enter a valid username",
                "Enter a valid password",
                "Click the login button",
            ]
        } else {
            &[
                "Open the login page",
                "Enter an invalid username or password",
                "Click the login button",
            ]
        }
    } else if REGISTER_TITLE.iter().any(|kw| title.contains(kw)) {
        if positive {
            &[
                "Open the registration page",
                "Fill in all required fields",
                "Click the register button",
            ]
        } else {
            &[
                "Open the registration page",
                "Fill in incomplete information",
                "Click the register button",
            ]
        }
    } else {
        &["Open the test page", "Perform the test operation", "Verify the result"]
    }
}
