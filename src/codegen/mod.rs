//! # Geração de Código
//!
//! Converte casos de teste em **um** script Python/Selenium executável,
//! em um de três formatos: `pytest`, `unittest` ou `selenium`.
//!
//! ## Para todos entenderem:
//!
//! O gerador não decide nada sozinho: cada step passa pelo mesmo
//! planejador usado pelo runner ao vivo (`planner::plan_case`) e cada
//! [`Operation`](crate::planner::Operation) vira uma ou mais linhas de
//! Python. Os três formatos mudam só a "moldura":
//!
//! | Formato  | Moldura                                  | Falha             |
//! |----------|------------------------------------------|-------------------|
//! | pytest   | classe + fixture autouse                 | `pytest.fail(..)` |
//! | unittest | `unittest.TestCase` com setUp/tearDown   | `self.fail(..)`   |
//! | selenium | funções `run_<nome>(driver)` + `run_tests()` | imprime e segue |
//!
//! ## Nomes:
//!
//! Títulos viram identificadores Python com [`sanitize_name`]. Títulos
//! que colidem recebem sufixos `_2`, `_3`, ...

mod python;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::errors::EngineError;
use crate::limits::DEFAULT_IMPLICIT_WAIT_SECS;
use crate::planner::{plan_case, CasePlan, PlanSettings};
use crate::protocol::TestCase;

// ============================================================================
// FRAMEWORK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    Pytest,
    Unittest,
    Selenium,
}

impl Framework {
    pub const ALL: [Framework; 3] = [Self::Pytest, Self::Unittest, Self::Selenium];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pytest => "pytest",
            Self::Unittest => "unittest",
            Self::Selenium => "selenium",
        }
    }

    fn driver(&self) -> &'static str {
        match self {
            Self::Pytest | Self::Unittest => "self.driver",
            Self::Selenium => "driver",
        }
    }

    fn unit_prefix(&self) -> &'static str {
        match self {
            Self::Pytest | Self::Unittest => "test_",
            Self::Selenium => "run_",
        }
    }
}

impl FromStr for Framework {
    type Err = EngineError;

    /// Sem diferenciar maiúsculas; espaços nas pontas são ignorados.
    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let wanted = id.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|framework| framework.as_str() == wanted)
            .ok_or_else(|| EngineError::Configuration {
                framework: id.to_string(),
            })
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// NOMES
// ============================================================================

static NON_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("static pattern compiles"));

/// Converte um título em identificador Python válido.
///
/// - todo caractere fora de `[A-Za-z0-9_]` vira `_`
/// - vazio vira `unnamed`
/// - começa com dígito: prefixo `test_`
/// - começa com `_`: prefixo `test`
/// - resultado em minúsculas
///
/// ```text
/// "Test Case 1" -> "test_case_1"
/// "123Test"     -> "test_123test"
/// "_test"       -> "test_test"
/// ```
pub fn sanitize_name(title: &str) -> String {
    let replaced = NON_IDENT.replace_all(title, "_");

    let name = match replaced.chars().next() {
        None => "unnamed".to_string(),
        Some(c) if c.is_ascii_digit() => format!("test_{replaced}"),
        Some('_') => format!("test{replaced}"),
        Some(_) => replaced.into_owned(),
    };

    name.to_lowercase()
}

/// Nomes únicos dentro de um script.
///
/// Um sufixo gerado (`test_login_2`) pode coincidir com o nome de outro
/// título (`"Login 2"`), então todo nome emitido fica em `issued`.
#[derive(Default)]
struct NameRegistry {
    counters: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl NameRegistry {
    fn unique(&mut self, base: String) -> String {
        let mut name = base.clone();
        let counter = self.counters.entry(base.clone()).or_insert(1);
        while self.issued.contains(&name) {
            *counter += 1;
            name = format!("{base}_{counter}");
        }
        self.issued.insert(name.clone());
        name
    }
}

// ============================================================================
// GERAÇÃO
// ============================================================================

/// Gera o script completo.
///
/// O framework é validado antes de qualquer texto ser produzido: um id
/// desconhecido retorna `EngineError::Configuration`.
#[instrument(skip(cases, settings), fields(cases = cases.len()))]
pub fn generate(
    cases: &[TestCase],
    framework_id: &str,
    settings: &PlanSettings,
) -> Result<String, EngineError> {
    let framework: Framework = framework_id.parse()?;
    Ok(generate_for(cases, framework, settings))
}

pub fn generate_for(cases: &[TestCase], framework: Framework, settings: &PlanSettings) -> String {
    let mut names = NameRegistry::default();
    let units: Vec<Unit> = cases
        .iter()
        .map(|case| {
            let title = if case.title.trim().is_empty() {
                &case.id
            } else {
                &case.title
            };
            Unit {
                name: names.unique(format!("{}{}", framework.unit_prefix(), sanitize_name(title))),
                case,
                plan: plan_case(case, settings),
            }
        })
        .collect();

    let mut script = Script::default();
    match framework {
        Framework::Pytest => render_pytest(&mut script, &units),
        Framework::Unittest => render_unittest(&mut script, &units),
        Framework::Selenium => render_selenium(&mut script, &units),
    }

    debug!(framework = %framework, bytes = script.out.len(), "script generated");
    script.out
}

struct Unit<'a> {
    name: String,
    case: &'a TestCase,
    plan: CasePlan,
}

/// Acumulador de linhas com indentação de 4 espaços.
#[derive(Default)]
struct Script {
    out: String,
}

impl Script {
    fn line(&mut self, depth: usize, text: &str) {
        if !text.is_empty() {
            for _ in 0..depth {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }
}

fn header(script: &mut Script, framework: Framework, imports: &[&str]) {
    script.line(0, "#!/usr/bin/env python3");
    script.line(0, "\"\"\"");
    script.line(0, &format!("Generated test script ({framework})."));
    script.line(0, "\"\"\"");
    script.blank();
    script.line(0, "import time");
    for import in imports {
        script.line(0, import);
    }
    script.line(0, "from selenium import webdriver");
    script.line(0, "from selenium.webdriver.common.by import By");
    script.blank();
}

fn docstring(script: &mut Script, depth: usize, case: &TestCase) {
    script.line(depth, "\"\"\"");
    let summary = if case.description.trim().is_empty() {
        &case.title
    } else {
        &case.description
    };
    script.line(depth, &python::docstring_text(summary));
    script.line(depth, &format!("Type: {}", case.case_type.as_str()));
    script.line(depth, &format!("Priority: {}", case.priority.as_str()));
    script.line(depth, "\"\"\"");
}

/// Corpo do `try`: comentário por step, operações, bloco `# Expected:`.
fn body(script: &mut Script, depth: usize, plan: &CasePlan, driver: &str) {
    for step in &plan.steps {
        script.line(depth, &format!("# {}", python::comment_text(&step.text)));
        for operation in &step.operations {
            for statement in python::statements(operation, driver) {
                script.line(depth, &statement);
            }
        }
    }

    if let Some(expectation) = &plan.expectation {
        script.line(
            depth,
            &format!("# Expected: {}", python::comment_text(&expectation.text)),
        );
        for operation in &expectation.operations {
            for statement in python::statements(operation, driver) {
                script.line(depth, &statement);
            }
        }
    }
}

fn render_pytest(script: &mut Script, units: &[Unit]) {
    let framework = Framework::Pytest;
    header(script, framework, &["", "import pytest"]);
    script.blank();
    script.line(0, "class TestGeneratedCases:");
    script.line(1, "\"\"\"Generated test cases.\"\"\"");
    script.blank();
    script.line(1, "@pytest.fixture(autouse=True)");
    script.line(1, "def setup(self):");
    script.line(2, "self.driver = webdriver.Chrome()");
    script.line(
        2,
        &format!("self.driver.implicitly_wait({DEFAULT_IMPLICIT_WAIT_SECS})"),
    );
    script.line(2, "yield");
    script.line(2, "self.driver.quit()");

    for unit in units {
        script.blank();
        script.line(1, &format!("def {}(self):", unit.name));
        docstring(script, 2, unit.case);
        script.line(2, "try:");
        body(script, 3, &unit.plan, framework.driver());
        script.line(2, "except Exception as e:");
        script.line(3, "pytest.fail(f\"Test failed: {e}\")");
    }
}

fn render_unittest(script: &mut Script, units: &[Unit]) {
    let framework = Framework::Unittest;
    header(script, framework, &["import unittest"]);
    script.blank();
    script.line(0, "class TestGeneratedCases(unittest.TestCase):");
    script.line(1, "\"\"\"Generated test cases.\"\"\"");
    script.blank();
    script.line(1, "def setUp(self):");
    script.line(2, "self.driver = webdriver.Chrome()");
    script.line(
        2,
        &format!("self.driver.implicitly_wait({DEFAULT_IMPLICIT_WAIT_SECS})"),
    );
    script.blank();
    script.line(1, "def tearDown(self):");
    script.line(2, "self.driver.quit()");

    for unit in units {
        script.blank();
        script.line(1, &format!("def {}(self):", unit.name));
        docstring(script, 2, unit.case);
        script.line(2, "try:");
        body(script, 3, &unit.plan, framework.driver());
        script.line(2, "except Exception as e:");
        script.line(3, "self.fail(f\"Test failed: {e}\")");
    }

    script.blank();
    script.blank();
    script.line(0, "if __name__ == \"__main__\":");
    script.line(1, "unittest.main()");
}

fn render_selenium(script: &mut Script, units: &[Unit]) {
    let framework = Framework::Selenium;
    header(script, framework, &[]);

    for unit in units {
        let title = python::comment_text(&unit.case.title);
        script.blank();
        script.line(0, &format!("def {}(driver):", unit.name));
        docstring(script, 1, unit.case);
        script.line(1, "try:");
        body(script, 2, &unit.plan, framework.driver());
        script.line(
            2,
            &format!("print({})", python::string_literal(&format!("PASS: {title}"))),
        );
        script.line(2, "return True");
        script.line(1, "except Exception as e:");
        script.line(
            2,
            &format!("print({}, e)", python::string_literal(&format!("FAIL: {title}:"))),
        );
        script.line(2, "return False");
        script.blank();
    }

    script.blank();
    script.line(0, "def run_tests():");
    script.line(1, "driver = webdriver.Chrome()");
    script.line(
        1,
        &format!("driver.implicitly_wait({DEFAULT_IMPLICIT_WAIT_SECS})"),
    );
    script.line(1, "results = []");
    script.line(1, "try:");
    if units.is_empty() {
        script.line(2, "pass");
    }
    for unit in units {
        script.line(2, &format!("results.append({}(driver))", unit.name));
    }
    script.line(1, "finally:");
    script.line(2, "driver.quit()");
    script.line(1, "print(f\"{sum(results)}/{len(results)} passed\")");
    script.blank();
    script.blank();
    script.line(0, "if __name__ == \"__main__\":");
    script.line(1, "run_tests()");
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Pacing;
    use crate::protocol::{CaseType, Priority};

    fn settings() -> PlanSettings {
        PlanSettings {
            base_url: "http://localhost:5001".to_string(),
            pacing: Pacing::default(),
        }
    }

    fn case(title: &str, steps: &[&str], expected: Option<&str>) -> TestCase {
        TestCase {
            id: "TC001".to_string(),
            title: title.to_string(),
            description: "Login with valid credentials".to_string(),
            case_type: CaseType::Positive,
            steps: steps.iter().map(|s| s.to_string()).collect(),
            expected_result: expected.map(str::to_string),
            priority: Priority::High,
        }
    }

    fn login_case() -> TestCase {
        case(
            "Valid Login",
            &[
                "打開登入頁面",
                "Enter admin as the username",
                "輸入密碼",
                "點擊登入按鈕",
            ],
            Some("成功登入並導向 Dashboard"),
        )
    }

    #[test]
    fn test_sanitize_name_examples() {
        assert_eq!(sanitize_name("Test Case 1"), "test_case_1");
        assert_eq!(sanitize_name("123Test"), "test_123test");
        assert_eq!(sanitize_name("_test"), "test_test");
        assert_eq!(sanitize_name(""), "unnamed");
        assert_eq!(sanitize_name("Login-Page!"), "login_page_");
        assert_eq!(sanitize_name("Valid_Name"), "valid_name");
        assert_eq!(sanitize_name("already_ok"), "already_ok");
    }

    #[test]
    fn test_sanitize_name_is_identifier() {
        let ident = Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap();
        for title in ["使用者登入", "9 lives", "  spaced  ", "ok", "Ünïcode"] {
            let name = sanitize_name(title);
            assert!(ident.is_match(&name), "{title:?} -> {name:?}");
            assert_eq!(sanitize_name(title), name);
        }
    }

    #[test]
    fn test_framework_parsing() {
        assert_eq!(" PyTest ".parse::<Framework>().unwrap(), Framework::Pytest);
        assert_eq!("unittest".parse::<Framework>().unwrap(), Framework::Unittest);
        assert_eq!("SELENIUM".parse::<Framework>().unwrap(), Framework::Selenium);
    }

    #[test]
    fn test_unknown_framework_is_configuration_error() {
        let err = generate(&[login_case()], "robot", &settings()).unwrap_err();
        assert!(matches!(err, EngineError::Configuration { ref framework } if framework == "robot"));
    }

    #[test]
    fn test_pytest_login_script() {
        let script = generate(&[login_case()], "pytest", &settings()).unwrap();

        assert!(script.contains("import pytest"));
        assert!(script.contains("@pytest.fixture(autouse=True)"));
        assert!(script.contains("    def test_valid_login(self):"));
        assert!(script.contains("# 打開登入頁面"));
        assert!(script.contains(r#"self.driver.get("http://localhost:5001")"#));
        assert!(script.contains(r#"element.send_keys("admin")"#));
        assert!(script.contains(r#"element.send_keys("password123")"#));
        assert!(script.contains(r#"By.CSS_SELECTOR, "button[type='submit']").click()"#));
        assert!(script.contains("time.sleep(2)"));
        assert!(script.contains("# Expected: 成功登入並導向 Dashboard"));
        assert!(script.contains(r#"for fragment in ("dashboard", "home")"#));
        assert!(script.contains("pytest.fail("));
        assert!(script.contains("Type: positive"));
        assert!(script.contains("Priority: high"));
    }

    #[test]
    fn test_step_comments_precede_statements_in_order() {
        let script = generate(&[login_case()], "unittest", &settings()).unwrap();
        let positions: Vec<usize> = ["# 打開登入頁面", "# Enter admin", "# 輸入密碼", "# 點擊登入按鈕", "# Expected:"]
            .iter()
            .map(|needle| script.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unittest_wrapper() {
        let script = generate(&[login_case()], "unittest", &settings()).unwrap();
        assert!(script.contains("class TestGeneratedCases(unittest.TestCase):"));
        assert!(script.contains("def setUp(self):"));
        assert!(script.contains("def tearDown(self):"));
        assert!(script.contains("self.fail("));
        assert!(script.trim_end().ends_with("unittest.main()"));
        assert!(!script.contains("pytest"));
    }

    #[test]
    fn test_selenium_wrapper() {
        let script = generate(&[login_case()], "selenium", &settings()).unwrap();
        assert!(script.contains("def run_valid_login(driver):"));
        assert!(script.contains(r#"driver.get("http://localhost:5001")"#));
        assert!(!script.contains("self.driver"));
        assert!(script.contains("results.append(run_valid_login(driver))"));
        assert!(script.contains("finally:\n        driver.quit()"));
        assert!(script.contains(r#"print("FAIL: Valid Login:", e)"#));
    }

    #[test]
    fn test_duplicate_titles_get_suffixes() {
        let cases = vec![
            case("Login", &["Wait"], None),
            case("login", &["Wait"], None),
            case("LOGIN", &["Wait"], None),
        ];
        let script = generate(&cases, "pytest", &settings()).unwrap();
        assert!(script.contains("def test_login(self):"));
        assert!(script.contains("def test_login_2(self):"));
        assert!(script.contains("def test_login_3(self):"));
    }

    #[test]
    fn test_suffix_never_collides_with_another_title() {
        let cases = vec![
            case("Login", &["Wait"], None),
            case("Login", &["Wait"], None),
            case("Login 2", &["Wait"], None),
        ];
        let script = generate(&cases, "pytest", &settings()).unwrap();

        let defs: Vec<&str> = script
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with("def test_"))
            .collect();
        assert_eq!(
            defs,
            vec![
                "def test_login(self):",
                "def test_login_2(self):",
                "def test_login_2_2(self):",
            ]
        );
    }

    #[test]
    fn test_hostile_text_is_escaped() {
        let tricky = case(
            "Quote \"test\"",
            &["Enter \"admin\"\nas username"],
            Some("line\nbreak"),
        );
        let script = generate(&[tricky], "selenium", &settings()).unwrap();
        assert!(script.contains("# Enter \"admin\" as username"));
        assert!(script.contains("# Expected: line break"));
        assert!(script.contains(r#"print("PASS: Quote \"test\"")"#));
    }

    #[test]
    fn test_empty_case_gets_default_steps() {
        let mut empty = case("Register new account", &[], None);
        empty.case_type = CaseType::Negative;
        let script = generate(&[empty], "pytest", &settings()).unwrap();
        assert!(script.contains("# Open the registration page"));
        assert!(script.contains("# Fill in incomplete information"));
        assert!(script.contains(r#"By.ID, "register-button").click()"#));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let cases = vec![login_case(), case("Other", &["Check the result"], None)];
        for framework in Framework::ALL {
            let a = generate_for(&cases, framework, &settings());
            let b = generate_for(&cases, framework, &settings());
            assert_eq!(a, b);
        }
    }
}
