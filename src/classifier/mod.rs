//! # Classificador de Ações
//!
//! Converte o texto livre de um step ("點擊登入按鈕", "Enter the password")
//! em uma [`CanonicalAction`] tipada.
//!
//! ## Para todos entenderem:
//!
//! Os steps chegam escritos por uma IA, em chinês tradicional ou inglês,
//! sem formato fixo. Em vez de tentar "entender" a frase, procuramos
//! palavras-chave. Cada regra da tabela [`RULES`] tem uma lista de
//! palavras nos dois idiomas; a primeira regra que casa decide o tipo.
//!
//! ## Ordem das regras (a primeira vence):
//!
//! | # | Regra    | Exemplos                     | Resultado        |
//! |---|----------|------------------------------|------------------|
//! | 1 | navigate | 打開, open, navigate         | `Navigate`       |
//! | 2 | input    | 輸入, 填寫, enter, type      | `InputField(..)` |
//! | 3 | click    | 點擊, 按下, click, press     | `Click(..)`      |
//! | 4 | verify   | 驗證, 檢查, verify, check    | `Verify(..)`     |
//! | 5 | wait     | 等待, wait                   | `Wait`           |
//! | - | nenhuma  |                              | `Generic`        |
//!
//! "Open the login page and click login" é `Navigate`, porque a regra 1
//! vem antes da regra 3. A classificação é uma função pura do texto.

use serde::Serialize;

// ============================================================================
// CONJUNTOS DE PALAVRAS-CHAVE
// ============================================================================

/// Palavras-chave paralelas nos dois idiomas suportados.
///
/// As palavras em inglês devem estar em minúsculas: o texto é
/// comparado depois de `to_lowercase()`. Elas só casam no início de uma
/// palavra ("center" não contém `enter`), mas aceitam sufixos
/// ("clicking", "redirected"). As chinesas casam em qualquer posição.
#[derive(Debug)]
pub struct KeywordSet {
    pub zh: &'static [&'static str],
    pub en: &'static [&'static str],
}

impl KeywordSet {
    /// `lowered` já deve estar em minúsculas.
    fn matches(&self, lowered: &str) -> bool {
        self.zh.iter().any(|kw| lowered.contains(kw))
            || self.en.iter().any(|kw| starts_word(lowered, kw))
    }
}

fn starts_word(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(at, _)| {
        text[..at]
            .chars()
            .next_back()
            .map_or(true, |prev| !prev.is_ascii_alphanumeric())
    })
}

pub const NAVIGATE: KeywordSet = KeywordSet {
    zh: &["打開", "開啟", "前往", "導航"],
    en: &["open", "navigate", "go to", "visit"],
};

pub const INPUT: KeywordSet = KeywordSet {
    zh: &["輸入", "填寫", "填入"],
    en: &["input", "enter", "type", "fill"],
};

pub const CLICK: KeywordSet = KeywordSet {
    zh: &["點擊", "點選", "按下"],
    en: &["click", "press", "tap"],
};

pub const VERIFY: KeywordSet = KeywordSet {
    zh: &["驗證", "檢查", "確認"],
    en: &["verify", "check", "assert", "confirm"],
};

pub const WAIT: KeywordSet = KeywordSet {
    zh: &["等待"],
    en: &["wait"],
};

const USERNAME_FIELD: KeywordSet = KeywordSet {
    zh: &["用戶名", "帳號", "使用者名稱"],
    en: &["username", "user name", "account", "login id"],
};

const PASSWORD_FIELD: KeywordSet = KeywordSet {
    zh: &["密碼"],
    en: &["password", "passcode", "secret"],
};

const LOGIN_CONTROL: KeywordSet = KeywordSet {
    zh: &["登入", "登錄"],
    en: &["login", "log in", "sign in"],
};

const REGISTER_CONTROL: KeywordSet = KeywordSet {
    zh: &["註冊"],
    en: &["register", "sign up"],
};

const REDIRECT_OUTCOME: KeywordSet = KeywordSet {
    zh: &["導向", "跳轉"],
    en: &["redirect", "dashboard", "landing"],
};

const ERROR_OUTCOME: KeywordSet = KeywordSet {
    zh: &["錯誤", "失敗"],
    en: &["error", "invalid", "fail"],
};

const SUCCESS_OUTCOME: KeywordSet = KeywordSet {
    zh: &["成功"],
    en: &["success"],
};

// ============================================================================
// AÇÃO CANÔNICA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTarget {
    Username,
    Password,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlTarget {
    Login,
    Register,
    Generic,
}

/// Resultado que um `Verify` (ou um `expected_result`) quer observar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Redirect,
    Error,
    Success,
    Generic,
}

/// Vocabulário fechado de ações. Os dois backends fazem `match` exaustivo
/// sobre ele (via `planner`), então uma variante nova quebra a compilação
/// em vez de ser ignorada silenciosamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    InputField(FieldTarget),
    Click(ControlTarget),
    Verify(Outcome),
    Wait,
    Generic,
}

impl ActionKind {
    /// Dica de alvo legível ("username", "login", ...).
    pub fn target_hint(&self) -> &'static str {
        match self {
            Self::Navigate => "page",
            Self::InputField(FieldTarget::Username) => "username",
            Self::InputField(FieldTarget::Password) => "password",
            Self::InputField(FieldTarget::Generic) => "input",
            Self::Click(ControlTarget::Login) => "login",
            Self::Click(ControlTarget::Register) => "register",
            Self::Click(ControlTarget::Generic) => "button",
            Self::Verify(Outcome::Redirect) => "redirect",
            Self::Verify(Outcome::Error) => "error",
            Self::Verify(Outcome::Success) => "success",
            Self::Verify(Outcome::Generic) => "result",
            Self::Wait => "pause",
            Self::Generic => "none",
        }
    }
}

/// Representação normalizada de um step. Efêmera: derivada a cada uso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalAction {
    pub kind: ActionKind,
    pub target: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub raw: String,
}

impl CanonicalAction {
    pub fn new(kind: ActionKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            target: kind.target_hint(),
            value: None,
            raw: raw.into(),
        }
    }
}

// ============================================================================
// TABELA DE REGRAS
// ============================================================================

/// Uma entrada da tabela: nome, palavras-chave e construtor do tipo.
///
/// O construtor recebe o texto já em minúsculas para fazer a
/// subclassificação (qual campo, qual botão, qual resultado).
pub struct Rule {
    pub name: &'static str,
    pub keywords: &'static KeywordSet,
    pub build: fn(&str) -> ActionKind,
}

/// Regras em ordem de prioridade. Avaliadas de cima para baixo.
pub static RULES: [Rule; 5] = [
    Rule {
        name: "navigate",
        keywords: &NAVIGATE,
        build: |_| ActionKind::Navigate,
    },
    Rule {
        name: "input",
        keywords: &INPUT,
        build: |text| ActionKind::InputField(field_target(text)),
    },
    Rule {
        name: "click",
        keywords: &CLICK,
        build: |text| ActionKind::Click(control_target(text)),
    },
    Rule {
        name: "verify",
        keywords: &VERIFY,
        build: |text| ActionKind::Verify(outcome_lowered(text)),
    },
    Rule {
        name: "wait",
        keywords: &WAIT,
        build: |_| ActionKind::Wait,
    },
];

fn field_target(lowered: &str) -> FieldTarget {
    if USERNAME_FIELD.matches(lowered) {
        FieldTarget::Username
    } else if PASSWORD_FIELD.matches(lowered) {
        FieldTarget::Password
    } else {
        FieldTarget::Generic
    }
}

fn control_target(lowered: &str) -> ControlTarget {
    if LOGIN_CONTROL.matches(lowered) {
        ControlTarget::Login
    } else if REGISTER_CONTROL.matches(lowered) {
        ControlTarget::Register
    } else {
        ControlTarget::Generic
    }
}

fn outcome_lowered(lowered: &str) -> Outcome {
    if REDIRECT_OUTCOME.matches(lowered) {
        Outcome::Redirect
    } else if ERROR_OUTCOME.matches(lowered) {
        Outcome::Error
    } else if SUCCESS_OUTCOME.matches(lowered) {
        Outcome::Success
    } else {
        Outcome::Generic
    }
}

/// Nome da regra que casaria com o texto, ou `None` para `Generic`.
pub fn matching_rule(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.keywords.matches(&lowered))
        .map(|rule| rule.name)
}

/// Classifica um step. Não preenche `value`; veja `extractors::enrich`.
pub fn classify(text: &str) -> CanonicalAction {
    let lowered = text.to_lowercase();
    let kind = RULES
        .iter()
        .find(|rule| rule.keywords.matches(&lowered))
        .map(|rule| (rule.build)(&lowered))
        .unwrap_or(ActionKind::Generic);

    CanonicalAction::new(kind, text)
}

/// Subclassificação de resultado, usada para `expected_result`.
pub fn outcome_of(text: &str) -> Outcome {
    outcome_lowered(&text.to_lowercase())
}
