//! # Parser de Respostas
//!
//! Converte o texto devolvido pelo gerador de casos (normalmente uma IA)
//! numa lista ordenada de [`TestCase`].
//!
//! ## Para todos entenderem:
//!
//! Pedimos JSON à IA, mas nem sempre recebemos JSON limpo. Às vezes vem
//! uma explicação antes e depois; às vezes vem uma lista em texto. Por
//! isso tentamos três estratégias, na ordem, e a primeira que funciona
//! vence:
//!
//! 1. **Documento inteiro**: o texto é JSON com a coleção `test_cases`
//!    (ou é diretamente um array de casos). Entradas ilegíveis são
//!    puladas; se nenhuma entrada pôde ser lida, a estratégia falhou.
//! 2. **Recorte entre chaves**: pega do primeiro `{` ao último `}` e
//!    tenta a estratégia 1 de novo.
//! 3. **Heurística de linhas**: linhas que começam com `✅` (positivo),
//!    `❌` ou `•` (negativo) abrem um caso novo; `→` separa o resultado
//!    esperado.
//!
//! Texto sem estrutura nenhuma produz lista vazia, nunca erro.
//!
//! ## Exemplo da estratégia 3:
//!
//! ```text
//! ✅ Login com credenciais válidas → redireciona para o dashboard
//! ❌ Login com senha errada
//!    resultado → mensagem de erro exibida
//! ```

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::errors::EngineError;
use crate::protocol::{CaseType, TestCase};

const COLLECTION_KEY: &str = "test_cases";

/// Marcadores que abrem um caso na heurística de linhas.
const MARKERS: [(char, CaseType); 3] = [
    ('✅', CaseType::Positive),
    ('❌', CaseType::Negative),
    ('•', CaseType::Negative),
];

const SEPARATOR: char = '→';

/// Lê a resposta com as três estratégias. Nunca falha.
#[instrument(skip(raw), fields(bytes = raw.len()))]
pub fn parse_response(raw: &str) -> Vec<TestCase> {
    let mut cases = match parse_document(raw) {
        Ok(cases) => {
            debug!(strategy = "document", count = cases.len(), "response parsed");
            cases
        }
        Err(e) => {
            debug!(error = %e, "document strategy failed");
            match parse_embedded(raw) {
                Ok(cases) => {
                    debug!(strategy = "embedded", count = cases.len(), "response parsed");
                    cases
                }
                Err(e) => {
                    debug!(error = %e, "embedded strategy failed, scanning lines");
                    parse_lines(raw)
                }
            }
        }
    };

    fill_missing_ids(&mut cases);
    cases
}

// ============================================================================
// ESTRATÉGIAS 1 E 2
// ============================================================================

fn parse_document(text: &str) -> Result<Vec<TestCase>, EngineError> {
    let document: Value =
        serde_json::from_str(text.trim()).map_err(|e| EngineError::Parse(e.to_string()))?;

    let collection = match &document {
        Value::Object(map) => map.get(COLLECTION_KEY).and_then(Value::as_array),
        Value::Array(items) => Some(items),
        _ => None,
    }
    .ok_or_else(|| EngineError::Parse(format!("no '{COLLECTION_KEY}' collection")))?;

    let cases: Vec<TestCase> = collection
        .iter()
        .filter_map(|item| match serde_json::from_value::<TestCase>(item.clone()) {
            Ok(case) => Some(case),
            Err(e) => {
                warn!(error = %e, "skipping unreadable case entry");
                None
            }
        })
        .collect();

    if cases.is_empty() && !collection.is_empty() {
        return Err(EngineError::Parse(format!(
            "none of the {} '{COLLECTION_KEY}' entries could be read",
            collection.len()
        )));
    }
    Ok(cases)
}

fn parse_embedded(text: &str) -> Result<Vec<TestCase>, EngineError> {
    let start = text.find('{');
    let end = text.rfind('}');

    match (start, end) {
        (Some(start), Some(end)) if start < end => parse_document(&text[start..=end]),
        _ => Err(EngineError::Parse("no braced region".to_string())),
    }
}

// ============================================================================
// ESTRATÉGIA 3
// ============================================================================

fn parse_lines(text: &str) -> Vec<TestCase> {
    let mut cases = Vec::new();
    let mut current: Option<TestCase> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some((case_type, rest)) = strip_marker(line) {
            if let Some(done) = current.take() {
                cases.push(done);
            }

            let (title, expected) = match rest.split_once(SEPARATOR) {
                Some((title, expected)) => (title.trim(), non_blank(expected)),
                None => (rest.trim(), None),
            };

            current = Some(TestCase {
                title: title.to_string(),
                description: rest.trim().to_string(),
                case_type,
                expected_result: expected,
                ..TestCase::default()
            });
        } else if let Some(case) = current.as_mut() {
            if let Some((_, expected)) = line.split_once(SEPARATOR) {
                if let Some(expected) = non_blank(expected) {
                    case.expected_result = Some(expected);
                }
            }
        }
    }

    if let Some(done) = current {
        cases.push(done);
    }
    cases
}

fn strip_marker(line: &str) -> Option<(CaseType, &str)> {
    MARKERS.iter().find_map(|(marker, case_type)| {
        line.strip_prefix(*marker)
            .map(|rest| (*case_type, rest.trim_start_matches(*marker)))
    })
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Casos sem id recebem `TC001`, `TC002`, ... pela posição.
fn fill_missing_ids(cases: &mut [TestCase]) {
    for (index, case) in cases.iter_mut().enumerate() {
        if case.id.trim().is_empty() {
            case.id = format!("TC{:03}", index + 1);
        }
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Priority;

    const PAYLOAD: &str = r#"{
        "test_cases": [
            {
                "id": "TC001",
                "title": "Valid login",
                "description": "Login with correct credentials",
                "type": "positive",
                "steps": ["打開登入頁面", "輸入正確的用戶名", "輸入正確的密碼", "點擊登入按鈕"],
                "expected_result": "成功登入並導向 Dashboard",
                "priority": "high"
            },
            {
                "title": "Wrong password",
                "type": "negative",
                "steps": ["Open the login page", "Enter a wrong password", "Click login"],
                "expected_result": "Error message shown"
            }
        ]
    }"#;

    #[test]
    fn test_structured_payload() {
        let cases = parse_response(PAYLOAD);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id, "TC001");
        assert_eq!(cases[0].priority, Priority::High);
        assert_eq!(cases[0].steps.len(), 4);
        assert_eq!(cases[1].id, "TC002");
        assert_eq!(cases[1].case_type, CaseType::Negative);
        assert_eq!(cases[1].priority, Priority::Medium);
    }

    #[test]
    fn test_parsing_is_stable() {
        assert_eq!(parse_response(PAYLOAD), parse_response(PAYLOAD));

        let reencoded = serde_json::json!({ "test_cases": parse_response(PAYLOAD) }).to_string();
        assert_eq!(parse_response(&reencoded), parse_response(PAYLOAD));
    }

    #[test]
    fn test_payload_wrapped_in_prose() {
        let wrapped = format!(
            "Sure! Here are the test cases you asked for:\n```json\n{PAYLOAD}\n```\nLet me know if you need more."
        );
        assert_eq!(parse_response(&wrapped), parse_response(PAYLOAD));
    }

    #[test]
    fn test_bare_array_is_accepted() {
        let cases = parse_response(r#"[{"title": "Only one", "steps": ["Wait"]}]"#);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "TC001");
    }

    #[test]
    fn test_json_without_collection_falls_through_to_lines() {
        let cases = parse_response("{\"answer\": 42}\n✅ Fallback case");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].title, "Fallback case");
    }

    #[test]
    fn test_bullet_lines_and_separators() {
        let prose = "\
Here is what I would test:
✅ 正確帳號密碼登入 → 成功導向 Dashboard
❌ 錯誤密碼登入
   預期 → 顯示錯誤訊息
• Empty username
Some closing remark without markers.
✅ Remember me checkbox → session persists
";
        let cases = parse_response(prose);

        assert_eq!(cases.len(), 4);
        let types: Vec<_> = cases.iter().map(|c| c.case_type).collect();
        assert_eq!(
            types,
            vec![
                CaseType::Positive,
                CaseType::Negative,
                CaseType::Negative,
                CaseType::Positive
            ]
        );
        assert_eq!(cases[0].title, "正確帳號密碼登入");
        assert_eq!(cases[0].expected_result.as_deref(), Some("成功導向 Dashboard"));
        assert_eq!(cases[1].expected_result.as_deref(), Some("顯示錯誤訊息"));
        assert_eq!(cases[2].title, "Empty username");
        assert_eq!(cases[2].expected_result, None);
        assert_eq!(cases[3].expected_result.as_deref(), Some("session persists"));

        let ids: Vec<_> = cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["TC001", "TC002", "TC003", "TC004"]);
        assert!(cases.iter().all(|c| c.steps.is_empty()));
    }

    #[test]
    fn test_loosely_typed_fields_are_recovered() {
        let payload = r#"{"test_cases": [
            {"id": 7, "title": "Numeric id", "steps": ["Wait"]},
            {"title": "Null type", "type": null, "priority": null, "steps": ["Wait"]},
            {"title": "Listed outcome", "steps": ["Wait"],
             "expected_result": ["Redirected to dashboard", "Welcome banner shown"]}
        ]}"#;

        let cases = parse_response(payload);

        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].id, "7");
        assert_eq!(cases[1].case_type, CaseType::Positive);
        assert_eq!(cases[1].priority, Priority::Medium);
        assert_eq!(
            cases[2].expected_result.as_deref(),
            Some("Redirected to dashboard; Welcome banner shown")
        );
    }

    #[test]
    fn test_unreadable_collection_is_a_failed_strategy() {
        assert!(parse_document(r#"{"test_cases": ["just text", 42]}"#).is_err());
        assert!(parse_document(r#"{"test_cases": []}"#).unwrap().is_empty());

        let cases = parse_response("{\"test_cases\": [\"just text\"]}\n✅ Line case");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].title, "Line case");
    }

    #[test]
    fn test_plain_prose_yields_nothing() {
        assert!(parse_response("I cannot help with that request.").is_empty());
        assert!(parse_response("").is_empty());
        assert!(parse_response("a → b without any bullet").is_empty());
    }
}
