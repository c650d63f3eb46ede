//! # Módulo de Carregamento
//!
//! Lê do disco a resposta do gerador de casos e a entrega ao
//! [`parser`](crate::parser).
//!
//! ## Para todos entenderem:
//!
//! O arquivo pode ser o JSON "limpo" ou a resposta crua da IA, com texto
//! em volta. Não importa: o parser decide como ler. Este módulo só se
//! preocupa em ler o arquivo e dar um erro claro se ele não existir.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::parser::parse_response;
use crate::protocol::TestCase;

/// Carrega os casos de teste de um arquivo.
///
/// Um arquivo legível sem nenhum caso reconhecível retorna `Ok(vec![])`;
/// cabe ao chamador decidir se isso é um problema.
pub fn load_cases_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<TestCase>> {
    let path_ref = path.as_ref();

    let content = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read test case file {:?}", path_ref))?;

    let cases = parse_response(&content);
    info!(path = ?path_ref, cases = cases.len(), "test cases loaded");

    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "step-engine-{}-{}",
            std::process::id(),
            name
        ));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_structured_file() {
        let path = temp_file(
            "cases.json",
            r#"{"test_cases": [{"id": "A", "title": "Login", "steps": ["Click login"]}]}"#,
        );
        let cases = load_cases_from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "A");
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_cases_from_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read test case file"));
    }
}
