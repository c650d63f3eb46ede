//! # Módulo de Logging
//!
//! Inicializa o `tracing-subscriber` usado pelo binário.
//!
//! ## Para todos entenderem:
//!
//! A biblioteca só emite eventos (`info!`, `warn!`, spans com
//! `#[instrument]`). Quem decide o que aparece no terminal é o
//! subscriber instalado aqui.
//!
//! ## Configuração via variáveis de ambiente:
//!
//! - `RUST_LOG`: filtro completo (tem precedência), ex.
//!   `step_engine=debug,reqwest=warn`
//! - `STEP_ENGINE_LOG`: nível padrão quando `RUST_LOG` não existe
//!
//! Os logs vão para stderr, para não misturar com o script ou o
//! relatório JSON escritos em stdout.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

// ============================================================================
// CONFIGURAÇÃO
// ============================================================================

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Nível mínimo quando `RUST_LOG` não está definido.
    pub log_level: Level,

    /// Desligado, nenhum evento é impresso.
    pub enable_console_logging: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            enable_console_logging: true,
        }
    }
}

impl LogConfig {
    /// Lê `STEP_ENGINE_LOG` (`trace`, `debug`, `info`, `warn`, `error`
    /// ou `off`). Valores inválidos mantêm o padrão.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("STEP_ENGINE_LOG") {
            config.apply_level(&level);
        }

        config
    }

    fn apply_level(&mut self, level: &str) {
        let level = level.trim();
        if level.eq_ignore_ascii_case("off") {
            self.enable_console_logging = false;
        } else if let Ok(parsed) = level.parse::<Level>() {
            self.log_level = parsed;
        }
    }

    /// Liga `debug` sem sobrescrever um nível mais detalhado.
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose && self.log_level < Level::DEBUG {
            self.log_level = Level::DEBUG;
        }
        self
    }
}

// ============================================================================
// INICIALIZAÇÃO
// ============================================================================

/// Instala o subscriber global.
///
/// Retorna erro se outro subscriber já foi instalado.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    if !config.enable_console_logging {
        return Ok(());
    }

    // Primeiro tenta ler de RUST_LOG, senão usa o nível configurado.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    tracing::debug!(level = %config.log_level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.enable_console_logging);
    }

    #[test]
    fn test_apply_level() {
        let mut config = LogConfig::default();
        config.apply_level(" DEBUG ");
        assert_eq!(config.log_level, Level::DEBUG);

        config.apply_level("nonsense");
        assert_eq!(config.log_level, Level::DEBUG);

        config.apply_level("off");
        assert!(!config.enable_console_logging);
    }

    #[test]
    fn test_verbose_never_lowers_detail() {
        let config = LogConfig::default().verbose(true);
        assert_eq!(config.log_level, Level::DEBUG);

        let trace = LogConfig {
            log_level: Level::TRACE,
            ..LogConfig::default()
        }
        .verbose(true);
        assert_eq!(trace.log_level, Level::TRACE);
    }
}
