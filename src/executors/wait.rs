//! # Pausas
//!
//! Implementa a operação `Pause` do runner ao vivo.
//!
//! ## Para todos entenderem:
//!
//! Uma página web não reage instantaneamente: depois de um clique em
//! "login" o navegador ainda está redirecionando. O engine espera um
//! tempo fixo (veja `limits::Pacing`) em vez de tentar adivinhar quando
//! a página terminou.
//!
//! ## Nota sobre precisão:
//!
//! A duração real pode ser ligeiramente maior que a pedida devido ao
//! overhead do runtime Tokio. O valor retornado é o tempo medido.

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument};

use super::CancelFlag;

/// Granularidade com que uma pausa longa observa o cancelamento.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Dorme por `duration`, sem bloquear a thread.
///
/// Retorna a duração medida em milissegundos. Se o `cancel` for acionado
/// durante a espera, retorna antes do fim.
#[instrument(skip(cancel), fields(requested_ms = duration.as_millis() as u64))]
pub async fn pause(duration: Duration, cancel: &CancelFlag) -> u64 {
    let start = Instant::now();

    if duration.is_zero() {
        return 0;
    }

    // Pausas longas são fatiadas para que Ctrl+C não espere o fim.
    let mut remaining = duration;
    while !remaining.is_zero() && !cancel.is_cancelled() {
        let slice = remaining.min(CANCEL_POLL);
        sleep(slice).await;
        remaining = remaining.saturating_sub(slice);
    }

    let elapsed = start.elapsed().as_millis() as u64;
    debug!(elapsed_ms = elapsed, "pause finished");
    elapsed
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pause_waits_requested_time() {
        let elapsed = pause(Duration::from_millis(120), &CancelFlag::new()).await;
        assert!(elapsed >= 120);
        assert!(elapsed < 1000);
    }

    #[tokio::test]
    async fn test_zero_pause_returns_immediately() {
        assert_eq!(pause(Duration::ZERO, &CancelFlag::new()).await, 0);
    }

    #[tokio::test]
    async fn test_cancelled_pause_returns_early() {
        let cancel = CancelFlag::new();
        cancel.cancel();

        let elapsed = pause(Duration::from_secs(5), &cancel).await;
        assert!(elapsed < 1000);
    }
}
