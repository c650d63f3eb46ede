// Module: Executors
// Live execution backend: session abstraction, runner and WebDriver provider.

pub mod live;
pub mod wait;
pub mod webdriver;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::EngineError;

/// Opaque handle to an element found by a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// One browser-automation session.
///
/// Primitives are deliberately small so the runner owns all the policy
/// (timeouts, pauses, fail-fast). Implementations must be Send so the run
/// future can move between tokio worker threads.
#[async_trait]
pub trait Session: Send {
    async fn set_implicit_wait(&mut self, wait: Duration) -> Result<(), EngineError>;

    async fn navigate(&mut self, url: &str) -> Result<(), EngineError>;

    async fn current_url(&mut self) -> Result<String, EngineError>;

    /// Returns `EngineError::ElementNotFound` when nothing matches the CSS selector.
    async fn locate(&mut self, css: &str) -> Result<ElementRef, EngineError>;

    async fn clear(&mut self, element: &ElementRef) -> Result<(), EngineError>;

    async fn type_text(&mut self, element: &ElementRef, text: &str) -> Result<(), EngineError>;

    async fn click(&mut self, element: &ElementRef) -> Result<(), EngineError>;

    async fn is_visible(&mut self, element: &ElementRef) -> Result<bool, EngineError>;

    /// Ends the session. Called exactly once by `SessionGuard`.
    async fn quit(&mut self) -> Result<(), EngineError>;
}

/// Opens sessions. One provider per run.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn Session>, EngineError>;
}

/// Cooperative cancellation, checked between cases and between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
