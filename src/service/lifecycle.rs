use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::llm::AnswerError;
use crate::service::{Answer, InitError, QAService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Uninitialized => "UNINITIALIZED",
            ServiceState::Initializing => "INITIALIZING",
            ServiceState::Ready => "READY",
            ServiceState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid lifecycle transition {from} -> {to}")]
    InvalidTransition { from: ServiceState, to: ServiceState },
}

#[derive(Error, Debug)]
pub enum AskError {
    #[error("Service is not ready (state: {0})")]
    NotReady(ServiceState),
    #[error(transparent)]
    Answer(#[from] AnswerError),
}

enum Phase {
    Uninitialized,
    Initializing,
    Ready(QAService),
    Failed(String),
}

impl Phase {
    fn state(&self) -> ServiceState {
        match self {
            Phase::Uninitialized => ServiceState::Uninitialized,
            Phase::Initializing => ServiceState::Initializing,
            Phase::Ready(_) => ServiceState::Ready,
            Phase::Failed(_) => ServiceState::Failed,
        }
    }
}

/// `UNINITIALIZED -> INITIALIZING -> READY | FAILED`, shared by every handler.
///
/// Only `READY` hands out the service; the built service never changes after
/// that, so handlers take a cheap clone and release the lock immediately.
#[derive(Clone)]
pub struct ServiceLifecycle {
    phase: Arc<RwLock<Phase>>,
}

impl Default for ServiceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceLifecycle {
    pub fn new() -> Self {
        Self {
            phase: Arc::new(RwLock::new(Phase::Uninitialized)),
        }
    }

    /// A lifecycle that is already `READY`.
    pub fn ready(service: QAService) -> Self {
        Self {
            phase: Arc::new(RwLock::new(Phase::Ready(service))),
        }
    }

    pub async fn state(&self) -> ServiceState {
        self.phase.read().await.state()
    }

    pub async fn failure_reason(&self) -> Option<String> {
        match &*self.phase.read().await {
            Phase::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    pub async fn begin_initializing(&self) -> Result<(), LifecycleError> {
        let mut phase = self.phase.write().await;
        match *phase {
            Phase::Uninitialized => {
                *phase = Phase::Initializing;
                log::info!("Service state: {}", ServiceState::Initializing);
                Ok(())
            }
            ref other => Err(LifecycleError::InvalidTransition {
                from: other.state(),
                to: ServiceState::Initializing,
            }),
        }
    }

    pub async fn mark_ready(&self, service: QAService) -> Result<(), LifecycleError> {
        self.finish(Phase::Ready(service)).await
    }

    pub async fn mark_failed(&self, reason: impl Into<String>) -> Result<(), LifecycleError> {
        self.finish(Phase::Failed(reason.into())).await
    }

    async fn finish(&self, next: Phase) -> Result<(), LifecycleError> {
        let mut phase = self.phase.write().await;
        if !matches!(*phase, Phase::Initializing) {
            return Err(LifecycleError::InvalidTransition {
                from: phase.state(),
                to: next.state(),
            });
        }
        log::info!("Service state: {}", next.state());
        *phase = next;
        Ok(())
    }

    /// Run `build` as the one initialization of this lifecycle.
    pub async fn initialize<F>(&self, build: F) -> Result<QAService, InitError>
    where
        F: Future<Output = Result<QAService, InitError>>,
    {
        self.begin_initializing().await?;
        match build.await {
            Ok(service) => {
                self.mark_ready(service.clone()).await?;
                Ok(service)
            }
            Err(e) => {
                log::error!("Initialization failed: {}", e);
                self.mark_failed(e.to_string()).await?;
                Err(e)
            }
        }
    }

    /// The built service, or the state that prevents answering.
    pub async fn service(&self) -> Result<QAService, AskError> {
        match &*self.phase.read().await {
            Phase::Ready(service) => Ok(service.clone()),
            other => Err(AskError::NotReady(other.state())),
        }
    }

    pub async fn ask(&self, question: &str) -> Result<Answer, AskError> {
        let service = self.service().await?;
        Ok(service.answer(question).await?)
    }
}
