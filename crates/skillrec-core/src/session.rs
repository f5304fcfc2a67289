//! Observable request lifecycle for interactive callers.
//!
//! A session runs at most one recommendation at a time. Starting a new one cancels the
//! previous request, and a late result from a superseded request never reaches subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::orchestrator::Recommender;
use crate::recommendation::{Method, RecommendationRequest, RecommendationResponse};

#[derive(Clone, Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running {
        generation: u64,
        method: Method,
    },
    Succeeded {
        generation: u64,
        response: Arc<RecommendationResponse>,
    },
    Failed {
        generation: u64,
        message: String,
    },
}

impl SessionState {
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Running { generation, .. }
            | Self::Succeeded { generation, .. }
            | Self::Failed { generation, .. } => Some(*generation),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

pub struct RecommendationSession {
    engine: Arc<Recommender>,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl RecommendationSession {
    #[must_use]
    pub fn new(engine: Arc<Recommender>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Idle);
        Arc::new(Self {
            engine,
            state,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn replace_token(&self, next: Option<CancellationToken>) {
        let previous = match self.in_flight.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        };
        if let Some(token) = previous {
            token.cancel();
        }
    }

    /// Begin a request, superseding whatever is in flight.
    pub fn start(self: &Arc<Self>, request: RecommendationRequest) -> JoinHandle<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        self.replace_token(Some(token.clone()));

        self.state.send_replace(SessionState::Running {
            generation,
            method: request.planned_method(),
        });

        let session = Arc::clone(self);
        tokio::spawn(async move {
            let result = session
                .engine
                .recommend_cancellable(&request, &token)
                .await;
            session.finish(generation, result);
        })
    }

    fn finish(&self, generation: u64, result: Result<RecommendationResponse, EngineError>) {
        let next = match result {
            Ok(response) => SessionState::Succeeded {
                generation,
                response: Arc::new(response),
            },
            Err(EngineError::Cancelled) => {
                tracing::debug!(generation, "recommendation cancelled");
                return;
            }
            Err(e) => SessionState::Failed {
                generation,
                message: e.to_string(),
            },
        };

        let published = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next;
            true
        });
        if !published {
            tracing::debug!(generation, "discarding superseded recommendation result");
        }
    }

    /// Stop waiting for the in-flight request and return to idle.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.replace_token(None);
        self.state.send_replace(SessionState::Idle);
    }
}

impl Drop for RecommendationSession {
    fn drop(&mut self) {
        self.replace_token(None);
    }
}
