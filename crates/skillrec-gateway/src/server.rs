use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use skillrec_core::Recommender;
use skillrec_llm::LlmConfig;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::router::build_router;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Recommender>,
    /// Applied to requests that carry no `llmConfig` of their own.
    pub default_llm: Option<LlmConfig>,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(engine: Arc<Recommender>) -> Self {
        Self {
            engine,
            default_llm: None,
            started_at: Instant::now(),
        }
    }
}

pub struct GatewayServer {
    bind: String,
    port: u16,
    auth_token: Option<String>,
    rate_limit: u32,
    max_body_size: usize,
    state: AppState,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayServer {
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        engine: Arc<Recommender>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        if bind == "0.0.0.0" {
            tracing::warn!("gateway binding to all interfaces; set an auth token");
        }

        Self {
            bind: bind.to_owned(),
            port,
            auth_token: None,
            rate_limit: 120,
            max_body_size: 1_048_576,
            state: AppState::new(engine),
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty());
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, limit: u32) -> Self {
        self.rate_limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    #[must_use]
    pub fn with_default_llm(mut self, config: Option<LlmConfig>) -> Self {
        self.state.default_llm = config;
        self
    }

    fn socket_addr(&self) -> Result<SocketAddr, GatewayError> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse()
            .map_err(|source| GatewayError::InvalidAddress { addr, source })
    }

    /// Bind and serve until the shutdown signal flips to `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, binding fails, or the server hits a fatal
    /// I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let addr = self.socket_addr()?;
        let router = build_router(
            self.state,
            self.auth_token.as_deref(),
            self.rate_limit,
            self.max_body_size,
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(addr.to_string(), e))?;
        tracing::info!("gateway listening on {addr}");

        let mut shutdown_rx = self.shutdown_rx;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            tracing::info!("gateway shutting down");
        })
        .await
        .map_err(|e| GatewayError::Server(format!("{e}")))?;

        Ok(())
    }
}
