//! Shared application state.

use std::sync::Arc;

use cwquery_auth::AssertionSigner;
use cwquery_client::{ClientError, UpstreamExecutor};
use cwquery_core::{DynHistoryStore, MemoryHistoryStore};

use crate::config::AppConfig;

/// State shared by all handlers.
///
/// The transport and signer are built once at startup and treated as
/// immutable for the process lifetime; the history store is the only
/// mutable shared state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub signer: Arc<AssertionSigner>,
    pub executor: UpstreamExecutor,
    pub history: DynHistoryStore,
}

impl AppState {
    /// Wires up state from configuration with an in-memory history store.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the mutual-TLS transport
    /// cannot be constructed.
    pub fn from_config(config: AppConfig) -> Result<Self, ClientError> {
        let executor =
            UpstreamExecutor::from_config(&config.transport(), config.request_timeout())?;
        let signer = AssertionSigner::new(
            config.tls.key_path.as_str(),
            config.tls.cert_path.as_str(),
            config.upstream.org_oid.as_str(),
            config.upstream.org_name.as_str(),
        );
        Ok(Self {
            config: Arc::new(config),
            signer: Arc::new(signer),
            executor,
            history: MemoryHistoryStore::shared(),
        })
    }

    /// Same wiring with an injected history store (used by tests and any
    /// future durable backend).
    pub fn with_history(
        config: AppConfig,
        history: DynHistoryStore,
    ) -> Result<Self, ClientError> {
        let mut state = Self::from_config(config)?;
        state.history = history;
        Ok(state)
    }
}
