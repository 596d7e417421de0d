use std::sync::Arc;

use ndel_meta::{MetaIndex, RedbMetaIndex};
use ndel_store::{BlobStore, FsBlobStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// ndel object server.
pub struct NdelServer {
    config: ServerConfig,
    state: AppState,
}

impl NdelServer {
    /// Open the on-disk stores under `config.data_path`.
    ///
    /// Fails if the metadata database stays locked for longer than the
    /// configured open timeout.
    pub async fn open(config: &ServerConfig) -> ServerResult<Self> {
        let blobs = FsBlobStore::open(config.objects_dir()).await?;

        let db_path = config.meta_db_path();
        let timeout = config.db_open_timeout();
        let index = tokio::task::spawn_blocking(move || RedbMetaIndex::open(db_path, timeout))
            .await
            .map_err(|e| ServerError::Internal(format!("index open task failed: {e}")))??;

        Ok(Self::with_stores(config.clone(), Arc::new(blobs), Arc::new(index)))
    }

    /// Build a server over explicit stores.
    pub fn with_stores(
        config: ServerConfig,
        blobs: Arc<dyn BlobStore>,
        index: Arc<dyn MetaIndex>,
    ) -> Self {
        Self {
            config,
            state: AppState::new(blobs, index),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_upload_size)
    }

    /// Bind the listen address and serve until the process exits.
    pub async fn serve(self) -> ServerResult<()> {
        let addr = self.config.listen_addr()?;
        let app = self.router();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            %addr,
            host = %self.config.host,
            proto = %self.config.proto,
            data_path = %self.config.data_path.display(),
            "ndel server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
