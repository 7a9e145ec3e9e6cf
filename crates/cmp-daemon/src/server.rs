//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::{BootstrapTenant, DaemonConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::storage::{InMemoryStore, PostgresStore};
use axum::Router;
use cmp_core::{ClusterOrchestrator, FleetError, NewTenant};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// CMP Daemon Server
pub struct Server {
    config: DaemonConfig,
    orchestrator: Arc<ClusterOrchestrator>,
}

impl Server {
    /// Connect the backend and the store, then seed the bootstrap tenant
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let backend = cmp_backend::connect(&config.backend).await?;

        let orchestrator = match &config.storage {
            StorageConfig::Memory => {
                warn!("Using in-memory storage; state is lost on restart");
                ClusterOrchestrator::new(Arc::new(InMemoryStore::new()), backend)
            }
            StorageConfig::Postgres {
                url,
                max_connections,
                connect_timeout_secs,
            } => {
                let store =
                    PostgresStore::new(url, *max_connections, *connect_timeout_secs).await?;
                ClusterOrchestrator::new(Arc::new(store), backend)
            }
        };

        let server = Self {
            orchestrator: Arc::new(orchestrator),
            config,
        };

        if let Some(seed) = &server.config.bootstrap {
            server.bootstrap(seed).await?;
        }

        Ok(server)
    }

    async fn bootstrap(&self, seed: &BootstrapTenant) -> DaemonResult<()> {
        let request = NewTenant {
            username: seed.username.clone(),
            token: seed.token.clone(),
            quota_cpu: seed.quota_cpu,
            quota_memory: seed.quota_memory,
        };

        match self.orchestrator.register_tenant(request).await {
            Ok(tenant) => {
                info!(tenant_id = %tenant.id, username = %tenant.username, "Bootstrap tenant created");
                Ok(())
            }
            Err(FleetError::AlreadyExists(_)) => {
                info!(username = %seed.username, "Bootstrap tenant already present");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The HTTP application, without binding a listener
    pub fn router(&self) -> Router {
        create_router(AppState::new(self.orchestrator.clone()), &self.config.server)
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = self.router();

        let listener = TcpListener::bind(addr).await?;

        info!(
            backend = %self.orchestrator.backend_name(),
            "CMP daemon listening on {}",
            addr
        );

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        info!("CMP daemon shutting down");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_config() -> DaemonConfig {
        DaemonConfig {
            bootstrap: Some(BootstrapTenant {
                username: "admin".into(),
                token: "admin-token".into(),
                quota_cpu: 8.0,
                quota_memory: 16.0,
            }),
            ..DaemonConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bootstrap_creates_seed_tenant() {
        let server = Server::new(seeded_config()).await.unwrap();
        let tenant = server.orchestrator.authenticate("admin-token").await.unwrap();
        assert_eq!(tenant.username, "admin");
        assert_eq!(tenant.quota_cpu, 8.0);
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let server = Server::new(seeded_config()).await.unwrap();
        let seed = server.config.bootstrap.clone().unwrap();
        server.bootstrap(&seed).await.unwrap();
        assert_eq!(server.orchestrator.list_tenants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_bootstrap_quota_fails_startup() {
        let mut config = seeded_config();
        if let Some(seed) = config.bootstrap.as_mut() {
            seed.quota_cpu = 0.0;
        }
        let result = Server::new(config).await;
        assert!(matches!(result, Err(DaemonError::Fleet(FleetError::InvalidRequest(_)))));
    }
}
