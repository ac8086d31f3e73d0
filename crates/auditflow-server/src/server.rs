//! Main AuditFlow Server implementation
//!
//! This module contains the AuditFlowServer implementation.

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use auditflow_core::{
    ClientRegistry, ClientRepository, TemplateCatalog, WorkflowGenerator, WorkflowRepository,
    WorkflowStore,
};
use auditflow_state_inmemory::InMemoryStateStoreProvider;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Main server implementation
#[derive(Clone)]
pub struct AuditFlowServer {
    /// Configuration
    pub config: ServerConfig,

    /// Template catalog shared by every request
    catalog: Arc<TemplateCatalog>,

    /// Client registry service
    clients: ClientRegistry,

    /// Workflow generator service
    generator: Arc<WorkflowGenerator>,

    /// Workflow store service
    workflows: WorkflowStore,
}

/// Manual Debug implementation that doesn't try to debug the trait objects
impl std::fmt::Debug for AuditFlowServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditFlowServer")
            .field("config", &self.config)
            .field("catalog_templates", &self.catalog.len())
            .finish()
    }
}

impl AuditFlowServer {
    /// Create a new AuditFlowServer over the given repositories
    pub fn new(
        config: ServerConfig,
        catalog: Arc<TemplateCatalog>,
        client_repo: Arc<dyn ClientRepository>,
        workflow_repo: Arc<dyn WorkflowRepository>,
    ) -> Self {
        let clients = ClientRegistry::new(client_repo);
        let generator = Arc::new(WorkflowGenerator::new(
            catalog.clone(),
            clients.clone(),
            workflow_repo.clone(),
        ));
        let workflows = WorkflowStore::new(workflow_repo);

        Self {
            config,
            catalog,
            clients,
            generator,
            workflows,
        }
    }

    /// Create a server backed by in-memory repositories
    pub fn in_memory(config: ServerConfig) -> ServerResult<Self> {
        let catalog = Arc::new(load_catalog(&config)?);
        let provider = InMemoryStateStoreProvider::new();
        let (client_repo, workflow_repo) = provider.create_repositories();
        info!("Using in-memory state store");

        Ok(Self::new(config, catalog, client_repo, workflow_repo))
    }

    /// Client registry
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Workflow generator
    pub fn generator(&self) -> &WorkflowGenerator {
        &self.generator
    }

    /// Workflow store
    pub fn workflows(&self) -> &WorkflowStore {
        &self.workflows
    }

    /// Run the server until Ctrl-C
    pub async fn run(self) -> ServerResult<()> {
        info!("Starting AuditFlow Server");

        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve requests on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let app = crate::api::build_router(Arc::new(self));

        info!("Listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

/// Load the configured catalog, or the built-in one
pub fn load_catalog(config: &ServerConfig) -> ServerResult<TemplateCatalog> {
    let catalog = match &config.catalog_path {
        Some(path) => {
            info!("Loading template catalog from {}", path.display());
            TemplateCatalog::from_yaml_file(path)?
        }
        None => TemplateCatalog::builtin()?,
    };

    let problems = catalog.integrity_report();
    for problem in &problems {
        error!(error = %problem, "Catalog integrity problem");
    }
    info!(
        templates = catalog.len(),
        problems = problems.len(),
        "Template catalog loaded"
    );

    Ok(catalog)
}

async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await
}

/// Resolve when `signal` fires; never resolve if it cannot be listened for
async fn wait_for_signal<S>(signal: S)
where
    S: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown signal received, shutting down gracefully"),
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_resolves_shutdown() {
        let result = tokio::time::timeout(
            Duration::from_millis(100),
            wait_for_signal(async { Ok(()) }),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failed_signal_listener_keeps_serving() {
        let result = tokio::time::timeout(
            Duration::from_millis(100),
            wait_for_signal(async { Err(io::Error::new(io::ErrorKind::Other, "no signal handler")) }),
        )
        .await;
        assert!(result.is_err());
    }
}
