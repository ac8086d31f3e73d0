use std::sync::Arc;

use crate::{
    domain::client::{Client, ClientId, RegisterClient},
    domain::repository::ClientRepository,
    CoreError,
};

/// Service for registering and looking up clients
#[derive(Clone)]
pub struct ClientRegistry {
    client_repo: Arc<dyn ClientRepository>,
}

impl ClientRegistry {
    /// Create a new client registry
    pub fn new(client_repo: Arc<dyn ClientRepository>) -> Self {
        Self { client_repo }
    }

    /// Validate and persist a new client
    pub async fn create(&self, request: RegisterClient) -> Result<Client, CoreError> {
        let client = request.into_client()?;
        self.client_repo.insert(&client).await?;

        tracing::info!(
            client_id = %client.id,
            client_type = %client.client_type,
            business_size = %client.business_size,
            fiscal_year = %client.fiscal_year,
            "Client registered"
        );

        Ok(client)
    }

    /// List clients in creation order
    pub async fn list(&self, offset: usize, limit: Option<usize>) -> Result<Vec<Client>, CoreError> {
        self.client_repo.list(offset, limit).await
    }

    /// Get a client by ID
    pub async fn get(&self, id: &ClientId) -> Result<Client, CoreError> {
        self.client_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(id.to_string()))
    }
}
