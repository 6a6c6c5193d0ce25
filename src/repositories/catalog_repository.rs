use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::models::{RepositoryError, RepositoryResult, Service};

/// Trait defining the interface for catalog data access operations
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All services, in no particular order
    async fn find_all(&self) -> RepositoryResult<Vec<Service>>;

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Service>>;

    /// Insert a new service; fails if the id is taken
    async fn create(&self, service: Service) -> RepositoryResult<Service>;

    /// Replace an existing service
    async fn update(&self, service: Service) -> RepositoryResult<Service>;

    async fn delete(&self, id: &str) -> RepositoryResult<()>;

    async fn exists(&self, id: &str) -> RepositoryResult<bool>;

    /// Upsert many services at once (bulk sort order changes, catalog import)
    async fn save_all(&self, services: Vec<Service>) -> RepositoryResult<()>;
}

/// Catalog held in process memory
#[derive(Clone, Default)]
pub struct InMemoryCatalogRepository {
    services: Arc<RwLock<HashMap<String, Service>>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with `services`
    pub fn with_services(services: Vec<Service>) -> Self {
        let map = services.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            services: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_all(&self) -> RepositoryResult<Vec<Service>> {
        Ok(self.services.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Service>> {
        Ok(self.services.read().await.get(id).cloned())
    }

    #[instrument(skip(self, service), fields(service_id = %service.id))]
    async fn create(&self, service: Service) -> RepositoryResult<Service> {
        let mut services = self.services.write().await;
        if services.contains_key(&service.id) {
            return Err(RepositoryError::ConstraintViolation {
                message: format!("Service {} already exists", service.id),
            });
        }
        services.insert(service.id.clone(), service.clone());
        debug!("Service stored");
        Ok(service)
    }

    #[instrument(skip(self, service), fields(service_id = %service.id))]
    async fn update(&self, service: Service) -> RepositoryResult<Service> {
        let mut services = self.services.write().await;
        match services.get_mut(&service.id) {
            Some(existing) => {
                *existing = service.clone();
                Ok(service)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        self.services
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn exists(&self, id: &str) -> RepositoryResult<bool> {
        Ok(self.services.read().await.contains_key(id))
    }

    async fn save_all(&self, batch: Vec<Service>) -> RepositoryResult<()> {
        let mut services = self.services.write().await;
        for service in batch {
            services.insert(service.id.clone(), service);
        }
        Ok(())
    }
}
