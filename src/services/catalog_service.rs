use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{
    Catalog, CreateServiceRequest, Quote, QuoteError, QuoteResult, Service, ServiceLookup,
    UpdateServiceRequest, Validate,
};
use crate::observability::Metrics;
use crate::repositories::CatalogRepository;
use crate::services::DependencyValidator;

/// Admin operations over the service catalog
pub struct CatalogService {
    repository: Arc<dyn CatalogRepository>,
    metrics: Option<Arc<Metrics>>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn CatalogRepository>) -> Self {
        Self {
            repository,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Every service in display order (parents followed by their subservices)
    #[instrument(skip(self))]
    pub async fn list_services(&self) -> QuoteResult<Vec<Service>> {
        let catalog = self.load_catalog().await?;
        Ok(catalog.display_order().into_iter().cloned().collect())
    }

    #[instrument(skip(self))]
    pub async fn get_service(&self, id: &str) -> QuoteResult<Service> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| QuoteError::ServiceNotFound { id: id.to_string() })
    }

    #[instrument(skip(self, request), fields(service_name = %request.name))]
    pub async fn create_service(&self, request: CreateServiceRequest) -> QuoteResult<Service> {
        let result = self.try_create(request).await;
        self.record("create_service", &result);
        result
    }

    #[instrument(skip(self, request))]
    pub async fn update_service(
        &self,
        id: &str,
        request: UpdateServiceRequest,
    ) -> QuoteResult<Service> {
        let result = self.try_update(id, request).await;
        self.record("update_service", &result);
        result
    }

    /// Delete a service nothing else depends on
    #[instrument(skip(self))]
    pub async fn delete_service(&self, id: &str) -> QuoteResult<()> {
        let result = self.try_delete(id).await;
        self.record("delete_service", &result);
        result
    }

    /// Persist a new display order; `ids[i]` gets `sort_order = i`
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn reorder_services(&self, ids: &[String]) -> QuoteResult<()> {
        let result = async {
            let mut catalog = self.load_catalog().await?;
            catalog.apply_sort_order(ids)?;
            self.repository.save_all(catalog.into_services()).await?;
            Ok::<(), QuoteError>(())
        }
        .await;
        self.record("reorder_services", &result);
        result
    }

    /// Replace-or-insert a batch of services after checking them as a whole catalog
    #[instrument(skip(self, services), fields(count = services.len()))]
    pub async fn import_services(&self, services: Vec<Service>) -> QuoteResult<usize> {
        let result = async {
            let mut merged: Vec<Service> = self
                .repository
                .find_all()
                .await?
                .into_iter()
                .filter(|existing| !services.iter().any(|s| s.id == existing.id))
                .collect();
            merged.extend(services.iter().cloned());
            Catalog::new(merged).validate()?;

            let count = services.len();
            self.repository.save_all(services).await?;
            info!(count, "Services imported");
            Ok::<usize, QuoteError>(count)
        }
        .await;
        self.record("import_services", &result);
        result
    }

    /// Snapshot of the catalog for the quote editor
    pub async fn load_catalog(&self) -> QuoteResult<Catalog> {
        Ok(Catalog::new(self.repository.find_all().await?))
    }

    /// Server-side mirror of the add check the editor performs
    #[instrument(skip(self, quote), fields(quote_id = %quote.id))]
    pub async fn validate_service_dependency(
        &self,
        quote: &Quote,
        day: usize,
        service_id: &str,
    ) -> QuoteResult<()> {
        if day >= quote.days.len() {
            return Err(QuoteError::DayNotFound { day });
        }
        let catalog = self.load_catalog().await?;
        if catalog.service(service_id).is_none() {
            return Err(QuoteError::ServiceNotFound {
                id: service_id.to_string(),
            });
        }
        DependencyValidator::new(&catalog).check_add(quote, day, service_id)?;
        Ok(())
    }

    async fn try_create(&self, request: CreateServiceRequest) -> QuoteResult<Service> {
        request.validate()?;

        let service = Service::new(request);
        let mut services = self.repository.find_all().await?;
        services.push(service.clone());
        Catalog::new(services).validate()?;

        let created = self.repository.create(service).await?;
        info!(service_id = %created.id, "Service created");
        Ok(created)
    }

    async fn try_update(&self, id: &str, request: UpdateServiceRequest) -> QuoteResult<Service> {
        request.validate()?;

        let mut service = self.get_service(id).await?;
        service.update(request);

        let services: Vec<Service> = self
            .repository
            .find_all()
            .await?
            .into_iter()
            .map(|existing| {
                if existing.id == service.id {
                    service.clone()
                } else {
                    existing
                }
            })
            .collect();
        Catalog::new(services).validate()?;

        let updated = self.repository.update(service).await?;
        info!(service_id = %updated.id, "Service updated");
        Ok(updated)
    }

    async fn try_delete(&self, id: &str) -> QuoteResult<()> {
        let catalog = self.load_catalog().await?;
        if catalog.services().iter().all(|s| s.id != id) {
            return Err(QuoteError::ServiceNotFound { id: id.to_string() });
        }

        let dependents: Vec<String> = catalog
            .dependents_of(id)
            .into_iter()
            .map(|s| s.name.clone())
            .collect();
        if !dependents.is_empty() {
            return Err(QuoteError::DependentsExist {
                id: id.to_string(),
                dependents,
            });
        }

        self.repository.delete(id).await?;
        info!(service_id = id, "Service deleted");
        Ok(())
    }

    fn record<T>(&self, operation: &str, result: &QuoteResult<T>) {
        if let Err(e) = result {
            warn!(operation, error = %e, "Catalog operation failed");
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_catalog_operation(operation, result.is_ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Day, DependencyType, RepositoryError, SelectedService};
    use async_trait::async_trait;
    use mockall::{mock, predicate::*};
    use rust_decimal_macros::dec;

    mock! {
        TestCatalogRepository {}

        #[async_trait]
        impl CatalogRepository for TestCatalogRepository {
            async fn find_all(&self) -> Result<Vec<Service>, RepositoryError>;
            async fn find_by_id(&self, id: &str) -> Result<Option<Service>, RepositoryError>;
            async fn create(&self, service: Service) -> Result<Service, RepositoryError>;
            async fn update(&self, service: Service) -> Result<Service, RepositoryError>;
            async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
            async fn exists(&self, id: &str) -> Result<bool, RepositoryError>;
            async fn save_all(&self, services: Vec<Service>) -> Result<(), RepositoryError>;
        }
    }

    fn create_request(name: &str) -> CreateServiceRequest {
        CreateServiceRequest {
            name: name.to_string(),
            price: dec!(1500),
            category: "Photography".to_string(),
            description: "Full day".to_string(),
            is_subservice: false,
            depends_on: None,
            dependency_type: DependencyType::None,
            sort_order: 0,
        }
    }

    fn with_dependency(
        name: &str,
        parent: &Service,
        dependency_type: DependencyType,
        is_subservice: bool,
    ) -> Service {
        Service::new(CreateServiceRequest {
            is_subservice,
            depends_on: Some(parent.id.clone()),
            dependency_type,
            ..create_request(name)
        })
    }

    #[tokio::test]
    async fn test_create_service_success() {
        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo.expect_find_all().times(1).returning(|| Ok(vec![]));
        mock_repo
            .expect_create()
            .times(1)
            .returning(|service| Ok(service));

        let service = CatalogService::new(Arc::new(mock_repo));
        let created = service
            .create_service(create_request("Wedding Photography"))
            .await
            .unwrap();

        assert_eq!(created.name, "Wedding Photography");
        assert!(created.id.starts_with('S'));
    }

    #[tokio::test]
    async fn test_create_service_validation_error() {
        let mock_repo = MockTestCatalogRepository::new();
        let service = CatalogService::new(Arc::new(mock_repo));

        let mut request = create_request("");
        request.price = dec!(-1);
        let result = service.create_service(request).await;

        assert!(matches!(result, Err(QuoteError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_create_with_unknown_prerequisite_rejected() {
        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo.expect_find_all().returning(|| Ok(vec![]));
        mock_repo.expect_create().never();

        let service = CatalogService::new(Arc::new(mock_repo));
        let request = CreateServiceRequest {
            depends_on: Some("S404".to_string()),
            dependency_type: DependencyType::SameQuote,
            ..create_request("Album")
        };

        let result = service.create_service(request).await;
        assert!(matches!(result, Err(QuoteError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_update_cannot_introduce_cycle() {
        let photo = Service::new(create_request("Photography"));
        let album = with_dependency("Album", &photo, DependencyType::SameQuote, false);
        let catalog = vec![photo.clone(), album.clone()];

        let mut mock_repo = MockTestCatalogRepository::new();
        let lookup = photo.clone();
        mock_repo
            .expect_find_by_id()
            .with(eq(photo.id.clone()))
            .returning(move |_| Ok(Some(lookup.clone())));
        mock_repo
            .expect_find_all()
            .returning(move || Ok(catalog.clone()));
        mock_repo.expect_update().never();

        let service = CatalogService::new(Arc::new(mock_repo));
        let request = UpdateServiceRequest {
            depends_on: Some(Some(album.id.clone())),
            dependency_type: Some(DependencyType::SameQuote),
            ..Default::default()
        };

        let result = service.update_service(&photo.id, request).await;
        assert!(matches!(result, Err(QuoteError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_create_subservice_of_subservice_rejected() {
        let photo = Service::new(create_request("Photography"));
        let assistant = with_dependency("Assistant", &photo, DependencyType::SameDay, true);
        let catalog = vec![photo, assistant.clone()];

        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo
            .expect_find_all()
            .returning(move || Ok(catalog.clone()));
        mock_repo.expect_create().never();

        let service = CatalogService::new(Arc::new(mock_repo));
        let request = CreateServiceRequest {
            is_subservice: true,
            depends_on: Some(assistant.id.clone()),
            dependency_type: DependencyType::SameDay,
            ..create_request("Lighting")
        };

        let result = service.create_service(request).await;
        assert!(matches!(result, Err(QuoteError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_import_rejects_duplicate_ids_in_batch() {
        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo.expect_find_all().returning(|| Ok(vec![]));
        mock_repo.expect_save_all().never();

        let photo = Service::new(create_request("Photography"));
        let mut copy = Service::new(create_request("Photography (second price)"));
        copy.id = photo.id.clone();

        let service = CatalogService::new(Arc::new(mock_repo));
        let result = service.import_services(vec![photo, copy]).await;
        assert!(matches!(result, Err(QuoteError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_dependents() {
        let photo = Service::new(create_request("Photography"));
        let second = with_dependency("Second Shooter", &photo, DependencyType::SameDay, true);
        let catalog = vec![photo.clone(), second];

        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo
            .expect_find_all()
            .returning(move || Ok(catalog.clone()));
        mock_repo.expect_delete().never();

        let service = CatalogService::new(Arc::new(mock_repo));
        match service.delete_service(&photo.id).await {
            Err(QuoteError::DependentsExist { dependents, .. }) => {
                assert_eq!(dependents, vec!["Second Shooter".to_string()]);
            }
            other => panic!("expected DependentsExist, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_missing_service() {
        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo.expect_find_all().returning(|| Ok(vec![]));

        let service = CatalogService::new(Arc::new(mock_repo));
        let result = service.delete_service("S404").await;
        assert!(matches!(result, Err(QuoteError::ServiceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_reorder_services_saves_new_sort_order() {
        let photo = Service::new(create_request("Photography"));
        let video = Service::new(create_request("Videography"));
        let catalog = vec![photo.clone(), video.clone()];
        let expected_first = video.id.clone();

        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo
            .expect_find_all()
            .returning(move || Ok(catalog.clone()));
        mock_repo
            .expect_save_all()
            .withf(move |services| {
                services
                    .iter()
                    .any(|s| s.id == expected_first && s.sort_order == 0)
            })
            .times(1)
            .returning(|_| Ok(()));

        let metrics = Arc::new(Metrics::new().unwrap());
        let service = CatalogService::new(Arc::new(mock_repo)).with_metrics(metrics.clone());
        service
            .reorder_services(&[video.id.clone(), photo.id.clone()])
            .await
            .unwrap();

        let recorded = metrics
            .catalog_operations_total
            .with_label_values(&["reorder_services", "success"])
            .get();
        assert_eq!(recorded, 1.0);
    }

    #[tokio::test]
    async fn test_list_services_in_display_order() {
        let mut photo = Service::new(create_request("Photography"));
        photo.sort_order = 1;
        let mut video = Service::new(create_request("Videography"));
        video.sort_order = 0;
        let mut second = with_dependency("Second Shooter", &photo, DependencyType::SameDay, true);
        second.sort_order = -5;
        let catalog = vec![second, photo, video];

        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo
            .expect_find_all()
            .returning(move || Ok(catalog.clone()));

        let service = CatalogService::new(Arc::new(mock_repo));
        let names: Vec<String> = service
            .list_services()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();

        assert_eq!(names, vec!["Videography", "Photography", "Second Shooter"]);
    }

    #[tokio::test]
    async fn test_validate_service_dependency() {
        let photo = Service::new(create_request("Photography"));
        let second = with_dependency("Second Shooter", &photo, DependencyType::SameDay, true);
        let catalog = vec![photo.clone(), second.clone()];

        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo
            .expect_find_all()
            .returning(move || Ok(catalog.clone()));
        let service = CatalogService::new(Arc::new(mock_repo));

        let mut quote = Quote::new("Check".to_string());
        quote.days.push(Day::new(None));
        quote.days.push(Day::new(None));
        quote.days[0]
            .services
            .push(SelectedService::new(photo.id.clone(), 1));

        assert!(service
            .validate_service_dependency(&quote, 0, &second.id)
            .await
            .is_ok());
        let err = service
            .validate_service_dependency(&quote, 1, &second.id)
            .await
            .unwrap_err();
        assert!(err.is_dependency_violation());
        assert!(matches!(
            service.validate_service_dependency(&quote, 0, "S404").await,
            Err(QuoteError::ServiceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_repository_error_propagates() {
        let mut mock_repo = MockTestCatalogRepository::new();
        mock_repo.expect_find_all().returning(|| {
            Err(RepositoryError::Unavailable {
                message: "offline".to_string(),
            })
        });

        let service = CatalogService::new(Arc::new(mock_repo));
        let result = service.list_services().await;
        assert!(matches!(result, Err(QuoteError::Repository { .. })));
    }
}
