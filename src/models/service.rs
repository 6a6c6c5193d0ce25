use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DependencyType;

/// Catalog entry for a bookable photography or videography service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_subservice: bool,
    #[serde(default)]
    pub depends_on: Option<String>,
    #[serde(default)]
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request model for creating a catalog service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_subservice: bool,
    #[serde(default)]
    pub depends_on: Option<String>,
    #[serde(default)]
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub sort_order: i32,
}

/// Request model for updating a catalog service
///
/// `depends_on` uses a nested option so callers can clear a dependency
/// (`Some(None)`) as well as leave it untouched (`None`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_subservice: Option<bool>,
    pub depends_on: Option<Option<String>>,
    pub dependency_type: Option<DependencyType>,
    pub sort_order: Option<i32>,
}

impl Service {
    /// Create a new Service with a generated ID and timestamps
    pub fn new(request: CreateServiceRequest) -> Self {
        let now = Utc::now();
        Self {
            id: format!(
                "S{}",
                Uuid::new_v4()
                    .simple()
                    .to_string()
                    .get(0..8)
                    .unwrap_or("00000000")
            ),
            name: request.name,
            price: request.price,
            category: request.category,
            description: request.description,
            is_subservice: request.is_subservice,
            depends_on: request.depends_on,
            dependency_type: request.dependency_type,
            sort_order: request.sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the provided fields of an update request
    pub fn update(&mut self, request: UpdateServiceRequest) {
        if let Some(name) = request.name {
            self.name = name;
        }
        if let Some(price) = request.price {
            self.price = price;
        }
        if let Some(category) = request.category {
            self.category = category;
        }
        if let Some(description) = request.description {
            self.description = description;
        }
        if let Some(is_subservice) = request.is_subservice {
            self.is_subservice = is_subservice;
        }
        if let Some(depends_on) = request.depends_on {
            self.depends_on = depends_on;
            if self.depends_on.is_none() {
                self.dependency_type = DependencyType::None;
            }
        }
        if let Some(dependency_type) = request.dependency_type {
            self.dependency_type = dependency_type;
        }
        if let Some(sort_order) = request.sort_order {
            self.sort_order = sort_order;
        }
        self.updated_at = Utc::now();
    }

    /// The prerequisite and its scope, when this service has an active dependency
    pub fn dependency(&self) -> Option<(&str, DependencyType)> {
        match (&self.depends_on, self.dependency_type) {
            (Some(id), DependencyType::SameDay | DependencyType::SameQuote) => {
                Some((id.as_str(), self.dependency_type))
            }
            _ => None,
        }
    }

    /// Whether this service is a subservice nested under `parent_id`
    pub fn is_subservice_of(&self, parent_id: &str) -> bool {
        self.is_subservice && self.depends_on.as_deref() == Some(parent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn create_request() -> CreateServiceRequest {
        CreateServiceRequest {
            name: "Wedding Photography".to_string(),
            price: dec!(1200.00),
            category: "Photography".to_string(),
            description: "Full-day coverage".to_string(),
            is_subservice: false,
            depends_on: None,
            dependency_type: DependencyType::None,
            sort_order: 1,
        }
    }

    #[test]
    fn test_service_creation() {
        let service = Service::new(create_request());

        assert!(service.id.starts_with('S'));
        assert_eq!(service.id.len(), 9);
        assert_eq!(service.name, "Wedding Photography");
        assert_eq!(service.price, dec!(1200.00));
        assert!(service.dependency().is_none());
        assert_eq!(service.created_at, service.updated_at);
    }

    #[test]
    fn test_service_update() {
        let mut service = Service::new(create_request());
        let original_updated_at = service.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(5));

        service.update(UpdateServiceRequest {
            price: Some(dec!(1350.00)),
            depends_on: Some(Some("S0000001".to_string())),
            dependency_type: Some(DependencyType::SameQuote),
            ..Default::default()
        });

        assert_eq!(service.price, dec!(1350.00));
        assert_eq!(
            service.dependency(),
            Some(("S0000001", DependencyType::SameQuote))
        );
        assert!(service.updated_at > original_updated_at);
    }

    #[test]
    fn test_clearing_dependency_resets_type() {
        let mut service = Service::new(CreateServiceRequest {
            depends_on: Some("S0000001".to_string()),
            dependency_type: DependencyType::SameDay,
            ..create_request()
        });

        service.update(UpdateServiceRequest {
            depends_on: Some(None),
            ..Default::default()
        });

        assert_eq!(service.depends_on, None);
        assert_eq!(service.dependency_type, DependencyType::None);
    }

    #[test]
    fn test_subservice_relationship() {
        let service = Service::new(CreateServiceRequest {
            name: "Drone Footage".to_string(),
            is_subservice: true,
            depends_on: Some("S0000001".to_string()),
            dependency_type: DependencyType::SameDay,
            ..create_request()
        });

        assert!(service.is_subservice_of("S0000001"));
        assert!(!service.is_subservice_of("S0000002"));
    }
}
