use std::collections::{HashMap, HashSet};

use super::{validate_service_shape, QuoteError, QuoteResult, Service, ValidationError, ValidationResult};

/// Read-only lookup from a service id to its current catalog entry
///
/// Validator, reorder engine and pricing only see the catalog through this
/// trait, so tests can hand them a plain map.
pub trait ServiceLookup: Send + Sync {
    fn service(&self, id: &str) -> Option<&Service>;

    /// Display name for an id, falling back to the id itself
    fn name_of(&self, id: &str) -> String {
        self.service(id)
            .map(|service| service.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn is_subservice(&self, id: &str) -> bool {
        self.service(id).map(|s| s.is_subservice).unwrap_or(false)
    }
}

impl ServiceLookup for HashMap<String, Service> {
    fn service(&self, id: &str) -> Option<&Service> {
        self.get(id)
    }
}

/// Snapshot of the service catalog with an id index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    services: Vec<Service>,
    index: HashMap<String, usize>,
}

impl ServiceLookup for Catalog {
    fn service(&self, id: &str) -> Option<&Service> {
        self.index.get(id).map(|&i| &self.services[i])
    }
}

impl Catalog {
    pub fn new(services: Vec<Service>) -> Self {
        let index = services
            .iter()
            .enumerate()
            .map(|(i, service)| (service.id.clone(), i))
            .collect();
        Self { services, index }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn into_services(self) -> Vec<Service> {
        self.services
    }

    /// Services in display order: parents by sort order, each followed
    /// immediately by its subservices regardless of their raw sort order.
    /// Subservices whose parent is missing or not a top-level service come last.
    pub fn display_order(&self) -> Vec<&Service> {
        let mut roots: Vec<&Service> = self.services.iter().filter(|s| !s.is_subservice).collect();
        roots.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));

        let mut ordered = Vec::with_capacity(self.services.len());
        let mut placed = HashSet::new();
        for root in roots {
            self.place_with_children(root, &mut ordered, &mut placed);
        }

        let mut orphans: Vec<&Service> = self
            .services
            .iter()
            .filter(|s| !placed.contains(s.id.as_str()))
            .collect();
        orphans.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        ordered.extend(orphans);
        ordered
    }

    fn place_with_children<'a>(
        &'a self,
        service: &'a Service,
        ordered: &mut Vec<&'a Service>,
        placed: &mut HashSet<&'a str>,
    ) {
        if !placed.insert(service.id.as_str()) {
            return;
        }
        ordered.push(service);

        let mut children: Vec<&Service> = self
            .services
            .iter()
            .filter(|s| s.is_subservice_of(&service.id))
            .collect();
        children.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        for child in children {
            if placed.insert(child.id.as_str()) {
                ordered.push(child);
            }
        }
    }

    /// Catalog services that declare a dependency on `id`
    pub fn dependents_of(&self, id: &str) -> Vec<&Service> {
        self.services
            .iter()
            .filter(|s| s.dependency().map(|(dep, _)| dep == id).unwrap_or(false))
            .collect()
    }

    /// Assign `sort_order = position` to each listed id; unlisted services keep theirs
    pub fn apply_sort_order(&mut self, ids: &[String]) -> QuoteResult<()> {
        for id in ids {
            if !self.index.contains_key(id) {
                return Err(QuoteError::ServiceNotFound { id: id.clone() });
            }
        }
        for (position, id) in ids.iter().enumerate() {
            let i = self.index[id];
            self.services[i].sort_order = position as i32;
        }
        Ok(())
    }

    /// Check per-service invariants, duplicate ids, dangling references,
    /// nested subservices and dependency cycles
    pub fn validate(&self) -> ValidationResult<()> {
        let mut seen = HashSet::with_capacity(self.services.len());
        for service in &self.services {
            if !seen.insert(service.id.as_str()) {
                return Err(ValidationError::InvalidValue {
                    field: "id".to_string(),
                    value: service.id.clone(),
                    reason: "Duplicate service id".to_string(),
                });
            }
            validate_service_shape(
                Some(&service.id),
                service.is_subservice,
                service.depends_on.as_deref(),
                service.dependency_type,
            )?;

            if let Some(parent) = &service.depends_on {
                let Some(target) = self.service(parent) else {
                    return Err(ValidationError::InvalidValue {
                        field: "depends_on".to_string(),
                        value: parent.clone(),
                        reason: format!("{} depends on an unknown service", service.name),
                    });
                };
                // subservice groups are one level deep
                if service.is_subservice && target.is_subservice {
                    return Err(ValidationError::InvalidValue {
                        field: "depends_on".to_string(),
                        value: parent.clone(),
                        reason: format!("{} cannot be a subservice of another subservice", service.name),
                    });
                }
            }
        }

        for service in &self.services {
            if self.has_cycle_from(service) {
                return Err(ValidationError::InvalidValue {
                    field: "depends_on".to_string(),
                    value: service.id.clone(),
                    reason: format!("Dependency cycle through {}", service.name),
                });
            }
        }

        Ok(())
    }

    fn has_cycle_from(&self, start: &Service) -> bool {
        let mut current = start.depends_on.as_deref();
        let mut steps = 0;
        while let Some(id) = current {
            if id == start.id {
                return true;
            }
            steps += 1;
            if steps > self.services.len() {
                return true;
            }
            current = self.service(id).and_then(|s| s.depends_on.as_deref());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DependencyType;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn service(id: &str, name: &str, sort_order: i32) -> Service {
        let now = Utc::now();
        Service {
            id: id.to_string(),
            name: name.to_string(),
            price: dec!(100),
            category: "Photo".to_string(),
            description: String::new(),
            is_subservice: false,
            depends_on: None,
            dependency_type: DependencyType::None,
            sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn subservice(id: &str, name: &str, parent: &str, sort_order: i32) -> Service {
        Service {
            is_subservice: true,
            depends_on: Some(parent.to_string()),
            dependency_type: DependencyType::SameDay,
            ..service(id, name, sort_order)
        }
    }

    #[test]
    fn test_display_order_groups_subservices_after_parent() {
        let catalog = Catalog::new(vec![
            subservice("drone", "Drone", "video", 0),
            service("photo", "Photography", 2),
            service("video", "Videography", 1),
            subservice("assist", "Assistant", "photo", 9),
            subservice("edit", "Editing", "video", 5),
        ]);

        let ids: Vec<&str> = catalog.display_order().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["video", "drone", "edit", "photo", "assist"]);
    }

    #[test]
    fn test_orphan_subservices_are_listed_last() {
        let catalog = Catalog::new(vec![
            subservice("orphan", "Orphan", "missing", 0),
            service("photo", "Photography", 5),
        ]);

        let ids: Vec<&str> = catalog.display_order().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["photo", "orphan"]);
    }

    #[test]
    fn test_apply_sort_order() {
        let mut catalog = Catalog::new(vec![
            service("a", "Alpha", 0),
            service("b", "Beta", 1),
            service("c", "Gamma", 2),
        ]);

        catalog
            .apply_sort_order(&["c".to_string(), "a".to_string(), "b".to_string()])
            .unwrap();

        let ids: Vec<&str> = catalog.display_order().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        let err = catalog.apply_sort_order(&["zzz".to_string()]).unwrap_err();
        assert!(matches!(err, QuoteError::ServiceNotFound { .. }));
    }

    #[test]
    fn test_validate_detects_cycles_and_dangling_references() {
        let mut a = service("a", "Alpha", 0);
        a.depends_on = Some("b".to_string());
        a.dependency_type = DependencyType::SameQuote;
        let mut b = service("b", "Beta", 1);
        b.depends_on = Some("a".to_string());
        b.dependency_type = DependencyType::SameQuote;
        assert!(Catalog::new(vec![a.clone(), b]).validate().is_err());

        let mut dangling = service("c", "Gamma", 2);
        dangling.depends_on = Some("nope".to_string());
        dangling.dependency_type = DependencyType::SameDay;
        assert!(Catalog::new(vec![dangling]).validate().is_err());

        let valid = Catalog::new(vec![service("photo", "Photography", 0), subservice("assist", "Assistant", "photo", 1)]);
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nested_subservices() {
        let catalog = Catalog::new(vec![
            service("photo", "Photography", 0),
            subservice("assist", "Assistant", "photo", 1),
            subservice("lighting", "Lighting", "assist", 2),
        ]);

        let err = catalog.validate().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "depends_on"));

        // a same_quote add-on may still point at a subservice
        let mut addon = service("prints", "Prints", 3);
        addon.depends_on = Some("assist".to_string());
        addon.dependency_type = DependencyType::SameQuote;
        let catalog = Catalog::new(vec![
            service("photo", "Photography", 0),
            subservice("assist", "Assistant", "photo", 1),
            addon,
        ]);
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_nested_subservice_is_not_grouped_under_its_grandparent() {
        let catalog = Catalog::new(vec![
            service("photo", "Photography", 0),
            subservice("assist", "Assistant", "photo", 0),
            subservice("lighting", "Lighting", "assist", 0),
            service("video", "Videography", 1),
        ]);

        let ids: Vec<&str> = catalog.display_order().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["photo", "assist", "video", "lighting"]);
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let catalog = Catalog::new(vec![
            service("photo", "Photography", 0),
            service("photo", "Photography (copy)", 1),
        ]);

        let err = catalog.validate().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_dependents_of() {
        let catalog = Catalog::new(vec![
            service("photo", "Photography", 0),
            subservice("assist", "Assistant", "photo", 1),
            service("album", "Album", 2),
        ]);

        let dependents = catalog.dependents_of("photo");
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].id, "assist");
        assert_eq!(catalog.name_of("album"), "Album");
        assert_eq!(catalog.name_of("unknown"), "unknown");
    }
}
