#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use quote_builder_rs::models::{Catalog, DependencyType, Quote, Service};
use quote_builder_rs::services::QuoteEditor;

pub const PHOTO: &str = "S-PHOTO";
pub const SECOND_SHOOTER: &str = "S-SECOND";
pub const EDITING: &str = "S-EDIT";
pub const VIDEO: &str = "S-VIDEO";
pub const DRONE: &str = "S-DRONE";
pub const ALBUM: &str = "S-ALBUM";
pub const TRAVEL: &str = "S-TRAVEL";

pub const QUIET_PERIOD: Duration = Duration::from_millis(1500);

fn service(
    id: &str,
    name: &str,
    price: Decimal,
    dependency: Option<(&str, DependencyType)>,
    is_subservice: bool,
    sort_order: i32,
) -> Service {
    let created = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
    Service {
        id: id.to_string(),
        name: name.to_string(),
        price,
        category: if id.contains("VIDEO") || id.contains("DRONE") {
            "Videography".to_string()
        } else {
            "Photography".to_string()
        },
        description: format!("{} for events", name),
        is_subservice,
        depends_on: dependency.map(|(parent, _)| parent.to_string()),
        dependency_type: dependency.map(|(_, t)| t).unwrap_or_default(),
        sort_order,
        created_at: created,
        updated_at: created,
    }
}

/// A small studio catalog: two parents with subservices, a same-quote add-on
/// and a standalone fee
pub fn studio_services() -> Vec<Service> {
    vec![
        service("S-PHOTO", "Wedding Photography", dec!(1500), None, false, 0),
        service(
            "S-SECOND",
            "Second Shooter",
            dec!(400),
            Some((PHOTO, DependencyType::SameDay)),
            true,
            0,
        ),
        service(
            "S-EDIT",
            "Extended Editing",
            dec!(200),
            Some((PHOTO, DependencyType::SameDay)),
            true,
            1,
        ),
        service("S-VIDEO", "Wedding Videography", dec!(1800), None, false, 1),
        service(
            "S-DRONE",
            "Drone Footage",
            dec!(350),
            Some((VIDEO, DependencyType::SameDay)),
            true,
            0,
        ),
        service(
            "S-ALBUM",
            "Premium Album",
            dec!(600),
            Some((PHOTO, DependencyType::SameQuote)),
            false,
            2,
        ),
        service("S-TRAVEL", "Travel Fee", dec!(150), None, false, 3),
    ]
}

pub fn studio_catalog() -> Arc<Catalog> {
    Arc::new(Catalog::new(studio_services()))
}

pub fn editor_with_days(days: usize) -> QuoteEditor {
    let mut editor = QuoteEditor::new(
        Quote::new("Integration".to_string()),
        studio_catalog(),
        QUIET_PERIOD,
    );
    for _ in 0..days {
        editor.add_day(None).expect("adding an undated day cannot fail");
    }
    editor
}

pub fn day_ids(quote: &Quote, day: usize) -> Vec<String> {
    quote.days[day]
        .services
        .iter()
        .map(|e| e.service_id.clone())
        .collect()
}

pub fn sorted_ids(quote: &Quote) -> Vec<String> {
    let mut ids: Vec<String> = quote.entries().map(|(_, e)| e.service_id.clone()).collect();
    ids.sort();
    ids
}

/// Every subservice sits directly after its parent or a sibling on the same day
pub fn groups_are_contiguous(quote: &Quote, catalog: &Catalog) -> bool {
    use quote_builder_rs::models::ServiceLookup;

    quote.days.iter().all(|day| {
        day.services.iter().enumerate().all(|(index, entry)| {
            let Some(service) = catalog.service(&entry.service_id) else {
                return true;
            };
            let Some(parent) = service.depends_on.as_deref().filter(|_| service.is_subservice)
            else {
                return true;
            };
            if index == 0 {
                return false;
            }
            let previous = &day.services[index - 1].service_id;
            previous == parent
                || catalog
                    .service(previous)
                    .map(|s| s.is_subservice_of(parent))
                    .unwrap_or(false)
        })
    })
}
