use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DiscountType, ServiceLookup};

/// Address of a selected service inside a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub day: usize,
    pub index: usize,
}

impl Position {
    pub fn new(day: usize, index: usize) -> Self {
        Self { day, index }
    }
}

/// Multi-day quote document assembled by staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub booked: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_by: Option<String>,
    pub days: Vec<Day>,
    #[serde(default)]
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub markups: Vec<Markup>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One shooting day with its ordered services
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Day {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub services: Vec<SelectedService>,
}

/// A service placed on a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedService {
    pub service_id: String,
    pub quantity: u32,
    /// Index of this entry within its day
    #[serde(default)]
    pub sequence: usize,
    #[serde(default)]
    pub discount: ServiceDiscount,
    #[serde(default)]
    pub tentative: bool,
    #[serde(default)]
    pub overrides: ServiceOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDiscount {
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub applied: bool,
}

/// Per-instance replacements for catalog fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceOverrides {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

/// Named percentage over a chosen set of services.
///
/// `base_amount` and `markup_amount` are captured when the markup is created
/// or edited and are never recomputed from later price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Markup {
    pub name: String,
    pub percentage: Decimal,
    #[serde(default)]
    pub service_ids: Vec<String>,
    pub base_amount: Decimal,
    pub markup_amount: Decimal,
}

impl Markup {
    pub fn snapshot(
        name: String,
        percentage: Decimal,
        service_ids: Vec<String>,
        base_amount: Decimal,
    ) -> Self {
        Self {
            name,
            percentage,
            service_ids,
            base_amount,
            markup_amount: base_amount * percentage / Decimal::ONE_HUNDRED,
        }
    }
}

impl Default for Quote {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl Quote {
    /// Create an empty quote with a generated ID
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            client_name: String::new(),
            location: String::new(),
            booked: false,
            archived: false,
            created_by: None,
            days: Vec::new(),
            discount_percentage: Decimal::ZERO,
            markups: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn entry(&self, position: Position) -> Option<&SelectedService> {
        self.days
            .get(position.day)
            .and_then(|day| day.services.get(position.index))
    }

    pub fn entry_mut(&mut self, position: Position) -> Option<&mut SelectedService> {
        self.days
            .get_mut(position.day)
            .and_then(|day| day.services.get_mut(position.index))
    }

    /// Every selected service with its position, in day order
    pub fn entries(&self) -> impl Iterator<Item = (Position, &SelectedService)> {
        self.days.iter().enumerate().flat_map(|(day, d)| {
            d.services
                .iter()
                .enumerate()
                .map(move |(index, entry)| (Position::new(day, index), entry))
        })
    }

    /// Number of instances of `service_id` across the quote
    pub fn count(&self, service_id: &str) -> usize {
        self.entries()
            .filter(|(_, entry)| entry.service_id == service_id)
            .count()
    }

    pub fn contains(&self, service_id: &str) -> bool {
        self.count(service_id) > 0
    }

    pub fn contains_on_day(&self, day: usize, service_id: &str) -> bool {
        self.days
            .get(day)
            .map(|d| d.count(service_id) > 0)
            .unwrap_or(false)
    }

    pub fn total_entries(&self) -> usize {
        self.days.iter().map(|d| d.services.len()).sum()
    }

    /// First and last set dates, if any day is dated
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.days.iter().filter_map(|d| d.date);
        let first = dates.next()?;
        let last = dates.last().unwrap_or(first);
        Some((first.min(last), first.max(last)))
    }
}

impl Day {
    pub fn new(date: Option<NaiveDate>) -> Self {
        Self {
            date,
            services: Vec::new(),
        }
    }

    pub fn count(&self, service_id: &str) -> usize {
        self.services
            .iter()
            .filter(|entry| entry.service_id == service_id)
            .count()
    }

    /// Rewrite each entry's sequence to match its index
    pub fn renumber(&mut self) {
        for (index, entry) in self.services.iter_mut().enumerate() {
            entry.sequence = index;
        }
    }
}

impl SelectedService {
    pub fn new(service_id: String, quantity: u32) -> Self {
        Self {
            service_id,
            quantity,
            sequence: 0,
            discount: ServiceDiscount::default(),
            tentative: false,
            overrides: ServiceOverrides::default(),
        }
    }

    /// Override price if set, otherwise the catalog price
    pub fn unit_price(&self, lookup: &dyn ServiceLookup) -> Option<Decimal> {
        self.overrides
            .price
            .or_else(|| lookup.service(&self.service_id).map(|s| s.price))
    }

    /// Override name if set, otherwise the catalog name
    pub fn display_name(&self, lookup: &dyn ServiceLookup) -> String {
        self.overrides
            .name
            .clone()
            .unwrap_or_else(|| lookup.name_of(&self.service_id))
    }
}
