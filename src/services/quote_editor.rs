use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::{
    validate_day_dates, validate_description, validate_discount_percentage,
    validate_markup_name, validate_markup_percentage, validate_quantity, validate_quote_text,
    validate_service_discount, validate_service_name, validate_service_price, Day,
    DependencyConflict, Markup, Position, Quote, QuoteError, QuoteResult, SelectedService,
    Service, ServiceDiscount, ServiceLookup, ServiceOverrides, Validate, ValidationError, ValidationMode,
};
use crate::observability::Metrics;
use crate::services::{
    DebouncedSave, DependencyValidator, MoveOutcome, PendingSave, PricingAggregator,
    QuoteTotals, ReorderEngine, ReorderRequest, SaveStatus,
};

/// Header fields of a quote
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteMetadata {
    pub title: String,
    pub client_name: String,
    pub location: String,
    pub booked: bool,
}

/// Owned editing state. Each operation validates before it mutates, so a
/// rejected edit leaves the quote as it was.
pub struct QuoteEditor {
    quote: Quote,
    lookup: Arc<dyn ServiceLookup>,
    mode: ValidationMode,
    totals: QuoteTotals,
    autosave: DebouncedSave,
    status: SaveStatus,
    metrics: Option<Arc<Metrics>>,
}

impl QuoteEditor {
    pub fn new(quote: Quote, lookup: Arc<dyn ServiceLookup>, quiet_period: Duration) -> Self {
        let totals = PricingAggregator::new(lookup.as_ref()).totals(&quote);
        Self {
            quote,
            lookup,
            mode: ValidationMode::Enforce,
            totals,
            autosave: DebouncedSave::new(quiet_period),
            status: SaveStatus::Idle,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    pub fn into_quote(self) -> Quote {
        self.quote
    }

    pub fn totals(&self) -> &QuoteTotals {
        &self.totals
    }

    pub fn lookup(&self) -> &dyn ServiceLookup {
        self.lookup.as_ref()
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn is_override(&self) -> bool {
        self.mode.is_override()
    }

    pub fn set_validation_mode(&mut self, mode: ValidationMode) {
        if mode != self.mode {
            info!(mode = %mode, "Validation mode changed");
        }
        self.mode = mode;
    }

    /// Swap in a refreshed catalog; prices of every line follow it
    pub fn set_lookup(&mut self, lookup: Arc<dyn ServiceLookup>) {
        self.lookup = lookup;
        self.recompute_totals();
    }

    /// Replace the whole quote, e.g. after loading a saved one
    pub fn load(&mut self, quote: Quote) -> QuoteResult<()> {
        quote.validate()?;
        info!(quote_id = %quote.id, "Quote loaded into editor");
        self.quote = quote;
        self.recompute_totals();
        self.autosave.touch(Instant::now());
        self.status = SaveStatus::Pending;
        Ok(())
    }

    /// Selected services whose prerequisite is currently missing
    pub fn dependency_issues(&self) -> Vec<DependencyConflict> {
        DependencyValidator::new(self.lookup.as_ref()).unsatisfied(&self.quote)
    }

    pub fn add_day(&mut self, date: Option<NaiveDate>) -> QuoteResult<usize> {
        self.edit("add_day", |quote, _, _| {
            let mut candidate = date_skeleton(quote);
            candidate.push(Day::new(date));
            validate_day_dates(&candidate)?;

            quote.days.push(Day::new(date));
            Ok(quote.days.len() - 1)
        })
    }

    pub fn remove_day(&mut self, day: usize) -> QuoteResult<Day> {
        self.edit("remove_day", |quote, lookup, mode| {
            if day >= quote.days.len() {
                return Err(QuoteError::DayNotFound { day });
            }
            DependencyValidator::new(lookup)
                .with_mode(mode)
                .check_remove_day(quote, day)?;

            Ok(quote.days.remove(day))
        })
    }

    pub fn set_day_date(&mut self, day: usize, date: Option<NaiveDate>) -> QuoteResult<()> {
        self.edit("set_day_date", |quote, _, _| {
            let mut candidate = date_skeleton(quote);
            let slot = candidate
                .get_mut(day)
                .ok_or(QuoteError::DayNotFound { day })?;
            slot.date = date;
            validate_day_dates(&candidate)?;

            quote.days[day].date = date;
            Ok(())
        })
    }

    /// Add a service to `day`. Subservices join the end of their parent's group.
    pub fn add_service(
        &mut self,
        day: usize,
        service_id: &str,
        quantity: u32,
    ) -> QuoteResult<Position> {
        self.edit("add_service", |quote, lookup, mode| {
            let service = lookup
                .service(service_id)
                .ok_or_else(|| QuoteError::ServiceNotFound {
                    id: service_id.to_string(),
                })?;
            let target = quote.days.get(day).ok_or(QuoteError::DayNotFound { day })?;
            validate_quantity(quantity)?;
            DependencyValidator::new(lookup)
                .with_mode(mode)
                .check_add(quote, day, service_id)?;

            let index = insertion_index(lookup, target, service);
            let services = &mut quote.days[day].services;
            services.insert(index, SelectedService::new(service_id.to_string(), quantity));
            quote.days[day].renumber();

            debug!(service_id, day, index, "Service added");
            Ok(Position::new(day, index))
        })
    }

    pub fn remove_service(&mut self, position: Position) -> QuoteResult<SelectedService> {
        self.edit("remove_service", |quote, lookup, mode| {
            existing(quote, position)?;
            DependencyValidator::new(lookup)
                .with_mode(mode)
                .check_remove(quote, position)?;

            let day = &mut quote.days[position.day];
            let removed = day.services.remove(position.index);
            day.renumber();
            Ok(removed)
        })
    }

    pub fn set_quantity(&mut self, position: Position, quantity: u32) -> QuoteResult<()> {
        self.edit("set_quantity", |quote, _, _| {
            validate_quantity(quantity)?;
            existing_mut(quote, position)?.quantity = quantity;
            Ok(())
        })
    }

    pub fn set_tentative(&mut self, position: Position, tentative: bool) -> QuoteResult<()> {
        self.edit("set_tentative", |quote, _, _| {
            existing_mut(quote, position)?.tentative = tentative;
            Ok(())
        })
    }

    pub fn set_service_discount(
        &mut self,
        position: Position,
        discount: ServiceDiscount,
    ) -> QuoteResult<()> {
        self.edit("set_service_discount", |quote, _, _| {
            validate_service_discount(&discount)?;
            existing_mut(quote, position)?.discount = discount;
            Ok(())
        })
    }

    pub fn set_overrides(
        &mut self,
        position: Position,
        overrides: ServiceOverrides,
    ) -> QuoteResult<()> {
        self.edit("set_overrides", |quote, _, _| {
            if let Some(name) = &overrides.name {
                validate_service_name(name)?;
            }
            if let Some(price) = &overrides.price {
                validate_service_price(price)?;
            }
            if let Some(description) = &overrides.description {
                validate_description(description)?;
            }
            existing_mut(quote, position)?.overrides = overrides;
            Ok(())
        })
    }

    pub fn set_discount_percentage(&mut self, percentage: Decimal) -> QuoteResult<()> {
        self.edit("set_discount_percentage", |quote, _, _| {
            validate_discount_percentage(&percentage)?;
            quote.discount_percentage = percentage;
            Ok(())
        })
    }

    /// Freeze a new markup over the entries at `positions` at today's prices
    pub fn add_markup(
        &mut self,
        name: &str,
        percentage: Decimal,
        positions: &[Position],
    ) -> QuoteResult<usize> {
        self.edit("add_markup", |quote, lookup, _| {
            let markup = build_markup(quote, lookup, name, percentage, positions)?;
            quote.markups.push(markup);
            Ok(quote.markups.len() - 1)
        })
    }

    /// Re-freeze an existing markup with new settings
    pub fn update_markup(
        &mut self,
        index: usize,
        name: &str,
        percentage: Decimal,
        positions: &[Position],
    ) -> QuoteResult<()> {
        self.edit("update_markup", |quote, lookup, _| {
            if index >= quote.markups.len() {
                return Err(QuoteError::MarkupNotFound { index });
            }
            let markup = build_markup(quote, lookup, name, percentage, positions)?;
            quote.markups[index] = markup;
            Ok(())
        })
    }

    pub fn remove_markup(&mut self, index: usize) -> QuoteResult<Markup> {
        self.edit("remove_markup", |quote, _, _| {
            if index >= quote.markups.len() {
                return Err(QuoteError::MarkupNotFound { index });
            }
            Ok(quote.markups.remove(index))
        })
    }

    pub fn set_metadata(&mut self, metadata: QuoteMetadata) -> QuoteResult<()> {
        self.edit("set_metadata", |quote, _, _| {
            validate_quote_text("title", &metadata.title)?;
            validate_quote_text("client_name", &metadata.client_name)?;
            validate_quote_text("location", &metadata.location)?;

            quote.title = metadata.title;
            quote.client_name = metadata.client_name;
            quote.location = metadata.location;
            quote.booked = metadata.booked;
            Ok(())
        })
    }

    /// The single reorder entry point shared by pointer and touch drags
    pub fn reorder(&mut self, request: ReorderRequest) -> QuoteResult<MoveOutcome> {
        let cross_day = request.source.day != request.target.day;
        let result = self.edit("reorder", |quote, lookup, mode| {
            ReorderEngine::new(lookup)
                .with_mode(mode)
                .reorder(quote, request)
        });
        if let Some(metrics) = &self.metrics {
            metrics.record_reorder(cross_day, result.is_ok());
        }
        result
    }

    /// Claim the draft write if the quiet period has elapsed (or a save was requested)
    pub fn pending_save(&mut self, now: Instant) -> Option<PendingSave> {
        let revision = self.autosave.take(now)?;
        self.status = SaveStatus::Saving;
        Some(PendingSave {
            revision,
            quote: self.quote.clone(),
        })
    }

    /// Ask for a write on the next flush without waiting for the quiet period
    pub fn request_save(&mut self) {
        self.autosave.force();
        self.status = SaveStatus::Pending;
    }

    pub fn mark_saved(&mut self, revision: u64, at: DateTime<Utc>) {
        debug!(revision, current = self.autosave.revision(), "Draft write acknowledged");
        self.status = if self.autosave.is_dirty() {
            SaveStatus::Pending
        } else {
            SaveStatus::Saved { at }
        };
    }

    pub fn mark_save_failed(&mut self, message: String) {
        self.status = SaveStatus::Failed { message };
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.status
    }

    fn edit<T>(
        &mut self,
        operation: &'static str,
        apply: impl FnOnce(&mut Quote, &dyn ServiceLookup, ValidationMode) -> QuoteResult<T>,
    ) -> QuoteResult<T> {
        let result = apply(&mut self.quote, self.lookup.as_ref(), self.mode);

        match &result {
            Ok(_) => {
                self.quote.touch();
                self.recompute_totals();
                self.autosave.touch(Instant::now());
                self.status = SaveStatus::Pending;
                if let Some(metrics) = &self.metrics {
                    metrics.record_quote_operation(operation, true);
                }
            }
            Err(e) => {
                warn!(operation, error = %e, "Quote edit rejected");
                if let Some(metrics) = &self.metrics {
                    metrics.record_quote_operation(operation, false);
                    if let QuoteError::Dependency(violation) = e {
                        metrics.record_dependency_violation(violation.kind());
                    }
                }
            }
        }
        result
    }

    fn recompute_totals(&mut self) {
        let started = Instant::now();
        self.totals = PricingAggregator::new(self.lookup.as_ref()).totals(&self.quote);
        if let Some(metrics) = &self.metrics {
            metrics.record_pricing(started.elapsed().as_secs_f64());
        }
    }
}

/// Days carrying only their dates, for validating a date change before applying it
fn date_skeleton(quote: &Quote) -> Vec<Day> {
    quote.days.iter().map(|d| Day::new(d.date)).collect()
}

fn existing(quote: &Quote, position: Position) -> QuoteResult<&SelectedService> {
    quote.entry(position).ok_or(QuoteError::LineNotFound {
        day: position.day,
        index: position.index,
    })
}

fn existing_mut(quote: &mut Quote, position: Position) -> QuoteResult<&mut SelectedService> {
    quote.entry_mut(position).ok_or(QuoteError::LineNotFound {
        day: position.day,
        index: position.index,
    })
}

fn insertion_index(lookup: &dyn ServiceLookup, day: &Day, service: &Service) -> usize {
    let parent = match (service.is_subservice, service.depends_on.as_deref()) {
        (true, Some(parent)) => parent,
        _ => return day.services.len(),
    };
    let Some(parent_index) = day.services.iter().rposition(|e| e.service_id == parent) else {
        return day.services.len();
    };

    let mut index = parent_index + 1;
    while index < day.services.len()
        && lookup
            .service(&day.services[index].service_id)
            .map(|s| s.is_subservice_of(parent))
            .unwrap_or(false)
    {
        index += 1;
    }
    index
}

fn build_markup(
    quote: &Quote,
    lookup: &dyn ServiceLookup,
    name: &str,
    percentage: Decimal,
    positions: &[Position],
) -> QuoteResult<Markup> {
    validate_markup_name(name)?;
    validate_markup_percentage(&percentage)?;
    if positions.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "markup_services".to_string(),
        }
        .into());
    }
    for position in positions {
        existing(quote, *position)?;
    }

    PricingAggregator::new(lookup)
        .markup_snapshot(quote, name.trim().to_string(), percentage, positions)
        .ok_or_else(|| QuoteError::ValidationError {
            message: "Markup references a missing service".to_string(),
        })
}
