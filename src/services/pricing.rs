use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{
    DiscountType, Markup, Position, Quote, SelectedService, ServiceDiscount, ServiceLookup,
};

/// Priced view of one selected service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePricing {
    pub position: Position,
    pub service_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    pub discount_amount: Decimal,
    pub net_amount: Decimal,
    pub tentative: bool,
    pub missing_from_catalog: bool,
}

/// Totals for a quote; tentative amounts are reported apart from the firm total
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub lines: Vec<LinePricing>,
    pub subtotal: Decimal,
    pub markups_total: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub tentative_subtotal: Decimal,
    pub tentative_discount: Decimal,
    pub tentative_total: Decimal,
}

impl QuoteTotals {
    pub fn has_tentative(&self) -> bool {
        self.lines.iter().any(|line| line.tentative)
    }

    /// Firm total followed by the parenthesised tentative total, when present
    pub fn summary(&self) -> String {
        if self.has_tentative() {
            format!(
                "{} ({})",
                format_currency(self.total),
                format_currency(self.tentative_total)
            )
        } else {
            format_currency(self.total)
        }
    }
}

/// Two-decimal display form; arithmetic elsewhere keeps full precision
pub fn format_currency(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Discount actually taken off a line: never more than the line itself
pub fn service_discount_amount(discount: &ServiceDiscount, line_total: Decimal) -> Decimal {
    if !discount.applied || line_total <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let declared = match discount.discount_type {
        DiscountType::Fixed => discount.value,
        DiscountType::Percentage => line_total * discount.value / Decimal::ONE_HUNDRED,
    };
    declared.max(Decimal::ZERO).min(line_total)
}

pub struct PricingAggregator<'a> {
    lookup: &'a dyn ServiceLookup,
}

impl<'a> PricingAggregator<'a> {
    pub fn new(lookup: &'a dyn ServiceLookup) -> Self {
        Self { lookup }
    }

    pub fn price_line(&self, position: Position, entry: &SelectedService) -> LinePricing {
        let unit_price = entry.unit_price(self.lookup);
        let missing_from_catalog = unit_price.is_none();
        if missing_from_catalog {
            warn!(
                service_id = %entry.service_id,
                "Selected service missing from catalog, pricing at zero"
            );
        }
        let unit_price = unit_price.unwrap_or(Decimal::ZERO);
        let line_total = unit_price * Decimal::from(entry.quantity);
        let discount_amount = service_discount_amount(&entry.discount, line_total);

        LinePricing {
            position,
            service_id: entry.service_id.clone(),
            name: entry.display_name(self.lookup),
            unit_price,
            quantity: entry.quantity,
            line_total,
            discount_amount,
            net_amount: line_total - discount_amount,
            tentative: entry.tentative,
            missing_from_catalog,
        }
    }

    pub fn totals(&self, quote: &Quote) -> QuoteTotals {
        let lines: Vec<LinePricing> = quote
            .entries()
            .map(|(position, entry)| self.price_line(position, entry))
            .collect();

        let subtotal: Decimal = lines
            .iter()
            .filter(|line| !line.tentative)
            .map(|line| line.net_amount)
            .sum();
        let tentative_subtotal: Decimal = lines
            .iter()
            .filter(|line| line.tentative)
            .map(|line| line.net_amount)
            .sum();
        let markups_total: Decimal = quote.markups.iter().map(|m| m.markup_amount).sum();

        let rate = quote.discount_percentage / Decimal::ONE_HUNDRED;
        let discount_amount = (subtotal + markups_total) * rate;
        let tentative_discount = tentative_subtotal * rate;

        QuoteTotals {
            lines,
            subtotal,
            markups_total,
            discount_amount,
            total: subtotal + markups_total - discount_amount,
            tentative_subtotal,
            tentative_discount,
            tentative_total: tentative_subtotal - tentative_discount,
        }
    }

    /// Freeze a markup over the entries at `positions` using current prices
    pub fn markup_snapshot(
        &self,
        quote: &Quote,
        name: String,
        percentage: Decimal,
        positions: &[Position],
    ) -> Option<Markup> {
        let mut base_amount = Decimal::ZERO;
        let mut service_ids = Vec::with_capacity(positions.len());
        for position in positions {
            let entry = quote.entry(*position)?;
            let unit_price = entry.unit_price(self.lookup).unwrap_or(Decimal::ZERO);
            base_amount += unit_price * Decimal::from(entry.quantity);
            service_ids.push(entry.service_id.clone());
        }
        Some(Markup::snapshot(name, percentage, service_ids, base_amount))
    }
}
