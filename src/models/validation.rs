use rust_decimal::Decimal;

use super::{
    CreateServiceRequest, Day, DependencyType, DiscountType, Quote, ServiceDiscount,
    UpdateServiceRequest, ValidationError, ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_SERVICE_NAME_LENGTH: usize = 200;
pub const MAX_CATEGORY_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_PRICE: Decimal = Decimal::from_parts(99999999, 0, 0, false, 2); // 999999.99
pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 1000;
pub const MAX_MARKUP_PERCENTAGE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
/// Upper bound for a stored markup base; well past any real quote
pub const MAX_MARKUP_BASE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

impl Validate for CreateServiceRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_service_name(&self.name)?;
        validate_service_price(&self.price)?;
        validate_category(&self.category)?;
        validate_description(&self.description)?;
        validate_service_shape(
            None,
            self.is_subservice,
            self.depends_on.as_deref(),
            self.dependency_type,
        )?;
        Ok(())
    }
}

impl Validate for UpdateServiceRequest {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_service_name(name)?;
        }
        if let Some(price) = &self.price {
            validate_service_price(price)?;
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }
}

impl Validate for Quote {
    fn validate(&self) -> ValidationResult<()> {
        validate_quote_text("title", &self.title)?;
        validate_quote_text("client_name", &self.client_name)?;
        validate_quote_text("location", &self.location)?;
        validate_discount_percentage(&self.discount_percentage)?;
        validate_day_dates(&self.days)?;
        for day in &self.days {
            for entry in &day.services {
                validate_quantity(entry.quantity)?;
                validate_service_discount(&entry.discount)?;
                if let Some(price) = &entry.overrides.price {
                    validate_service_price(price)?;
                }
            }
        }
        for markup in &self.markups {
            validate_markup_percentage(&markup.percentage)?;
            validate_markup_amounts(&markup.base_amount, &markup.markup_amount)?;
        }
        Ok(())
    }
}

/// Validate service name
pub fn validate_service_name(name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "service_name".to_string(),
        });
    }

    if trimmed.len() > MAX_SERVICE_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "service_name".to_string(),
            max_length: MAX_SERVICE_NAME_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if trimmed
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(ValidationError::InvalidValue {
            field: "service_name".to_string(),
            value: name.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate service price (zero is allowed for bundled extras)
pub fn validate_service_price(price: &Decimal) -> ValidationResult<()> {
    if *price < Decimal::ZERO || *price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "service_price".to_string(),
            min: "0".to_string(),
            max: MAX_PRICE.to_string(),
            value: price.to_string(),
        });
    }

    if price.normalize().scale() > 2 {
        return Err(ValidationError::InvalidValue {
            field: "service_price".to_string(),
            value: price.to_string(),
            reason: "Price cannot have more than 2 decimal places".to_string(),
        });
    }

    Ok(())
}

pub fn validate_category(category: &str) -> ValidationResult<()> {
    let trimmed = category.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "category".to_string(),
        });
    }

    if trimmed.len() > MAX_CATEGORY_LENGTH {
        return Err(ValidationError::TooLong {
            field: "category".to_string(),
            max_length: MAX_CATEGORY_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    Ok(())
}

pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.len() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max_length: MAX_DESCRIPTION_LENGTH,
            actual_length: description.len(),
        });
    }
    Ok(())
}

/// Dependency shape rules shared by create requests and stored services
pub fn validate_service_shape(
    id: Option<&str>,
    is_subservice: bool,
    depends_on: Option<&str>,
    dependency_type: DependencyType,
) -> ValidationResult<()> {
    if let (Some(id), Some(parent)) = (id, depends_on) {
        if id == parent {
            return Err(ValidationError::InvalidValue {
                field: "depends_on".to_string(),
                value: parent.to_string(),
                reason: "A service cannot depend on itself".to_string(),
            });
        }
    }

    if is_subservice {
        if depends_on.is_none() {
            return Err(ValidationError::RequiredField {
                field: "depends_on".to_string(),
            });
        }
        if dependency_type != DependencyType::SameDay {
            return Err(ValidationError::InvalidValue {
                field: "dependency_type".to_string(),
                value: dependency_type.to_string(),
                reason: "Subservices must use a same_day dependency".to_string(),
            });
        }
    }

    match (depends_on, dependency_type) {
        (Some(_), DependencyType::None) => Err(ValidationError::InvalidValue {
            field: "dependency_type".to_string(),
            value: dependency_type.to_string(),
            reason: "A dependency requires same_day or same_quote".to_string(),
        }),
        (None, DependencyType::SameDay | DependencyType::SameQuote) => {
            Err(ValidationError::RequiredField {
                field: "depends_on".to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Validate selected quantity
pub fn validate_quantity(quantity: u32) -> ValidationResult<()> {
    if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: MIN_QUANTITY.to_string(),
            max: MAX_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }
    Ok(())
}

/// Validate quote-level discount percentage (0–100)
pub fn validate_discount_percentage(percentage: &Decimal) -> ValidationResult<()> {
    if *percentage < Decimal::ZERO || *percentage > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "discount_percentage".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
            value: percentage.to_string(),
        });
    }
    Ok(())
}

pub fn validate_markup_percentage(percentage: &Decimal) -> ValidationResult<()> {
    if *percentage < Decimal::ZERO || *percentage > MAX_MARKUP_PERCENTAGE {
        return Err(ValidationError::OutOfRange {
            field: "markup_percentage".to_string(),
            min: "0".to_string(),
            max: MAX_MARKUP_PERCENTAGE.to_string(),
            value: percentage.to_string(),
        });
    }
    Ok(())
}

pub fn validate_service_discount(discount: &ServiceDiscount) -> ValidationResult<()> {
    if discount.value < Decimal::ZERO {
        return Err(ValidationError::InvalidValue {
            field: "discount_value".to_string(),
            value: discount.value.to_string(),
            reason: "Discount cannot be negative".to_string(),
        });
    }
    if discount.discount_type == DiscountType::Percentage && discount.value > Decimal::ONE_HUNDRED
    {
        return Err(ValidationError::OutOfRange {
            field: "discount_value".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
            value: discount.value.to_string(),
        });
    }
    Ok(())
}

/// Dates that are set must be strictly increasing across days
pub fn validate_day_dates(days: &[Day]) -> ValidationResult<()> {
    let mut previous = None;
    for (index, day) in days.iter().enumerate() {
        if let Some(date) = day.date {
            if let Some(prev) = previous {
                if date <= prev {
                    return Err(ValidationError::InvalidValue {
                        field: format!("days[{}].date", index),
                        value: date.to_string(),
                        reason: format!("Must be after {}", prev),
                    });
                }
            }
            previous = Some(date);
        }
    }
    Ok(())
}

/// Markup names label a line on the quote and must be present
pub fn validate_markup_name(name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "markup_name".to_string(),
        });
    }
    if trimmed.len() > MAX_SERVICE_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "markup_name".to_string(),
            max_length: MAX_SERVICE_NAME_LENGTH,
            actual_length: trimmed.len(),
        });
    }
    Ok(())
}

/// Stored markup amounts; the markup can be at most the base times the largest percentage
pub fn validate_markup_amounts(base: &Decimal, amount: &Decimal) -> ValidationResult<()> {
    if *base < Decimal::ZERO || *base > MAX_MARKUP_BASE {
        return Err(ValidationError::OutOfRange {
            field: "markup_base_amount".to_string(),
            min: "0".to_string(),
            max: MAX_MARKUP_BASE.to_string(),
            value: base.to_string(),
        });
    }
    let max_amount = *base * MAX_MARKUP_PERCENTAGE / Decimal::ONE_HUNDRED;
    if *amount < Decimal::ZERO || *amount > max_amount {
        return Err(ValidationError::OutOfRange {
            field: "markup_amount".to_string(),
            min: "0".to_string(),
            max: max_amount.to_string(),
            value: amount.to_string(),
        });
    }
    Ok(())
}

/// Free-text quote header fields (title, client, location); empty is allowed
pub fn validate_quote_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.len() > MAX_SERVICE_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length: MAX_SERVICE_NAME_LENGTH,
            actual_length: value.len(),
        });
    }
    Ok(())
}
