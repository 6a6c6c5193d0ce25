use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scope in which a service's prerequisite must be present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    SameDay,
    SameQuote,
    #[default]
    None,
}

impl DependencyType {
    /// Human-readable scope used in validation messages
    pub fn scope_label(&self) -> &'static str {
        match self {
            DependencyType::SameDay => "the same day",
            DependencyType::SameQuote => "the same quote",
            DependencyType::None => "no scope",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyType::SameDay => write!(f, "same_day"),
            DependencyType::SameQuote => write!(f, "same_quote"),
            DependencyType::None => write!(f, "none"),
        }
    }
}

impl FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "same_day" => Ok(DependencyType::SameDay),
            "same_quote" => Ok(DependencyType::SameQuote),
            "none" | "" => Ok(DependencyType::None),
            _ => Err(format!("Invalid dependency type: {}", s)),
        }
    }
}

/// How a per-service discount value is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    #[default]
    Percentage,
    Fixed,
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::Fixed => write!(f, "fixed"),
        }
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            _ => Err(format!("Invalid discount type: {}", s)),
        }
    }
}

/// Whether dependency checks are enforced or bypassed by staff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Enforce,
    Override,
}

impl ValidationMode {
    pub fn is_override(&self) -> bool {
        matches!(self, ValidationMode::Override)
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationMode::Enforce => write!(f, "enforce"),
            ValidationMode::Override => write!(f, "override"),
        }
    }
}
