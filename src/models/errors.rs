use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::DependencyType;

/// A selected service whose dependency would be left unsatisfied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConflict {
    pub dependent_id: String,
    pub dependent_name: String,
    pub prerequisite_name: String,
    /// Zero-based day index of the dependent entry
    pub day: usize,
    pub dependency_type: DependencyType,
}

impl fmt::Display for DependencyConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (day {}) requires {} on {}",
            self.dependent_name,
            self.day + 1,
            self.prerequisite_name,
            self.dependency_type.scope_label()
        )
    }
}

fn join_conflicts(conflicts: &[DependencyConflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Dependency rule violations raised by add, remove, day-removal and move checks
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DependencyViolation {
    #[error("{service} requires {prerequisite} to be selected on {} (day {})", .scope.scope_label(), .day + 1)]
    AddBlocked {
        service: String,
        prerequisite: String,
        scope: DependencyType,
        day: usize,
    },

    #[error("Cannot remove {service}: {}", join_conflicts(.conflicts))]
    RemoveBlocked {
        service: String,
        conflicts: Vec<DependencyConflict>,
    },

    #[error("Cannot remove day {}: {}", .day + 1, join_conflicts(.conflicts))]
    DayRemovalBlocked {
        day: usize,
        conflicts: Vec<DependencyConflict>,
    },

    #[error("Cannot move {service} from day {} to day {}: {}", .from_day + 1, .to_day + 1, join_conflicts(.conflicts))]
    MoveBlocked {
        service: String,
        from_day: usize,
        to_day: usize,
        conflicts: Vec<DependencyConflict>,
    },
}

impl DependencyViolation {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            DependencyViolation::AddBlocked { .. } => "add",
            DependencyViolation::RemoveBlocked { .. } => "remove",
            DependencyViolation::DayRemovalBlocked { .. } => "remove_day",
            DependencyViolation::MoveBlocked { .. } => "move",
        }
    }

    /// Every conflict carried by the violation
    pub fn conflicts(&self) -> &[DependencyConflict] {
        match self {
            DependencyViolation::AddBlocked { .. } => &[],
            DependencyViolation::RemoveBlocked { conflicts, .. }
            | DependencyViolation::DayRemovalBlocked { conflicts, .. }
            | DependencyViolation::MoveBlocked { conflicts, .. } => conflicts,
        }
    }
}

/// Service-level errors raised by quote and catalog operations
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Service not found: {id}")]
    ServiceNotFound { id: String },

    #[error("Day not found: {day}")]
    DayNotFound { day: usize },

    #[error("Selected service not found: day={day}, index={index}")]
    LineNotFound { day: usize, index: usize },

    #[error("Markup not found: {index}")]
    MarkupNotFound { index: usize },

    #[error("Quote not found: {id}")]
    QuoteNotFound { id: String },

    #[error("Dependency violation: {0}")]
    Dependency(#[from] DependencyViolation),

    #[error("Invalid move: {reason}")]
    InvalidMove { reason: String },

    #[error("Service {id} is required by: {}", .dependents.join(", "))]
    DependentsExist { id: String, dependents: Vec<String> },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },
}

impl QuoteError {
    /// Whether the error came from a dependency rule rather than bad input
    pub fn is_dependency_violation(&self) -> bool {
        matches!(self, QuoteError::Dependency(_))
    }
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Item not found")]
    NotFound,

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Backing store unavailable: {message}")]
    Unavailable { message: String },
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field too long: {field}, max_length={max_length}, actual_length={actual_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<ValidationError> for QuoteError {
    fn from(err: ValidationError) -> Self {
        QuoteError::ValidationError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for quote and catalog operations
pub type QuoteResult<T> = Result<T, QuoteError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(name: &str, day: usize, dependency_type: DependencyType) -> DependencyConflict {
        DependencyConflict {
            dependent_id: format!("id-{}", name),
            dependent_name: name.to_string(),
            prerequisite_name: "Photography".to_string(),
            day,
            dependency_type,
        }
    }

    #[test]
    fn test_error_display() {
        let error = QuoteError::ServiceNotFound {
            id: "S001".to_string(),
        };
        assert_eq!(error.to_string(), "Service not found: S001");

        let violation = DependencyViolation::AddBlocked {
            service: "Second Shooter".to_string(),
            prerequisite: "Photography".to_string(),
            scope: DependencyType::SameDay,
            day: 1,
        };
        assert_eq!(
            violation.to_string(),
            "Second Shooter requires Photography to be selected on the same day (day 2)"
        );
    }

    #[test]
    fn test_remove_blocked_lists_every_conflict() {
        let violation = DependencyViolation::RemoveBlocked {
            service: "Photography".to_string(),
            conflicts: vec![
                conflict("Second Shooter", 0, DependencyType::SameDay),
                conflict("Album", 2, DependencyType::SameQuote),
            ],
        };

        let message = violation.to_string();
        assert!(message.contains("Second Shooter (day 1) requires Photography on the same day"));
        assert!(message.contains("Album (day 3) requires Photography on the same quote"));
        assert_eq!(violation.kind(), "remove");
        assert_eq!(violation.conflicts().len(), 2);
    }

    #[test]
    fn test_error_conversion() {
        let validation_error = ValidationError::InvalidValue {
            field: "price".to_string(),
            value: "-10".to_string(),
            reason: "Price cannot be negative".to_string(),
        };

        let quote_error: QuoteError = validation_error.into();
        match quote_error {
            QuoteError::ValidationError { message } => {
                assert!(message.contains("Invalid field value"));
            }
            _ => panic!("Expected ValidationError conversion"),
        }

        let dependency: QuoteError = DependencyViolation::DayRemovalBlocked {
            day: 0,
            conflicts: vec![],
        }
        .into();
        assert!(dependency.is_dependency_violation());
    }

    #[test]
    fn test_repository_error_from_serde() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_error.is_err());

        let repo_error: RepositoryError = json_error.unwrap_err().into();
        match repo_error {
            RepositoryError::Serialization { .. } => {}
            _ => panic!("Expected Serialization error"),
        }
    }
}
