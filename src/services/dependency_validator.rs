use std::collections::BTreeSet;
use std::ops::Range;
use tracing::{debug, warn};

use crate::models::{
    DependencyConflict, DependencyType, DependencyViolation, Position, Quote, SelectedService,
    ServiceLookup, ValidationMode,
};

/// Add, remove and move rules for selected services; in override mode a
/// failing check is logged and then admitted
pub struct DependencyValidator<'a> {
    lookup: &'a dyn ServiceLookup,
    mode: ValidationMode,
}

impl<'a> DependencyValidator<'a> {
    pub fn new(lookup: &'a dyn ServiceLookup) -> Self {
        Self {
            lookup,
            mode: ValidationMode::Enforce,
        }
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Whether `service_id` may be added to `day`
    pub fn check_add(
        &self,
        quote: &Quote,
        day: usize,
        service_id: &str,
    ) -> Result<(), DependencyViolation> {
        let result = self.evaluate_add(quote, day, service_id);
        self.apply_mode(result, "add")
    }

    /// Whether the entry at `position` may be removed
    pub fn check_remove(
        &self,
        quote: &Quote,
        position: Position,
    ) -> Result<(), DependencyViolation> {
        let result = self.evaluate_remove(quote, position);
        self.apply_mode(result, "remove")
    }

    /// Whether the whole of `day` may be removed
    pub fn check_remove_day(&self, quote: &Quote, day: usize) -> Result<(), DependencyViolation> {
        let result = self.evaluate_remove_day(quote, day);
        self.apply_mode(result, "remove_day")
    }

    /// Whether the entries `block` of `from_day` may move to `to_day`.
    ///
    /// Treated as removing the block from the source day and adding it to the
    /// target day; `same_quote` dependencies are never affected by a move.
    pub fn check_move(
        &self,
        quote: &Quote,
        from_day: usize,
        block: Range<usize>,
        to_day: usize,
    ) -> Result<(), DependencyViolation> {
        if from_day == to_day {
            return Ok(());
        }
        let result = self.evaluate_move(quote, from_day, block, to_day);
        self.apply_mode(result, "move")
    }

    /// Every selected service whose prerequisite is currently missing.
    ///
    /// Non-empty only after edits made in override mode or catalog changes.
    pub fn unsatisfied(&self, quote: &Quote) -> Vec<DependencyConflict> {
        quote
            .entries()
            .filter_map(|(position, entry)| {
                let (prerequisite, scope) = self.lookup.service(&entry.service_id)?.dependency()?;
                let satisfied = match scope {
                    DependencyType::SameDay => quote.contains_on_day(position.day, prerequisite),
                    _ => quote.contains(prerequisite),
                };
                (!satisfied).then(|| self.conflict(entry, position.day, prerequisite, scope))
            })
            .collect()
    }

    fn apply_mode(
        &self,
        result: Result<(), DependencyViolation>,
        operation: &str,
    ) -> Result<(), DependencyViolation> {
        match result {
            Err(violation) if self.mode.is_override() => {
                warn!(
                    operation = operation,
                    violation = %violation,
                    "Dependency check bypassed in override mode"
                );
                Ok(())
            }
            other => other,
        }
    }

    fn evaluate_add(
        &self,
        quote: &Quote,
        day: usize,
        service_id: &str,
    ) -> Result<(), DependencyViolation> {
        let Some(service) = self.lookup.service(service_id) else {
            return Ok(());
        };
        let Some((prerequisite, scope)) = service.dependency() else {
            return Ok(());
        };

        let present = match scope {
            DependencyType::SameDay => quote.contains_on_day(day, prerequisite),
            _ => quote.contains(prerequisite),
        };

        if present {
            debug!(service_id, prerequisite, "Dependency satisfied");
            Ok(())
        } else {
            Err(DependencyViolation::AddBlocked {
                service: service.name.clone(),
                prerequisite: self.lookup.name_of(prerequisite),
                scope,
                day,
            })
        }
    }

    fn evaluate_remove(
        &self,
        quote: &Quote,
        position: Position,
    ) -> Result<(), DependencyViolation> {
        let Some(removed) = quote.entry(position) else {
            return Ok(());
        };
        let removed_id = removed.service_id.as_str();
        let last_on_day = quote.days[position.day].count(removed_id) == 1;
        let last_in_quote = quote.count(removed_id) == 1;

        let conflicts: Vec<DependencyConflict> = quote
            .entries()
            .filter(|(other, _)| *other != position)
            .filter_map(|(other, entry)| {
                let scope = self.depends_on(entry, removed_id)?;
                let orphaned = match scope {
                    DependencyType::SameDay => other.day == position.day && last_on_day,
                    _ => last_in_quote,
                };
                orphaned.then(|| self.conflict(entry, other.day, removed_id, scope))
            })
            .collect();

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(DependencyViolation::RemoveBlocked {
                service: removed.display_name(self.lookup),
                conflicts,
            })
        }
    }

    fn evaluate_remove_day(&self, quote: &Quote, day: usize) -> Result<(), DependencyViolation> {
        let Some(removed_day) = quote.days.get(day) else {
            return Ok(());
        };

        let removed_ids: BTreeSet<&str> = removed_day
            .services
            .iter()
            .map(|entry| entry.service_id.as_str())
            .collect();

        let mut conflicts = Vec::new();
        for removed_id in removed_ids {
            let survives_elsewhere = quote.count(removed_id) > removed_day.count(removed_id);
            if survives_elsewhere {
                continue;
            }
            // same_day dependents elsewhere rely on their own day; only
            // same_quote dependents outside this day are orphaned.
            for (other, entry) in quote.entries().filter(|(p, _)| p.day != day) {
                if self.depends_on(entry, removed_id) == Some(DependencyType::SameQuote) {
                    conflicts.push(self.conflict(
                        entry,
                        other.day,
                        removed_id,
                        DependencyType::SameQuote,
                    ));
                }
            }
        }

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(DependencyViolation::DayRemovalBlocked { day, conflicts })
        }
    }

    fn evaluate_move(
        &self,
        quote: &Quote,
        from_day: usize,
        block: Range<usize>,
        to_day: usize,
    ) -> Result<(), DependencyViolation> {
        let (Some(source), Some(target)) = (quote.days.get(from_day), quote.days.get(to_day))
        else {
            return Ok(());
        };
        let Some(moved) = source.services.get(block.clone()) else {
            return Ok(());
        };
        let in_block = |id: &str| moved.iter().any(|entry| entry.service_id == id);
        let mut conflicts = Vec::new();

        // Leaving the source day.
        let moved_ids: BTreeSet<&str> = moved.iter().map(|e| e.service_id.as_str()).collect();
        for moved_id in moved_ids {
            let moving = moved.iter().filter(|e| e.service_id == moved_id).count();
            if source.count(moved_id) > moving {
                continue;
            }
            for (index, entry) in source.services.iter().enumerate() {
                if block.contains(&index) {
                    continue;
                }
                if self.depends_on(entry, moved_id) == Some(DependencyType::SameDay) {
                    conflicts.push(self.conflict(
                        entry,
                        from_day,
                        moved_id,
                        DependencyType::SameDay,
                    ));
                }
            }
        }

        // Arriving on the target day.
        for entry in moved {
            let Some((prerequisite, DependencyType::SameDay)) = self
                .lookup
                .service(&entry.service_id)
                .and_then(|s| s.dependency())
            else {
                continue;
            };
            if target.count(prerequisite) == 0 && !in_block(prerequisite) {
                conflicts.push(self.conflict(entry, to_day, prerequisite, DependencyType::SameDay));
            }
        }

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(DependencyViolation::MoveBlocked {
                service: moved
                    .first()
                    .map(|e| e.display_name(self.lookup))
                    .unwrap_or_default(),
                from_day,
                to_day,
                conflicts,
            })
        }
    }

    /// Scope of `entry`'s dependency on `prerequisite`, if it has one
    fn depends_on(&self, entry: &SelectedService, prerequisite: &str) -> Option<DependencyType> {
        self.lookup
            .service(&entry.service_id)
            .and_then(|s| s.dependency())
            .and_then(|(id, scope)| (id == prerequisite).then_some(scope))
    }

    fn conflict(
        &self,
        dependent: &SelectedService,
        day: usize,
        prerequisite: &str,
        dependency_type: DependencyType,
    ) -> DependencyConflict {
        DependencyConflict {
            dependent_id: dependent.service_id.clone(),
            dependent_name: dependent.display_name(self.lookup),
            prerequisite_name: self.lookup.name_of(prerequisite),
            day,
            dependency_type,
        }
    }
}
