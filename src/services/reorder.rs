use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, warn};

use crate::models::{
    Day, Position, Quote, QuoteError, QuoteResult, SelectedService, ServiceLookup, ValidationMode,
};
use crate::services::DependencyValidator;

/// A drop of the entry at `source` onto the row at `target`.
///
/// `target.index == day length` addresses the end of the day (an empty day
/// has no rows to drop on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub source: Position,
    pub target: Position,
    pub insert_after: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub from_day: usize,
    pub to_day: usize,
    /// New index of the dragged entry in the target day
    pub index: usize,
    /// Number of entries moved (the dragged entry plus its subservices)
    pub moved: usize,
}

impl MoveOutcome {
    pub fn crossed_days(&self) -> bool {
        self.from_day != self.to_day
    }
}

/// Whether `dragged` may be dropped on `target` (`None` = empty space at the end of a day)
pub fn is_valid_drop_target(
    lookup: &dyn ServiceLookup,
    dragged: &SelectedService,
    target: Option<&SelectedService>,
) -> bool {
    let parent = lookup
        .service(&dragged.service_id)
        .filter(|s| s.is_subservice)
        .and_then(|s| s.depends_on.as_deref());

    match (parent, target) {
        (Some(parent), Some(target)) => {
            let sibling = lookup
                .service(&target.service_id)
                .map(|s| s.is_subservice_of(parent))
                .unwrap_or(false);
            let exact_parent =
                target.service_id == parent && !lookup.is_subservice(&target.service_id);
            sibling || exact_parent
        }
        (Some(_), None) => false,
        (None, Some(target)) => !lookup.is_subservice(&target.service_id),
        (None, None) => true,
    }
}

/// Moves a parent together with the run of subservices that follows it
pub struct ReorderEngine<'a> {
    lookup: &'a dyn ServiceLookup,
    mode: ValidationMode,
}

impl<'a> ReorderEngine<'a> {
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

    /// Range of the entry at `index` plus the subservice run that follows it
    pub fn block_range(&self, day: &Day, index: usize) -> Range<usize> {
        let Some(entry) = day.services.get(index) else {
            return index..index;
        };
        if self.lookup.is_subservice(&entry.service_id) {
            return index..index + 1;
        }
        let mut end = index + 1;
        while end < day.services.len() && self.is_child(&day.services[end], &entry.service_id) {
            end += 1;
        }
        index..end
    }

    /// Move the dragged block; on error `quote` is left untouched
    pub fn reorder(&self, quote: &mut Quote, request: ReorderRequest) -> QuoteResult<MoveOutcome> {
        let ReorderRequest {
            source,
            target,
            insert_after,
        } = request;

        let dragged = quote
            .entry(source)
            .ok_or(QuoteError::LineNotFound {
                day: source.day,
                index: source.index,
            })?
            .clone();
        let target_day = quote
            .days
            .get(target.day)
            .ok_or(QuoteError::DayNotFound { day: target.day })?;
        let target_entry = match target_day.services.get(target.index) {
            Some(entry) => Some(entry.clone()),
            None if target.index == target_day.services.len() => None,
            None => {
                return Err(QuoteError::LineNotFound {
                    day: target.day,
                    index: target.index,
                })
            }
        };

        if source == target {
            debug!("Dropped onto itself, nothing to do");
            return Ok(MoveOutcome {
                from_day: source.day,
                to_day: target.day,
                index: source.index,
                moved: 0,
            });
        }

        if !is_valid_drop_target(self.lookup, &dragged, target_entry.as_ref()) {
            let reason = self.invalid_target_reason(&dragged, target_entry.as_ref());
            warn!(
                source_day = source.day,
                source_index = source.index,
                target_day = target.day,
                target_index = target.index,
                reason = %reason,
                "Rejected drop target"
            );
            return Err(QuoteError::InvalidMove { reason });
        }

        let block = self.block_range(&quote.days[source.day], source.index);
        if source.day == target.day && block.contains(&target.index) {
            return Err(QuoteError::InvalidMove {
                reason: format!(
                    "{} cannot be dropped inside its own group",
                    dragged.display_name(self.lookup)
                ),
            });
        }

        if source.day != target.day {
            DependencyValidator::new(self.lookup)
                .with_mode(self.mode)
                .check_move(quote, source.day, block.clone(), target.day)?;
        }

        // Validated; from here on the mutation cannot fail.
        let moved: Vec<SelectedService> = quote.days[source.day]
            .services
            .drain(block.clone())
            .collect();
        let moved_len = moved.len();

        let mut target_index = target.index;
        if source.day == target.day && target.index > block.start {
            target_index -= moved_len;
        }

        let services = &quote.days[target.day].services;
        let insert_at = match &target_entry {
            None => target_index.min(services.len()),
            Some(target_entry) => {
                if self.lookup.is_subservice(&dragged.service_id) {
                    if self.lookup.is_subservice(&target_entry.service_id) {
                        target_index + usize::from(insert_after)
                    } else {
                        // Dropped on the parent: first slot of its group.
                        target_index + 1
                    }
                } else if insert_after {
                    let mut at = target_index + 1;
                    while at < services.len() && self.is_child(&services[at], &target_entry.service_id)
                    {
                        at += 1;
                    }
                    at
                } else {
                    target_index
                }
            }
        };

        quote.days[target.day]
            .services
            .splice(insert_at..insert_at, moved);
        quote.days[source.day].renumber();
        if source.day != target.day {
            quote.days[target.day].renumber();
        }
        quote.touch();

        debug!(
            from_day = source.day,
            to_day = target.day,
            index = insert_at,
            moved = moved_len,
            "Reordered services"
        );

        Ok(MoveOutcome {
            from_day: source.day,
            to_day: target.day,
            index: insert_at,
            moved: moved_len,
        })
    }

    fn is_child(&self, entry: &SelectedService, parent_id: &str) -> bool {
        self.lookup
            .service(&entry.service_id)
            .map(|s| s.is_subservice_of(parent_id))
            .unwrap_or(false)
    }

    fn invalid_target_reason(
        &self,
        dragged: &SelectedService,
        target: Option<&SelectedService>,
    ) -> String {
        let name = dragged.display_name(self.lookup);
        match target {
            _ if self.lookup.is_subservice(&dragged.service_id) => {
                format!("{} can only be reordered within its parent's group", name)
            }
            Some(target) => format!(
                "{} cannot be placed inside the group of {}",
                name,
                target.display_name(self.lookup)
            ),
            None => format!("{} cannot be dropped here", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyType, Service};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn service(id: &str, parent: Option<&str>) -> Service {
        let now = Utc::now();
        Service {
            id: id.to_string(),
            name: id.to_string(),
            price: dec!(100),
            category: "Photo".to_string(),
            description: String::new(),
            is_subservice: parent.is_some(),
            depends_on: parent.map(str::to_string),
            dependency_type: if parent.is_some() {
                DependencyType::SameDay
            } else {
                DependencyType::None
            },
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// photo has subservices p1, p2; video has v1
    fn catalog() -> HashMap<String, Service> {
        [
            service("photo", None),
            service("p1", Some("photo")),
            service("p2", Some("photo")),
            service("video", None),
            service("v1", Some("video")),
            service("album", None),
        ]
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect()
    }

    fn quote(days: &[&[&str]]) -> Quote {
        let mut quote = Quote::new("Test".to_string());
        for ids in days {
            let mut day = Day::new(None);
            day.services = ids
                .iter()
                .map(|id| SelectedService::new(id.to_string(), 1))
                .collect();
            day.renumber();
            quote.days.push(day);
        }
        quote
    }

    fn ids(quote: &Quote, day: usize) -> Vec<&str> {
        quote.days[day]
            .services
            .iter()
            .map(|e| e.service_id.as_str())
            .collect()
    }

    fn request(source: (usize, usize), target: (usize, usize), insert_after: bool) -> ReorderRequest {
        ReorderRequest {
            source: Position::new(source.0, source.1),
            target: Position::new(target.0, target.1),
            insert_after,
        }
    }

    #[test]
    fn test_parent_moves_with_subservices() {
        let lookup = catalog();
        let engine = ReorderEngine::new(&lookup);
        let mut q = quote(&[&["photo", "p1", "p2", "video", "v1", "album"]]);

        let outcome = engine.reorder(&mut q, request((0, 0), (0, 5), true)).unwrap();

        assert_eq!(ids(&q, 0), vec!["video", "v1", "album", "photo", "p1", "p2"]);
        assert_eq!(outcome.moved, 3);
        assert_eq!(outcome.index, 3);
        let sequences: Vec<usize> = q.days[0].services.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_insert_after_parent_skips_its_group() {
        let lookup = catalog();
        let engine = ReorderEngine::new(&lookup);
        let mut q = quote(&[&["album", "photo", "p1", "p2", "video"]]);

        engine.reorder(&mut q, request((0, 0), (0, 1), true)).unwrap();
        assert_eq!(ids(&q, 0), vec!["photo", "p1", "p2", "album", "video"]);

        engine.reorder(&mut q, request((0, 4), (0, 0), false)).unwrap();
        assert_eq!(ids(&q, 0), vec!["video", "photo", "p1", "p2", "album"]);
    }

    #[test]
    fn test_subservice_reorders_within_group() {
        let lookup = catalog();
        let engine = ReorderEngine::new(&lookup);
        let mut q = quote(&[&["photo", "p1", "p2", "video"]]);

        engine.reorder(&mut q, request((0, 2), (0, 1), false)).unwrap();
        assert_eq!(ids(&q, 0), vec!["photo", "p2", "p1", "video"]);

        // Dropping on the parent lands first in the group, even "before" it.
        engine.reorder(&mut q, request((0, 2), (0, 0), false)).unwrap();
        assert_eq!(ids(&q, 0), vec!["photo", "p1", "p2", "video"]);
    }

    #[test]
    fn test_invalid_targets_are_rejected_without_mutation() {
        let lookup = catalog();
        let engine = ReorderEngine::new(&lookup);
        let mut q = quote(&[&["photo", "p1", "video", "v1"]]);
        let before = q.clone();

        // Subservice onto another parent's group.
        let err = engine.reorder(&mut q, request((0, 1), (0, 3), false)).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidMove { .. }));
        // Parent onto a subservice.
        assert!(engine.reorder(&mut q, request((0, 2), (0, 1), true)).is_err());
        // Subservice onto empty space.
        assert!(engine.reorder(&mut q, request((0, 1), (0, 4), false)).is_err());

        assert_eq!(q, before);
    }

    #[test]
    fn test_cross_day_subservice_move_rejected() {
        let lookup = catalog();
        let engine = ReorderEngine::new(&lookup);
        let mut q = quote(&[&["photo", "p1", "p2"], &["video", "v1"]]);
        let before = q.clone();

        // Parent-less target day: dropping p1 next to nothing valid there.
        assert!(engine.reorder(&mut q, request((0, 1), (1, 0), false)).is_err());

        // Parent without its subservices is impossible; the whole block moves.
        let outcome = engine.reorder(&mut q, request((0, 0), (1, 0), false)).unwrap();
        assert!(outcome.crossed_days());
        assert!(ids(&q, 0).is_empty());
        assert_eq!(ids(&q, 1), vec!["photo", "p1", "p2", "video", "v1"]);
        assert_ne!(q, before);
    }

    #[test]
    fn test_cross_day_subservice_joins_parent_instance() {
        let lookup = catalog();
        let engine = ReorderEngine::new(&lookup);
        let mut q = quote(&[&["photo", "p1", "p2"], &["photo"]]);

        engine.reorder(&mut q, request((0, 2), (1, 0), true)).unwrap();
        assert_eq!(ids(&q, 0), vec!["photo", "p1"]);
        assert_eq!(ids(&q, 1), vec!["photo", "p2"]);
    }

    #[test]
    fn test_drop_on_empty_day() {
        let lookup = catalog();
        let engine = ReorderEngine::new(&lookup);
        let mut q = quote(&[&["album", "video", "v1"], &[]]);

        engine.reorder(&mut q, request((0, 1), (1, 0), false)).unwrap();
        assert_eq!(ids(&q, 0), vec!["album"]);
        assert_eq!(ids(&q, 1), vec!["video", "v1"]);
    }

    #[test]
    fn test_same_day_move_into_later_position_adjusts_for_removal() {
        let lookup = catalog();
        let engine = ReorderEngine::new(&lookup);
        let mut q = quote(&[&["video", "v1", "album", "photo"]]);

        engine.reorder(&mut q, request((0, 0), (0, 3), false)).unwrap();
        assert_eq!(ids(&q, 0), vec!["album", "video", "v1", "photo"]);
    }

    #[test]
    fn test_out_of_range_positions() {
        let lookup = catalog();
        let engine = ReorderEngine::new(&lookup);
        let mut q = quote(&[&["photo"]]);

        assert!(matches!(
            engine.reorder(&mut q, request((0, 5), (0, 0), false)),
            Err(QuoteError::LineNotFound { .. })
        ));
        assert!(matches!(
            engine.reorder(&mut q, request((0, 0), (3, 0), false)),
            Err(QuoteError::DayNotFound { .. })
        ));
        assert!(matches!(
            engine.reorder(&mut q, request((0, 0), (0, 9), false)),
            Err(QuoteError::LineNotFound { .. })
        ));
    }
}
