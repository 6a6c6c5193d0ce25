use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::models::{Quote, QuoteResult};
use crate::repositories::QuoteRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub quote_id: String,
    pub title: String,
    pub client_name: String,
    pub location: String,
    pub booked: bool,
    pub start: NaiveDate,
    /// Inclusive
    pub end: NaiveDate,
}

impl CalendarEvent {
    /// The span of a quote's dated days; `None` when no day has a date
    pub fn from_quote(quote: &Quote) -> Option<Self> {
        let (start, end) = quote.date_range()?;
        Some(Self {
            quote_id: quote.id.clone(),
            title: quote.title.clone(),
            client_name: quote.client_name.clone(),
            location: quote.location.clone(),
            booked: quote.booked,
            start,
            end,
        })
    }

    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start <= to && self.end >= from
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// An event placed on a display lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneEvent {
    pub lane: usize,
    pub event: CalendarEvent,
}

/// Assign each event the lowest lane whose previous event ended before it starts.
///
/// Events are placed by start date, longer events first on ties, so two
/// overlapping events never share a lane.
pub fn layout_lanes(events: &[CalendarEvent]) -> Vec<LaneEvent> {
    let mut sorted: Vec<&CalendarEvent> = events.iter().collect();
    sorted.sort_by_key(|e| (e.start, Reverse(e.end), e.quote_id.clone()));

    let mut lane_ends: Vec<NaiveDate> = Vec::new();
    let mut placed = Vec::with_capacity(sorted.len());
    for event in sorted {
        let lane = match lane_ends.iter().position(|end| *end < event.start) {
            Some(lane) => {
                lane_ends[lane] = event.end;
                lane
            }
            None => {
                lane_ends.push(event.end);
                lane_ends.len() - 1
            }
        };
        placed.push(LaneEvent {
            lane,
            event: event.clone(),
        });
    }
    placed
}

pub struct CalendarService {
    repository: Arc<dyn QuoteRepository>,
}

impl CalendarService {
    pub fn new(repository: Arc<dyn QuoteRepository>) -> Self {
        Self { repository }
    }

    /// Events of non-archived quotes overlapping `from..=to`, ordered by start
    #[instrument(skip(self))]
    pub async fn events_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> QuoteResult<Vec<CalendarEvent>> {
        let mut events: Vec<CalendarEvent> = self
            .repository
            .find_all()
            .await?
            .iter()
            .filter(|q| !q.archived)
            .filter_map(CalendarEvent::from_quote)
            .filter(|e| e.overlaps(from, to))
            .collect();
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));

        debug!(count = events.len(), "Calendar events loaded");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Day;
    use crate::repositories::InMemoryQuoteRepository;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    fn event(id: &str, start: NaiveDate, end: NaiveDate) -> CalendarEvent {
        CalendarEvent {
            quote_id: id.to_string(),
            title: id.to_string(),
            client_name: String::new(),
            location: String::new(),
            booked: false,
            start,
            end,
        }
    }

    fn dated_quote(title: &str, dates: &[Option<NaiveDate>]) -> Quote {
        let mut quote = Quote::new(title.to_string());
        quote.days = dates.iter().map(|d| Day::new(*d)).collect();
        quote
    }

    #[test]
    fn test_event_from_quote() {
        let quote = dated_quote("Festival", &[Some(date(7, 1)), None, Some(date(7, 3))]);
        let event = CalendarEvent::from_quote(&quote).unwrap();

        assert_eq!(event.start, date(7, 1));
        assert_eq!(event.end, date(7, 3));
        assert_eq!(event.days(), 3);
        assert!(CalendarEvent::from_quote(&dated_quote("Undated", &[None])).is_none());
    }

    #[test]
    fn test_overlapping_events_get_separate_lanes() {
        let events = vec![
            event("a", date(6, 1), date(6, 3)),
            event("b", date(6, 2), date(6, 2)),
            event("c", date(6, 4), date(6, 5)),
            event("d", date(6, 3), date(6, 4)),
        ];

        let lanes = layout_lanes(&events);
        let lane_of = |id: &str| {
            lanes
                .iter()
                .find(|l| l.event.quote_id == id)
                .map(|l| l.lane)
                .unwrap()
        };

        assert_eq!(lane_of("a"), 0);
        assert_eq!(lane_of("b"), 1);
        assert_eq!(lane_of("d"), 1);
        assert_eq!(lane_of("c"), 0);

        for x in &lanes {
            for y in &lanes {
                if x.event.quote_id != y.event.quote_id && x.lane == y.lane {
                    assert!(!x.event.overlaps(y.event.start, y.event.end));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_events_between_skips_archived_and_undated() {
        let repo = Arc::new(InMemoryQuoteRepository::new());
        let june = dated_quote("June", &[Some(date(6, 10))]);
        let july = dated_quote("July", &[Some(date(7, 10)), Some(date(7, 11))]);
        let mut archived = dated_quote("Archived", &[Some(date(6, 12))]);
        archived.archived = true;
        let undated = dated_quote("Undated", &[None]);
        for quote in [june, july, archived, undated] {
            repo.insert(quote).await.unwrap();
        }

        let service = CalendarService::new(repo);
        let events = service.events_between(date(6, 1), date(6, 30)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "June");

        let boundary = service.events_between(date(7, 11), date(7, 31)).await.unwrap();
        assert_eq!(boundary.len(), 1);
    }
}
