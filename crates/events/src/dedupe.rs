use crate::timestamp::DEFAULT_EVENT_TZ;
use chrono::NaiveDate;
use core_types::Event;
use itertools::Itertools;
use std::collections::HashSet;

/// Removes duplicate events and returns the rest in chronological order.
///
/// Two events are duplicates when they share a name and the same UTC instant; the
/// first one seen is kept. With `prefer_fred`, any non-FRED event whose category and
/// New York calendar day are covered by a FRED event is also dropped, so an official
/// release date replaces a hand-maintained entry for the same print.
pub fn dedupe_events(events: Vec<Event>, prefer_fred: bool) -> Vec<Event> {
    let mut unique: Vec<Event> = events.into_iter().unique_by(Event::dedupe_key).collect();

    if prefer_fred {
        let covered: HashSet<(String, NaiveDate)> = unique
            .iter()
            .filter(|e| e.source.is_fred())
            .map(day_key)
            .collect();
        if !covered.is_empty() {
            let before = unique.len();
            unique.retain(|e| e.source.is_fred() || !covered.contains(&day_key(e)));
            tracing::debug!(dropped = before - unique.len(), "Replaced events covered by FRED releases.");
        }
    }

    unique.sort_by(|a, b| {
        a.utc_timestamp()
            .cmp(&b.utc_timestamp())
            .then_with(|| a.name.cmp(&b.name))
    });
    unique
}

/// Days are compared in New York time whatever offset the source stored.
fn day_key(event: &Event) -> (String, NaiveDate) {
    let day = event.timestamp.with_timezone(&DEFAULT_EVENT_TZ).date_naive();
    (event.category.to_lowercase(), day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::EventSource;

    fn event(name: &str, category: &str, rfc3339: &str, source: EventSource) -> Event {
        Event::new(
            name,
            category,
            chrono::DateTime::parse_from_rfc3339(rfc3339).unwrap(),
            source,
        )
    }

    #[test]
    fn same_name_and_instant_is_one_event() {
        let a = event("US CPI Jan 2025", "cpi", "2025-01-14T08:30:00-05:00", EventSource::BuiltIn);
        let b = event("US CPI Jan 2025", "cpi", "2025-01-14T13:30:00Z", EventSource::File);
        let out = dedupe_events(vec![a, b], false);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, EventSource::BuiltIn);
    }

    #[test]
    fn distinct_names_at_same_time_are_kept() {
        let a = event("AAPL FY25 Q1", "earnings", "2025-01-30T16:00:00-05:00", EventSource::BuiltIn);
        let b = event("MSFT FY25 Q2", "earnings", "2025-01-30T16:00:00-05:00", EventSource::BuiltIn);
        assert_eq!(dedupe_events(vec![b, a], false).len(), 2);
    }

    #[test]
    fn output_is_chronological_then_by_name() {
        let late = event("B", "x", "2025-02-01T00:00:00Z", EventSource::File);
        let early_b = event("B", "x", "2025-01-01T00:00:00Z", EventSource::File);
        let early_a = event("A", "x", "2025-01-01T00:00:00Z", EventSource::File);
        let out = dedupe_events(vec![late.clone(), early_b, early_a], false);
        let names: Vec<_> = out.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "B"]);
        assert_eq!(out[2], late);
    }

    #[test]
    fn fred_replaces_same_day_entries_in_its_category() {
        let builtin = event("US CPI Jan 2025", "cpi", "2025-01-15T08:30:00-05:00", EventSource::BuiltIn);
        let fred = event("Consumer Price Index 2025-01-15", "cpi", "2025-01-15T08:30:00-05:00", EventSource::Fred);
        let fomc = event("FOMC Jan 15", "fomc", "2025-01-15T14:00:00-05:00", EventSource::BuiltIn);

        let kept = dedupe_events(vec![builtin.clone(), fred.clone(), fomc.clone()], true);
        assert_eq!(kept, vec![fred.clone(), fomc.clone()]);

        let all = dedupe_events(vec![builtin, fred, fomc], false);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn fred_days_use_the_event_local_date() {
        // 20:00 New York on the 14th is already the 15th in UTC.
        let evening = event("Late CPI", "cpi", "2025-01-14T20:00:00-05:00", EventSource::File);
        let fred = event("CPI 2025-01-15", "cpi", "2025-01-15T08:30:00-05:00", EventSource::Fred);
        assert_eq!(dedupe_events(vec![evening, fred], true).len(), 2);
    }

    #[test]
    fn utc_stamped_events_are_compared_on_the_new_york_day() {
        let fred = event("CPI 2025-01-14", "cpi", "2025-01-14T08:30:00-05:00", EventSource::Fred);
        // 01:00 UTC on the 15th is still the evening of the 14th in New York.
        let ics_evening = event("CPI webcast", "cpi", "2025-01-15T01:00:00Z", EventSource::Ics);
        let kept = dedupe_events(vec![fred.clone(), ics_evening], true);
        assert_eq!(kept, vec![fred.clone()]);

        let ics_next_day = event("CPI follow-up", "cpi", "2025-01-15T13:30:00Z", EventSource::Ics);
        assert_eq!(dedupe_events(vec![fred, ics_next_day], true).len(), 2);
    }
}
