use crate::builtin::sample_events;
use crate::dedupe::dedupe_events;
use crate::error::EventsError;
use crate::file::load_events_file;
use crate::fred::{load_events_from_fred, FredRequest};
use crate::ics::load_events_from_ics;
use api_client::{CalendarFeed, ReleaseCalendarClient};
use chrono_tz::Tz;
use core_types::{Event, EventSource};
use std::path::Path;

/// A calendar source that failed to load. The run continues without it.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: EventSource,
    pub location: String,
    pub error: EventsError,
}

/// Collects events from every configured source, remembering which sources failed.
#[derive(Debug, Default)]
pub struct EventCalendar {
    events: Vec<Event>,
    failures: Vec<SourceFailure>,
}

impl EventCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the built-in schedule. Returns how many events were added.
    pub fn add_builtin(&mut self, categories: &[String], year: i32) -> usize {
        let events = sample_events(categories, year);
        self.push(EventSource::BuiltIn, "builtin", Ok(events))
    }

    pub fn add_file(&mut self, path: &Path, default_tz: Tz) -> usize {
        let loaded = load_events_file(path, default_tz);
        self.push(EventSource::File, &path.display().to_string(), loaded)
    }

    pub async fn add_ics(&mut self, source: &str, category: &str, feed: &dyn CalendarFeed) -> usize {
        let loaded = load_events_from_ics(source, category, feed).await;
        self.push(EventSource::Ics, source, loaded)
    }

    pub async fn add_fred(&mut self, client: &dyn ReleaseCalendarClient, request: &FredRequest) -> usize {
        let loaded = load_events_from_fred(client, request).await;
        self.push(EventSource::Fred, "fred", loaded)
    }

    /// Records a source that could not even be set up (e.g. a missing API key).
    pub fn record_failure(&mut self, source: EventSource, location: &str, error: EventsError) {
        tracing::warn!(%source, location, error = %error, "Event source failed; continuing without it.");
        self.failures.push(SourceFailure {
            source,
            location: location.to_string(),
            error,
        });
    }

    pub fn failures(&self) -> &[SourceFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// De-duplicates and orders everything collected so far.
    pub fn finish(self, prefer_fred: bool) -> Vec<Event> {
        dedupe_events(self.events, prefer_fred)
    }

    fn push(&mut self, source: EventSource, location: &str, loaded: Result<Vec<Event>, EventsError>) -> usize {
        match loaded {
            Ok(events) => {
                let count = events.len();
                tracing::info!(%source, location, count, "Loaded events.");
                self.events.extend(events);
                count
            }
            Err(error) => {
                self.record_failure(source, location, error);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::error::ApiError;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use std::collections::BTreeMap;
    use std::io::Write;

    struct OneRelease;

    #[async_trait]
    impl ReleaseCalendarClient for OneRelease {
        async fn release_name(&self, _release_id: u32) -> Result<String, ApiError> {
            Ok("Consumer Price Index".to_string())
        }

        async fn release_dates(
            &self,
            _release_id: u32,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<NaiveDate>, ApiError> {
            Ok(vec![NaiveDate::from_ymd_opt(2025, 1, 14).unwrap()])
        }
    }

    fn cats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn fred_entries_replace_builtin_ones_for_the_same_day() {
        let mut calendar = EventCalendar::new();
        assert_eq!(calendar.add_builtin(&cats(&["cpi"]), 2025), 12);

        let request = FredRequest {
            release_ids: BTreeMap::from([("cpi".to_string(), 10)]),
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            timezone: chrono_tz::America::New_York,
            default_release_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            time_overrides: BTreeMap::new(),
        };
        assert_eq!(calendar.add_fred(&OneRelease, &request).await, 1);

        let events = calendar.finish(true);
        assert_eq!(events.len(), 12);
        assert_eq!(events[0].name, "Consumer Price Index 2025-01-14");
        assert_eq!(events[0].source, EventSource::Fred);
    }

    #[test]
    fn failing_sources_are_recorded_not_fatal() {
        let mut calendar = EventCalendar::new();
        calendar.add_builtin(&cats(&["fomc"]), 2024);
        assert_eq!(calendar.add_file(Path::new("/no/such/events.csv"), chrono_tz::UTC), 0);

        assert_eq!(calendar.len(), 8);
        assert_eq!(calendar.failures().len(), 1);
        assert_eq!(calendar.failures()[0].source, EventSource::File);
    }

    #[test]
    fn file_events_merge_with_builtin() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "name,timestamp,category").unwrap();
        writeln!(file, "FOMC Jan 29,2025-01-29 14:00,fomc").unwrap();
        writeln!(file, "Retail sales,2025-01-16 08:30,retail").unwrap();

        let mut calendar = EventCalendar::new();
        calendar.add_builtin(&cats(&["fomc"]), 2025);
        assert_eq!(calendar.add_file(file.path(), chrono_tz::America::New_York), 2);

        let events = calendar.finish(false);
        // The file copy of the January FOMC collapses into the built-in one.
        assert_eq!(events.len(), 9);
        assert!(events.iter().any(|e| e.category == "retail"));
        assert!(calendar_is_sorted(&events));
    }

    fn calendar_is_sorted(events: &[Event]) -> bool {
        events.windows(2).all(|w| w[0].utc_timestamp() <= w[1].utc_timestamp())
    }
}
