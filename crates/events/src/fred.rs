use crate::error::EventsError;
use crate::timestamp::localize;
use api_client::ReleaseCalendarClient;
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use configuration::FredSettings;
use core_types::{Event, EventSource};
use std::collections::BTreeMap;

/// Which FRED releases to turn into events, over which dates and at what local time.
#[derive(Debug, Clone, PartialEq)]
pub struct FredRequest {
    /// Category name to FRED release id, e.g. `cpi -> 10`.
    pub release_ids: BTreeMap<String, u32>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub timezone: Tz,
    pub default_release_time: NaiveTime,
    pub time_overrides: BTreeMap<String, NaiveTime>,
}

impl FredRequest {
    /// Resolves settings into a concrete request for `year`, relative to `today`.
    pub fn from_settings(settings: &FredSettings, year: i32, today: NaiveDate) -> Result<Self, EventsError> {
        let invalid = |e: configuration::ConfigError| EventsError::InvalidRequest(e.to_string());
        let (start, end) = settings.date_range(year, today).map_err(invalid)?;
        let default_release_time =
            configuration::parse_release_time(&settings.default_release_time).map_err(invalid)?;
        let time_overrides = settings
            .time_overrides
            .keys()
            .map(|category| Ok((category.clone(), settings.release_time_for(category)?)))
            .collect::<Result<BTreeMap<_, _>, configuration::ConfigError>>()
            .map_err(invalid)?;

        Ok(Self {
            release_ids: settings.release_ids.clone(),
            start,
            end,
            timezone: settings.timezone,
            default_release_time,
            time_overrides,
        })
    }

    pub fn release_time_for(&self, category: &str) -> NaiveTime {
        self.time_overrides
            .get(category)
            .copied()
            .unwrap_or(self.default_release_time)
    }
}

/// Turns each configured release's publication dates into events.
///
/// A release whose name cannot be fetched is labelled `FRED <category>`. A release
/// whose dates cannot be fetched is logged and skipped; the others still load.
pub async fn load_events_from_fred(
    client: &dyn ReleaseCalendarClient,
    request: &FredRequest,
) -> Result<Vec<Event>, EventsError> {
    if request.end < request.start {
        return Err(EventsError::InvalidRequest(format!(
            "end date {} is before start date {}",
            request.end, request.start
        )));
    }

    let mut events = Vec::new();

    for (category, &release_id) in &request.release_ids {
        let release_name = match client.release_name(release_id).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(category = %category, release_id, error = %e, "Could not fetch FRED release name.");
                format!("FRED {}", category)
            }
        };

        let dates = match client.release_dates(release_id, request.start, request.end).await {
            Ok(dates) => dates,
            Err(e) => {
                tracing::warn!(category = %category, release_id, error = %e, "Skipping FRED release.");
                continue;
            }
        };

        let time = request.release_time_for(category);
        for date in dates.into_iter().filter(|d| *d >= request.start && *d <= request.end) {
            let timestamp = match localize(date.and_time(time), request.timezone) {
                Ok(ts) => ts,
                Err(e) => {
                    tracing::warn!(category = %category, %date, error = %e, "Skipping FRED release date.");
                    continue;
                }
            };
            events.push(
                Event::new(format!("{} {}", release_name, date), category.as_str(), timestamp, EventSource::Fred)
                    .with_metadata("source", "fred")
                    .with_metadata("release_id", release_id.to_string())
                    .with_metadata("release_name", release_name.clone()),
            );
        }
        tracing::debug!(category = %category, release_id, "Loaded FRED release dates.");
    }

    Ok(events)
}
