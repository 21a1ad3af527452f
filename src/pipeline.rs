use analytics::{analysis_bounds, rank_impacts, AnalyticsError, ImpactEngine};
use anyhow::{bail, Context};
use api_client::error::ApiError;
use api_client::{CalendarFeed, MarketDataClient, ReleaseCalendarClient};
use chrono::{DateTime, NaiveDate, Utc};
use configuration::{Interval, Settings};
use core_types::{Event, EventSource, ImpactRecord, PriceSeries, WindowConfig};
use events::{EventCalendar, EventsError, FredRequest, DEFAULT_EVENT_TZ};
use indicatif::ProgressStyle;
use tracing::{Instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

pub const NO_EVENTS_MESSAGE: &str = "No events matched categories.";

/// The external services a run talks to. `fred` is `None` when no client could be
/// built (typically a missing API key).
pub struct Sources<'a> {
    pub market: &'a dyn MarketDataClient,
    pub feed: &'a dyn CalendarFeed,
    pub fred: Option<&'a dyn ReleaseCalendarClient>,
}

/// Everything a run produced, for reporting.
#[derive(Debug)]
pub struct ImpactRun {
    pub events: Vec<Event>,
    /// Ranked by event time, then reaction speed.
    pub records: Vec<ImpactRecord>,
    pub skipped_assets: Vec<String>,
    /// (event, asset) pairs without enough bars on one side of the event.
    pub skipped_pairs: usize,
    pub failed_sources: usize,
}

// ==============================================================================
// Orchestration
// ==============================================================================

/// Runs the whole study: calendar, prices, per-pair statistics, ranking.
///
/// An empty calendar is fatal. Failing event sources, assets without data and
/// pairs without enough bars are logged and skipped.
pub async fn run(settings: &Settings, sources: &Sources<'_>, today: NaiveDate) -> anyhow::Result<ImpactRun> {
    let window = settings.analysis.window().context("Invalid analysis window")?;

    let calendar = load_calendar(settings, sources, today).await;
    let failed_sources = calendar.failures().len();
    let events = calendar.finish(true);
    if events.is_empty() {
        bail!(NO_EVENTS_MESSAGE);
    }
    tracing::info!(events = events.len(), "Event calendar ready.");

    let (start, end) = analysis_bounds(&events, &window).context("Event list is empty")?;
    tracing::info!(
        assets = ?settings.analysis.assets,
        from = %start.date_naive(),
        to = %end.date_naive(),
        interval = %settings.analysis.interval,
        "Fetching prices..."
    );
    let (series, skipped_assets) = fetch_prices(
        sources.market,
        &settings.analysis.assets,
        settings.analysis.interval,
        start,
        end,
    )
    .await?;

    let (records, skipped_pairs) = compute_impacts(
        &series,
        &events,
        &window,
        settings.analysis.restrict_to_event_tickers,
    );
    if skipped_pairs > 0 {
        tracing::info!(skipped_pairs, "Some event/asset pairs lacked data around the event.");
    }

    Ok(ImpactRun {
        events,
        records: rank_impacts(records),
        skipped_assets,
        skipped_pairs,
        failed_sources,
    })
}

/// Collects events from every configured source.
pub async fn load_calendar(settings: &Settings, sources: &Sources<'_>, today: NaiveDate) -> EventCalendar {
    let analysis = &settings.analysis;
    let mut calendar = EventCalendar::new();

    calendar.add_builtin(&analysis.categories, analysis.year);

    if let Some(path) = &settings.calendar.events_file {
        calendar.add_file(path, DEFAULT_EVENT_TZ);
    }

    if let Some(url) = &settings.calendar.ics_url {
        calendar
            .add_ics(url, &settings.calendar.ics_category, sources.feed)
            .await;
    }

    if !settings.fred.release_ids.is_empty() {
        match (sources.fred, FredRequest::from_settings(&settings.fred, analysis.year, today)) {
            (Some(client), Ok(request)) => {
                calendar.add_fred(client, &request).await;
            }
            (None, _) => calendar.record_failure(
                EventSource::Fred,
                "fred",
                EventsError::Api(ApiError::MissingApiKey("FRED_API_KEY")),
            ),
            (_, Err(e)) => calendar.record_failure(EventSource::Fred, "fred", e),
        }
    }

    calendar
}

/// Fetches each asset in turn. Assets that fail or come back empty are skipped and
/// returned by name.
pub async fn fetch_prices(
    client: &dyn MarketDataClient,
    assets: &[String],
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<(Vec<PriceSeries>, Vec<String>)> {
    let span = tracing::info_span!("fetch_prices");
    span.pb_set_style(
        &ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    span.pb_set_length(assets.len() as u64);

    let fetched = async move {
        let mut series = Vec::with_capacity(assets.len());
        let mut skipped = Vec::new();

        for asset in assets {
            match client.fetch_series(asset, interval, start, end).await {
                Ok(s) if !s.is_empty() => {
                    tracing::debug!(asset = %asset, bars = s.len(), "Fetched prices.");
                    series.push(s);
                }
                Ok(_) => {
                    tracing::warn!(asset = %asset, "No price data; skipping asset.");
                    skipped.push(asset.clone());
                }
                Err(e) => {
                    tracing::warn!(asset = %asset, error = %e, "Price fetch failed; skipping asset.");
                    skipped.push(asset.clone());
                }
            }
            Span::current().pb_inc(1);
        }

        (series, skipped)
    }
    .instrument(span)
    .await;

    Ok(fetched)
}

/// Analyzes every (asset, event) pair. Returns the records and how many pairs
/// were skipped.
pub fn compute_impacts(
    series: &[PriceSeries],
    events: &[Event],
    window: &WindowConfig,
    restrict_to_event_tickers: bool,
) -> (Vec<ImpactRecord>, usize) {
    let engine = ImpactEngine::new();
    let mut records = Vec::new();
    let mut skipped = 0;

    for s in series {
        for event in events {
            if restrict_to_event_tickers && !event.applies_to(s.asset()) {
                continue;
            }
            match engine.analyze(s.asset(), s, event, window) {
                Ok(record) => records.push(record),
                Err(AnalyticsError::NotEnoughData(reason)) => {
                    tracing::debug!(reason = %reason, "Skipping pair.");
                    skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(asset = s.asset(), event = %event.name, error = %e, "Skipping pair.");
                    skipped += 1;
                }
            }
        }
    }

    (records, skipped)
}
