use api_client::error::ApiError;
use api_client::{CalendarFeed, MarketDataClient, ReleaseCalendarClient};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use configuration::{Interval, Settings};
use core_types::{EventSource, PriceBar, PriceSeries};
use event_impact::pipeline::{self, load_calendar};
use event_impact::{report, Sources, NO_EVENTS_MESSAGE};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Mutex;

// ==============================================================================
// In-memory sources
// ==============================================================================

/// Hourly bars across the requested range with a saw-tooth close. `BAD` errors
/// and `EMPTY` has no data.
#[derive(Default)]
struct SyntheticMarket {
    requests: Mutex<Vec<String>>,
}

#[async_trait]
impl MarketDataClient for SyntheticMarket {
    async fn fetch_series(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, ApiError> {
        self.requests.lock().unwrap().push(ticker.to_string());
        match ticker {
            "BAD" => return Err(ApiError::ApiError("Not Found: No data found".to_string())),
            "EMPTY" => return Ok(PriceSeries::empty(ticker, interval.as_str())),
            _ => {}
        }

        let mut bars = Vec::new();
        let mut ts = start;
        let mut i: i64 = 0;
        while ts <= end {
            let close = dec!(100) + Decimal::from(i % 7);
            bars.push(PriceBar {
                timestamp: ts,
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1000),
            });
            ts += Duration::hours(1);
            i += 1;
        }
        Ok(PriceSeries::new(ticker, interval.as_str(), bars))
    }
}

struct StaticFeed;

#[async_trait]
impl CalendarFeed for StaticFeed {
    async fn fetch_calendar(&self, _url: &str) -> Result<String, ApiError> {
        Ok("BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20250207T133000Z\r\n\
SUMMARY:Employment Situation\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n"
            .to_string())
    }
}

struct FailingFeed;

#[async_trait]
impl CalendarFeed for FailingFeed {
    async fn fetch_calendar(&self, url: &str) -> Result<String, ApiError> {
        Err(ApiError::Status {
            status: 503,
            url: url.to_string(),
        })
    }
}

struct CpiReleases;

#[async_trait]
impl ReleaseCalendarClient for CpiReleases {
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

fn settings(assets: &[&str], categories: &[&str]) -> Settings {
    let mut settings = Settings::default();
    settings.analysis.assets = assets.iter().map(|s| s.to_string()).collect();
    settings.analysis.categories = categories.iter().map(|s| s.to_string()).collect();
    settings.analysis.year = 2025;
    settings.analysis.interval = Interval::Hour1;
    settings
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

// ==============================================================================
// Tests
// ==============================================================================

#[tokio::test]
async fn runs_every_asset_against_every_event() {
    let market = SyntheticMarket::default();
    let sources = Sources {
        market: &market,
        feed: &StaticFeed,
        fred: None,
    };
    let run = pipeline::run(&settings(&["SPY", "BAD", "EMPTY", "TLT"], &["cpi"]), &sources, today())
        .await
        .unwrap();

    assert_eq!(run.events.len(), 12);
    assert_eq!(run.records.len(), 24);
    assert_eq!(run.skipped_assets, vec!["BAD".to_string(), "EMPTY".to_string()]);
    assert_eq!(run.skipped_pairs, 0);
    assert_eq!(*market.requests.lock().unwrap(), vec!["SPY", "BAD", "EMPTY", "TLT"]);

    // Ranked by event time; every record is fully defined on synthetic data.
    assert!(run.records.windows(2).all(|w| w[0].event_time_utc <= w[1].event_time_utc));
    assert!(run.records.iter().all(|r| r.post_return.is_some() && r.reaction_minutes.is_some()));
    assert_eq!(run.records[0].event, "US CPI Jan 2025");
}

#[tokio::test]
async fn empty_calendar_is_fatal() {
    let market = SyntheticMarket::default();
    let sources = Sources {
        market: &market,
        feed: &StaticFeed,
        fred: None,
    };
    let err = pipeline::run(&settings(&["SPY"], &["gdp"]), &sources, today())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), NO_EVENTS_MESSAGE);
    assert!(market.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn event_tickers_can_restrict_pairing() {
    let market = SyntheticMarket::default();
    let sources = Sources {
        market: &market,
        feed: &StaticFeed,
        fred: None,
    };
    let mut cfg = settings(&["AAPL", "SPY"], &["earnings"]);

    let all = pipeline::run(&cfg, &sources, today()).await.unwrap();
    assert_eq!(all.records.len(), 8);

    cfg.analysis.restrict_to_event_tickers = true;
    let restricted = pipeline::run(&cfg, &sources, today()).await.unwrap();
    assert_eq!(restricted.records.len(), 1);
    assert_eq!(restricted.records[0].asset, "AAPL");
    assert_eq!(restricted.records[0].event, "AAPL FY25 Q1");
}

#[tokio::test]
async fn merges_file_ics_and_fred_sources() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "name,category,timestamp,tickers").unwrap();
    writeln!(file, "Retail sales,retail,2025-01-16 08:30,").unwrap();

    let mut cfg = settings(&["SPY"], &["cpi"]);
    cfg.calendar.events_file = Some(file.path().to_path_buf());
    cfg.calendar.ics_url = Some("https://calendar.example.org/bls.ics".to_string());
    cfg.fred.release_ids = BTreeMap::from([("cpi".to_string(), 10)]);

    let market = SyntheticMarket::default();
    let sources = Sources {
        market: &market,
        feed: &StaticFeed,
        fred: Some(&CpiReleases),
    };
    let calendar = load_calendar(&cfg, &sources, today()).await;
    assert!(calendar.failures().is_empty());

    let events = calendar.finish(true);
    // 12 built-in CPI prints, minus January replaced by FRED, plus FRED, file and ICS.
    assert_eq!(events.len(), 12 - 1 + 1 + 1 + 1);
    assert!(events.iter().any(|e| e.source == EventSource::Ics && e.category == "macro"));
    assert!(events.iter().any(|e| e.source == EventSource::File && e.name == "Retail sales"));
    assert!(!events.iter().any(|e| e.name == "US CPI Jan 2025"));
}

#[tokio::test]
async fn failing_optional_sources_do_not_stop_the_run() {
    let mut cfg = settings(&["SPY"], &["fomc"]);
    cfg.calendar.ics_url = Some("https://calendar.example.org/down.ics".to_string());
    cfg.fred.release_ids = BTreeMap::from([("cpi".to_string(), 10)]);

    let market = SyntheticMarket::default();
    let sources = Sources {
        market: &market,
        feed: &FailingFeed,
        fred: None,
    };
    let run = pipeline::run(&cfg, &sources, today()).await.unwrap();
    assert_eq!(run.failed_sources, 2);
    assert_eq!(run.events.len(), 8);
    assert_eq!(run.records.len(), 8);
}

#[tokio::test]
async fn results_export_to_csv_and_json() {
    let market = SyntheticMarket::default();
    let sources = Sources {
        market: &market,
        feed: &StaticFeed,
        fred: None,
    };
    let run = pipeline::run(&settings(&["SPY"], &["fomc"]), &sources, today())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut output = configuration::OutputSettings::default();
    output.csv = Some(dir.path().join("out/impacts.csv"));
    output.json = Some(dir.path().join("out/impacts.json"));
    output.summary = true;
    report::emit(&run.records, &output).unwrap();

    let csv = std::fs::read_to_string(dir.path().join("out/impacts.csv")).unwrap();
    assert_eq!(csv.lines().count(), 1 + 8);
    assert!(csv.starts_with("event,category,asset,post_return,vol_change,max_drawdown_post,reaction_minutes"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("out/impacts.json")).unwrap()).unwrap();
    assert_eq!(json.as_array().map(Vec::len), Some(8));
}
