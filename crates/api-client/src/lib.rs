use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use configuration::Interval;
use core_types::PriceSeries;

pub mod error;
pub mod feed;
pub mod fred;
pub mod responses;
pub mod yahoo;

// --- Public API ---
pub use feed::HttpCalendarFeed;
pub use fred::FredClient;
pub use yahoo::YahooClient;

/// The abstract interface for a historical market-data source.
/// The pipeline only talks to this trait, so the concrete provider (or an
/// in-memory fake in tests) can be swapped out.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetches bars for `ticker` and returns those inside `[start, end]`, sorted.
    /// An empty series means the provider had no data for the range.
    async fn fetch_series(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, ApiError>;
}

/// A source of scheduled statistical release dates.
#[async_trait]
pub trait ReleaseCalendarClient: Send + Sync {
    /// The human-readable name of a release.
    async fn release_name(&self, release_id: u32) -> Result<String, ApiError>;

    /// Release dates within `[start, end]`, ascending.
    async fn release_dates(
        &self,
        release_id: u32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, ApiError>;
}

/// Retrieves the raw text of an iCalendar feed.
#[async_trait]
pub trait CalendarFeed: Send + Sync {
    async fn fetch_calendar(&self, url: &str) -> Result<String, ApiError>;
}
