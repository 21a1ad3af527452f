use crate::enums::EventSource;
use crate::error::CoreError;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==============================================================================
// Event
// ==============================================================================

/// A scheduled macro or micro event such as a CPI print, an FOMC statement or an
/// earnings release.
///
/// The timestamp keeps the offset it was loaded with; all comparisons against
/// price data go through [`Event::utc_timestamp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub category: String,
    pub timestamp: DateTime<FixedOffset>,
    /// Tickers the event is specific to (e.g. earnings). Empty for macro events.
    #[serde(default)]
    pub tickers: Vec<String>,
    pub source: EventSource,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
        source: EventSource,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            timestamp,
            tickers: Vec::new(),
            source,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_tickers(mut self, tickers: Vec<String>) -> Self {
        self.tickers = tickers;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The event timestamp converted to UTC.
    pub fn utc_timestamp(&self) -> DateTime<Utc> {
        self.timestamp.with_timezone(&Utc)
    }

    /// The identity used for de-duplication: two events with the same name at the
    /// same instant are the same event, regardless of the offset they were written in.
    pub fn dedupe_key(&self) -> (String, DateTime<Utc>) {
        (self.name.clone(), self.utc_timestamp())
    }

    /// Whether this event should be paired with `asset`. Events without tickers apply
    /// to every asset.
    pub fn applies_to(&self, asset: &str) -> bool {
        self.tickers.is_empty() || self.tickers.iter().any(|t| t.eq_ignore_ascii_case(asset))
    }
}

// ==============================================================================
// Price data
// ==============================================================================

/// A single OHLCV bar, stamped with its open time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl PriceBar {
    /// The close as `f64`, for the statistics that need logs and square roots.
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(f64::NAN)
    }
}

/// An ordered, read-only series of bars for one asset at one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    asset: String,
    interval: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Builds a series, sorting the bars by timestamp and keeping only the first bar
    /// for any repeated timestamp.
    pub fn new(asset: impl Into<String>, interval: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self {
            asset: asset.into(),
            interval: interval.into(),
            bars,
        }
    }

    pub fn empty(asset: impl Into<String>, interval: impl Into<String>) -> Self {
        Self::new(asset, interval, Vec::new())
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// All bars with `start <= timestamp <= end`.
    pub fn window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[PriceBar] {
        if end < start {
            return &[];
        }
        let lo = self.bars.partition_point(|b| b.timestamp < start);
        let hi = self.bars.partition_point(|b| b.timestamp <= end);
        &self.bars[lo..hi]
    }

    /// Consumes the series and keeps only the bars inside `[start, end]`.
    pub fn restrict(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let bars = self.window(start, end).to_vec();
        Self { bars, ..self }
    }
}

// ==============================================================================
// Windows and results
// ==============================================================================

/// How far before and after an event the analysis looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub pre: Duration,
    pub post: Duration,
}

impl WindowConfig {
    /// The widest window accepted on either side of an event.
    pub const MAX_SPAN_DAYS: i64 = 3650;

    pub fn new(pre: Duration, post: Duration) -> Result<Self, CoreError> {
        for (label, span) in [("pre window", pre), ("post window", post)] {
            if span <= Duration::zero() {
                return Err(CoreError::InvalidInput(label.into(), "must be positive".into()));
            }
            if span > Duration::days(Self::MAX_SPAN_DAYS) {
                return Err(CoreError::InvalidInput(
                    label.into(),
                    format!("must not exceed {} days", Self::MAX_SPAN_DAYS),
                ));
            }
        }
        Ok(Self { pre, post })
    }

    /// 24 hours either side, suited to hourly and finer bars.
    pub fn intraday_default() -> Self {
        Self {
            pre: Duration::hours(24),
            post: Duration::hours(24),
        }
    }

    /// Five days either side, suited to daily bars.
    pub fn daily_default() -> Self {
        Self {
            pre: Duration::days(5),
            post: Duration::days(5),
        }
    }

    /// Returns `(event - pre, event + post)`, clamped to the representable range.
    pub fn bounds_around(&self, event_time: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = event_time
            .checked_sub_signed(self.pre)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = event_time
            .checked_add_signed(self.post)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        (start, end)
    }
}

/// The measured market reaction of one asset to one event.
///
/// Metrics that are undefined for the data at hand (a zero reference price, a
/// window too short to produce a return) are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactRecord {
    pub event: String,
    pub category: String,
    pub asset: String,
    pub event_time_utc: DateTime<Utc>,
    pub pre_return: Option<f64>,
    pub post_return: Option<f64>,
    pub pre_vol: Option<f64>,
    pub post_vol: Option<f64>,
    pub vol_change: Option<f64>,
    pub max_drawdown_post: Option<f64>,
    pub reaction_minutes: Option<f64>,
}
