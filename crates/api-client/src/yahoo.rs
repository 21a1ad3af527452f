use crate::error::ApiError;
use crate::responses::ChartResponse;
use crate::MarketDataClient;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use configuration::{Interval, MarketDataSettings};
use core_types::{PriceBar, PriceSeries};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;

/// Yahoo Finance chart API client.
///
/// Yahoo only serves a bounded history per interval and rejects long intraday
/// lookbacks, so a request is expressed as a `range` and retried with smaller
/// ranges until one returns bars.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(settings: &MarketDataSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_range(
        &self,
        ticker: &str,
        interval: Interval,
        range: &str,
    ) -> Result<Vec<PriceBar>, ApiError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("range", range),
                ("interval", interval.as_str()),
                ("includePrePost", "false"),
            ])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        // Yahoo reports most failures inside a JSON body, often with a 4xx status.
        match parse_chart_response(&text) {
            Ok(bars) => Ok(bars),
            Err(e) if status.is_success() => Err(e),
            Err(ApiError::ApiError(msg)) => Err(ApiError::ApiError(msg)),
            Err(_) => Err(ApiError::Status {
                status: status.as_u16(),
                url,
            }),
        }
    }
}

#[async_trait]
impl MarketDataClient for YahooClient {
    async fn fetch_series(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, ApiError> {
        let lookback_days = (Utc::now() - start).num_days().max(1);
        let ranges = candidate_ranges(lookback_days, interval.is_intraday());
        let bars = fetch_with_fallback(ticker, &ranges, |range| self.fetch_range(ticker, interval, range)).await?;

        Ok(PriceSeries::new(ticker, interval.as_str(), bars).restrict(start, end))
    }
}

/// Tries each range in order and returns the first non-empty set of bars.
///
/// If no range produced bars, the last error is returned; when every range merely
/// came back empty the result is an empty `Vec`.
pub async fn fetch_with_fallback<F, Fut>(
    ticker: &str,
    ranges: &[&'static str],
    mut fetch: F,
) -> Result<Vec<PriceBar>, ApiError>
where
    F: FnMut(&'static str) -> Fut,
    Fut: Future<Output = Result<Vec<PriceBar>, ApiError>>,
{
    let mut last_err = None;

    for &range in ranges {
        match fetch(range).await {
            Ok(fetched) if !fetched.is_empty() => {
                tracing::debug!(ticker, range, bars = fetched.len(), "Fetched price history.");
                return Ok(fetched);
            }
            Ok(_) => {
                tracing::debug!(ticker, range, "Empty price history, trying a shorter range.");
            }
            Err(e) => {
                tracing::debug!(ticker, range, error = %e, "Range rejected, trying a shorter range.");
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(e) => Err(e),
        None => Ok(Vec::new()),
    }
}

/// The ordered list of `range` values to try for a lookback of `lookback_days`.
///
/// The first entry is the smallest range covering the lookback; the rest are the
/// fallbacks in decreasing size, without repeats.
pub fn candidate_ranges(lookback_days: i64, intraday: bool) -> Vec<&'static str> {
    let (first, fallbacks): (&'static str, &[&'static str]) = if intraday {
        let first = match lookback_days {
            d if d <= 30 => "60d",
            d if d <= 90 => "6mo",
            d if d <= 365 => "1y",
            // Yahoo caps intraday history at roughly two years.
            _ => "2y",
        };
        (first, &["1y", "6mo", "3mo", "60d", "30d"])
    } else {
        let first = match lookback_days {
            d if d <= 30 => "3mo",
            d if d <= 90 => "6mo",
            d if d <= 200 => "1y",
            d if d <= 400 => "2y",
            d if d <= 1200 => "5y",
            _ => "10y",
        };
        (first, &["2y", "1y", "6mo", "3mo"])
    };

    let mut ranges = vec![first];
    ranges.extend(fallbacks.iter().copied().filter(|r| *r != first));
    ranges
}

/// Converts a chart API body into bars. Bars without a close are dropped; missing
/// open/high/low fall back to the close and missing volume to zero.
pub fn parse_chart_response(body: &str) -> Result<Vec<PriceBar>, ApiError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;

    if let Some(err) = response.chart.error {
        return Err(ApiError::ApiError(format!("{}: {}", err.code, err.description)));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let timestamps = result.timestamp.unwrap_or_default();
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let column = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();
    let mut bars = Vec::with_capacity(timestamps.len());

    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = column(&quote.close, i).and_then(to_decimal) else {
            continue;
        };
        let timestamp = Utc
            .timestamp_opt(ts, 0)
            .single()
            .ok_or_else(|| ApiError::InvalidData(format!("Invalid timestamp: {}", ts)))?;
        let price = |values: &[Option<f64>]| column(values, i).and_then(to_decimal).unwrap_or(close);

        bars.push(PriceBar {
            timestamp,
            open: price(&quote.open),
            high: price(&quote.high),
            low: price(&quote.low),
            close,
            volume: column(&quote.volume, i).and_then(to_decimal).unwrap_or(Decimal::ZERO),
        });
    }

    Ok(bars)
}

fn to_decimal(value: f64) -> Option<Decimal> {
    if value.is_finite() {
        Decimal::from_f64(value)
    } else {
        None
    }
}
