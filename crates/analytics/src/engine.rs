use crate::error::AnalyticsError;
use chrono::{DateTime, Utc};
use core_types::{Event, ImpactRecord, PriceBar, PriceSeries, WindowConfig};

/// A stateless calculator for the market reaction around a single event.
#[derive(Debug, Default)]
pub struct ImpactEngine {}

impl ImpactEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for measuring one (event, asset) pair.
    ///
    /// # Arguments
    ///
    /// * `asset` - The ticker the series belongs to; copied into the record.
    /// * `series` - Bars for the asset, covering at least the event window.
    /// * `event` - The event to centre the windows on.
    /// * `window` - How far before and after the event to look.
    ///
    /// # Returns
    ///
    /// The `ImpactRecord`, or `AnalyticsError::NotEnoughData` when either side of
    /// the event has no bars.
    pub fn analyze(
        &self,
        asset: &str,
        series: &PriceSeries,
        event: &Event,
        window: &WindowConfig,
    ) -> Result<ImpactRecord, AnalyticsError> {
        let event_time = event.utc_timestamp();
        let (start, end) = window.bounds_around(event_time);

        // Both windows include the bar stamped exactly at the event.
        let pre = series.window(start, event_time);
        let post = series.window(event_time, end);
        if pre.is_empty() || post.is_empty() {
            return Err(AnalyticsError::NotEnoughData(format!(
                "{} around '{}': {} pre-event and {} post-event bars",
                asset,
                event.name,
                pre.len(),
                post.len()
            )));
        }

        let pre_closes = closes(pre)?;
        let post_closes = closes(post)?;

        // Non-empty slices, so first/last exist.
        let first = pre_closes[0];
        let reference = pre_closes[pre_closes.len() - 1];
        let last = post_closes[post_closes.len() - 1];

        let pre_vol = realized_volatility(&pre_closes);
        let post_vol = realized_volatility(&post_closes);
        let vol_change = match (pre_vol, post_vol) {
            (Some(pre), Some(post)) => Some(post - pre),
            _ => None,
        };

        tracing::trace!(asset, event = %event.name, pre = pre.len(), post = post.len(), "Analyzed event window.");

        Ok(ImpactRecord {
            event: event.name.clone(),
            category: event.category.clone(),
            asset: asset.to_string(),
            event_time_utc: event_time,
            pre_return: simple_return(first, reference),
            post_return: simple_return(reference, last),
            pre_vol,
            post_vol,
            vol_change,
            max_drawdown_post: max_drawdown_from(reference, &post_closes),
            reaction_minutes: reaction_minutes(event_time, reference, post),
        })
    }
}

/// The overall time range needed to analyze every event: from the earliest
/// `event - pre` to the latest `event + post`. `None` for an empty event list.
pub fn analysis_bounds(events: &[Event], window: &WindowConfig) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = events.iter().map(|e| window.bounds_around(e.utc_timestamp()).0).min()?;
    let end = events.iter().map(|e| window.bounds_around(e.utc_timestamp()).1).max()?;
    Some((start, end))
}

fn closes(bars: &[PriceBar]) -> Result<Vec<f64>, AnalyticsError> {
    bars.iter()
        .map(|b| {
            let close = b.close_f64();
            if close.is_finite() {
                Ok(close)
            } else {
                Err(AnalyticsError::Calculation(format!("close at {} is not representable", b.timestamp)))
            }
        })
        .collect()
}

/// `to / from - 1`, undefined for a zero base.
pub fn simple_return(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        None
    } else {
        Some(to / from - 1.0)
    }
}

/// Population standard deviation of consecutive log returns. `None` when the
/// closes do not yield a single finite return.
pub fn realized_volatility(closes: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .map(|w| (w[1] / w[0]).ln())
        .filter(|r| r.is_finite())
        .collect();
    if returns.is_empty() {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / n;
    Some(variance.sqrt())
}

/// Largest peak-to-trough fall of the cumulative return `c / reference - 1`.
///
/// The running peak starts at the first value, so the result is `0.0` for a path
/// that never falls back and negative otherwise.
pub fn max_drawdown_from(reference: f64, closes: &[f64]) -> Option<f64> {
    if reference <= 0.0 || closes.is_empty() {
        return None;
    }

    let mut peak = closes[0] / reference - 1.0;
    let mut max_drawdown = 0.0_f64;

    for &close in closes {
        let cumulative = close / reference - 1.0;
        peak = peak.max(cumulative);
        max_drawdown = max_drawdown.min(cumulative - peak);
    }

    Some(max_drawdown)
}

/// Minutes from the event to the post-event bar with the largest absolute move
/// from `reference`. The earliest bar wins a tie.
pub fn reaction_minutes(event_time: DateTime<Utc>, reference: f64, post: &[PriceBar]) -> Option<f64> {
    if reference == 0.0 {
        return None;
    }

    let mut best: Option<(&PriceBar, f64)> = None;
    for bar in post {
        let moved = (bar.close_f64() / reference - 1.0).abs();
        if !moved.is_finite() {
            continue;
        }
        match best {
            Some((_, top)) if moved <= top => {}
            _ => best = Some((bar, moved)),
        }
    }

    best.map(|(bar, _)| (bar.timestamp - event_time).num_seconds() as f64 / 60.0)
}
