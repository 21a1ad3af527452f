use chrono::{DateTime, FixedOffset, TimeZone};
use core_types::{Event, EventSource};

use crate::timestamp::DEFAULT_EVENT_TZ;

// ==============================================================================
// Published schedules
// ==============================================================================

// (month, day) of each CPI release. All at 08:30 New York time.
static CPI_2024: [(u32, u32); 12] = [
    (1, 11), (2, 13), (3, 12), (4, 10), (5, 15), (6, 12),
    (7, 11), (8, 14), (9, 11), (10, 10), (11, 13), (12, 11),
];
static CPI_2025: [(u32, u32); 12] = [
    (1, 14), (2, 12), (3, 12), (4, 9), (5, 14), (6, 11),
    (7, 15), (8, 13), (9, 10), (10, 15), (11, 12), (12, 10),
];

// (month, day) of each FOMC statement. All at 14:00 New York time.
static FOMC_2024: [(u32, u32); 8] = [
    (1, 31), (3, 20), (5, 1), (6, 12), (7, 31), (9, 18), (11, 7), (12, 18),
];
static FOMC_2025: [(u32, u32); 8] = [
    (1, 29), (3, 19), (4, 30), (6, 11), (7, 30), (9, 17), (11, 5), (12, 17),
];

struct Earnings {
    ticker: &'static str,
    quarter: &'static str,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
}

const fn earnings(ticker: &'static str, quarter: &'static str, date: (u32, u32), time: (u32, u32)) -> Earnings {
    Earnings {
        ticker,
        quarter,
        month: date.0,
        day: date.1,
        hour: time.0,
        minute: time.1,
    }
}

static EARNINGS_2024: [Earnings; 4] = [
    earnings("AAPL", "FY23 Q4", (2, 1), (16, 0)),
    earnings("MSFT", "FY24 Q2", (1, 30), (16, 0)),
    earnings("NVDA", "FY24 Q4", (2, 21), (16, 20)),
    earnings("AMZN", "FY23 Q4", (2, 1), (16, 0)),
];
static EARNINGS_2025: [Earnings; 4] = [
    earnings("AAPL", "FY25 Q1", (1, 30), (16, 0)),
    earnings("MSFT", "FY25 Q2", (1, 29), (16, 0)),
    earnings("NVDA", "FY25 Q4", (2, 26), (16, 20)),
    earnings("AMZN", "FY24 Q4", (2, 6), (16, 0)),
];

/// Years with a built-in schedule.
pub const SUPPORTED_YEARS: [i32; 2] = [2024, 2025];

// ==============================================================================
// Sample calendar
// ==============================================================================

/// Returns the built-in events for `year`, limited to `categories`.
///
/// Category matching is case-insensitive and an empty list means every category.
/// Known categories are `cpi`, `fomc` and `earnings`; unknown categories and
/// unsupported years simply yield nothing.
pub fn sample_events(categories: &[String], year: i32) -> Vec<Event> {
    let wants = |category: &str| {
        categories.is_empty() || categories.iter().any(|c| c.trim().eq_ignore_ascii_case(category))
    };
    let (cpi, fomc, results): (&[(u32, u32)], &[(u32, u32)], &[Earnings]) = match year {
        2024 => (&CPI_2024[..], &FOMC_2024[..], &EARNINGS_2024[..]),
        2025 => (&CPI_2025[..], &FOMC_2025[..], &EARNINGS_2025[..]),
        _ => {
            tracing::warn!(year, "No built-in event schedule for this year.");
            return Vec::new();
        }
    };

    let mut events = Vec::new();

    if wants("cpi") {
        events.extend(cpi.iter().filter_map(|&(m, d)| {
            let ts = new_york(year, m, d, 8, 30)?;
            let name = format!("US CPI {}", ts.format("%b %Y"));
            Some(Event::new(name, "cpi", ts, EventSource::BuiltIn))
        }));
    }

    if wants("fomc") {
        events.extend(fomc.iter().filter_map(|&(m, d)| {
            let ts = new_york(year, m, d, 14, 0)?;
            let name = format!("FOMC {}", ts.format("%b %d"));
            Some(Event::new(name, "fomc", ts, EventSource::BuiltIn))
        }));
    }

    if wants("earnings") {
        events.extend(results.iter().filter_map(|e| {
            let ts = new_york(year, e.month, e.day, e.hour, e.minute)?;
            let name = format!("{} {}", e.ticker, e.quarter);
            Some(
                Event::new(name, "earnings", ts, EventSource::BuiltIn)
                    .with_tickers(vec![e.ticker.to_string()]),
            )
        }));
    }

    events
}

fn new_york(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<FixedOffset>> {
    DEFAULT_EVENT_TZ
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .map(|dt| dt.fixed_offset())
}
