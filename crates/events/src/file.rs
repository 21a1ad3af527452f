use crate::error::EventsError;
use crate::timestamp::parse_event_timestamp;
use chrono_tz::Tz;
use core_types::{Event, EventSource};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_CATEGORY: &str = "custom";

// Columns with a fixed meaning; everything else is carried as metadata.
const NAME_COLUMN: &str = "name";
const TIMESTAMP_COLUMN: &str = "timestamp";
const CATEGORY_COLUMN: &str = "category";
const TICKERS_COLUMN: &str = "tickers";

/// Loads a user event file, picking the parser from the extension (`.json`, else CSV).
///
/// Malformed rows are logged and skipped; a file that cannot be read or lacks the
/// required columns is an error.
pub fn load_events_file(path: &Path, default_tz: Tz) -> Result<Vec<Event>, EventsError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        load_events_from_json(path, default_tz)
    } else {
        load_events_from_csv(path, default_tz)
    }
}

// ==============================================================================
// CSV
// ==============================================================================

/// Reads a CSV with `name` and `timestamp` columns and optional `category` and
/// `tickers` (comma-separated inside the field) columns.
pub fn load_events_from_csv(path: &Path, default_tz: Tz) -> Result<Vec<Event>, EventsError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_lowercase()).collect();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let name_idx = column(NAME_COLUMN).ok_or_else(|| EventsError::MissingColumn(NAME_COLUMN.into()))?;
    let ts_idx =
        column(TIMESTAMP_COLUMN).ok_or_else(|| EventsError::MissingColumn(TIMESTAMP_COLUMN.into()))?;
    let category_idx = column(CATEGORY_COLUMN);
    let tickers_idx = column(TICKERS_COLUMN);

    let mut events = Vec::new();
    for (line, record) in reader.records().enumerate() {
        // Header is line 1.
        let row = line + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(row, error = %e, "Skipping unreadable event row.");
                continue;
            }
        };
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let name = field(name_idx);
        if name.is_empty() {
            tracing::warn!(row, "Skipping event row without a name.");
            continue;
        }
        let timestamp = match parse_event_timestamp(field(ts_idx), default_tz) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(row, name, error = %e, "Skipping event row with a bad timestamp.");
                continue;
            }
        };
        let category = category_idx
            .map(field)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);
        let tickers = tickers_idx.map(|i| split_tickers(field(i))).unwrap_or_default();

        let mut event = Event::new(name, category, timestamp, EventSource::File).with_tickers(tickers);
        for (idx, header) in headers.iter().enumerate() {
            if [name_idx, ts_idx].contains(&idx) || Some(idx) == category_idx || Some(idx) == tickers_idx {
                continue;
            }
            let value = field(idx);
            if !value.is_empty() {
                event.metadata.insert(header.clone(), value.to_string());
            }
        }
        events.push(event);
    }

    tracing::debug!(path = %path.display(), count = events.len(), "Loaded CSV events.");
    Ok(events)
}

// ==============================================================================
// JSON
// ==============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TickerList {
    List(Vec<String>),
    Joined(String),
}

#[derive(Debug, Deserialize)]
struct RawJsonEvent {
    name: String,
    timestamp: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tickers: Option<TickerList>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

/// Reads a JSON array of event objects. Each object needs `name` and `timestamp`;
/// `category`, `tickers` (array or comma-separated string) and `metadata` are optional.
pub fn load_events_from_json(path: &Path, default_tz: Tz) -> Result<Vec<Event>, EventsError> {
    let text = std::fs::read_to_string(path).map_err(|source| EventsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let entries: Vec<Value> = serde_json::from_str(&text)?;

    let mut events = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let raw: RawJsonEvent = match serde_json::from_value(entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed JSON event.");
                continue;
            }
        };
        if raw.name.trim().is_empty() {
            tracing::warn!(index, "Skipping JSON event without a name.");
            continue;
        }
        let timestamp = match parse_event_timestamp(&raw.timestamp, default_tz) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(index, name = %raw.name, error = %e, "Skipping JSON event with a bad timestamp.");
                continue;
            }
        };
        let category = raw
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let tickers = match raw.tickers {
            Some(TickerList::List(list)) => normalize_tickers(list),
            Some(TickerList::Joined(joined)) => split_tickers(&joined),
            None => Vec::new(),
        };

        let mut event =
            Event::new(raw.name.trim(), category, timestamp, EventSource::File).with_tickers(tickers);
        for (key, value) in raw.metadata {
            let value = match value {
                Value::String(s) => s,
                Value::Null => continue,
                other => other.to_string(),
            };
            event.metadata.insert(key, value);
        }
        events.push(event);
    }

    tracing::debug!(path = %path.display(), count = events.len(), "Loaded JSON events.");
    Ok(events)
}

fn split_tickers(raw: &str) -> Vec<String> {
    normalize_tickers(raw.split(',').map(str::to_string).collect())
}

fn normalize_tickers(tickers: Vec<String>) -> Vec<String> {
    tickers
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
