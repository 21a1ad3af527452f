use crate::error::EventsError;
use chrono::offset::LocalResult;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Zone assumed for event times written without an offset. Macro releases are
/// scheduled in New York time.
pub const DEFAULT_EVENT_TZ: Tz = chrono_tz::America::New_York;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Attaches `tz` to a wall-clock time. On a DST fall-back the earlier instant wins;
/// a time skipped by spring-forward is an error.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<FixedOffset>, EventsError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.fixed_offset()),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.fixed_offset()),
        LocalResult::None => Err(EventsError::Timestamp(format!(
            "{} does not exist in {}",
            naive, tz
        ))),
    }
}

/// Parses an ISO-8601 timestamp. Values with an offset (or `Z`) keep it; naive
/// date-times and bare dates (midnight) are interpreted in `default_tz`.
pub fn parse_event_timestamp(raw: &str, default_tz: Tz) -> Result<DateTime<FixedOffset>, EventsError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(EventsError::Timestamp("empty timestamp".to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(naive, default_tz);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return localize(date.and_time(NaiveTime::MIN), default_tz);
    }

    Err(EventsError::Timestamp(format!("unrecognised timestamp '{}'", raw)))
}
