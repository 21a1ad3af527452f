use crate::error::EventsError;
use crate::timestamp::localize;
use api_client::CalendarFeed;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use core_types::{Event, EventSource};
use std::collections::HashMap;
use std::path::Path;
use url::Url;

/// Loads events from an ICS calendar at `source`, which may be a local path, a
/// `file://` URL or an http(s) URL.
pub async fn load_events_from_ics(
    source: &str,
    category: &str,
    feed: &dyn CalendarFeed,
) -> Result<Vec<Event>, EventsError> {
    let text = if Path::new(source).exists() {
        read_local(Path::new(source))?
    } else {
        match Url::parse(source) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                feed.fetch_calendar(url.as_str()).await?
            }
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| EventsError::UnknownSource(source.to_string()))?;
                read_local(&path)?
            }
            _ => return Err(EventsError::UnknownSource(source.to_string())),
        }
    };

    let events = parse_ics(&text, category);
    tracing::debug!(source, count = events.len(), "Loaded ICS events.");
    Ok(events)
}

fn read_local(path: &Path) -> Result<String, EventsError> {
    std::fs::read_to_string(path).map_err(|source| EventsError::Io {
        path: path.display().to_string(),
        source,
    })
}

// ==============================================================================
// Parsing
// ==============================================================================

#[derive(Debug)]
struct Property {
    params: HashMap<String, String>,
    value: String,
}

/// Extracts every `VEVENT` with both a `DTSTART` and a `SUMMARY`.
///
/// `DTSTART` handling: a trailing `Z` is UTC, a `TZID` parameter names the zone,
/// floating times are taken as UTC and date-only values as midnight UTC. Nested
/// components such as `VALARM` are ignored.
pub fn parse_ics(text: &str, category: &str) -> Vec<Event> {
    let mut events = Vec::new();
    let mut current: Option<HashMap<String, Property>> = None;
    let mut nested = 0usize;

    for line in unfold_lines(text) {
        let Some(colon) = find_unquoted(&line, ':') else {
            continue;
        };
        let (head, value) = (&line[..colon], &line[colon + 1..]);
        let mut parts = split_unquoted(head, ';').into_iter();
        let name = parts.next().unwrap_or("").trim().to_ascii_uppercase();
        let value = value.trim();

        match name.as_str() {
            "BEGIN" if value.eq_ignore_ascii_case("VEVENT") && current.is_none() => {
                current = Some(HashMap::new());
                nested = 0;
            }
            "BEGIN" if current.is_some() => nested += 1,
            "END" if nested > 0 => nested -= 1,
            "END" if value.eq_ignore_ascii_case("VEVENT") => {
                if let Some(props) = current.take() {
                    if let Some(event) = build_event(&props, category) {
                        events.push(event);
                    }
                }
            }
            _ if nested == 0 => {
                if let Some(props) = current.as_mut() {
                    let params = parts
                        .filter_map(|p| p.split_once('='))
                        .map(|(k, v)| (k.trim().to_ascii_uppercase(), v.trim().trim_matches('"').to_string()))
                        .collect();
                    props.entry(name.clone()).or_insert(Property {
                        params,
                        value: value.to_string(),
                    });
                }
            }
            _ => {}
        }
    }

    events
}

/// Byte offset of the first `delim` outside a double-quoted parameter value.
fn find_unquoted(text: &str, delim: char) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == delim && !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_unquoted(text: &str, delim: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some(i) = find_unquoted(rest, delim) {
        pieces.push(&rest[..i]);
        rest = &rest[i + delim.len_utf8()..];
    }
    pieces.push(rest);
    pieces
}

/// Joins RFC 5545 continuation lines (those starting with a space or tab).
fn unfold_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let raw = raw.trim_end_matches('\r');
        if let Some(rest) = raw.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !raw.trim().is_empty() {
            lines.push(raw.to_string());
        }
    }
    lines
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push(' '),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out.trim().to_string()
}

fn build_event(props: &HashMap<String, Property>, category: &str) -> Option<Event> {
    let summary = props.get("SUMMARY").map(|p| unescape(&p.value)).filter(|s| !s.is_empty())?;
    let dtstart = props.get("DTSTART")?;

    let timestamp = match parse_dtstart(dtstart) {
        Ok(ts) => ts,
        Err(e) => {
            tracing::warn!(summary = %summary, error = %e, "Skipping ICS event with an unreadable DTSTART.");
            return None;
        }
    };

    let mut event = Event::new(summary, category, timestamp, EventSource::Ics);
    if let Some(uid) = props.get("UID") {
        event = event.with_metadata("uid", uid.value.clone());
    }
    if let Some(location) = props.get("LOCATION").map(|p| unescape(&p.value)).filter(|s| !s.is_empty()) {
        event = event.with_metadata("location", location);
    }
    Some(event)
}

fn parse_dtstart(prop: &Property) -> Result<DateTime<FixedOffset>, EventsError> {
    let raw = prop.value.as_str();

    if let Some(utc) = raw.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .map_err(|e| EventsError::Timestamp(format!("{}: {}", raw, e)))?;
        return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)).fixed_offset());
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S")
        .map_err(|e| EventsError::Timestamp(format!("{}: {}", raw, e)))?;

    match prop.params.get("TZID") {
        Some(tzid) => match tzid.parse::<Tz>() {
            Ok(tz) => localize(naive, tz),
            Err(_) => {
                tracing::warn!(tzid = %tzid, "Unknown TZID, treating the time as UTC.");
                Ok(Utc.from_utc_datetime(&naive).fixed_offset())
            }
        },
        None => Ok(Utc.from_utc_datetime(&naive).fixed_offset()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::error::ApiError;
    use async_trait::async_trait;
    use std::io::Write;

    const CALENDAR: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:cpi-2025-01@example.org\r\n\
DTSTART:20250114T133000Z\r\n\
SUMMARY:Consumer Price Index\\, December\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART;TZID=America/New_York:20250129T140000\r\n\
SUMMARY:FOMC statement and \r\n\
\x20press conference\r\n\
BEGIN:VALARM\r\n\
TRIGGER:-PT15M\r\n\
SUMMARY:Reminder\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART;VALUE=DATE:20250704\r\n\
SUMMARY:Market holiday\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20250301T090000\r\n\
SUMMARY:Floating time\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:No start time\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn parses_all_dtstart_forms() {
        let events = parse_ics(CALENDAR, "macro");
        assert_eq!(events.len(), 4);

        assert_eq!(events[0].name, "Consumer Price Index, December");
        assert_eq!(events[0].utc_timestamp(), utc(2025, 1, 14, 13, 30));
        assert_eq!(events[0].metadata.get("uid").map(String::as_str), Some("cpi-2025-01@example.org"));

        assert_eq!(events[1].name, "FOMC statement and press conference");
        assert_eq!(events[1].utc_timestamp(), utc(2025, 1, 29, 19, 0));

        assert_eq!(events[2].utc_timestamp(), utc(2025, 7, 4, 0, 0));
        assert_eq!(events[3].utc_timestamp(), utc(2025, 3, 1, 9, 0));

        assert!(events.iter().all(|e| e.category == "macro" && e.source == EventSource::Ics));
    }

    #[test]
    fn colons_inside_quoted_parameters_do_not_split_the_line() {
        let text = "BEGIN:VEVENT\r\n\
SUMMARY;ALTREP=\"https://bls.gov/cpi\";LANGUAGE=en:CPI release\r\n\
DTSTART;TZID=\"America/New_York\":20250114T083000\r\n\
END:VEVENT\r\n";
        let events = parse_ics(text, "cpi");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "CPI release");
        assert_eq!(events[0].utc_timestamp(), utc(2025, 1, 14, 13, 30));
    }

    #[test]
    fn quoted_splitting_helpers() {
        assert_eq!(find_unquoted("A;X=\"a:b\":v", ':'), Some(9));
        assert_eq!(find_unquoted("\"a:b\"", ':'), None);
        assert_eq!(split_unquoted("SUMMARY;X=\"a;b\";Y=c", ';'), vec!["SUMMARY", "X=\"a;b\"", "Y=c"]);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_ics("not a calendar", "macro").is_empty());
        assert!(parse_ics("BEGIN:VEVENT\nDTSTART:yesterday\nSUMMARY:x\nEND:VEVENT\n", "macro").is_empty());
    }

    struct StaticFeed(&'static str);

    #[async_trait]
    impl CalendarFeed for StaticFeed {
        async fn fetch_calendar(&self, url: &str) -> Result<String, ApiError> {
            assert!(url.starts_with("https://"));
            Ok(self.0.to_string())
        }
    }

    struct NoNetwork;

    #[async_trait]
    impl CalendarFeed for NoNetwork {
        async fn fetch_calendar(&self, url: &str) -> Result<String, ApiError> {
            panic!("unexpected fetch of {}", url);
        }
    }

    #[tokio::test]
    async fn fetches_remote_calendars_through_the_feed() {
        let events = load_events_from_ics("https://example.org/cal.ics", "fed", &StaticFeed(CALENDAR))
            .await
            .unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].category, "fed");
    }

    #[tokio::test]
    async fn reads_local_files_without_the_network() {
        let mut file = tempfile::Builder::new().suffix(".ics").tempfile().unwrap();
        file.write_all(CALENDAR.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let events = load_events_from_ics(&path, "macro", &NoNetwork).await.unwrap();
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn reads_file_urls_without_the_network() {
        let mut file = tempfile::Builder::new().suffix(".ics").tempfile().unwrap();
        file.write_all(CALENDAR.as_bytes()).unwrap();
        let url = Url::from_file_path(file.path()).unwrap();

        let events = load_events_from_ics(url.as_str(), "macro", &NoNetwork).await.unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].name, "FOMC statement and press conference");
    }

    #[tokio::test]
    async fn rejects_unknown_sources() {
        let err = load_events_from_ics("/definitely/missing.ics", "macro", &NoNetwork)
            .await
            .unwrap_err();
        assert!(matches!(err, EventsError::UnknownSource(_)));
    }
}
