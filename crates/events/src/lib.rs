//! # Event calendar
//!
//! Builds the list of scheduled events an impact study runs over. Events come from
//! a built-in 2024/2025 schedule, user CSV/JSON files, ICS feeds and the FRED
//! release calendar; [`EventCalendar`] merges them and [`dedupe_events`] settles
//! overlaps.
//!
//! Naive timestamps are read as New York time unless a loader is told otherwise.

pub mod builtin;
pub mod calendar;
pub mod dedupe;
pub mod error;
pub mod file;
pub mod fred;
pub mod ics;
pub mod timestamp;

// Re-export the loaders to provide a clean public API.
pub use builtin::sample_events;
pub use calendar::{EventCalendar, SourceFailure};
pub use dedupe::dedupe_events;
pub use error::EventsError;
pub use file::{load_events_file, load_events_from_csv, load_events_from_json};
pub use fred::{load_events_from_fred, FredRequest};
pub use ics::{load_events_from_ics, parse_ics};
pub use timestamp::{parse_event_timestamp, DEFAULT_EVENT_TZ};
