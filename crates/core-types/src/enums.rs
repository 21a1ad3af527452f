use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an event record was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    BuiltIn,
    File,
    Ics,
    Fred,
}

impl EventSource {
    pub fn is_fred(&self) -> bool {
        matches!(self, EventSource::Fred)
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventSource::BuiltIn => "builtin",
            EventSource::File => "file",
            EventSource::Ics => "ics",
            EventSource::Fred => "fred",
        };
        f.write_str(label)
    }
}
