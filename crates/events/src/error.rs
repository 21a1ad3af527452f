use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV event file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse JSON event file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Event file is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Invalid event timestamp: {0}")]
    Timestamp(String),

    #[error("Calendar source '{0}' is neither an existing file nor an http(s) URL")]
    UnknownSource(String),

    #[error("Invalid FRED request: {0}")]
    InvalidRequest(String),

    #[error("API error: {0}")]
    Api(#[from] api_client::error::ApiError),
}
