use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The API request returned an error: {0}")]
    ApiError(String),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from API: {0}")]
    InvalidData(String),

    #[error("Missing API key: set {0} in the environment")]
    MissingApiKey(&'static str),
}
