use serde::Deserialize;

// Raw response shapes. Only the fields we read are declared; serde ignores the rest.

// --- Yahoo chart API (`/v8/finance/chart/{symbol}`) ---

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    /// Bar open times in epoch seconds. Absent when the range holds no bars.
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    pub quote: Vec<Quote>,
}

/// Column-oriented OHLCV. Yahoo emits `null` for bars without trades.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Quote {
    pub open: Vec<Option<f64>>,
    pub high: Vec<Option<f64>>,
    pub low: Vec<Option<f64>>,
    pub close: Vec<Option<f64>>,
    pub volume: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

// --- FRED (`/fred/release`, `/fred/release/dates`) ---

#[derive(Debug, Deserialize)]
pub struct FredReleaseResponse {
    #[serde(default)]
    pub releases: Vec<FredRelease>,
}

#[derive(Debug, Deserialize)]
pub struct FredRelease {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FredReleaseDatesResponse {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub release_dates: Vec<FredReleaseDate>,
}

#[derive(Debug, Deserialize)]
pub struct FredReleaseDate {
    pub date: String,
}

/// The body FRED returns alongside a non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub struct FredErrorResponse {
    pub error_code: u16,
    pub error_message: String,
}
