use crate::error::ApiError;
use crate::responses::{FredErrorResponse, FredReleaseDatesResponse, FredReleaseResponse};
use crate::ReleaseCalendarClient;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use configuration::FredSettings;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

const PAGE_LIMIT: usize = 1000;

/// Client for the FRED release calendar.
#[derive(Clone)]
pub struct FredClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FredClient {
    /// Builds a client from settings. Fails if no API key is configured.
    pub fn new(settings: &FredSettings) -> Result<Self, ApiError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(ApiError::MissingApiKey("FRED_API_KEY"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("file_type", "json")])
            .query(params)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            match serde_json::from_str::<FredErrorResponse>(&text) {
                Ok(err) => Err(ApiError::ApiError(format!("{} {}", err.error_code, err.error_message))),
                Err(_) => Err(ApiError::Status {
                    status: status.as_u16(),
                    url,
                }),
            }
        }
    }
}

#[async_trait]
impl ReleaseCalendarClient for FredClient {
    async fn release_name(&self, release_id: u32) -> Result<String, ApiError> {
        let response: FredReleaseResponse = self
            .get("/release", &[("release_id", release_id.to_string())])
            .await?;
        response
            .releases
            .into_iter()
            .find(|r| r.id == release_id)
            .map(|r| r.name)
            .ok_or_else(|| ApiError::InvalidData(format!("Release {} not found", release_id)))
    }

    async fn release_dates(
        &self,
        release_id: u32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, ApiError> {
        let today = Utc::now().date_naive();
        let mut dates = collect_release_dates(|offset| {
            let params = release_dates_params(release_id, start, end, today, offset);
            async move { self.get("/release/dates", &params).await }
        })
        .await?;

        dates.retain(|d| *d >= start && *d <= end);
        dates.sort();
        dates.dedup();
        Ok(dates)
    }
}

/// Query parameters for one page of `/release/dates`.
///
/// FRED omits scheduled dates that have no data yet unless asked, so ranges
/// reaching today or later include them.
fn release_dates_params(
    release_id: u32,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    offset: usize,
) -> [(&'static str, String); 6] {
    let include_upcoming = end >= today;
    [
        ("release_id", release_id.to_string()),
        ("realtime_start", start.to_string()),
        ("realtime_end", end.to_string()),
        ("include_release_dates_with_no_data", include_upcoming.to_string()),
        ("limit", PAGE_LIMIT.to_string()),
        ("offset", offset.to_string()),
    ]
}

/// Requests pages at increasing offsets until a short page or the reported
/// `count` ends the listing.
pub async fn collect_release_dates<F, Fut>(mut fetch_page: F) -> Result<Vec<NaiveDate>, ApiError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<FredReleaseDatesResponse, ApiError>>,
{
    let mut dates = Vec::new();
    let mut offset = 0;

    loop {
        let page = fetch_page(offset).await?;
        let fetched = page.release_dates.len();
        dates.extend(parse_release_dates(&page)?);

        offset += fetched;
        if fetched < PAGE_LIMIT || offset >= page.count {
            break;
        }
    }

    Ok(dates)
}

fn parse_release_dates(page: &FredReleaseDatesResponse) -> Result<Vec<NaiveDate>, ApiError> {
    page.release_dates
        .iter()
        .map(|row| {
            NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
                .map_err(|e| ApiError::InvalidData(format!("Invalid release date '{}': {}", row.date, e)))
        })
        .collect()
}
