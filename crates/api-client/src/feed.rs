use crate::error::ApiError;
use crate::CalendarFeed;
use async_trait::async_trait;
use configuration::CalendarSettings;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;

/// Fetches iCalendar feeds over HTTP.
#[derive(Clone)]
pub struct HttpCalendarFeed {
    client: reqwest::Client,
}

impl HttpCalendarFeed {
    pub fn new(settings: &CalendarSettings) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/calendar, text/plain; q=0.9, */*; q=0.8"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CalendarFeed for HttpCalendarFeed {
    async fn fetch_calendar(&self, url: &str) -> Result<String, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}
