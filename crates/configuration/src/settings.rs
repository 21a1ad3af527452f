use crate::error::ConfigError;
use crate::interval::Interval;
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use core_types::WindowConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an absent `config.toml` yields a runnable setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analysis: AnalysisSettings,
    pub calendar: CalendarSettings,
    pub fred: FredSettings,
    pub market_data: MarketDataSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

/// What to analyse and how wide the event windows are.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Tickers to study, in market-data API notation (e.g. "EURUSD=X", "CL=F").
    pub assets: Vec<String>,
    pub interval: Interval,
    /// Categories taken from the built-in calendar.
    pub categories: Vec<String>,
    /// Calendar year of the built-in events.
    pub year: i32,
    /// Time before each event to include. Falls back to the interval's default.
    #[serde(with = "humantime_serde")]
    pub pre_window: Option<Duration>,
    /// Time after each event to include. Falls back to the interval's default.
    #[serde(with = "humantime_serde")]
    pub post_window: Option<Duration>,
    /// When set, events that name tickers are only paired with those tickers.
    pub restrict_to_event_tickers: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            assets: ["SPY", "QQQ", "GLD", "TLT", "EURUSD=X", "CL=F"]
                .into_iter()
                .map(String::from)
                .collect(),
            interval: Interval::Hour1,
            categories: ["cpi", "fomc", "earnings"].into_iter().map(String::from).collect(),
            year: 2025,
            pre_window: None,
            post_window: None,
            restrict_to_event_tickers: false,
        }
    }
}

impl AnalysisSettings {
    /// Resolves the configured windows, falling back to the interval default for
    /// whichever side is unset.
    pub fn window(&self) -> Result<WindowConfig, ConfigError> {
        let fallback = self.interval.default_window();
        let pre = match self.pre_window {
            Some(d) => to_chrono(d, "pre_window")?,
            None => fallback.pre,
        };
        let post = match self.post_window {
            Some(d) => to_chrono(d, "post_window")?,
            None => fallback.post,
        };
        WindowConfig::new(pre, post).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn to_chrono(d: Duration, field: &str) -> Result<chrono::Duration, ConfigError> {
    chrono::Duration::from_std(d)
        .map_err(|_| ConfigError::ValidationError(format!("{} is out of range", field)))
}

/// Additional event sources merged on top of the built-in calendar.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// CSV or JSON file with `name,category,timestamp[,tickers]`.
    pub events_file: Option<PathBuf>,
    /// ICS feed; either a URL or a local path.
    pub ics_url: Option<String>,
    /// Category label applied to every ICS event.
    pub ics_category: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            events_file: None,
            ics_url: None,
            ics_category: "macro".to_string(),
            user_agent: "event-impact/0.1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// FRED release-date source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FredSettings {
    pub base_url: String,
    /// Read from `FRED_API_KEY` when not given in the file.
    pub api_key: Option<String>,
    /// Category label -> FRED release id (e.g. `cpi = 10`).
    pub release_ids: BTreeMap<String, u32>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// If set, fetch releases from today to today + N days.
    pub rolling_days: Option<u32>,
    /// Zone the release times are expressed in.
    pub timezone: Tz,
    /// HH:MM stamped on release dates without an override.
    pub default_release_time: String,
    /// Category -> HH:MM (e.g. `fomc = "14:00"`).
    pub time_overrides: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

impl Default for FredSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.stlouisfed.org/fred".to_string(),
            api_key: None,
            release_ids: BTreeMap::new(),
            start: None,
            end: None,
            rolling_days: None,
            timezone: chrono_tz::America::New_York,
            default_release_time: "08:30".to_string(),
            time_overrides: BTreeMap::new(),
            timeout_secs: 15,
        }
    }
}

impl FredSettings {
    /// The inclusive date range to query, given the analysis year and today's date.
    ///
    /// A rolling window wins over explicit bounds; missing bounds default to the
    /// first and last day of `year`.
    pub fn date_range(&self, year: i32, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ConfigError> {
        if let Some(days) = self.rolling_days {
            let end = today + chrono::Duration::days(i64::from(days));
            return Ok((today, end));
        }
        let jan_1 = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| ConfigError::ValidationError(format!("Invalid year {}", year)))?;
        let dec_31 = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| ConfigError::ValidationError(format!("Invalid year {}", year)))?;
        let start = self.start.unwrap_or(jan_1);
        let end = self.end.unwrap_or(dec_31);
        if end < start {
            return Err(ConfigError::ValidationError(format!(
                "FRED end date {} is before start date {}",
                end, start
            )));
        }
        Ok((start, end))
    }

    /// The release time for `category`, honouring overrides.
    pub fn release_time_for(&self, category: &str) -> Result<NaiveTime, ConfigError> {
        let raw = self
            .time_overrides
            .get(category)
            .unwrap_or(&self.default_release_time);
        parse_release_time(raw)
    }
}

/// Market-data HTTP endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketDataSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            user_agent: "Mozilla/5.0 (compatible; event-impact/0.1)".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Where results go besides the terminal.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
    /// Print the per-category summary after the main table.
    pub summary: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// If set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "event-impact.log".to_string(),
        }
    }
}

impl Settings {
    /// Checks the cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.assets.iter().all(|a| a.trim().is_empty()) {
            return Err(ConfigError::ValidationError("at least one asset is required".into()));
        }
        self.analysis.window()?;
        parse_release_time(&self.fred.default_release_time)?;
        for (category, time) in &self.fred.time_overrides {
            parse_release_time(time).map_err(|_| {
                ConfigError::ValidationError(format!(
                    "invalid release time '{}' for category '{}'",
                    time, category
                ))
            })?;
        }
        if let (Some(start), Some(end)) = (self.fred.start, self.fred.end) {
            if end < start {
                return Err(ConfigError::ValidationError(format!(
                    "FRED end date {} is before start date {}",
                    end, start
                )));
            }
        }
        Ok(())
    }
}

/// Parses an `HH:MM` release time.
pub fn parse_release_time(raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ConfigError::ValidationError(format!("invalid HH:MM time '{}'", raw)))
}

/// Parses `key=value,key=value` lists such as `cpi=9,fomc=10`. Blank entries are
/// ignored; an entry without `=` is an error.
pub fn parse_key_values(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut out = BTreeMap::new();
    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| ConfigError::ValidationError(format!("expected key=value, got '{}'", pair)))?;
        out.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(out)
}

/// Parses `category=release_id` pairs.
pub fn parse_release_ids(raw: &str) -> Result<BTreeMap<String, u32>, ConfigError> {
    parse_key_values(raw)?
        .into_iter()
        .map(|(category, id)| {
            id.parse::<u32>()
                .map(|id| (category.clone(), id))
                .map_err(|_| {
                    ConfigError::ValidationError(format!(
                        "release id for '{}' must be an integer, got '{}'",
                        category, id
                    ))
                })
        })
        .collect()
}

/// Splits a comma-separated list, trimming and dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.analysis.assets.len(), 6);
        assert_eq!(settings.analysis.window().unwrap(), WindowConfig::intraday_default());
    }

    #[test]
    fn explicit_windows_override_interval_default() {
        let analysis = AnalysisSettings {
            interval: Interval::Day1,
            pre_window: Some(Duration::from_secs(2 * 3600)),
            ..AnalysisSettings::default()
        };
        let window = analysis.window().unwrap();
        assert_eq!(window.pre, chrono::Duration::hours(2));
        assert_eq!(window.post, chrono::Duration::days(5));
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut settings = Settings::default();
        settings.analysis.post_window = Some(Duration::ZERO);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn oversized_window_is_rejected() {
        let mut settings = Settings::default();
        settings.analysis.pre_window = Some(Duration::from_secs(100_000 * 86_400));
        let err = settings.validate().unwrap_err();
        assert!(matches!(&err, ConfigError::ValidationError(msg) if msg.contains("3650")));
    }

    #[test]
    fn empty_asset_list_is_rejected() {
        let mut settings = Settings::default();
        settings.analysis.assets = vec![" ".into()];
        assert!(settings.validate().is_err());
    }

    #[test]
    fn bad_override_time_is_rejected() {
        let mut settings = Settings::default();
        settings.fred.time_overrides.insert("fomc".into(), "2pm".into());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn key_value_lists() {
        let parsed = parse_key_values("cpi=9, fomc = 10,,").unwrap();
        assert_eq!(parsed.get("cpi").map(String::as_str), Some("9"));
        assert_eq!(parsed.get("fomc").map(String::as_str), Some("10"));
        assert!(parse_key_values("cpi").is_err());

        let ids = parse_release_ids("cpi=9,employment=50").unwrap();
        assert_eq!(ids["employment"], 50);
        assert!(parse_release_ids("cpi=nine").is_err());
    }

    #[test]
    fn release_time_uses_override_then_default() {
        let mut fred = FredSettings::default();
        fred.time_overrides.insert("fomc".into(), "14:00".into());
        assert_eq!(fred.release_time_for("fomc").unwrap(), NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(fred.release_time_for("cpi").unwrap(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
    }

    #[test]
    fn fred_date_range_defaults_and_rolling() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut fred = FredSettings::default();
        assert_eq!(
            fred.date_range(2024, today).unwrap(),
            (
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
            )
        );

        fred.rolling_days = Some(10);
        assert_eq!(
            fred.date_range(2024, today).unwrap(),
            (today, NaiveDate::from_ymd_opt(2025, 3, 11).unwrap())
        );
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(split_list(" SPY, ,QQQ ,"), vec!["SPY".to_string(), "QQQ".to_string()]);
    }
}
