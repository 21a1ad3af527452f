use anyhow::Context;
use api_client::{FredClient, HttpCalendarFeed, ReleaseCalendarClient, YahooClient};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use configuration::{Interval, Settings};
use event_impact::{pipeline, report, Sources};
use std::path::PathBuf;

/// The main entry point for the event impact study.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; FRED_API_KEY may come from the real environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings =
        configuration::load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_to(&mut settings)?;
    settings.validate().context("Invalid configuration")?;

    // Held until exit so the file appender flushes.
    let _log_guard = configuration::logging::init_tracing(&settings.logging)?;

    let market = YahooClient::new(&settings.market_data)?;
    let feed = HttpCalendarFeed::new(&settings.calendar)?;
    let fred = match FredClient::new(&settings.fred) {
        Ok(client) => Some(client),
        Err(e) => {
            if !settings.fred.release_ids.is_empty() {
                tracing::debug!(error = %e, "FRED client unavailable.");
            }
            None
        }
    };

    let sources = Sources {
        market: &market,
        feed: &feed,
        fred: fred.as_ref().map(|c| c as &dyn ReleaseCalendarClient),
    };
    let run = pipeline::run(&settings, &sources, Utc::now().date_naive()).await?;

    tracing::info!(
        events = run.events.len(),
        impacts = run.records.len(),
        skipped_assets = run.skipped_assets.len(),
        skipped_pairs = run.skipped_pairs,
        failed_sources = run.failed_sources,
        "Analysis complete."
    );
    report::emit(&run.records, &settings.output)
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Measure how markets react to scheduled macro events using free Yahoo Finance data.
///
/// Every flag overrides the matching `config.toml` / `EVENT_IMPACT__*` value.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: ./config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma separated tickers to study (e.g. "SPY,QQQ,EURUSD=X").
    #[arg(long)]
    assets: Option<String>,

    /// Price interval (1h or 1d are most reliable).
    #[arg(long, value_enum)]
    interval: Option<Interval>,

    /// Which built-in event categories to load (e.g. "cpi,fomc,earnings").
    #[arg(long)]
    categories: Option<String>,

    /// Calendar year for built-in events.
    #[arg(long)]
    year: Option<i32>,

    /// Hours before each event to include in the window.
    #[arg(long)]
    pre_hours: Option<f64>,

    /// Hours after each event to include in the window.
    #[arg(long)]
    post_hours: Option<f64>,

    /// CSV/JSON with columns name,category,timestamp[,tickers]. Appends to built-ins.
    #[arg(long)]
    events_file: Option<PathBuf>,

    /// ICS URL or local path for an extra calendar. Appends to built-ins.
    #[arg(long)]
    events_ics_url: Option<String>,

    /// Category label applied to ICS events.
    #[arg(long)]
    events_ics_category: Option<String>,

    /// Category to FRED release id mapping, e.g. "cpi=10,employment=50". Requires FRED_API_KEY.
    #[arg(long)]
    events_fred_release_ids: Option<String>,

    /// First date (YYYY-MM-DD) of the FRED release fetch. Defaults to Jan 1 of --year.
    #[arg(long)]
    fred_start: Option<NaiveDate>,

    /// Last date (YYYY-MM-DD) of the FRED release fetch. Defaults to Dec 31 of --year.
    #[arg(long)]
    fred_end: Option<NaiveDate>,

    /// Release time per category, e.g. "fomc=14:00,cpi=08:30".
    #[arg(long)]
    fred_time_overrides: Option<String>,

    /// Fetch FRED releases from today to today+N days instead of a fixed range.
    #[arg(long)]
    fred_rolling_days: Option<u32>,

    /// Write the impact table as CSV.
    #[arg(long)]
    output_csv: Option<PathBuf>,

    /// Write the full impact records as JSON.
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Also print mean/median impact per category and asset.
    #[arg(long)]
    summary: bool,
}

impl Cli {
    /// Overlays the flags that were given onto the loaded settings.
    fn apply_to(&self, settings: &mut Settings) -> anyhow::Result<()> {
        let analysis = &mut settings.analysis;
        if let Some(assets) = &self.assets {
            analysis.assets = configuration::split_list(assets);
        }
        if let Some(interval) = self.interval {
            analysis.interval = interval;
        }
        if let Some(categories) = &self.categories {
            analysis.categories = configuration::split_list(categories);
        }
        if let Some(year) = self.year {
            analysis.year = year;
        }
        if let Some(hours) = self.pre_hours {
            analysis.pre_window = Some(hours_to_duration(hours, "--pre-hours")?);
        }
        if let Some(hours) = self.post_hours {
            analysis.post_window = Some(hours_to_duration(hours, "--post-hours")?);
        }

        let calendar = &mut settings.calendar;
        if let Some(path) = &self.events_file {
            calendar.events_file = Some(path.clone());
        }
        if let Some(url) = &self.events_ics_url {
            calendar.ics_url = Some(url.clone());
        }
        if let Some(category) = &self.events_ics_category {
            calendar.ics_category = category.clone();
        }

        let fred = &mut settings.fred;
        if let Some(raw) = &self.events_fred_release_ids {
            fred.release_ids = configuration::parse_release_ids(raw)?;
        }
        if let Some(start) = self.fred_start {
            fred.start = Some(start);
        }
        if let Some(end) = self.fred_end {
            fred.end = Some(end);
        }
        if let Some(raw) = &self.fred_time_overrides {
            fred.time_overrides.extend(configuration::parse_key_values(raw)?);
        }
        if let Some(days) = self.fred_rolling_days {
            fred.rolling_days = Some(days);
        }

        let output = &mut settings.output;
        if let Some(path) = &self.output_csv {
            output.csv = Some(path.clone());
        }
        if let Some(path) = &self.output_json {
            output.json = Some(path.clone());
        }
        output.summary |= self.summary;

        Ok(())
    }
}

fn hours_to_duration(hours: f64, flag: &str) -> anyhow::Result<std::time::Duration> {
    if hours.is_nan() || hours <= 0.0 {
        anyhow::bail!("{} must be a positive number of hours, got {}", flag, hours);
    }
    std::time::Duration::try_from_secs_f64(hours * 3600.0)
        .with_context(|| format!("{} is out of range", flag))
}
