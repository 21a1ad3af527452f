use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod interval;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use interval::Interval;
pub use settings::{
    AnalysisSettings, CalendarSettings, FredSettings, LoggingSettings, MarketDataSettings,
    OutputSettings, Settings, parse_key_values, parse_release_ids, parse_release_time, split_list,
};

/// Environment variables with this prefix override file values, nesting with `__`
/// (e.g. `EVENT_IMPACT__ANALYSIS__YEAR=2024`).
pub const ENV_PREFIX: &str = "EVENT_IMPACT";

/// Loads the application configuration.
///
/// Reads `path` if given, otherwise an optional `config.toml` in the working
/// directory, then layers `EVENT_IMPACT__*` environment variables on top. The FRED
/// API key falls back to `FRED_API_KEY`. The result is validated before it is
/// returned.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file_source = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name("config").required(false),
    };

    let builder = config::Config::builder()
        .add_source(file_source)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("analysis.assets")
                .with_list_parse_key("analysis.categories"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Settings` struct
    let mut settings = builder.try_deserialize::<Settings>()?;

    if settings.fred.api_key.is_none() {
        settings.fred.api_key = std::env::var("FRED_API_KEY").ok().filter(|k| !k.trim().is_empty());
    }

    settings.validate()?;
    Ok(settings)
}
