use crate::error::ConfigError;
use core_types::WindowConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar intervals understood by the market-data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Interval {
    #[serde(rename = "1m")]
    #[cfg_attr(feature = "clap", value(name = "1m"))]
    Minute1,
    #[serde(rename = "2m")]
    #[cfg_attr(feature = "clap", value(name = "2m"))]
    Minute2,
    #[serde(rename = "5m")]
    #[cfg_attr(feature = "clap", value(name = "5m"))]
    Minute5,
    #[serde(rename = "15m")]
    #[cfg_attr(feature = "clap", value(name = "15m"))]
    Minute15,
    #[serde(rename = "30m")]
    #[cfg_attr(feature = "clap", value(name = "30m"))]
    Minute30,
    #[serde(rename = "60m")]
    #[cfg_attr(feature = "clap", value(name = "60m"))]
    Minute60,
    #[serde(rename = "90m")]
    #[cfg_attr(feature = "clap", value(name = "90m"))]
    Minute90,
    #[default]
    #[serde(rename = "1h")]
    #[cfg_attr(feature = "clap", value(name = "1h"))]
    Hour1,
    #[serde(rename = "1d")]
    #[cfg_attr(feature = "clap", value(name = "1d"))]
    Day1,
    #[serde(rename = "5d")]
    #[cfg_attr(feature = "clap", value(name = "5d"))]
    Day5,
    #[serde(rename = "1wk")]
    #[cfg_attr(feature = "clap", value(name = "1wk"))]
    Week1,
    #[serde(rename = "1mo")]
    #[cfg_attr(feature = "clap", value(name = "1mo"))]
    Month1,
    #[serde(rename = "3mo")]
    #[cfg_attr(feature = "clap", value(name = "3mo"))]
    Month3,
}

impl Interval {
    const ALL: [Interval; 13] = [
        Interval::Minute1,
        Interval::Minute2,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Minute60,
        Interval::Minute90,
        Interval::Hour1,
        Interval::Day1,
        Interval::Day5,
        Interval::Week1,
        Interval::Month1,
        Interval::Month3,
    ];

    /// The wire representation used in API query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute2 => "2m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Minute60 => "60m",
            Interval::Minute90 => "90m",
            Interval::Hour1 => "1h",
            Interval::Day1 => "1d",
            Interval::Day5 => "5d",
            Interval::Week1 => "1wk",
            Interval::Month1 => "1mo",
            Interval::Month3 => "3mo",
        }
    }

    /// Minute and hour bars.
    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Interval::Minute1
                | Interval::Minute2
                | Interval::Minute5
                | Interval::Minute15
                | Interval::Minute30
                | Interval::Minute60
                | Interval::Minute90
                | Interval::Hour1
        )
    }

    /// The analysis window used when none is configured.
    pub fn default_window(&self) -> WindowConfig {
        if self.is_intraday() {
            WindowConfig::intraday_default()
        } else {
            WindowConfig::daily_default()
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::ValidationError(format!("Unsupported interval '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("1h".parse::<Interval>().unwrap(), Interval::Hour1);
        assert_eq!("1WK".parse::<Interval>().unwrap(), Interval::Week1);
        assert!("7h".parse::<Interval>().is_err());
    }

    #[test]
    fn every_interval_round_trips_through_its_name() {
        for interval in Interval::ALL {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
    }

    #[test]
    fn default_window_follows_bar_size() {
        assert_eq!(Interval::Minute15.default_window(), WindowConfig::intraday_default());
        assert_eq!(Interval::Day1.default_window(), WindowConfig::daily_default());
    }
}
