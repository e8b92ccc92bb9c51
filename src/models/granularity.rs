// Bucket granularity: hours > minutes > seconds (coarsest to finest).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MS_PER_SECOND: i64 = 1_000;
pub const MS_PER_MINUTE: i64 = 60_000;
pub const MS_PER_HOUR: i64 = 3_600_000;

/// Width of one histogram bucket. Variant order gives `Seconds < Minutes < Hours`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Seconds,
    Minutes,
    Hours,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity '{0}' (expected second(s), minute(s) or hour(s))")]
pub struct GranularityParseError(pub String);

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Seconds, Granularity::Minutes, Granularity::Hours];

    pub fn bucket_width_ms(self) -> i64 {
        match self {
            Granularity::Seconds => MS_PER_SECOND,
            Granularity::Minutes => MS_PER_MINUTE,
            Granularity::Hours => MS_PER_HOUR,
        }
    }

    /// Next finer level for drill-down; `None` at seconds.
    pub fn finer(self) -> Option<Granularity> {
        match self {
            Granularity::Hours => Some(Granularity::Minutes),
            Granularity::Minutes => Some(Granularity::Seconds),
            Granularity::Seconds => None,
        }
    }

    /// Value substituted for `{{per}}` in the histogram query (e.g. "MINUTES").
    pub fn query_name(self) -> &'static str {
        match self {
            Granularity::Seconds => "SECONDS",
            Granularity::Minutes => "MINUTES",
            Granularity::Hours => "HOURS",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Seconds => "seconds",
            Granularity::Minutes => "minutes",
            Granularity::Hours => "hours",
        }
    }

    /// Singular unit, as shown on the selector buttons and the y-axis label.
    pub fn unit_name(self) -> &'static str {
        match self {
            Granularity::Seconds => "second",
            Granularity::Minutes => "minute",
            Granularity::Hours => "hour",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = GranularityParseError;

    /// Accepts singular or plural names in any case ("minute", "MINUTES").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.trim_end_matches('s') {
            "second" => Ok(Granularity::Seconds),
            "minute" => Ok(Granularity::Minutes),
            "hour" => Ok(Granularity::Hours),
            _ => Err(GranularityParseError(s.to_string())),
        }
    }
}
