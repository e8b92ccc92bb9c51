// Inclusive [from, to] time range in epoch millis (UTC).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Granularity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window start {from} is after window end {to}")]
    Inverted { from: i64, to: i64 },
}

/// Time range the histogram covers. Always `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    from: i64,
    to: i64,
}

impl Window {
    pub fn new(from: i64, to: i64) -> Result<Self, WindowError> {
        if from > to {
            return Err(WindowError::Inverted { from, to });
        }
        Ok(Self { from, to })
    }

    /// For callers that derive `to` from `from` by adding a non-negative span.
    pub(crate) fn from_ordered(from: i64, to: i64) -> Self {
        debug_assert!(from <= to, "window start {from} after end {to}");
        Self { from, to }
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn to(&self) -> i64 {
        self.to
    }

    /// `floor((to - from) / width) + 1`: one bucket per width step starting at `from`.
    pub fn bucket_count(&self, granularity: Granularity) -> usize {
        ((self.to - self.from) / granularity.bucket_width_ms()) as usize + 1
    }

    pub fn contains(&self, ts: i64) -> bool {
        self.from <= ts && ts <= self.to
    }
}

impl<'de> Deserialize<'de> for Window {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            from: i64,
            to: i64,
        }
        let raw = Raw::deserialize(deserializer)?;
        Window::new(raw.from, raw.to).map_err(serde::de::Error::custom)
    }
}
