// Presentation shape pushed to rendering surfaces (HTTP + /ws/histogram).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BucketSeries, Granularity, Window};

/// Tooltip and axis timestamp format, e.g. "18-10-2026, 09:05:00 AM".
pub const LABEL_TIME_FORMAT: &str = "%d-%m-%Y, %I:%M:%S %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetStatus {
    /// No query result received yet.
    Loading,
    Ready,
    /// Provider configuration could not be built; nothing will be queried.
    ConfigurationError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledBucket {
    pub x: i64,
    pub y: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramView {
    pub status: WidgetStatus,
    pub granularity: Granularity,
    pub window: Window,
    pub buckets: Vec<LabeledBucket>,
    pub subheading: String,
    pub x_axis_label: String,
    pub y_axis_label: String,
    /// False at the finest granularity; clicks there are ignored.
    pub drillable: bool,
}

impl HistogramView {
    pub fn loading(granularity: Granularity, window: Window) -> Self {
        Self::build(WidgetStatus::Loading, granularity, window, &BucketSeries::default())
    }

    pub fn ready(granularity: Granularity, window: Window, series: &BucketSeries) -> Self {
        Self::build(WidgetStatus::Ready, granularity, window, series)
    }

    pub fn configuration_error(granularity: Granularity, window: Window) -> Self {
        Self::build(
            WidgetStatus::ConfigurationError,
            granularity,
            window,
            &BucketSeries::default(),
        )
    }

    fn build(
        status: WidgetStatus,
        granularity: Granularity,
        window: Window,
        series: &BucketSeries,
    ) -> Self {
        let buckets = series
            .iter()
            .map(|b| LabeledBucket {
                x: b.x,
                y: b.y,
                label: format!("{} : {}", format_timestamp(b.x), b.y),
            })
            .collect();
        Self {
            status,
            granularity,
            window,
            buckets,
            subheading: format!("{} view", granularity),
            x_axis_label: format!(
                "{} to {}",
                format_timestamp(window.from()),
                format_timestamp(window.to())
            ),
            y_axis_label: format!("request per {}", granularity.unit_name()),
            drillable: granularity.finer().is_some(),
        }
    }
}

/// Formats epoch millis with [`LABEL_TIME_FORMAT`] in UTC; out-of-range values print raw.
pub fn format_timestamp(ts_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ts_ms) {
        Some(dt) => dt.format(LABEL_TIME_FORMAT).to_string(),
        None => ts_ms.to_string(),
    }
}
