// Histogram aggregation: gap-filled bucket series, trailing-window policy, drill-down.
// Pure functions; AggregatorState is owned by a single widget task.

use std::collections::HashMap;

use crate::models::{Bucket, BucketSeries, Granularity, Sample, Window};

/// Buckets kept before the snapped "now" in coarse trailing windows.
const TRAILING_BUCKETS: i64 = 61;
/// Seconds view: 70s back, ending 10s before now (the live edge is not aggregated yet).
const SECONDS_LOOKBACK_MS: i64 = 70_000;
const SECONDS_LIVE_MARGIN_MS: i64 = 10_000;

/// Dense series for `window`: one bucket per width step from `from` through `to`,
/// count taken from `samples` or 0. Samples off the grid are ignored; on duplicate
/// timestamps the last one wins.
pub fn build_series(samples: &[Sample], window: Window, granularity: Granularity) -> BucketSeries {
    let lookup: HashMap<i64, i64> = samples
        .iter()
        .filter(|s| window.contains(s.timestamp))
        .map(|s| (s.timestamp, s.count))
        .collect();

    let width = granularity.bucket_width_ms() as usize;
    let mut buckets = Vec::with_capacity(window.bucket_count(granularity));
    for x in (window.from()..=window.to()).step_by(width) {
        buckets.push(Bucket {
            x,
            y: lookup.get(&x).copied().unwrap_or(0),
        });
    }
    BucketSeries::from_buckets(buckets)
}

/// Floors `ts_ms` to the start of its granularity unit (UTC).
pub fn snap_down(ts_ms: i64, granularity: Granularity) -> i64 {
    let width = granularity.bucket_width_ms();
    ts_ms.div_euclid(width) * width
}

/// Trailing window ending near `now_ms`, snapped to the unit start.
pub fn initial_window(granularity: Granularity, now_ms: i64) -> Window {
    let snapped = snap_down(now_ms, granularity);
    let width = granularity.bucket_width_ms();
    match granularity {
        Granularity::Hours | Granularity::Minutes => {
            Window::from_ordered(snapped - TRAILING_BUCKETS * width, snapped + width)
        }
        Granularity::Seconds => Window::from_ordered(
            snapped - SECONDS_LOOKBACK_MS,
            snapped - SECONDS_LIVE_MARGIN_MS,
        ),
    }
}

/// One level finer, covering the clicked bucket: `[t, t + width(current)]`.
/// `None` at seconds (terminal).
pub fn drill_down(current: Granularity, clicked: i64) -> Option<(Granularity, Window)> {
    let next = current.finer()?;
    let window = Window::from_ordered(clicked, clicked.saturating_add(current.bucket_width_ms()));
    Some((next, window))
}

/// Trailing window for `granularity` at the current wall-clock time.
pub fn refresh(granularity: Granularity) -> Window {
    initial_window(granularity, now_millis())
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// What the widget currently shows: granularity, window and series of the last
/// applied query result. Pending queries never touch it; clicks are read against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorState {
    granularity: Granularity,
    window: Window,
    series: BucketSeries,
}

impl AggregatorState {
    pub fn new(granularity: Granularity, now_ms: i64) -> Self {
        Self {
            granularity,
            window: initial_window(granularity, now_ms),
            series: BucketSeries::default(),
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn series(&self) -> &BucketSeries {
        &self.series
    }

    /// Level and window a click on the shown bucket `clicked` asks for.
    /// `None` when the shown level is seconds.
    pub fn drill_target(&self, clicked: i64) -> Option<(Granularity, Window)> {
        drill_down(self.granularity, clicked)
    }

    /// Commits a query result: `granularity` and `window` become the shown level.
    pub fn apply(
        &mut self,
        granularity: Granularity,
        window: Window,
        samples: &[Sample],
    ) -> &BucketSeries {
        self.granularity = granularity;
        self.window = window;
        self.series = build_series(samples, window, granularity);
        &self.series
    }
}
