// Shared test helpers: in-memory query channels and widget wiring

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use usage_histogram::models::{Granularity, HistogramView, Sample, WidgetStatus};
use usage_histogram::query::{QueryChannel, QueryError, QueryRequest};
use usage_histogram::widget::{self, WidgetConfig, WidgetDeps, WidgetHandle};

pub const TEST_TEMPLATE: &str = "within {{from}}, {{to}} per '{{per}}'";

/// Answers every query with one sample at the window start and records what it saw.
#[derive(Default)]
pub struct RecordingChannel {
    pub requests: Mutex<Vec<QueryRequest>>,
    pub calls: AtomicUsize,
}

impl RecordingChannel {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QueryChannel for RecordingChannel {
    async fn execute(&self, request: &QueryRequest) -> Result<Vec<Sample>, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        Ok(vec![Sample::new(request.window.from(), 7)])
    }
}

/// Always fails.
pub struct FailingChannel;

impl QueryChannel for FailingChannel {
    async fn execute(&self, _request: &QueryRequest) -> Result<Vec<Sample>, QueryError> {
        Err(QueryError::Backend("backend unavailable".into()))
    }
}

/// Answers hours queries at once; finer levels are answered after `finer_delay`,
/// or fail when `fail_finer` is set.
pub struct CoarseFirstChannel {
    pub finer_delay: Duration,
    pub fail_finer: bool,
    pub requests: Mutex<Vec<QueryRequest>>,
}

impl CoarseFirstChannel {
    pub fn delayed(finer_delay: Duration) -> Self {
        Self {
            finer_delay,
            fail_finer: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            finer_delay: Duration::ZERO,
            fail_finer: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn last_request(&self) -> Option<QueryRequest> {
        self.requests.lock().await.last().cloned()
    }
}

impl QueryChannel for CoarseFirstChannel {
    async fn execute(&self, request: &QueryRequest) -> Result<Vec<Sample>, QueryError> {
        self.requests.lock().await.push(request.clone());
        if request.granularity != Granularity::Hours {
            if self.fail_finer {
                return Err(QueryError::Backend("finer levels unavailable".into()));
            }
            tokio::time::sleep(self.finer_delay).await;
        }
        Ok(vec![Sample::new(request.window.from(), 1)])
    }
}

pub fn widget_config(default_granularity: Granularity) -> WidgetConfig {
    WidgetConfig {
        widget_id: "test-widget".into(),
        query_name: "query".into(),
        query_template: TEST_TEMPLATE.into(),
        default_granularity,
        refresh_interval_ms: 60_000,
        selected_refresh_interval_ms: 10_000,
    }
}

/// Spawns a widget; keep the returned sender alive for the widget's lifetime.
pub fn spawn_widget<C: QueryChannel>(
    channel: Arc<C>,
    config: WidgetConfig,
) -> (WidgetHandle, tokio::task::JoinHandle<()>, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (handle, task) = widget::spawn(
        WidgetDeps {
            channel,
            shutdown_rx,
        },
        config,
    );
    (handle, task, shutdown_tx)
}

/// Waits (up to 3s) for a published view matching `pred`.
pub async fn wait_for_view(
    handle: &WidgetHandle,
    pred: impl Fn(&HistogramView) -> bool,
) -> HistogramView {
    let mut views = handle.subscribe_views();
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        {
            let view = views.borrow_and_update();
            if pred(&*view) {
                return (*view).clone();
            }
        }
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, views.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => panic!("widget stopped before view matched"),
            Err(_) => panic!("timed out waiting for view; last: {:?}", *views.borrow()),
        }
    }
}

pub fn is_ready(view: &HistogramView) -> bool {
    view.status == WidgetStatus::Ready
}
