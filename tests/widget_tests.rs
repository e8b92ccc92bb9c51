// Widget task tests: mount query, granularity selection, drill-down, timers, faults

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use common::*;
use usage_histogram::models::{Granularity, Sample, Window, WidgetStatus};
use usage_histogram::query::{QueryChannel, QueryError, QueryRequest};

#[tokio::test]
async fn mount_queries_default_granularity_and_publishes_ready_view() {
    let channel = Arc::new(RecordingChannel::default());
    let (handle, _task, _shutdown) =
        spawn_widget(channel.clone(), widget_config(Granularity::Seconds));

    let view = wait_for_view(&handle, is_ready).await;
    assert_eq!(view.granularity, Granularity::Seconds);
    assert_eq!(view.buckets.len(), 61);
    assert_eq!(view.buckets[0].y, 7);
    assert!(view.buckets[1..].iter().all(|b| b.y == 0));
    assert_eq!(view.buckets[0].x, view.window.from());
    assert!(!view.drillable);

    let requests = channel.requests.lock().await;
    assert_eq!(requests.len(), 1);
    let rendered = requests[0].render();
    assert!(rendered.ends_with("per 'SECONDS'"), "{rendered}");
    assert!(rendered.contains(&view.window.from().to_string()));
}

#[tokio::test]
async fn select_granularity_resets_to_trailing_window() {
    let channel = Arc::new(RecordingChannel::default());
    let (handle, _task, _shutdown) =
        spawn_widget(channel.clone(), widget_config(Granularity::Seconds));
    wait_for_view(&handle, is_ready).await;

    handle.select_granularity(Granularity::Minutes).await.unwrap();
    let view = wait_for_view(&handle, |v| {
        is_ready(v) && v.granularity == Granularity::Minutes
    })
    .await;
    assert_eq!(view.buckets.len(), 63);
    for pair in view.buckets.windows(2) {
        assert_eq!(pair[0].x + 60_000, pair[1].x);
    }
    assert_eq!(view.y_axis_label, "request per minute");

    let requests = channel.requests.lock().await;
    assert!(requests.last().unwrap().render().ends_with("per 'MINUTES'"));
}

#[tokio::test]
async fn drill_down_walks_hours_minutes_seconds_then_stops() {
    let channel = Arc::new(RecordingChannel::default());
    let (handle, _task, _shutdown) =
        spawn_widget(channel.clone(), widget_config(Granularity::Hours));
    let view = wait_for_view(&handle, is_ready).await;
    assert!(view.drillable);

    let clicked = view.buckets[3].x;
    assert!(handle.drill_down(clicked).await.unwrap());
    let view = wait_for_view(&handle, |v| {
        is_ready(v) && v.granularity == Granularity::Minutes
    })
    .await;
    assert_eq!(view.window.from(), clicked);
    assert_eq!(view.window.to(), clicked + 3_600_000);
    assert_eq!(view.buckets.len(), 61);

    let clicked = view.buckets[10].x;
    assert!(handle.drill_down(clicked).await.unwrap());
    let view = wait_for_view(&handle, |v| {
        is_ready(v) && v.granularity == Granularity::Seconds
    })
    .await;
    assert_eq!(view.window.from(), clicked);
    assert_eq!(view.window.to(), clicked + 60_000);
    assert!(!view.drillable);

    let calls = channel.calls();
    assert!(!handle.drill_down(view.buckets[0].x).await.unwrap());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(channel.calls(), calls, "terminal drill-down must not query");
    assert_eq!(handle.current_view().granularity, Granularity::Seconds);
}

#[tokio::test]
async fn rapid_drill_downs_both_read_the_shown_level() {
    let channel = Arc::new(CoarseFirstChannel::delayed(Duration::from_millis(300)));
    let (handle, _task, _shutdown) =
        spawn_widget(channel.clone(), widget_config(Granularity::Hours));
    let view = wait_for_view(&handle, is_ready).await;

    let first = view.buckets[3].x;
    let second = view.buckets[5].x;
    assert!(handle.drill_down(first).await.unwrap());
    assert!(handle.drill_down(second).await.unwrap());

    let drilled = wait_for_view(&handle, |v| {
        is_ready(v) && v.granularity != Granularity::Hours
    })
    .await;
    assert_eq!(drilled.granularity, Granularity::Minutes);
    assert_eq!(drilled.window, Window::new(second, second + 3_600_000).unwrap());
    assert_eq!(drilled.buckets.len(), 61);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let view = handle.current_view();
    assert_eq!(view.granularity, Granularity::Minutes);
    assert_eq!(view.window, drilled.window);
}

#[tokio::test]
async fn failed_drill_query_keeps_clicks_on_the_shown_level() {
    let channel = Arc::new(CoarseFirstChannel::failing());
    let (handle, _task, _shutdown) =
        spawn_widget(channel.clone(), widget_config(Granularity::Hours));
    let view = wait_for_view(&handle, is_ready).await;

    assert!(handle.drill_down(view.buckets[3].x).await.unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;
    let shown = handle.current_view();
    assert_eq!(shown.status, WidgetStatus::Ready);
    assert_eq!(shown.granularity, Granularity::Hours);
    assert!(shown.drillable);

    let clicked = shown.buckets[5].x;
    assert!(handle.drill_down(clicked).await.unwrap());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let last = channel.last_request().await.unwrap();
    assert_eq!(last.granularity, Granularity::Minutes);
    assert_eq!(last.window, Window::new(clicked, clicked + 3_600_000).unwrap());
    assert_eq!(handle.current_view().granularity, Granularity::Hours);
}

/// Hours queries block their worker thread, so aborting the subscription cannot
/// stop them from answering. Finer levels answer at once.
#[derive(Default)]
struct BlockingHoursChannel {
    hours_answered: AtomicBool,
}

impl QueryChannel for BlockingHoursChannel {
    async fn execute(&self, request: &QueryRequest) -> Result<Vec<Sample>, QueryError> {
        if request.granularity == Granularity::Hours {
            std::thread::sleep(Duration::from_millis(200));
            self.hours_answered.store(true, Ordering::SeqCst);
        }
        Ok(vec![Sample::new(request.window.from(), 3)])
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 3)]
async fn superseded_query_answering_late_does_not_replace_view() {
    let channel = Arc::new(BlockingHoursChannel::default());
    let (handle, _task, _shutdown) =
        spawn_widget(channel.clone(), widget_config(Granularity::Hours));

    // Mount query is blocked in the channel; supersede it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.select_granularity(Granularity::Minutes).await.unwrap();
    let view = wait_for_view(&handle, |v| {
        is_ready(v) && v.granularity == Granularity::Minutes
    })
    .await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(channel.hours_answered.load(Ordering::SeqCst));
    let current = handle.current_view();
    assert_eq!(current.granularity, Granularity::Minutes);
    assert_eq!(current.window, view.window);
}

#[tokio::test]
async fn refresh_timer_requeries_until_drill_down() {
    let channel = Arc::new(RecordingChannel::default());
    let mut config = widget_config(Granularity::Hours);
    config.refresh_interval_ms = 40;
    let (handle, _task, _shutdown) = spawn_widget(channel.clone(), config);

    let view = wait_for_view(&handle, is_ready).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(channel.calls() >= 3, "calls = {}", channel.calls());

    assert!(handle.drill_down(view.buckets[0].x).await.unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_drill = channel.calls();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(channel.calls(), after_drill, "drilled view must not refresh");
    assert_eq!(handle.current_view().granularity, Granularity::Minutes);
}

#[tokio::test]
async fn selection_rearms_timer_at_selected_interval() {
    let channel = Arc::new(RecordingChannel::default());
    let mut config = widget_config(Granularity::Seconds);
    config.selected_refresh_interval_ms = 40;
    let (handle, _task, _shutdown) = spawn_widget(channel.clone(), config);

    wait_for_view(&handle, is_ready).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(channel.calls(), 1, "mount interval is a minute");

    handle.select_granularity(Granularity::Hours).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(channel.calls() >= 4, "calls = {}", channel.calls());
    assert_eq!(handle.current_view().granularity, Granularity::Hours);
}

#[tokio::test]
async fn bad_provider_template_is_a_configuration_error() {
    let channel = Arc::new(RecordingChannel::default());
    let mut config = widget_config(Granularity::Seconds);
    config.query_template = "within {{from}}, {{to}}".into();
    let (handle, _task, _shutdown) = spawn_widget(channel.clone(), config);

    let view = wait_for_view(&handle, |v| v.status == WidgetStatus::ConfigurationError).await;
    assert!(view.buckets.is_empty());

    assert!(!handle.drill_down(0).await.unwrap());
    handle.select_granularity(Granularity::Hours).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(channel.calls(), 0);
    assert_eq!(
        handle.current_view().status,
        WidgetStatus::ConfigurationError
    );
}

#[tokio::test]
async fn failed_query_keeps_previous_view() {
    let (handle, _task, _shutdown) =
        spawn_widget(Arc::new(FailingChannel), widget_config(Granularity::Minutes));
    tokio::time::sleep(Duration::from_millis(100)).await;
    let view = handle.current_view();
    assert_eq!(view.status, WidgetStatus::Loading);
    assert_eq!(view.granularity, Granularity::Minutes);
}

#[tokio::test]
async fn shutdown_stops_the_widget() {
    let channel = Arc::new(RecordingChannel::default());
    let (handle, task, shutdown) =
        spawn_widget(channel.clone(), widget_config(Granularity::Seconds));
    wait_for_view(&handle, is_ready).await;

    shutdown.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("widget task should exit")
        .unwrap();
    assert!(handle.select_granularity(Granularity::Hours).await.is_err());
}
