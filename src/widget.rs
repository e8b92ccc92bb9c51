// Histogram widget task: owns the aggregator state, the refresh timer and the
// query subscription. Refresh ticks, granularity selection, bucket clicks and
// query responses are handled one at a time in a single select loop; the latest
// view is published on a watch channel for HTTP and WebSocket clients.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior, interval_at};
use tracing::Instrument;

use crate::aggregator::{AggregatorState, initial_window, now_millis, refresh as trailing_window};
use crate::config::AppConfig;
use crate::models::{Granularity, HistogramView, Window};
use crate::query::{ProviderConfig, QueryChannel, QueryRequest, QueryResponse, SubscriptionManager};

const COMMAND_CHANNEL_CAPACITY: usize = 32;
const RESPONSE_CHANNEL_CAPACITY: usize = 4;

/// Events sent to the widget by rendering surfaces.
#[derive(Debug)]
pub enum WidgetCommand {
    /// Granularity selector button: reset to the trailing window and re-arm the timer.
    SelectGranularity(Granularity),
    /// Bucket click on the shown view. Replies whether a finer query was issued.
    DrillDown {
        timestamp: i64,
        reply: Option<oneshot::Sender<bool>>,
    },
}

/// Cheap to clone; shared by routes and WebSocket sessions.
#[derive(Clone)]
pub struct WidgetHandle {
    commands: mpsc::Sender<WidgetCommand>,
    views: watch::Receiver<HistogramView>,
}

impl WidgetHandle {
    pub async fn select_granularity(&self, granularity: Granularity) -> anyhow::Result<()> {
        self.commands
            .send(WidgetCommand::SelectGranularity(granularity))
            .await
            .map_err(|_| anyhow::anyhow!("widget task has stopped"))
    }

    pub async fn drill_down(&self, timestamp: i64) -> anyhow::Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(WidgetCommand::DrillDown {
                timestamp,
                reply: Some(reply),
            })
            .await
            .map_err(|_| anyhow::anyhow!("widget task has stopped"))?;
        Ok(rx.await?)
    }

    pub fn current_view(&self) -> HistogramView {
        self.views.borrow().clone()
    }

    pub fn subscribe_views(&self) -> watch::Receiver<HistogramView> {
        self.views.clone()
    }
}

pub struct WidgetDeps<C> {
    pub channel: Arc<C>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub widget_id: String,
    pub query_name: String,
    pub query_template: String,
    pub default_granularity: Granularity,
    pub refresh_interval_ms: u64,
    pub selected_refresh_interval_ms: u64,
}

impl WidgetConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            widget_id: config.widget.widget_id.clone(),
            query_name: config.provider.query_name.clone(),
            query_template: config.provider.query.clone(),
            default_granularity: config.widget.default_granularity,
            refresh_interval_ms: config.widget.refresh_interval_ms,
            selected_refresh_interval_ms: config.widget.selected_refresh_interval_ms,
        }
    }
}

/// Timer whose first tick is one full period away (mount already issued a query).
fn refresh_timer(period_ms: u64) -> Interval {
    let period = Duration::from_millis(period_ms);
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

/// Ticks the timer if armed; pends forever otherwise.
async fn next_refresh(timer: &mut Option<Interval>) {
    match timer {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

pub fn spawn<C: QueryChannel>(
    deps: WidgetDeps<C>,
    config: WidgetConfig,
) -> (WidgetHandle, tokio::task::JoinHandle<()>) {
    let WidgetDeps {
        channel,
        mut shutdown_rx,
    } = deps;
    let WidgetConfig {
        widget_id,
        query_name,
        query_template,
        default_granularity,
        refresh_interval_ms,
        selected_refresh_interval_ms,
    } = config;

    let mut state = AggregatorState::new(default_granularity, now_millis());
    let (view_tx, view_rx) =
        watch::channel(HistogramView::loading(state.granularity(), state.window()));
    let (command_tx, mut command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let handle = WidgetHandle {
        commands: command_tx,
        views: view_rx,
    };

    let span = tracing::span!(tracing::Level::DEBUG, "widget", widget_id = %widget_id);
    let task = tokio::spawn(
        async move {
            let provider = match ProviderConfig::new(widget_id.as_str(), query_name, query_template)
            {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        operation = "load_provider_config",
                        "Cannot fetch provider configuration for widget"
                    );
                    view_tx.send_replace(HistogramView::configuration_error(
                        state.granularity(),
                        state.window(),
                    ));
                    None
                }
            };

            let (response_tx, mut response_rx) =
                mpsc::channel::<QueryResponse>(RESPONSE_CHANNEL_CAPACITY);
            let mut subscriptions = SubscriptionManager::new(channel, response_tx);
            let mut refresh = provider.as_ref().map(|_| refresh_timer(refresh_interval_ms));
            // Level the timer refreshes and the selector last asked for. The shown
            // level lives in `state` and only moves when a result is applied.
            let mut selected = default_granularity;

            let query = |subscriptions: &mut SubscriptionManager<C>,
                         granularity: Granularity,
                         window: Window| {
                if let Some(provider) = &provider {
                    subscriptions.subscribe(QueryRequest::new(provider.clone(), granularity, window));
                }
            };

            query(&mut subscriptions, state.granularity(), state.window());

            loop {
                tokio::select! {
                    _ = next_refresh(&mut refresh) => {
                        query(&mut subscriptions, selected, trailing_window(selected));
                    }
                    command = command_rx.recv() => {
                        let Some(command) = command else {
                            tracing::debug!("all widget handles dropped");
                            break;
                        };
                        match command {
                            WidgetCommand::SelectGranularity(granularity) => {
                                if provider.is_none() {
                                    tracing::debug!(%granularity, "ignoring selection: no provider configuration");
                                    continue;
                                }
                                tracing::info!(%granularity, "granularity selected");
                                selected = granularity;
                                // Replace, never stack, the refresh timer.
                                refresh = Some(refresh_timer(selected_refresh_interval_ms));
                                query(
                                    &mut subscriptions,
                                    granularity,
                                    initial_window(granularity, now_millis()),
                                );
                            }
                            WidgetCommand::DrillDown { timestamp, reply } => {
                                let target = provider
                                    .as_ref()
                                    .and_then(|_| state.drill_target(timestamp));
                                let applied = target.is_some();
                                match target {
                                    Some((granularity, window)) => {
                                        tracing::info!(
                                            timestamp,
                                            from = %state.granularity(),
                                            to = %granularity,
                                            "drilling into bucket"
                                        );
                                        // A drilled view stays until the next selection.
                                        refresh = None;
                                        query(&mut subscriptions, granularity, window);
                                    }
                                    None => tracing::debug!(timestamp, "drill-down ignored"),
                                }
                                if let Some(reply) = reply {
                                    let _ = reply.send(applied);
                                }
                            }
                        }
                    }
                    Some(response) = response_rx.recv() => {
                        if !subscriptions.is_current(response.generation) {
                            tracing::debug!(
                                generation = response.generation,
                                current = subscriptions.generation(),
                                "discarding stale query response"
                            );
                            continue;
                        }
                        match response.result {
                            Ok(samples) => {
                                state.apply(response.granularity, response.window, &samples);
                                tracing::debug!(
                                    operation = "histogram_query",
                                    rows = samples.len(),
                                    buckets = state.series().len(),
                                    total = state.series().total(),
                                    "histogram updated"
                                );
                                let view = HistogramView::ready(
                                    state.granularity(),
                                    state.window(),
                                    state.series(),
                                );
                                view_tx.send_replace(view);
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    operation = "histogram_query",
                                    "histogram query failed; keeping previous view"
                                );
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("widget shutting down");
                        break;
                    }
                }
            }
            subscriptions.unsubscribe();
        }
        .instrument(span),
    );

    (handle, task)
}
