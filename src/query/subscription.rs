// At most one in-flight histogram query per widget. Every subscribe aborts the
// previous task and bumps the generation; responses carry the generation they
// were issued under so a late answer can be told apart from the current one.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{QueryChannel, QueryError, QueryRequest};
use crate::models::{Granularity, Sample, Window};

/// Exactly one per subscription, unless it was aborted first.
#[derive(Debug)]
pub struct QueryResponse {
    pub generation: u64,
    pub granularity: Granularity,
    pub window: Window,
    pub result: Result<Vec<Sample>, QueryError>,
}

pub struct SubscriptionManager<C> {
    channel: Arc<C>,
    tx: mpsc::Sender<QueryResponse>,
    generation: u64,
    active: Option<u64>,
    in_flight: Option<JoinHandle<()>>,
}

impl<C: QueryChannel> SubscriptionManager<C> {
    pub fn new(channel: Arc<C>, tx: mpsc::Sender<QueryResponse>) -> Self {
        Self {
            channel,
            tx,
            generation: 0,
            active: None,
            in_flight: None,
        }
    }

    /// Cancels any pending query, then issues `request`. Returns its generation.
    pub fn subscribe(&mut self, request: QueryRequest) -> u64 {
        self.unsubscribe();
        self.generation += 1;
        let generation = self.generation;
        self.active = Some(generation);

        let channel = self.channel.clone();
        let tx = self.tx.clone();
        tracing::debug!(
            generation,
            widget_id = request.provider.widget_id(),
            query_name = request.provider.query_name(),
            granularity = %request.granularity,
            from = request.window.from(),
            to = request.window.to(),
            "subscribing histogram query"
        );
        self.in_flight = Some(tokio::spawn(async move {
            let result = channel.execute(&request).await;
            let response = QueryResponse {
                generation,
                granularity: request.granularity,
                window: request.window,
                result,
            };
            if tx.send(response).await.is_err() {
                tracing::debug!(generation, "query response dropped: receiver closed");
            }
        }));
        generation
    }

    /// Aborts the in-flight query; any response already queued becomes stale.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.active = None;
    }

    /// True only for the generation of the latest, not yet cancelled subscription.
    pub fn is_current(&self, generation: u64) -> bool {
        self.active == Some(generation)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<C> Drop for SubscriptionManager<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
