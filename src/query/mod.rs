// Histogram query: immutable provider config, per-query placeholder values,
// the channel that executes rendered queries, and subscription bookkeeping.

mod subscription;

use std::future::Future;

use thiserror::Error;

use crate::models::{Granularity, Sample, Window};

pub use subscription::{QueryResponse, SubscriptionManager};

pub const FROM_PLACEHOLDER: &str = "{{from}}";
pub const TO_PLACEHOLDER: &str = "{{to}}";
pub const PER_PLACEHOLDER: &str = "{{per}}";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query template is missing placeholder {0}")]
    MissingPlaceholder(&'static str),
    #[error("provider query name must be non-empty")]
    EmptyQueryName,
    #[error("backend query failed: {0}")]
    Backend(String),
}

/// Which query the widget runs and its template. Built once, never mutated;
/// each query gets fresh [`QueryValues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    widget_id: String,
    query_name: String,
    query_template: String,
}

impl ProviderConfig {
    pub fn new(
        widget_id: impl Into<String>,
        query_name: impl Into<String>,
        query_template: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let query_name = query_name.into();
        if query_name.trim().is_empty() {
            return Err(QueryError::EmptyQueryName);
        }
        let query_template = query_template.into();
        for placeholder in [FROM_PLACEHOLDER, TO_PLACEHOLDER, PER_PLACEHOLDER] {
            if !query_template.contains(placeholder) {
                return Err(QueryError::MissingPlaceholder(placeholder));
            }
        }
        Ok(Self {
            widget_id: widget_id.into(),
            query_name,
            query_template,
        })
    }

    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    pub fn query_name(&self) -> &str {
        &self.query_name
    }

    pub fn query_template(&self) -> &str {
        &self.query_template
    }
}

/// Values for `{{from}}`, `{{to}}` (epoch millis) and `{{per}}` (e.g. "HOURS").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryValues {
    pub from: i64,
    pub to: i64,
    pub per: Granularity,
}

impl QueryValues {
    pub fn new(window: Window, granularity: Granularity) -> Self {
        Self {
            from: window.from(),
            to: window.to(),
            per: granularity,
        }
    }

    pub fn substitutions(&self) -> [(&'static str, String); 3] {
        [
            (FROM_PLACEHOLDER, self.from.to_string()),
            (TO_PLACEHOLDER, self.to.to_string()),
            (PER_PLACEHOLDER, self.per.query_name().to_string()),
        ]
    }
}

/// One histogram query: provider config plus the window/granularity it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub provider: ProviderConfig,
    pub granularity: Granularity,
    pub window: Window,
}

impl QueryRequest {
    pub fn new(provider: ProviderConfig, granularity: Granularity, window: Window) -> Self {
        Self {
            provider,
            granularity,
            window,
        }
    }

    pub fn values(&self) -> QueryValues {
        QueryValues::new(self.window, self.granularity)
    }

    /// Template with every placeholder substituted.
    pub fn render(&self) -> String {
        self.values()
            .substitutions()
            .iter()
            .fold(self.provider.query_template.clone(), |query, (key, value)| {
                query.replace(key, value)
            })
    }
}

/// Executes a rendered histogram query and returns `[timestamp, count]` rows.
pub trait QueryChannel: Send + Sync + 'static {
    fn execute(
        &self,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<Vec<Sample>, QueryError>> + Send;
}
