// Domain models: granularity, windows, samples/buckets, views, ingest events

mod granularity;
mod request;
mod series;
mod view;
mod window;

pub use granularity::{
    Granularity, GranularityParseError, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND,
};
pub use request::ApiRequest;
pub use series::{Bucket, BucketSeries, Sample};
pub use view::{HistogramView, LABEL_TIME_FORMAT, LabeledBucket, WidgetStatus, format_timestamp};
pub use window::{Window, WindowError};
