// Backend samples and the dense bucket series built from them.

use serde::{Deserialize, Serialize};

/// One backend row: bucket timestamp (epoch millis) and request count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub count: i64,
}

impl Sample {
    pub fn new(timestamp: i64, count: i64) -> Self {
        Self { timestamp, count }
    }
}

/// One chart bar: `x` is the bucket start, `y` the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub x: i64,
    pub y: i64,
}

/// Ascending, gap-free buckets for one window at one granularity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketSeries(Vec<Bucket>);

impl BucketSeries {
    pub(crate) fn from_buckets(buckets: Vec<Bucket>) -> Self {
        Self(buckets)
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> i64 {
        self.0.iter().map(|b| b.y).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bucket> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a BucketSeries {
    type Item = &'a Bucket;
    type IntoIter = std::slice::Iter<'a, Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
