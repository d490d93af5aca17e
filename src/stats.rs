//! Active route counters shared by every feed task.
//!
//! Each feed reports how many prefixes it announced in its last completed cycle,
//! the aggregate is kept as the sum of those per-feed counts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FeedStats {
    /// Active routes across every feed
    pub total: usize,
    /// Active routes per feed URL, as of its last completed cycle
    pub feeds: HashMap<String, usize>,
}

/// Outcome of recording one cycle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleRecord {
    pub previous: usize,
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<FeedStats>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `feed`'s count with `success` and adjust the total by the difference.
    ///   Per-feed and total are updated under one lock so `total == sum(feeds)` always holds
    pub async fn record_cycle(&self, feed: &str, success: usize) -> CycleRecord {
        let mut stats = self.inner.lock().await;
        let previous = stats.feeds.insert(feed.to_string(), success).unwrap_or(0);
        stats.total = stats.total - previous + success;
        CycleRecord {
            previous,
            current: success,
            total: stats.total,
        }
    }

    pub async fn feed_count(&self, feed: &str) -> usize {
        self.inner.lock().await.feeds.get(feed).copied().unwrap_or(0)
    }

    pub async fn total(&self) -> usize {
        self.inner.lock().await.total
    }

    /// Independent copy of the current counters
    pub async fn snapshot(&self) -> FeedStats {
        self.inner.lock().await.clone()
    }
}
