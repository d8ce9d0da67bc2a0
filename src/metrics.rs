use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters for the operational `/metrics` endpoints.
#[derive(Clone)]
pub struct Metrics {
    pub codes_sent: Arc<AtomicU64>,
    pub tokens_issued: Arc<AtomicU64>,
    pub token_failures: Arc<AtomicU64>,
    pub titles_created: Arc<AtomicU64>,
    pub reviews_created: Arc<AtomicU64>,
    pub comments_created: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            codes_sent: Arc::new(AtomicU64::new(0)),
            tokens_issued: Arc::new(AtomicU64::new(0)),
            token_failures: Arc::new(AtomicU64::new(0)),
            titles_created: Arc::new(AtomicU64::new(0)),
            reviews_created: Arc::new(AtomicU64::new(0)),
            comments_created: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_codes_sent(&self) {
        self.codes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tokens_issued(&self) {
        self.tokens_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_token_failures(&self) {
        self.token_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_titles_created(&self) {
        self.titles_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reviews_created(&self) {
        self.reviews_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_comments_created(&self) {
        self.comments_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            codes_sent: self.codes_sent.load(Ordering::Relaxed),
            tokens_issued: self.tokens_issued.load(Ordering::Relaxed),
            token_failures: self.token_failures.load(Ordering::Relaxed),
            titles_created: self.titles_created.load(Ordering::Relaxed),
            reviews_created: self.reviews_created.load(Ordering::Relaxed),
            comments_created: self.comments_created.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub codes_sent: u64,
    pub tokens_issued: u64,
    pub token_failures: u64,
    pub titles_created: u64,
    pub reviews_created: u64,
    pub comments_created: u64,
    pub uptime_seconds: u64,
}
