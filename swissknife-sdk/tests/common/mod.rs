//! Shared fixtures for coordinator integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use swissknife_sdk::{Fetcher, Subscriber, SubscriberError};
use swissknife_types::{ErrorKind, FetchResult, Reading, SourceId};

/// Replies with a scripted sequence of results, repeating the last one.
#[derive(Debug)]
pub struct Scripted {
    id: SourceId,
    delay: Duration,
    script: Mutex<Vec<FetchResult>>,
    pub calls: AtomicUsize,
}

impl Scripted {
    pub fn new(id: impl Into<SourceId>, script: Vec<FetchResult>) -> Self {
        Self {
            id: id.into(),
            delay: Duration::ZERO,
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn ok(id: impl Into<SourceId>, value: f64) -> Self {
        Self::new(id, vec![Reading::new(value).into()])
    }

    pub fn failing(id: impl Into<SourceId>) -> Self {
        Self::new(id, vec![FetchResult::failure(ErrorKind::HttpStatus, "503")])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for Scripted {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn endpoint(&self) -> &str {
        "scripted://"
    }

    async fn fetch(&self) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut script = self.script.lock();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script[0].clone()
        }
    }
}

/// Never answers.
#[derive(Debug)]
pub struct Hanging(pub SourceId);

#[async_trait]
impl Fetcher for Hanging {
    fn id(&self) -> &SourceId {
        &self.0
    }

    fn endpoint(&self) -> &str {
        "hanging://"
    }

    async fn fetch(&self) -> FetchResult {
        std::future::pending().await
    }
}

/// Counts refresh notifications.
#[derive(Debug, Default)]
pub struct Counter(AtomicUsize);

impl Counter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Subscriber for Counter {
    fn on_refresh(&self) -> Result<(), SubscriberError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
