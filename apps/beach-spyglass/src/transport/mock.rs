use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;

use super::{Connector, Endpoint, FrameStream, TransportError};

/// What a single scripted connection does once opened.
#[derive(Debug, Clone)]
pub enum ScriptedConnection {
    /// The connect attempt fails.
    Refuse,
    /// Deliver the frames, then close cleanly.
    Frames(Vec<Bytes>),
    /// Deliver the frames, then fail with a transport error.
    FramesThenError(Vec<Bytes>),
    /// Deliver the frames, then stay open forever.
    FramesThenHold(Vec<Bytes>),
}

#[derive(Debug, Default)]
struct Counters {
    live: AtomicUsize,
    max_live: AtomicUsize,
}

/// Connector that plays back scripted connections in order, then repeats
/// `fallback` forever.
pub struct MockConnector {
    scripts: Mutex<VecDeque<ScriptedConnection>>,
    fallback: ScriptedConnection,
    attempts: Mutex<Vec<Instant>>,
    counters: Arc<Counters>,
}

impl MockConnector {
    pub fn new(scripts: impl IntoIterator<Item = ScriptedConnection>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            fallback: ScriptedConnection::Frames(Vec::new()),
            attempts: Mutex::new(Vec::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Replace what happens once the scripts run out (default: open then
    /// close immediately).
    pub fn with_fallback(mut self, fallback: ScriptedConnection) -> Self {
        self.fallback = fallback;
        self
    }

    /// Times of every connect call, in order.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts
            .lock()
            .map(|attempts| attempts.clone())
            .unwrap_or_default()
    }

    /// The most connections that were ever open at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }

    fn next_script(&self) -> ScriptedConnection {
        self.scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn FrameStream>, TransportError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(Instant::now());
        }
        let (frames, ending) = match self.next_script() {
            ScriptedConnection::Refuse => {
                return Err(TransportError::Refused(endpoint.to_string()));
            }
            ScriptedConnection::Frames(frames) => (frames, Ending::Close),
            ScriptedConnection::FramesThenError(frames) => (frames, Ending::Error),
            ScriptedConnection::FramesThenHold(frames) => (frames, Ending::Hold),
        };

        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(MockFrames {
            frames: frames.into(),
            ending: Some(ending),
            counters: self.counters.clone(),
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum Ending {
    Close,
    Error,
    Hold,
}

struct MockFrames {
    frames: VecDeque<Bytes>,
    ending: Option<Ending>,
    counters: Arc<Counters>,
}

#[async_trait]
impl FrameStream for MockFrames {
    async fn next_frame(&mut self) -> Option<Result<Bytes, TransportError>> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        match self.ending.take() {
            Some(Ending::Error) => Some(Err(TransportError::Refused(
                "scripted connection error".to_string(),
            ))),
            Some(Ending::Hold) => std::future::pending().await,
            Some(Ending::Close) | None => None,
        }
    }
}

impl Drop for MockFrames {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}
