pub mod reconnect;

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::protocol;
use crate::transport::{Connector, Endpoint, FrameStream};
use crate::view::{DisplaySurface, ViewController, ViewError};

pub use reconnect::{Backoff, ReconnectPolicy, ReconnectState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("gave up after {attempts} consecutive reconnect attempts")]
    RetriesExhausted { attempts: u32 },
    #[error(transparent)]
    View(#[from] ViewError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub connect_attempts: u64,
    pub connections_opened: u64,
    pub frames_applied: u64,
    pub frames_dropped: u64,
}

/// One mirror session: a single connection at a time, a reconnect timer,
/// and the view it keeps in sync.
pub struct Session<S: DisplaySurface> {
    connector: Arc<dyn Connector>,
    view: ViewController<S>,
    policy: ReconnectPolicy,
    reconnect: ReconnectState,
    state_tx: watch::Sender<ConnectionState>,
    stats: SessionStats,
}

impl<S: DisplaySurface> Session<S> {
    pub fn new(connector: Arc<dyn Connector>, view: ViewController<S>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        Self {
            connector,
            view,
            policy: ReconnectPolicy::default(),
            reconnect: ReconnectState::default(),
            state_tx,
            stats: SessionStats::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn view(&self) -> &ViewController<S> {
        &self.view
    }

    /// Mirror `endpoint` until the reconnect policy gives up. With the
    /// default policy this never returns.
    pub async fn run(&mut self, endpoint: &Endpoint) -> Result<(), SessionError> {
        self.run_until(endpoint, std::future::pending()).await
    }

    /// Like [`Session::run`], but stops cleanly once `shutdown` completes.
    /// Any live connection or pending reconnect timer is dropped.
    pub async fn run_until<F>(&mut self, endpoint: &Endpoint, shutdown: F) -> Result<(), SessionError>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            biased;
            _ = shutdown => {
                info!(target: "spyglass::session", %endpoint, "session shutdown requested");
                Ok(())
            }
            result = self.drive(endpoint) => result,
        };
        self.set_state(ConnectionState::Closed);
        result
    }

    /// Release the display surface.
    pub fn close(mut self) -> Result<(), SessionError> {
        self.view.close()?;
        Ok(())
    }

    // Default logging goes to the same tty as the mirror, so nothing on the
    // reconnect or dispatch path logs above info.
    async fn drive(&mut self, endpoint: &Endpoint) -> Result<(), SessionError> {
        loop {
            self.set_state(ConnectionState::Connecting);
            self.stats.connect_attempts += 1;
            debug!(
                target: "spyglass::session",
                %endpoint,
                attempt = self.reconnect.attempt() + 1,
                "connecting"
            );

            match self.connector.connect(endpoint).await {
                Ok(stream) => {
                    self.on_open(endpoint);
                    self.pump(stream).await;
                    info!(target: "spyglass::session", %endpoint, "connection closed");
                }
                Err(err) => {
                    info!(target: "spyglass::session", %endpoint, error = %err, "connect failed");
                }
            }

            // The stream is dropped by now, so the next attempt never
            // overlaps a live socket.
            self.set_state(ConnectionState::Closed);
            let attempt = self.reconnect.record_close();
            if !self.policy.should_retry(attempt) {
                info!(target: "spyglass::session", attempt, "reconnect attempts exhausted");
                return Err(SessionError::RetriesExhausted {
                    attempts: attempt.saturating_sub(1),
                });
            }
            let delay = self.policy.delay_for(attempt);
            debug!(
                target: "spyglass::session",
                delay_ms = delay.as_millis() as u64,
                attempt,
                "scheduling reconnect"
            );
            sleep(delay).await;
        }
    }

    fn on_open(&mut self, endpoint: &Endpoint) {
        self.reconnect.reset();
        self.stats.connections_opened += 1;
        self.set_state(ConnectionState::Open);
        info!(target: "spyglass::session", %endpoint, "connection open");
        if let Err(err) = self.view.prepare_for_fresh_connection() {
            info!(target: "spyglass::session", error = %err, "failed to clear view on open");
        }
    }

    async fn pump(&mut self, mut stream: Box<dyn FrameStream>) {
        while let Some(next) = stream.next_frame().await {
            match next {
                Ok(frame) => self.dispatch(frame),
                Err(err) => {
                    info!(target: "spyglass::session", error = %err, "connection error");
                    break;
                }
            }
        }
    }

    fn dispatch(&mut self, frame: Bytes) {
        let command = protocol::decode(frame);
        if command.is_unknown() {
            self.stats.frames_dropped += 1;
            return;
        }
        let kind = command.describe();
        match self.view.apply(command) {
            Ok(_) => self.stats.frames_applied += 1,
            Err(err) => {
                self.stats.frames_dropped += 1;
                info!(target: "spyglass::session", command = kind, error = %err, "failed to apply frame");
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(target: "spyglass::session", from = ?previous, to = ?state, "state transition");
        }
    }
}
