use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::thread;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::session::{Session, SessionError};
use crate::terminal::cli::Cli;
use crate::terminal::error::CliError;
use crate::transport::websocket::WebSocketConnector;
use crate::view::{TerminalSurface, ViewController};

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.mirror_config();
    let endpoint = config.endpoint()?;
    let policy = config.reconnect_policy();
    info!(
        target: "spyglass::app",
        %endpoint,
        delay_ms = policy.delay.as_millis() as u64,
        backoff = ?policy.backoff,
        "starting mirror"
    );

    let view = ViewController::new(TerminalSurface::stdout())?;
    let mut session = Session::new(Arc::new(WebSocketConnector), view).with_policy(policy);

    let result = session.run_until(&endpoint, shutdown_signal()).await;
    let stats = session.stats();
    info!(
        target: "spyglass::app",
        attempts = stats.connect_attempts,
        opened = stats.connections_opened,
        applied = stats.frames_applied,
        dropped = stats.frames_dropped,
        "mirror stopped"
    );
    finish(result, session.close())
}

/// The session's own outcome wins; a failed teardown is only reported when
/// the session itself ended cleanly.
fn finish(result: Result<(), SessionError>, closed: Result<(), SessionError>) -> Result<(), CliError> {
    match (result, closed) {
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                warn!(target: "spyglass::app", error = %close_err, "failed to release terminal");
            }
            Err(err.into())
        }
        (Ok(()), closed) => Ok(closed?),
    }
}

async fn shutdown_signal() {
    let interrupt = spawn_interrupt_watcher();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!(target: "spyglass::app", error = %err, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        }
        Ok(()) = interrupt => {}
    }
}

/// Raw mode turns Ctrl-C into a plain key event, so watch for it on the tty.
/// Every other keystroke is read and discarded; none reach the mirrored view.
fn spawn_interrupt_watcher() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    if !io::stdin().is_terminal() {
        return rx;
    }
    thread::spawn(move || {
        loop {
            match event::read() {
                Ok(Event::Key(key)) if is_interrupt(&key) => {
                    debug!(target: "spyglass::app", "interrupt key received");
                    let _ = tx.send(());
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "spyglass::app", error = %err, "stopped watching terminal input");
                    return;
                }
            }
        }
    });
    rx
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
        && key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
}
