//! Graceful-shutdown state machine.
//!
//! The server moves through three states, driven only by interrupt signals
//! and listener-close completion, never by request traffic:
//! `Listening` → (first interrupt) → `Draining` → (in-flight work done) →
//! `Stopped`. A second interrupt while draining forces the process to exit.

use crate::error::ServerResult;
use std::process;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const LISTENING: u8 = 0;
const DRAINING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle state of the listening socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Accepting new connections normally
    Listening,
    /// No longer accepting; in-flight requests are allowed to finish
    Draining,
    /// Terminal: the listener is closed and no work remains
    Stopped,
}

/// Shared handle to the server lifecycle state. Cloned into the interrupt
/// handler and the event loop; the signal path only ever writes the
/// `Listening` → `Draining` transition, the event loop only writes
/// `Draining` → `Stopped`.
#[derive(Clone)]
pub struct ShutdownSignal {
    state: Arc<AtomicU8>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(LISTENING)),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServerState {
        match self.state.load(Ordering::SeqCst) {
            LISTENING => ServerState::Listening,
            DRAINING => ServerState::Draining,
            _ => ServerState::Stopped,
        }
    }

    /// Request a graceful drain. Returns true only for the transition out
    /// of `Listening`, so repeated signals are told the drain was already
    /// under way.
    pub fn begin_drain(&self) -> bool {
        self.state
            .compare_exchange(LISTENING, DRAINING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Mark the terminal state once the listener is closed and the last
    /// in-flight connection has finished
    pub fn mark_stopped(&self) {
        self.state.store(STOPPED, Ordering::SeqCst);
    }

    /// Install the interrupt handler: the first signal starts a graceful
    /// drain, a second one while draining terminates the process. The
    /// handler is a guard on the current state rather than a replaced
    /// handler, so re-entry is idempotent.
    pub fn install_interrupt_handler(&self) -> ServerResult<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            if signal.begin_drain() {
                log::info!("Gracefully stopping the server (CTRL-C again to force stop)");
            } else {
                log::warn!("Stopping the server forcefully");
                process::exit(1);
            }
        })?;
        Ok(())
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
