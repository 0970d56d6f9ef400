//! Outer control loop and the background host that runs it

use crate::dispatcher::{ActionHandler, Dispatcher};
use crate::session::Session;
use anyhow::Context;
use courtbot_core::CancelToken;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub ticks: u64,
    pub handled_ticks: u64,
}

/// Ticks the dispatcher until the session stops
pub struct ControlLoop<H> {
    dispatcher: Dispatcher<H>,
    max_ticks: Option<u64>,
}

impl<H: ActionHandler> ControlLoop<H> {
    pub fn new(dispatcher: Dispatcher<H>) -> Self {
        Self {
            dispatcher,
            max_ticks: None,
        }
    }

    /// Stop after `ticks` ticks even if nobody cancels the session.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher<H> {
        &self.dispatcher
    }

    pub fn run(&mut self, session: &mut Session) -> LoopReport {
        let mut report = LoopReport::default();
        session.state_mut().reset();
        info!("Control loop started");

        while session.is_running() {
            if self.max_ticks.is_some_and(|max| report.ticks >= max) {
                info!("Tick limit of {} reached", report.ticks);
                break;
            }

            report.ticks += 1;
            if self.dispatcher.tick(session) {
                report.handled_ticks += 1;
            } else {
                debug!("Tick {}: nothing matched", report.ticks);
            }

            session.wait(session.timings().tick_interval());
        }

        info!(
            "Control loop finished: {} ticks, {} handled",
            report.ticks, report.handled_ticks
        );
        report
    }
}

/// Runs one session on a background thread.
///
/// The host only shares the cancel token with the session. `stop` asks the
/// session to exit and waits a bounded time for it to do so.
pub struct SessionHost {
    cancel: CancelToken,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl SessionHost {
    pub fn spawn<F>(body: F) -> crate::Result<Self>
    where
        F: FnOnce(CancelToken) + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let (tx, done) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("courtbot-session".to_string())
            .spawn(move || {
                body(token);
                let _ = tx.send(());
            })
            .context("Failed to spawn session thread")?;

        Ok(Self {
            cancel,
            done,
            handle: Some(handle),
        })
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether the session thread is still running its body
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Request a stop and wait up to `timeout`. Returns whether the session
    /// exited in time; a late session keeps running detached.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        self.cancel.stop();

        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.join();
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Session did not stop within {:?}", timeout);
                false
            }
        }
    }

    /// Wait for the session to finish on its own.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Session thread panicked");
            }
        }
    }
}
