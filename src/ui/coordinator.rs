//! Coordinator - the single owner of the session
//!
//! Keypresses, refresh results and interrupts all end up here and are
//! applied one at a time on the thread that owns the terminal. After every
//! round the current frame is painted.
//!
//! ```text
//! RefreshWorker ──Refreshed──┐
//! signal flag ──Interrupt────┼──► Coordinator ──► Session::handle ──► Frame ──► Renderer
//! KeyReader ─────Key─────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use tracing::{debug, info};

use super::frame::Frame;
use super::screen::{KeyReader, Renderer};
use crate::core::{Session, SessionContext, SessionEvent};

pub struct Coordinator<'a> {
    session: Session,
    ctx: SessionContext<'a>,
    events: Receiver<SessionEvent>,
    interrupted: &'a AtomicBool,
    paint_interval: Duration,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        session: Session,
        ctx: SessionContext<'a>,
        events: Receiver<SessionEvent>,
        interrupted: &'a AtomicBool,
        paint_interval: Duration,
    ) -> Self {
        Coordinator {
            session,
            ctx,
            events,
            interrupted,
            paint_interval,
        }
    }

    /// Run until the session exits
    pub fn run<T: Renderer + KeyReader>(&mut self, terminal: &mut T) -> anyhow::Result<()> {
        info!(
            processes = self.session.all_processes().len(),
            "session started"
        );

        loop {
            self.drain_events();
            if self.session.is_exiting() {
                break;
            }

            terminal.paint(&Frame::build(&self.session));

            if let Some(key) = terminal.read_key(self.paint_interval) {
                debug!(?key, "key");
                self.session.handle(SessionEvent::Key(key), &self.ctx);
            }
            if self.session.is_exiting() {
                break;
            }
        }

        info!("session finished");
        Ok(())
    }

    /// Apply everything queued since the last round
    fn drain_events(&mut self) {
        if self.interrupted.swap(false, Ordering::SeqCst) {
            self.session.handle(SessionEvent::Interrupt, &self.ctx);
        }
        loop {
            match self.events.try_recv() {
                Ok(event) => self.session.handle(event, &self.ctx),
                Err(TryRecvError::Empty) => break,
                // Worker stopped; keep serving keys
                Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session {
        &self.session
    }
}
