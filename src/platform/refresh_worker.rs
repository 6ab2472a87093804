//! Background refresh of the process list
//!
//! # Architecture
//!
//! ```text
//! Main Thread                    Refresh Thread
//! ───────────                    ──────────────
//! RefreshWorker::spawn ────────► loop
//!                                  ├─► wait `interval` (or shutdown)
//!                                  ├─► Enumerator::snapshot()
//!   ◄──── SessionEvent::Refreshed ─┘
//! handle(event)
//!   │
//! drop(worker) ─── shutdown ────► exit loop, joined
//! ```
//!
//! The thread never touches session state; it only produces fresh lists.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, trace};

use crate::core::{Enumerator, SessionEvent};

/// Periodically re-enumerates processes and posts the result
#[derive(Debug)]
pub struct RefreshWorker {
    /// Dropping this wakes and stops the thread
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshWorker {
    /// Start the refresh thread
    pub fn spawn(
        enumerator: Enumerator,
        interval: Duration,
        events: Sender<SessionEvent>,
    ) -> Result<Self> {
        let (shutdown, stop) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("gruyere-refresh".to_string())
            .spawn(move || loop {
                match stop.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // Explicit stop or the owner went away
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let snapshot = enumerator.snapshot();
                trace!(
                    generation = snapshot.generation,
                    count = snapshot.records.len(),
                    "refresh complete"
                );
                if events.send(SessionEvent::Refreshed(snapshot)).is_err() {
                    // Session is gone
                    break;
                }
            })
            .context("failed to spawn refresh thread")?;

        debug!(?interval, "refresh worker started");
        Ok(RefreshWorker {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("refresh worker stopped");
        }
    }
}

impl Drop for RefreshWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::enumerator_tests::{raw, FakeSource};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_worker_posts_fresh_lists() {
        let source = Arc::new(FakeSource::with(vec![raw(1, "80", "root", "nginx")]));
        let (tx, rx) = mpsc::channel();
        let _worker =
            RefreshWorker::spawn(Enumerator::new(source.clone()), Duration::from_millis(10), tx)
                .unwrap();

        match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
            SessionEvent::Refreshed(snapshot) => assert_eq!(snapshot.records[0].pid, 1),
            other => panic!("unexpected event: {:?}", other),
        }

        source.set(vec![raw(2, "443", "root", "caddy")]);
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            assert!(Instant::now() < deadline, "refresh never picked up the change");
            if let SessionEvent::Refreshed(snapshot) = rx.recv_timeout(Duration::from_secs(2)).unwrap() {
                if snapshot.records.first().map(|r| r.pid) == Some(2) {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_stop_is_prompt() {
        let source = Arc::new(FakeSource::default());
        let (tx, _rx) = mpsc::channel();
        let mut worker =
            RefreshWorker::spawn(Enumerator::new(source), Duration::from_secs(60), tx).unwrap();

        let started = Instant::now();
        worker.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        // Second stop is a no-op
        worker.stop();
    }

    #[test]
    fn test_worker_exits_when_receiver_dropped() {
        let source = Arc::new(FakeSource::default());
        let (tx, rx) = mpsc::channel();
        let mut worker =
            RefreshWorker::spawn(Enumerator::new(source), Duration::from_millis(5), tx).unwrap();
        drop(rx);
        std::thread::sleep(Duration::from_millis(50));
        assert!(worker.handle.as_ref().is_some_and(|h| h.is_finished()));
        worker.stop();
    }
}
