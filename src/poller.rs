//! Poller: periodic scan-and-dispatch over the poll root.
//!
//! Lists the root, feeds every regular file to the consumer sequentially,
//! then sleeps for the configured interval. One bad pass never takes the
//! process down: the pass is abandoned, reported, and the loop continues.
//! Cancellation is explicit — `run` exits when `shutdown` is called, and the
//! caller chooses the task or thread that drives it.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tracing::debug;

use crate::consumer::{Consumer, Outcome};
use crate::error::{Error, Result};
use crate::event::{Event, EventKind, EventSink};
use crate::processor::Processor;

/// A scan loop is considered stalled after this many missed intervals.
const HEALTH_MULTIPLIER: u32 = 10;

/// Configuration for the polling loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Directory where candidates appear.
    pub poll_root: PathBuf,
    /// Pause between scan passes.
    pub interval: Duration,
}

impl PollConfig {
    pub fn new(poll_root: impl Into<PathBuf>) -> Self {
        Self {
            poll_root: poll_root.into(),
            interval: Duration::from_millis(500),
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Drives one [`Consumer`] against a continuously refreshed candidate set.
pub struct Poller<P> {
    consumer: Arc<Consumer<P>>,
    config: PollConfig,
    shutdown: Arc<Notify>,
    last_scan: Arc<Mutex<Instant>>,
    events: Arc<dyn EventSink>,
}

impl<P> Clone for Poller<P> {
    fn clone(&self) -> Self {
        Self {
            consumer: Arc::clone(&self.consumer),
            config: self.config.clone(),
            shutdown: Arc::clone(&self.shutdown),
            last_scan: Arc::clone(&self.last_scan),
            events: Arc::clone(&self.events),
        }
    }
}

impl<P: Processor> Poller<P> {
    pub fn new(consumer: Consumer<P>, config: PollConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            consumer: Arc::new(consumer),
            config,
            shutdown: Arc::new(Notify::new()),
            last_scan: Arc::new(Mutex::new(Instant::now())),
            events,
        }
    }

    /// Request the loop to exit. Takes effect at the next cancellation
    /// check; an in-flight scan pass finishes its current candidate first.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Pull-based liveness probe: true while the last clean scan pass is
    /// more recent than ten poll intervals ago.
    pub fn is_healthy(&self) -> bool {
        let last = *self
            .last_scan
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        last.elapsed() < self.config.interval * HEALTH_MULTIPLIER
    }

    /// Run the scan loop until cancelled.
    ///
    /// Exits with `Ok(())` when the caller invokes [`Poller::shutdown`].
    /// Scan-level errors (i/o faults, processor failures) abandon the pass
    /// and are reported through the event sink; they never end the loop.
    pub async fn run(&self) -> Result<()> {
        self.events.emit(Event::now(EventKind::PollStarted {
            root: self.config.poll_root.clone(),
            interval_ms: self.config.interval.as_millis() as u64,
        }));

        loop {
            match self.scan().await {
                Ok(archived) => {
                    if archived > 0 {
                        debug!(archived, "scan pass complete");
                    }
                    *self
                        .last_scan
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Instant::now();
                }
                Err(e) => {
                    self.events.emit(Event::now(EventKind::ScanError {
                        error: e.to_string(),
                    }));
                }
            }

            tokio::select! {
                _ = self.shutdown.notified() => {
                    self.events.emit(Event::now(EventKind::ShutdownRequested));
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    /// One scan pass: list the root, accept every regular file in listing
    /// order, one candidate fully handled before the next begins.
    async fn scan(&self) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.config.poll_root)
            .await
            .map_err(|e| Error::io(&self.config.poll_root, e))?;

        let mut archived = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io(&self.config.poll_root, e))?
        {
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                // Listed but gone by stat time — a competitor was faster.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io(entry.path(), e)),
            };
            if !file_type.is_file() {
                continue;
            }

            match self.consumer.accept(&entry.path()).await? {
                Outcome::Archived { .. } => archived += 1,
                Outcome::LostRace => {}
            }
        }

        Ok(archived)
    }
}
