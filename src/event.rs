//! Structured events emitted by the consumer and poller.
//!
//! Events are the queue's voice: every externally observable step of the
//! claim/process/archive protocol is reported through an [`EventSink`].
//! Sinks can forward to logs, dashboards, or test assertions; the protocol
//! code itself never writes to the console.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A structured event with its wall-clock timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

impl Event {
    /// Stamp an event kind with the current time.
    pub fn now(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The polling loop started against a root directory.
    PollStarted { root: PathBuf, interval_ms: u64 },
    /// A managed subdirectory (`working/` or `processed/`) was created.
    DirCreated { path: PathBuf },
    /// A candidate was claimed into `working/` under this instance's name.
    Claimed { candidate: PathBuf, claimed: PathBuf },
    /// The candidate vanished before the claim landed — a competitor owns it.
    LostRace { candidate: PathBuf },
    /// A processed file was moved to `processed/` under its original name.
    Archived { original: String, archived: PathBuf },
    /// A scan pass was abandoned. The loop continues on the next interval.
    ScanError { error: String },
    /// Cancellation was observed; the loop is exiting.
    ShutdownRequested,
}

/// Destination for queue events.
///
/// `emit` is synchronous and must not block for long — it runs inline in the
/// claim path.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Production sink: forwards events to the tracing layer with structured
/// fields. Lost races are routine, so they log at info, not warn.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        match &event.kind {
            EventKind::PollStarted { root, interval_ms } => {
                info!(root = %root.display(), interval_ms, "polling started");
            }
            EventKind::DirCreated { path } => {
                info!(path = %path.display(), "managed directory created");
            }
            EventKind::Claimed { candidate, claimed } => {
                info!(
                    candidate = %candidate.display(),
                    claimed = %claimed.display(),
                    "candidate claimed"
                );
            }
            EventKind::LostRace { candidate } => {
                info!(candidate = %candidate.display(), "lost claim race");
            }
            EventKind::Archived { original, archived } => {
                info!(original = %original, archived = %archived.display(), "file archived");
            }
            EventKind::ScanError { error } => {
                warn!(error = %error, "scan pass abandoned");
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested");
            }
        }
    }
}

/// Test sink: collects events into memory for later assertions.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Just the kinds, in emission order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.snapshot().into_iter().map(|e| e.kind).collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
