//! Consumer: the claim → process → archive protocol for one candidate.
//!
//! Claiming is an atomic rename out of the poll root into `working/` under a
//! per-instance name. The rename is the only synchronization primitive: the
//! filesystem guarantees at most one caller sees it succeed, and every loser
//! observes the source vanishing. After the processor runs, a second rename
//! archives the file to `processed/` under its original name, replacing any
//! previous entry.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::event::{Event, EventKind, EventSink};
use crate::identity::ConsumerId;
use crate::processor::Processor;

/// Name of the claimed-but-not-archived area under the poll root.
pub const WORKING_DIR: &str = "working";
/// Name of the archive area under the poll root.
pub const PROCESSED_DIR: &str = "processed";

/// What happened when a candidate was offered to [`Consumer::accept`].
#[derive(Debug)]
pub enum Outcome {
    /// Claimed, processed, and archived at this path.
    Archived { archived: PathBuf },
    /// The candidate was gone by claim time — a competitor owns it now.
    LostRace,
}

/// Protocol object bound to one poll root and one instance identity.
///
/// Stateless between calls; safe to drive directly without a poller.
pub struct Consumer<P> {
    id: ConsumerId,
    working: PathBuf,
    processed: PathBuf,
    processor: P,
    events: Arc<dyn EventSink>,
}

impl<P: Processor> Consumer<P> {
    /// Bind a consumer to a poll root, idempotently creating the `working/`
    /// and `processed/` areas. Creation races with other instances are
    /// tolerated: whoever loses treats AlreadyExists as success.
    pub async fn create(
        root: &Path,
        id: ConsumerId,
        processor: P,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let working = ensure_dir(root.join(WORKING_DIR), events.as_ref()).await?;
        let processed = ensure_dir(root.join(PROCESSED_DIR), events.as_ref()).await?;

        debug!(id = %id, root = %root.display(), "consumer ready");

        Ok(Self {
            id,
            working,
            processed,
            processor,
            events,
        })
    }

    pub fn id(&self) -> &ConsumerId {
        &self.id
    }

    /// Claim, process, and archive one candidate file.
    ///
    /// A normal return means the candidate is either fully archived or was
    /// never claimed by this instance (lost race). A processor failure
    /// propagates as [`Error::Processor`] and leaves the claimed file in
    /// `working/` — the claim is not rolled back.
    pub async fn accept(&self, candidate: &Path) -> Result<Outcome> {
        let Some(original) = candidate.file_name().map(OsStr::to_os_string) else {
            return Err(Error::io(
                candidate,
                io::Error::new(io::ErrorKind::InvalidInput, "candidate has no file name"),
            ));
        };

        let claimed = self.working.join(self.claim_name(&original));

        match tokio::fs::rename(candidate, &claimed).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(self.lost_race(candidate));
            }
            Err(e) => return Err(Error::io(candidate, e)),
        }

        // Rename reported success but the destination is gone: should not
        // happen, treated as a second manifestation of the lost race.
        match tokio::fs::try_exists(&claimed).await {
            Ok(true) => {}
            Ok(false) => return Ok(self.lost_race(candidate)),
            Err(e) => return Err(Error::io(&claimed, e)),
        }

        self.events.emit(Event::now(EventKind::Claimed {
            candidate: candidate.to_path_buf(),
            claimed: claimed.clone(),
        }));

        // Typically transactional domain work. Not rolled back on a later
        // failure; errors have to be looked into manually.
        self.processor
            .process(claimed.clone())
            .await
            .map_err(|source| Error::Processor {
                file: claimed.clone(),
                source,
            })?;

        // Archive under the original name. rename replaces an existing
        // destination, so re-archival of the same name is last-writer-wins.
        let archived = self.processed.join(&original);
        tokio::fs::rename(&claimed, &archived)
            .await
            .map_err(|e| Error::io(&claimed, e))?;

        self.events.emit(Event::now(EventKind::Archived {
            original: original.to_string_lossy().into_owned(),
            archived: archived.clone(),
        }));

        Ok(Outcome::Archived { archived })
    }

    /// Claimed filename: `<identity>.<originalFileName>`.
    fn claim_name(&self, original: &OsStr) -> OsString {
        let mut name = OsString::from(format!("{}.", self.id));
        name.push(original);
        name
    }

    fn lost_race(&self, candidate: &Path) -> Outcome {
        debug!(candidate = %candidate.display(), "candidate already taken");
        self.events.emit(Event::now(EventKind::LostRace {
            candidate: candidate.to_path_buf(),
        }));
        Outcome::LostRace
    }
}

/// Create a managed directory if absent. AlreadyExists means another
/// instance got there first, which is fine.
async fn ensure_dir(path: PathBuf, events: &dyn EventSink) -> Result<PathBuf> {
    match tokio::fs::create_dir(&path).await {
        Ok(()) => {
            events.emit(Event::now(EventKind::DirCreated { path: path.clone() }));
            Ok(path)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(e) => Err(Error::io(path, e)),
    }
}
