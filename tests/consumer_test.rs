//! Integration tests for the claim/process/archive protocol.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use dirq::consumer::{Consumer, Outcome, PROCESSED_DIR, WORKING_DIR};
use dirq::error::Error;
use dirq::event::{EventKind, EventSink, MemorySink};
use dirq::identity::ConsumerId;
use dirq::processor::{Processor, processor_fn};

fn node(name: &str) -> ConsumerId {
    ConsumerId::new(name)
}

/// A processor that records every claimed path it was invoked with.
fn recording() -> (Arc<Mutex<Vec<PathBuf>>>, impl Processor) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let kept = Arc::clone(&seen);
    let processor = processor_fn(move |claimed: PathBuf| {
        let kept = Arc::clone(&kept);
        async move {
            kept.lock().unwrap().push(claimed);
            Ok(())
        }
    });
    (seen, processor)
}

fn noop() -> impl Processor {
    processor_fn(|_claimed: PathBuf| async move { Ok(()) })
}

async fn consumer_with_sink(
    root: &Path,
    id: &str,
    processor: impl Processor,
) -> (Consumer<impl Processor>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let events: Arc<dyn EventSink> = sink.clone();
    let consumer = Consumer::create(root, node(id), processor, events)
        .await
        .expect("failed to create consumer");
    (consumer, sink)
}

fn dir_entries(path: &Path) -> Vec<String> {
    match std::fs::read_dir(path) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Directory bootstrap
// ---------------------------------------------------------------------------

#[tokio::test]
async fn managed_directories_created_for_fresh_root() {
    let root = TempDir::new().unwrap();

    let (_, sink) = consumer_with_sink(root.path(), "node-1", noop()).await;

    assert!(root.path().join(WORKING_DIR).is_dir());
    assert!(root.path().join(PROCESSED_DIR).is_dir());

    let created: Vec<_> = sink
        .kinds()
        .into_iter()
        .filter(|k| matches!(k, EventKind::DirCreated { .. }))
        .collect();
    assert_eq!(created.len(), 2);
}

#[tokio::test]
async fn directory_bootstrap_is_idempotent() {
    let root = TempDir::new().unwrap();

    let (_, _) = consumer_with_sink(root.path(), "node-1", noop()).await;
    // Second consumer against the same root: both dirs already exist.
    let (_, sink) = consumer_with_sink(root.path(), "node-2", noop()).await;

    assert!(root.path().join(WORKING_DIR).is_dir());
    assert!(root.path().join(PROCESSED_DIR).is_dir());
    assert!(
        !sink
            .kinds()
            .iter()
            .any(|k| matches!(k, EventKind::DirCreated { .. }))
    );
}

// ---------------------------------------------------------------------------
// Claim → process → archive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn accept_processes_and_archives_files() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("test1.txt"), "one").unwrap();
    std::fs::write(root.path().join("test2.txt"), "two").unwrap();

    let (seen, processor) = recording();
    let (consumer, sink) = consumer_with_sink(root.path(), "node-1", processor).await;

    for name in ["test1.txt", "test2.txt"] {
        let outcome = consumer.accept(&root.path().join(name)).await.unwrap();
        assert!(matches!(outcome, Outcome::Archived { .. }));
    }

    assert!(root.path().join(PROCESSED_DIR).join("test1.txt").is_file());
    assert!(root.path().join(PROCESSED_DIR).join("test2.txt").is_file());

    // No leftover claims after success.
    assert!(dir_entries(&root.path().join(WORKING_DIR)).is_empty());

    // The processor saw the transient claimed paths, once per file.
    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            root.path().join(WORKING_DIR).join("node-1.test1.txt"),
            root.path().join(WORKING_DIR).join("node-1.test2.txt"),
        ]
    );

    let archived: Vec<_> = sink
        .kinds()
        .into_iter()
        .filter(|k| matches!(k, EventKind::Archived { .. }))
        .collect();
    assert_eq!(archived.len(), 2);
}

#[tokio::test]
async fn accept_on_missing_candidate_is_a_lost_race_not_an_error() {
    let root = TempDir::new().unwrap();
    let (consumer, sink) = consumer_with_sink(root.path(), "node-1", noop()).await;

    let already_moved = root.path().join("test1.txt");
    let outcome = consumer.accept(&already_moved).await.unwrap();

    assert!(matches!(outcome, Outcome::LostRace));
    assert!(!root.path().join(PROCESSED_DIR).join("test1.txt").exists());
    assert!(
        sink.kinds()
            .iter()
            .any(|k| matches!(k, EventKind::LostRace { .. }))
    );
}

#[tokio::test]
async fn archive_overwrites_existing_processed_entry() {
    let root = TempDir::new().unwrap();
    let (consumer, _) = consumer_with_sink(root.path(), "node-1", noop()).await;

    let archived = root.path().join(PROCESSED_DIR).join("test1.txt");
    std::fs::write(&archived, "old").unwrap();

    std::fs::write(root.path().join("test1.txt"), "new").unwrap();
    consumer
        .accept(&root.path().join("test1.txt"))
        .await
        .unwrap();

    // Last archive wins.
    assert_eq!(std::fs::read_to_string(&archived).unwrap(), "new");
}

// ---------------------------------------------------------------------------
// Processor failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn processor_failure_propagates_and_leaves_claim_stuck() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("test1.txt"), "payload").unwrap();

    let failing = processor_fn(|claimed: PathBuf| async move {
        anyhow::bail!("refusing {}", claimed.display())
    });
    let (consumer, _) = consumer_with_sink(root.path(), "node-1", failing).await;

    let err = consumer
        .accept(&root.path().join("test1.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Processor { .. }));

    // The claim is not rolled back: file stuck in working/, nothing archived.
    assert!(
        root.path()
            .join(WORKING_DIR)
            .join("node-1.test1.txt")
            .is_file()
    );
    assert!(dir_entries(&root.path().join(PROCESSED_DIR)).is_empty());
    assert!(!root.path().join("test1.txt").exists());
}

// ---------------------------------------------------------------------------
// Competing consumers
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn exactly_one_of_two_competing_consumers_wins() {
    let root = TempDir::new().unwrap();
    let (a, _) = consumer_with_sink(root.path(), "node-a", noop()).await;
    let (b, _) = consumer_with_sink(root.path(), "node-b", noop()).await;

    for round in 0..25 {
        let candidate = root.path().join("job.txt");
        std::fs::write(&candidate, format!("round {round}")).unwrap();

        let (ra, rb) = tokio::join!(a.accept(&candidate), b.accept(&candidate));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        let wins = [&ra, &rb]
            .iter()
            .filter(|o| matches!(o, Outcome::Archived { .. }))
            .count();
        let losses = [&ra, &rb]
            .iter()
            .filter(|o| matches!(o, Outcome::LostRace))
            .count();

        assert_eq!(wins, 1, "round {round}: exactly one claim must succeed");
        assert_eq!(losses, 1, "round {round}: the other must lose the race");

        // The file is never lost: it always ends up archived.
        assert!(root.path().join(PROCESSED_DIR).join("job.txt").is_file());
        assert!(dir_entries(&root.path().join(WORKING_DIR)).is_empty());
    }
}
