//! End-to-end pipeline tests over real temp directories.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local};
use shoebox_config::{IngestSettings, StabilitySettings};
use shoebox_events::EventBus;
use shoebox_ingest::{IngestOutcome, IngestionCoordinator, StopFlag};
use shoebox_telemetry::Metrics;
use tempfile::TempDir;

struct Harness {
    _staging: TempDir,
    _archive: TempDir,
    staging_root: PathBuf,
    archive_root: PathBuf,
    events: EventBus,
    coordinator: IngestionCoordinator,
}

fn harness(configure: impl FnOnce(&mut IngestSettings)) -> Harness {
    let staging = TempDir::new().expect("staging dir");
    let archive = TempDir::new().expect("archive dir");
    let staging_root = staging
        .path()
        .canonicalize()
        .expect("canonical staging root");
    let archive_root = archive
        .path()
        .canonicalize()
        .expect("canonical archive root");

    let mut settings = IngestSettings::new(staging_root.clone(), archive_root.clone());
    settings.stability = StabilitySettings {
        min_stable_window: Duration::from_millis(100),
        max_wait: Duration::from_secs(5),
    };
    configure(&mut settings);

    let events = EventBus::new();
    let coordinator = IngestionCoordinator::new(
        Arc::new(settings),
        events.clone(),
        Metrics::new().expect("metrics"),
        StopFlag::new(),
    );
    Harness {
        _staging: staging,
        _archive: archive,
        staging_root,
        archive_root,
        events,
        coordinator,
    }
}

fn todays_bucket(archive_root: &std::path::Path) -> PathBuf {
    let now = Local::now();
    archive_root.join(format!(
        "{:04}/{:02}/{:02}",
        now.year(),
        now.month(),
        now.day()
    ))
}

#[tokio::test]
async fn plain_file_lands_in_a_date_bucket() {
    let harness = harness(|_| {});
    let camera_dir = harness.staging_root.join("camera/roll1");
    std::fs::create_dir_all(&camera_dir).expect("create camera dir");
    let source = camera_dir.join("photo.jpg");
    std::fs::write(&source, b"not really a jpeg, which is fine").expect("write source");

    let outcome = harness.coordinator.process(&source).await;

    let IngestOutcome::Moved { destination } = outcome else {
        panic!("expected Moved, got {outcome:?}");
    };
    assert_eq!(
        destination,
        todays_bucket(&harness.archive_root).join("photo.jpg")
    );
    assert!(destination.exists());
    assert!(!source.exists());
    // The emptied staging subtree is pruned, the root survives.
    assert!(!harness.staging_root.join("camera").exists());
    assert!(harness.staging_root.exists());

    let last = harness.events.last_event_id().expect("events published");
    let mut stream = harness.events.subscribe(Some(0));
    let mut kinds = Vec::new();
    for _ in 0..last {
        let envelope = stream.next().await.expect("replayed event");
        kinds.push(envelope.event.kind());
    }
    assert!(kinds.contains(&"ingest_started"));
    assert!(kinds.contains(&"file_moved"));
    assert!(!kinds.contains(&"ingest_failed"));
}

#[tokio::test]
async fn processing_runs_to_completion_on_a_spawned_task() {
    let harness = harness(|_| {});
    let source = harness.staging_root.join("photo.jpg");
    std::fs::write(&source, b"spawned payload").expect("write source");

    let coordinator = Arc::new(harness.coordinator);
    let worker = Arc::clone(&coordinator);
    let task_source = source.clone();
    let outcome = tokio::spawn(async move { worker.process(&task_source).await })
        .await
        .expect("worker task joins");

    assert!(matches!(outcome, IngestOutcome::Moved { .. }));
    assert!(!source.exists());
}

#[tokio::test]
async fn byte_identical_copy_is_skipped_and_source_removed() {
    let harness = harness(|_| {});
    let source = harness.staging_root.join("photo.jpg");
    std::fs::write(&source, b"identical payload").expect("write source");

    let bucket = todays_bucket(&harness.archive_root);
    std::fs::create_dir_all(&bucket).expect("create bucket");
    std::fs::write(bucket.join("photo.jpg"), b"identical payload").expect("write archived copy");

    let outcome = harness.coordinator.process(&source).await;

    assert_eq!(outcome, IngestOutcome::Duplicate);
    assert!(!source.exists());
    assert_eq!(
        std::fs::read(bucket.join("photo.jpg")).expect("read archived copy"),
        b"identical payload"
    );
}

#[tokio::test]
async fn name_collision_with_different_content_gets_a_new_name() {
    let harness = harness(|_| {});
    let source = harness.staging_root.join("photo.jpg");
    std::fs::write(&source, b"new shot").expect("write source");

    let bucket = todays_bucket(&harness.archive_root);
    std::fs::create_dir_all(&bucket).expect("create bucket");
    std::fs::write(bucket.join("photo.jpg"), b"older shot").expect("write archived copy");

    let outcome = harness.coordinator.process(&source).await;

    let IngestOutcome::Moved { destination } = outcome else {
        panic!("expected Moved, got {outcome:?}");
    };
    assert_ne!(destination, bucket.join("photo.jpg"));
    assert!(destination.starts_with(&bucket));
    assert_eq!(std::fs::read(&destination).expect("read moved file"), b"new shot");
    assert_eq!(
        std::fs::read(bucket.join("photo.jpg")).expect("read original"),
        b"older shot"
    );
}

#[tokio::test]
async fn processed_paths_cool_down_before_reclaim() {
    let harness = harness(|_| {});
    let source = harness.staging_root.join("photo.jpg");
    std::fs::write(&source, b"payload").expect("write source");

    let first = harness.coordinator.process(&source).await;
    assert!(matches!(first, IngestOutcome::Moved { .. }));

    // Recreate the file at the same path; the cool-down refuses the claim.
    std::fs::write(&source, b"payload").expect("rewrite source");
    let second = harness.coordinator.process(&source).await;
    assert_eq!(second, IngestOutcome::Ignored);
    assert!(source.exists());
}

#[tokio::test]
async fn unsupported_and_scratch_files_are_ignored() {
    let harness = harness(|_| {});
    let notes = harness.staging_root.join("notes.txt");
    std::fs::write(&notes, b"not media").expect("write notes");

    assert_eq!(
        harness.coordinator.process(&notes).await,
        IngestOutcome::Ignored
    );
    assert!(notes.exists());
    assert_eq!(harness.coordinator.in_flight(), 0);
}

#[tokio::test]
async fn dry_run_reports_moves_without_touching_files() {
    let harness = harness(|settings| settings.dry_run = true);
    let camera_dir = harness.staging_root.join("camera");
    std::fs::create_dir_all(&camera_dir).expect("create camera dir");
    let source = camera_dir.join("photo.jpg");
    std::fs::write(&source, b"payload").expect("write source");

    let outcome = harness.coordinator.process(&source).await;

    assert!(matches!(outcome, IngestOutcome::Moved { .. }));
    assert!(source.exists());
    assert!(camera_dir.exists());
    assert!(!todays_bucket(&harness.archive_root).join("photo.jpg").exists());
}
