// Library-level tests for full backup runs
use assert_fs::prelude::*;
use mediabackup::backup_core::{
    BackupController, BackupError, BackupJob, CancellationToken, ChannelReporter, JobEvent,
    JobStatus, MediaExtensionSet, MetadataDateResolver, NullReporter, PreflightSummary,
    StateHandle,
};
use predicates::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use time::UtcOffset;

mod common;
use common::{setup_mixed_source, tiff_with_datetime};

#[test]
fn test_preflight_excludes_unlisted_files() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = setup_mixed_source(&temp_dir);

    let mut controller = BackupController::new(MediaExtensionSet::default());
    let summary = controller
        .start_job(source.path(), temp_dir.child("dest").path())
        .unwrap();

    assert_eq!(
        summary,
        PreflightSummary {
            total: 5,
            images: 3,
            videos: 2,
        }
    );
}

#[test]
fn test_second_run_adds_suffixed_copies() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = setup_mixed_source(&temp_dir);
    let dest = temp_dir.child("dest");

    let mut controller = BackupController::new(MediaExtensionSet::default());
    for _ in 0..3 {
        controller.start_job(source.path(), dest.path()).unwrap();
        controller.confirm_and_run().unwrap();
        let report = controller.wait().unwrap();
        assert_eq!(report.status, JobStatus::Completed);
        assert_eq!(report.copied, 5);
        assert!(report.failures.is_empty());
    }

    let march = dest.child("2024/03_March");
    march.child("a.jpg").assert(predicate::path::exists());
    march.child("a_1.jpg").assert(predicate::path::exists());
    march.child("a_2.jpg").assert(predicate::path::exists());
    march.child("a_3.jpg").assert(predicate::path::missing());
}

#[test]
fn test_job_organizes_by_exif_date() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("source");
    source
        .child("IMG_0001.jpg")
        .write_binary(&tiff_with_datetime("2024:03:09 08:00:00"))
        .unwrap();
    let dest = temp_dir.child("dest");

    let job = BackupJob::prepare(source.path(), dest.path(), &MediaExtensionSet::default())
        .unwrap()
        .with_resolver(Arc::new(MetadataDateResolver::with_offset(UtcOffset::UTC)));
    let report = job.run(&CancellationToken::new(), &NullReporter, &StateHandle::default());

    assert_eq!(report.status, JobStatus::Completed);
    assert_eq!(report.copied, 1);
    assert_eq!(report.unknown_date, 0);
    dest.child("2024/03_March/IMG_0001.jpg")
        .assert(predicate::path::exists());
    dest.child("Unknown_Date").assert(predicate::path::is_dir());
}

#[test]
fn test_job_renames_colliding_names_from_different_folders() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("source");
    let bytes = tiff_with_datetime("2022:11:01 09:30:00");
    for dir in ["a", "b", "c"] {
        source
            .child(format!("{}/IMG.jpg", dir))
            .write_binary(&bytes)
            .unwrap();
    }
    let dest = temp_dir.child("dest");

    let job = BackupJob::prepare(source.path(), dest.path(), &MediaExtensionSet::default())
        .unwrap();
    let report = job.run(&CancellationToken::new(), &NullReporter, &StateHandle::default());

    assert_eq!(report.copied, 3);
    let folder = dest.child("2022/11_November");
    folder.child("IMG.jpg").assert(predicate::path::exists());
    folder.child("IMG_1.jpg").assert(predicate::path::exists());
    folder.child("IMG_2.jpg").assert(predicate::path::exists());
}

#[test]
fn test_files_without_exif_use_modification_time() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = setup_mixed_source(&temp_dir);
    let dest = temp_dir.child("dest");

    let mut controller = BackupController::new(MediaExtensionSet::default());
    controller.start_job(source.path(), dest.path()).unwrap();
    controller.confirm_and_run().unwrap();
    let report = controller.wait().unwrap();

    assert_eq!(report.unknown_date, 0);
    dest.child("2021/06_June/c.png")
        .assert(predicate::path::exists());
    let unknown = std::fs::read_dir(dest.child("Unknown_Date").path()).unwrap();
    assert_eq!(unknown.count(), 0);
}

#[test]
fn test_progress_reaches_total_and_summary_fires() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = setup_mixed_source(&temp_dir);

    let mut controller = BackupController::new(MediaExtensionSet::default())
        .with_progress_interval(Duration::from_secs(3600));
    let (reporter, rx) = ChannelReporter::new();
    controller.subscribe(Arc::new(reporter));

    controller
        .start_job(source.path(), temp_dir.child("dest").path())
        .unwrap();
    controller.confirm_and_run().unwrap();
    let report = controller.wait().unwrap();

    let events: Vec<JobEvent> = rx.try_iter().collect();
    let last_progress = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Progress(p) => Some(p.clone()),
            JobEvent::Finished(_) => None,
        })
        .last()
        .unwrap();
    assert_eq!((last_progress.processed, last_progress.total), (5, 5));
    assert!(matches!(events.last(), Some(JobEvent::Finished(r)) if *r == report));
    assert!(report.message.contains("5 media files copied"));
}

#[test]
fn test_destination_under_a_file_is_fatal() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = setup_mixed_source(&temp_dir);
    let blocker = temp_dir.child("blocker");
    blocker.write_str("x").unwrap();

    let mut controller = BackupController::new(MediaExtensionSet::default());
    let result = controller.start_job(source.path(), &blocker.path().join("dest"));

    assert!(matches!(result, Err(BackupError::DestinationCreate { .. })));
    assert_eq!(controller.state().status, JobStatus::Idle);
    assert!(matches!(
        controller.confirm_and_run(),
        Err(BackupError::NoPendingJob)
    ));
}
