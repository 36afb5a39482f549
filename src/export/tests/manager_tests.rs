//! Background runs through the export manager

use std::sync::Arc;
use std::time::Duration;

use super::mock_codec::{collect_run, names, AcceptAll, Fixture, MockCodec};
use crate::codec::ImageCodec;
use crate::export::{ExportEvent, ExportManager, ExportStatus};
use crate::model::CompressionPolicy;

fn finished_count(events: &[ExportEvent]) -> usize {
    events.iter().filter(|e| matches!(e, ExportEvent::Finished(_))).count()
}

#[test]
fn test_run_finishes_once() {
    let fixture = Fixture::new(&["beauty"], 1..=5);
    let codec = Arc::new(MockCodec::new());
    let (manager, events) = ExportManager::new(Arc::clone(&codec) as Arc<dyn ImageCodec>, Arc::new(AcceptAll));

    assert!(manager.start(fixture.spec.clone(), fixture.sequences.clone(), CompressionPolicy::Always));
    let (received, outcome) = collect_run(&events);

    assert!(outcome.success);
    assert_eq!(finished_count(&received), 1);
    assert_eq!(manager.wait(), Some(outcome));
    assert!(!manager.is_running());
    assert!(events.try_recv().is_err());
    // The start policy overrides the one stored in the job
    assert_eq!(codec.written_names(), names(1..=5));
}

#[test]
fn test_second_start_is_rejected_while_running() {
    let fixture = Fixture::new(&["beauty"], 1..=10);
    let codec = Arc::new(MockCodec::new().with_write_delay(Duration::from_millis(50)));
    let (manager, events) = ExportManager::new(Arc::clone(&codec) as Arc<dyn ImageCodec>, Arc::new(AcceptAll));

    assert!(manager.start(fixture.spec.clone(), fixture.sequences.clone(), CompressionPolicy::Always));
    assert!(manager.is_running());
    assert!(!manager.start(fixture.spec.clone(), fixture.sequences.clone(), CompressionPolicy::Always));

    manager.stop();
    manager.stop();
    let (received, outcome) = collect_run(&events);

    assert_eq!(outcome.status, ExportStatus::Stopped);
    assert_eq!(finished_count(&received), 1);
    assert!(codec.attempts().len() < 10);
    manager.wait();
    assert!(!manager.is_running());
}

#[test]
fn test_restart_after_stop() {
    let fixture = Fixture::new(&["beauty"], 1..=3);
    let codec = Arc::new(MockCodec::new());
    let (manager, events) = ExportManager::new(Arc::clone(&codec) as Arc<dyn ImageCodec>, Arc::new(AcceptAll));

    manager.stop();
    assert_eq!(manager.wait(), None);

    assert!(manager.start(fixture.spec.clone(), fixture.sequences.clone(), CompressionPolicy::Skip));
    let (_, first) = collect_run(&events);
    assert!(first.success);
    assert_eq!(codec.copied_names(), names(1..=3));

    // A stop issued between runs does not leak into the next one
    manager.stop();
    assert!(manager.start(fixture.spec.clone(), fixture.sequences.clone(), CompressionPolicy::Always));
    let (_, second) = collect_run(&events);
    assert!(second.success);
    assert_eq!(codec.written_names(), names(1..=3));
}
