//! Export runs through the orchestrator state machine

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use super::mock_codec::{names, percents, AcceptAll, Fixture, MockCodec};
use crate::codec::ImageCodec;
use crate::export::{CancelToken, EventSink, ExportEvent, ExportOrchestrator, ExportOutcome, ExportStatus};
use crate::model::{ChannelSourceRef, CompressionPolicy, ExportSpec, OutputChannel, SequenceSet};
use crate::validation::{ValidationEngine, Validator};

fn run_with(
    spec: ExportSpec,
    sequences: SequenceSet,
    codec: Arc<MockCodec>,
    validator: Arc<dyn Validator>,
    cancel: CancelToken,
) -> (ExportOutcome, Vec<ExportEvent>) {
    let (sender, receiver) = mpsc::channel();
    let orchestrator = ExportOrchestrator::new(
        spec, sequences, codec as Arc<dyn ImageCodec>, validator, cancel, EventSink::new(sender));
    let outcome = orchestrator.run();
    (outcome, receiver.try_iter().collect())
}

fn run(fixture: &Fixture, spec: ExportSpec, codec: Arc<MockCodec>) -> (ExportOutcome, Vec<ExportEvent>) {
    run_with(spec, fixture.sequences.clone(), codec, Arc::new(AcceptAll), CancelToken::new())
}

fn assert_monotonic_to_100(events: &[ExportEvent]) {
    let percents = percents(events);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {:?}", percents);
    assert_eq!(percents.last(), Some(&100));
}

#[test]
fn test_direct_copy_run() {
    let fixture = Fixture::new(&["beauty"], 1..=6);
    let codec = Arc::new(MockCodec::new());

    let (outcome, events) = run(&fixture, fixture.spec.clone(), Arc::clone(&codec));

    assert_eq!(outcome, ExportOutcome::succeeded());
    assert_eq!(codec.copied_names(), names(1..=6));
    assert!(codec.attempts().is_empty());
    assert_eq!(percents(&events).len(), 6);
    assert_monotonic_to_100(&events);
    assert!(events.contains(&ExportEvent::Progress { percent: 16, message: "Frame 1 (direct copy)".to_string() }));
}

#[test]
fn test_always_policy_uses_worker_pool() {
    let fixture = Fixture::new(&["beauty"], 1..=8);
    let mut spec = fixture.spec.clone();
    spec.compression_policy = CompressionPolicy::Always;
    let codec = Arc::new(MockCodec::new());

    let (outcome, events) = run(&fixture, spec, Arc::clone(&codec));

    assert!(outcome.success);
    assert!(codec.copied_names().is_empty());
    assert_eq!(codec.written_names(), names(1..=8));
    assert_monotonic_to_100(&events);
    assert!(fixture.output_dir().is_dir());
}

#[test]
fn test_direct_copy_falls_back_once() {
    let fixture = Fixture::new(&["beauty"], 1..=6);
    let codec = Arc::new(MockCodec::new().failing_copy("beauty.0003.tif"));

    let (outcome, events) = run(&fixture, fixture.spec.clone(), Arc::clone(&codec));

    assert_eq!(outcome.status, ExportStatus::Succeeded);
    assert_eq!(codec.copied_names(), names(1..=2));
    assert_eq!(codec.written_names(), names(3..=6));
    assert_eq!(percents(&events).len(), 6);
    assert_monotonic_to_100(&events);
}

#[test]
fn test_failed_write_stops_the_run() {
    // Fewer than five frames run on a single worker, in order
    let fixture = Fixture::new(&["beauty"], 1..=4);
    let mut spec = fixture.spec.clone();
    spec.compression_policy = CompressionPolicy::Always;
    let codec = Arc::new(MockCodec::new().failing_write("comp.0002.tif"));

    let (outcome, _) = run(&fixture, spec, Arc::clone(&codec));

    assert_eq!(outcome.status, ExportStatus::Failed);
    assert!(!outcome.success);
    assert!(outcome.message.starts_with("Export failed at frame 2: "), "{}", outcome.message);
    assert!(outcome.message.contains("disk full"));
    assert_eq!(codec.attempts(), names(1..=2));
}

#[test]
fn test_failed_write_halts_queued_frames() {
    // Enough frames for a multi-worker pool; slow writes keep most frames queued
    let fixture = Fixture::new(&["beauty"], 1..=24);
    let mut spec = fixture.spec.clone();
    spec.compression_policy = CompressionPolicy::Always;
    let codec = Arc::new(MockCodec::new()
        .failing_write("comp.0002.tif")
        .with_write_delay(Duration::from_millis(20)));

    let (outcome, events) = run(&fixture, spec, Arc::clone(&codec));

    assert_eq!(outcome.status, ExportStatus::Failed);
    assert_ne!(outcome, ExportOutcome::succeeded());
    assert!(outcome.message.starts_with("Export failed at frame 2: "), "{}", outcome.message);

    let attempts = codec.attempts();
    assert!(attempts.contains(&"comp.0002.tif".to_string()));
    assert!(attempts.len() < 24, "every frame was written: {:?}", attempts);
    assert!(percents(&events).iter().all(|p| *p < 100));
    assert!(!events.iter().any(|e| matches!(e, ExportEvent::Finished(_))));
}

#[test]
fn test_panicking_write_fails_the_run() {
    let fixture = Fixture::new(&["beauty"], 1..=8);
    let mut spec = fixture.spec.clone();
    spec.compression_policy = CompressionPolicy::Always;
    let codec = Arc::new(MockCodec::new().panicking_write("comp.0003.tif"));

    let (outcome, _) = run(&fixture, spec, Arc::clone(&codec));

    assert_eq!(outcome.status, ExportStatus::Failed);
    assert!(outcome.message.starts_with("Export failed at frame 3: "), "{}", outcome.message);
    assert!(outcome.message.contains("worker panicked on frame 3"), "{}", outcome.message);
    assert!(!codec.written_names().contains(&"comp.0003.tif".to_string()));
}

#[test]
fn test_cancellation_stops_new_writes() {
    let fixture = Fixture::new(&["beauty"], 1..=10);
    let mut spec = fixture.spec.clone();
    spec.compression_policy = CompressionPolicy::Always;
    let cancel = CancelToken::new();
    let codec = Arc::new(MockCodec::new().cancelling_after(2, cancel.clone()));

    let (outcome, _) = run_with(spec, fixture.sequences.clone(), Arc::clone(&codec), Arc::new(AcceptAll), cancel);

    assert_eq!(outcome, ExportOutcome::stopped());
    assert_eq!(outcome.message, "Export stopped by user");
    assert_eq!(codec.attempts().len(), 2);
}

#[test]
fn test_cancelled_before_start() {
    let fixture = Fixture::new(&["beauty"], 1..=3);
    let cancel = CancelToken::new();
    cancel.cancel();
    let codec = Arc::new(MockCodec::new());

    let (outcome, _) = run_with(
        fixture.spec.clone(), fixture.sequences.clone(), Arc::clone(&codec), Arc::new(AcceptAll), cancel);

    assert_eq!(outcome.status, ExportStatus::Stopped);
    assert!(codec.copied_names().is_empty());
}

#[test]
fn test_no_sequences_means_no_frames() {
    let fixture = Fixture::new(&["beauty"], 1..=3);
    let codec = Arc::new(MockCodec::new());

    let (outcome, _) = run_with(
        fixture.spec.clone(), SequenceSet::new(), Arc::clone(&codec), Arc::new(AcceptAll), CancelToken::new());

    assert_eq!(outcome, ExportOutcome::no_frames());
    assert!(codec.attempts().is_empty());
    assert!(codec.copied_names().is_empty());
    assert!(!fixture.output_dir().exists());
}

#[test]
fn test_range_outside_frames_means_no_frames() {
    let fixture = Fixture::new(&["beauty"], 1..=3);
    let mut spec = fixture.spec.clone();
    spec.frame_range = Some((50, 60));

    let (outcome, _) = run(&fixture, spec, Arc::new(MockCodec::new()));
    assert_eq!(outcome.status, ExportStatus::NoFrames);
}

#[test]
fn test_validation_errors_block_the_run() {
    let fixture = Fixture::new(&["beauty"], 1..=3);
    let mut spec = fixture.spec.clone();
    spec.channels.push(OutputChannel::new("X", ChannelSourceRef::new("missing", "R", 0)));
    spec.channels.push(OutputChannel::new("X", ChannelSourceRef::new("beauty", "R", 0)));
    let codec = Arc::new(MockCodec::new());
    let validator = Arc::new(ValidationEngine::new(Arc::clone(&codec) as Arc<dyn ImageCodec>));

    let (outcome, events) = run_with(spec, fixture.sequences.clone(), Arc::clone(&codec), validator, CancelToken::new());

    assert_eq!(outcome, ExportOutcome::blocked(2));
    assert_eq!(outcome.message, "Export blocked: 2 validation errors");
    assert!(codec.attempts().is_empty());
    assert!(percents(&events).is_empty());
    assert!(events.iter().any(|e| matches!(e, ExportEvent::Log(m) if m.contains("MISSING_SEQUENCE"))));
}

#[test]
fn test_recombined_frames_carry_zero_filled_channels() {
    let fixture = Fixture::new(&["beauty", "depth"], 1..=2);
    let mut spec = fixture.spec.clone();
    spec.channels.truncate(2);
    spec.channels.push(OutputChannel::new("depth.Z", ChannelSourceRef::new("depth", "Z", 0)));
    spec.channels.push(OutputChannel::new("P", ChannelSourceRef::new("depth", "position", 0)));
    let codec = Arc::new(MockCodec::new());

    let (outcome, _) = run(&fixture, spec, Arc::clone(&codec));

    assert!(outcome.success);
    let written = codec.written.lock().unwrap();
    assert_eq!(written.len(), 2);
    for (_, image) in written.iter() {
        assert_eq!(image.channel_names, vec!["R", "G", "depth.Z", "P"]);
        assert_eq!(&image.pixels[..4], &[1.0, 2.0, 4.0, 0.0]);
    }
}
