//! Background export controller

use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::cancel::CancelToken;
use super::events::{EventSink, ExportEvent, ExportOutcome};
use super::orchestrator::ExportOrchestrator;
use crate::codec::ImageCodec;
use crate::model::{CompressionPolicy, ExportSpec, SequenceSet};
use crate::validation::Validator;

/// Starts and stops export runs, one at a time
///
/// Runs execute on a background thread. All events of all runs go to the
/// receiver returned by `new`; every run ends with exactly one
/// `ExportEvent::Finished`.
pub struct ExportManager {
    /// Codec handed to every run
    codec: Arc<dyn ImageCodec>,
    /// Gate run before any I/O
    validator: Arc<dyn Validator>,
    /// Event channel shared by all runs
    sender: Sender<ExportEvent>,
    /// Set while a run is active
    running: Arc<AtomicBool>,
    /// Stop flag of the current run
    cancel: Mutex<CancelToken>,
    /// Thread of the current or last run
    handle: Mutex<Option<JoinHandle<ExportOutcome>>>,
}

impl ExportManager {
    /// Creates an idle manager
    ///
    /// # Arguments
    ///
    /// * `codec` - Image codec used by every run
    /// * `validator` - Validation gate used by every run
    ///
    /// # Returns
    ///
    /// The manager and the receiving end of its event channel
    pub fn new(codec: Arc<dyn ImageCodec>, validator: Arc<dyn Validator>) -> (Self, Receiver<ExportEvent>) {
        let (sender, receiver) = mpsc::channel();
        let manager = ExportManager {
            codec,
            validator,
            sender,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(CancelToken::new()),
            handle: Mutex::new(None),
        };
        (manager, receiver)
    }

    /// Begins a run; returns `false` without side effects if one is active
    ///
    /// # Arguments
    ///
    /// * `spec` - Export job
    /// * `sequences` - Source sequences of the job
    /// * `policy` - Replaces the compression policy stored in `spec`
    ///
    /// # Returns
    ///
    /// `true` if a run thread was started
    pub fn start(&self, mut spec: ExportSpec, sequences: SequenceSet, policy: CompressionPolicy) -> bool {
        if self.running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            warn!("Export already running, start request ignored");
            return false;
        }

        // Reap the previous run's thread; it has already finished
        if let Some(previous) = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = previous.join();
        }

        spec.compression_policy = policy;
        let cancel = CancelToken::new();
        *self.cancel.lock().unwrap_or_else(|e| e.into_inner()) = cancel.clone();

        let events = EventSink::new(self.sender.clone());
        let orchestrator = ExportOrchestrator::new(
            spec, sequences, Arc::clone(&self.codec), Arc::clone(&self.validator), cancel, events.clone());
        let running = Arc::clone(&self.running);

        info!("Starting export run");
        let spawned = thread::Builder::new().name("export-run".to_string()).spawn(move || {
            let outcome = orchestrator.run();
            running.store(false, Ordering::SeqCst);
            events.finished(outcome.clone());
            outcome
        });

        match spawned {
            Ok(handle) => {
                *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
                true
            }
            Err(e) => {
                warn!("Cannot start export thread: {}", e);
                self.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Requests cooperative cancellation of the active run; idempotent
    pub fn stop(&self) {
        if self.is_running() {
            info!("Stop requested");
        }
        self.cancel.lock().unwrap_or_else(|e| e.into_inner()).cancel();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Blocks until the current run ends; `None` if no run was started
    pub fn wait(&self) -> Option<ExportOutcome> {
        let handle = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take()?;
        match handle.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Some(ExportOutcome::failed("Export failed: run thread panicked"))
            }
        }
    }
}
