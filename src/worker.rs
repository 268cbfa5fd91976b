//! Background scanning.
//!
//! A scan runs on its own thread and streams [`ScanEvent`]s over a channel
//! while the caller stays responsive. [`ScanHandle::join`] is the completion
//! signal: the outcome is handed over only once the worker has finished, so
//! the worker is the single writer of the results.
//!
//! [`ScanSession`] keeps at most one scan in flight. Starting a new scan
//! cancels the previous one and clears its results.

use crate::scanner::{FileRecord, ScanError, ScanEvent, ScanOutcome, ScanRequest, ScanResult, Scanner};
use crate::tree::DirectoryNode;
use crossbeam::channel::{Receiver, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Spawns scans on background threads.
pub struct ScanWorker;

impl ScanWorker {
    /// Starts scanning `request` on a new thread.
    pub fn spawn(scanner: Scanner, request: ScanRequest) -> ScanHandle {
        let (sender, receiver) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let thread = thread::Builder::new()
            .name("extsort-scan".to_string())
            .spawn(move || {
                let mut sender = sender;
                scanner.scan(&request, &mut sender, &worker_cancel)
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("could not start scan thread: {}", e);
                None
            }
        };

        ScanHandle {
            events: receiver,
            cancel,
            thread,
        }
    }
}

/// A running (or finished) background scan.
pub struct ScanHandle {
    events: Receiver<ScanEvent>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<ScanResult<ScanOutcome>>>,
}

impl ScanHandle {
    /// Progress events. The channel disconnects when the worker finishes.
    pub fn events(&self) -> &Receiver<ScanEvent> {
        &self.events
    }

    /// Asks the worker to stop at the next entry.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the worker and returns its outcome.
    ///
    /// Undrained events are discarded.
    pub fn join(mut self) -> ScanResult<ScanOutcome> {
        let thread = self.thread.take().ok_or(ScanError::WorkerPanicked)?;
        thread.join().map_err(|_| ScanError::WorkerPanicked)?
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        // A dropped handle means nobody wants the results.
        if self.thread.is_some() {
            self.cancel();
        }
    }
}

/// Holds the current scan and the results of the last completed one.
#[derive(Default)]
pub struct ScanSession {
    scanner: Scanner,
    active: Option<ScanHandle>,
    last: Option<ScanOutcome>,
}

impl ScanSession {
    pub fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            active: None,
            last: None,
        }
    }

    /// Starts a new scan, superseding any scan in flight.
    ///
    /// The previous worker is cancelled and joined, and prior results are
    /// cleared before the new worker starts.
    pub fn start(&mut self, request: ScanRequest) -> &ScanHandle {
        if let Some(previous) = self.active.take() {
            previous.cancel();
            if let Err(e) = previous.join() {
                log::warn!("previous scan ended with error: {}", e);
            }
        }
        self.last = None;

        self.active
            .insert(ScanWorker::spawn(self.scanner.clone(), request))
    }

    /// The active scan, if any.
    pub fn active(&self) -> Option<&ScanHandle> {
        self.active.as_ref()
    }

    /// Cancels the active scan without waiting for it.
    pub fn cancel(&self) {
        if let Some(handle) = &self.active {
            handle.cancel();
        }
    }

    /// Waits for the active scan and keeps its outcome.
    ///
    /// Returns the last outcome again if no scan is active.
    pub fn wait(&mut self) -> ScanResult<Option<&ScanOutcome>> {
        if let Some(handle) = self.active.take() {
            self.last = Some(handle.join()?);
        }
        Ok(self.last.as_ref())
    }

    /// Matched files from the last completed scan.
    pub fn files(&self) -> &[FileRecord] {
        self.last.as_ref().map_or(&[], |outcome| outcome.files.as_slice())
    }

    /// The tree from the last completed scan.
    pub fn tree(&self) -> Option<&DirectoryNode> {
        self.last.as_ref().map(|outcome| &outcome.tree)
    }

    /// Takes ownership of the last outcome, leaving the session empty.
    pub fn take_outcome(&mut self) -> Option<ScanOutcome> {
        self.last.take()
    }

    /// Drops any stored results.
    pub fn clear(&mut self) {
        self.last = None;
    }
}
