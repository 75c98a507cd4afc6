//! Posting pointer activity back into the hidden surface.
//!
//! The UI thread maps the point and queues it; a dedicated worker drains the
//! queue in order and talks to the injector.  A slow injector therefore
//! delays events but never reorders them, and never stalls drawing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::interface::TInputInjector;
use crate::presentation::PresentationGeometry;
use crate::types::{Point, PointerKind, SyntheticInputEvent};

/// Key code of the `6` key.
const KEY_6: u16 = 0x58;
/// Shift and Command modifier flags, as CGEventFlags.
const SHIFT_COMMAND: u64 = 0x0002_0000 | 0x0010_0000;

enum Job {
    Mouse(SyntheticInputEvent),
    Key(u16, u64),
    Flush(flume::Sender<()>),
}

#[derive(Default)]
struct Shared {
    denied: AtomicBool,
    reported: AtomicBool,
    posted: AtomicU64,
    suppressed: AtomicU64,
}

impl Shared {
    fn deny(&self) {
        if !self.denied.swap(true, Ordering::AcqRel) {
            warn!("input injection denied, forwarding suspended");
        }
    }
}

/// Maps and posts `SyntheticInputEvent`s on a worker thread.
pub struct InputForwarder {
    injector: Arc<dyn TInputInjector>,
    shared: Arc<Shared>,
    tx: Option<flume::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl InputForwarder {
    /// Starts the injection worker.
    pub fn new(injector: Arc<dyn TInputInjector>) -> InputForwarder {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = flume::unbounded::<Job>();
        let worker = {
            let injector = injector.clone();
            let shared = shared.clone();
            thread::Builder::new()
                .name("simbar-inject".into())
                .spawn(move || drain(rx, injector, shared))
        };
        let worker = match worker {
            Ok(w) => Some(w),
            Err(e) => {
                error!("cannot start injection worker: {}", e);
                shared.deny();
                None
            }
        };
        InputForwarder {
            injector: injector,
            shared: shared,
            tx: worker.as_ref().map(|_| tx),
            worker: worker,
        }
    }

    /// Maps `local` (relative to the drawn frame) into hidden-surface pixels
    /// and queues it for posting.
    ///
    /// Returns `InjectionDenied` the first time forwarding is attempted after
    /// the injector refused an event.  Until `recheck_permission` succeeds,
    /// later events are dropped quietly.
    pub fn forward(&self, local: Point, kind: PointerKind,
                   geometry: &PresentationGeometry) -> Result<()> {
        let event = SyntheticInputEvent {
            kind: kind,
            point: geometry.to_hidden(local),
            timestamp: Instant::now(),
        };
        trace!("forward {:?} {:?} -> {:?}", kind, local, event.point);
        self.enqueue(Job::Mouse(event))
    }

    /// Posts the system's Touch Bar screenshot shortcut.
    pub fn capture_screenshot(&self) -> Result<()> {
        info!("requesting Touch Bar screenshot");
        self.enqueue(Job::Key(KEY_6, SHIFT_COMMAND))
    }

    fn enqueue(&self, job: Job) -> Result<()> {
        if self.shared.denied.load(Ordering::Acquire) {
            self.shared.suppressed.fetch_add(1, Ordering::Relaxed);
            return self.take_denial().map_or(Ok(()), Err);
        }
        match self.tx {
            Some(ref tx) if tx.send(job).is_ok() => Ok(()),
            _ => {
                self.shared.deny();
                self.take_denial().map_or(Ok(()), Err)
            }
        }
    }

    /// The pending denial, exactly once per denial.
    pub fn take_denial(&self) -> Option<Error> {
        if self.shared.denied.load(Ordering::Acquire) &&
            !self.shared.reported.swap(true, Ordering::AcqRel) {
            return Some(Error::InjectionDenied);
        }
        None
    }

    /// True while events are being dropped.
    pub fn is_suppressed(&self) -> bool {
        self.shared.denied.load(Ordering::Acquire)
    }

    /// Asks the injector again; resumes forwarding if it now allows input.
    pub fn recheck_permission(&self) -> bool {
        if self.worker.is_none() {
            return false;
        }
        if !self.injector.is_permitted() {
            debug!("input injection still denied");
            return false;
        }
        if self.shared.denied.swap(false, Ordering::AcqRel) {
            info!("input injection permitted again, resuming");
        }
        self.shared.reported.store(false, Ordering::Release);
        true
    }

    /// Blocks until everything queued so far has been handled.
    pub fn flush(&self) {
        if let Some(ref tx) = self.tx {
            let (done_tx, done_rx) = flume::bounded(1);
            if tx.send(Job::Flush(done_tx)).is_ok() {
                let _ = done_rx.recv();
            }
        }
    }

    /// Events handed to the injector successfully.
    pub fn posted(&self) -> u64 {
        self.shared.posted.load(Ordering::Relaxed)
    }

    /// Events dropped while injection was denied.
    pub fn suppressed(&self) -> u64 {
        self.shared.suppressed.load(Ordering::Relaxed)
    }
}

impl Drop for InputForwarder {
    fn drop(&mut self) {
        self.tx = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("injection worker panicked");
            }
        }
    }
}

fn drain(rx: flume::Receiver<Job>, injector: Arc<dyn TInputInjector>, shared: Arc<Shared>) {
    for job in rx.iter() {
        let result = match job {
            Job::Flush(done) => {
                let _ = done.send(());
                continue;
            }
            _ if shared.denied.load(Ordering::Acquire) => {
                shared.suppressed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            Job::Mouse(event) => injector.post_mouse(event.kind, event.point),
            Job::Key(code, flags) => injector.press_key(code, flags),
        };
        match result {
            Ok(()) => {
                shared.posted.fetch_add(1, Ordering::Relaxed);
            }
            Err(Error::InjectionDenied) => {
                shared.suppressed.fetch_add(1, Ordering::Relaxed);
                shared.deny();
            }
            Err(e) => warn!("failed to post input: {}", e),
        }
    }
    debug!("injection worker exiting");
}
