//! Wrapper around the platform's push-based display capture.
//!
//! The adapter stamps frames with a process-wide sequence number and gates
//! delivery on the stream still being open, so the platform is free to call
//! back after it has been told to stop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::interface::{StreamId, TFrameSource};
use crate::types::{CapturedFrame, SurfaceId};

/// Receives frames from an open stream, on the capture thread.
pub type FrameSink = Arc<dyn Fn(CapturedFrame) + Send + Sync>;

/// An open capture stream.  Dropping it without `close` leaks the platform
/// stream, but delivery still stops.
pub struct StreamHandle {
    id: StreamId,
    surface: SurfaceId,
    live: Arc<AtomicBool>,
}

impl StreamHandle {
    ///
    pub fn id(&self) -> StreamId { self.id }
    ///
    pub fn surface(&self) -> SurfaceId { self.surface }
    /// False once closed.
    pub fn is_live(&self) -> bool { self.live.load(Ordering::Acquire) }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.live.store(false, Ordering::Release);
    }
}

/// Opens and closes capture streams on a `TFrameSource`.
pub struct FrameSourceAdapter {
    source: Arc<dyn TFrameSource>,
    sequence: Arc<AtomicU64>,
    open_timeout: Duration,
}

impl FrameSourceAdapter {
    ///
    pub fn new(source: Arc<dyn TFrameSource>, open_timeout: Duration) -> FrameSourceAdapter {
        FrameSourceAdapter {
            source: source,
            sequence: Arc::new(AtomicU64::new(0)),
            open_timeout: open_timeout,
        }
    }

    /// Sequence number given to the most recent frame, 0 if none yet.
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Starts capturing `surface`, delivering frames to `on_frame`.
    ///
    /// The platform call happens on a helper thread.  If it has not answered
    /// within the open timeout the surface is considered unavailable; should
    /// the stream turn up later it is stopped straight away.
    pub fn open(&self, surface: SurfaceId, on_frame: FrameSink) -> Result<StreamHandle> {
        let live = Arc::new(AtomicBool::new(true));
        let callback = {
            let live = live.clone();
            let sequence = self.sequence.clone();
            Box::new(move |mut frame: CapturedFrame| {
                if !live.load(Ordering::Acquire) {
                    trace!("dropping frame delivered after close");
                    return;
                }
                frame.sequence = sequence.fetch_add(1, Ordering::AcqRel) + 1;
                on_frame(frame);
            })
        };

        let (tx, rx) = flume::bounded::<Result<StreamId>>(1);
        let source = self.source.clone();
        // Held while sending, so a late stream is either received or stopped.
        let abandoned = Arc::new(Mutex::new(false));
        let opener_abandoned = abandoned.clone();
        let spawned = thread::Builder::new()
            .name("simbar-capture-open".into())
            .spawn(move || {
                let result = source.create_stream(surface, callback);
                let abandoned = opener_abandoned.lock();
                match result {
                    Ok(id) if *abandoned => {
                        warn!("capture stream {} opened after timeout, stopping it", id);
                        source.stop_stream(id);
                    }
                    result => {
                        let _ = tx.send(result);
                    }
                }
            });
        if let Err(e) = spawned {
            return Err(Error::CaptureUnavailable(format!("cannot spawn opener: {}", e)));
        }

        match rx.recv_timeout(self.open_timeout) {
            Ok(Ok(id)) => {
                info!("capture stream {} open on surface {}", id, surface);
                Ok(StreamHandle { id: id, surface: surface, live: live })
            }
            Ok(Err(e)) => {
                live.store(false, Ordering::Release);
                error!("capture stream on surface {} failed: {}", surface, e);
                Err(match e {
                    Error::CaptureUnavailable(_) => e,
                    other => Error::CaptureUnavailable(other.to_string()),
                })
            }
            Err(_) => {
                live.store(false, Ordering::Release);
                *abandoned.lock() = true;
                // The opener may have sent just as the wait expired.
                if let Ok(Ok(id)) = rx.try_recv() {
                    self.source.stop_stream(id);
                }
                error!("capture stream on surface {} did not open within {:?}",
                       surface, self.open_timeout);
                Err(Error::CaptureUnavailable(
                    format!("no stream after {:?}", self.open_timeout)))
            }
        }
    }

    /// Stops `handle`.  Frames still in flight are discarded.
    pub fn close(&self, handle: StreamHandle) {
        handle.live.store(false, Ordering::Release);
        self.source.stop_stream(handle.id);
        info!("capture stream {} closed", handle.id);
    }
}
