//! Single-slot handoff between the capture thread and the UI.
//!
//! Frames arrive at whatever cadence the system renders the bar.  The UI only
//! ever wants the newest one, so the relay keeps exactly one frame: a submit
//! replaces whatever is there, read or not.  Intermediate frames are dropped
//! on purpose.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::types::CapturedFrame;

struct Slot {
    frame: Option<CapturedFrame>,
    read: bool,
    // Bumped by `clear`.
    epoch: u64,
}

/// Conflated channel of `CapturedFrame`s.
pub struct FrameRelay {
    slot: Mutex<Slot>,
    submitted: AtomicU64,
    dropped: AtomicU64,
}

impl Default for FrameRelay {
    fn default() -> FrameRelay {
        FrameRelay::new()
    }
}

impl FrameRelay {
    ///
    pub fn new() -> FrameRelay {
        FrameRelay {
            slot: Mutex::new(Slot { frame: None, read: false, epoch: 0 }),
            submitted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Offers a frame.  It replaces the held frame unless the held frame is
    /// at least as new.
    pub fn submit(&self, frame: CapturedFrame) {
        self.offer(None, frame);
    }

    /// Current epoch.  A producer that captures it before starting can use
    /// `submit_in` so that nothing it sends survives the next `clear`.
    pub fn epoch(&self) -> u64 {
        self.slot.lock().epoch
    }

    /// Like `submit`, but discards the frame if the relay has been cleared
    /// since `epoch` was read.
    pub fn submit_in(&self, epoch: u64, frame: CapturedFrame) {
        self.offer(Some(epoch), frame);
    }

    fn offer(&self, epoch: Option<u64>, frame: CapturedFrame) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let stale = {
            let mut slot = self.slot.lock();
            if epoch.map_or(false, |e| e != slot.epoch) {
                Some(frame)
            } else {
                match slot.frame {
                    Some(ref held) if held.sequence >= frame.sequence => Some(frame),
                    _ => {
                        let unread = !slot.read && slot.frame.is_some();
                        // The old frame is dropped after the lock is released.
                        let old = slot.frame.replace(frame);
                        slot.read = false;
                        if unread {
                            self.dropped.fetch_add(1, Ordering::Relaxed);
                        }
                        old
                    }
                }
            }
        };
        if let Some(old) = stale {
            trace!("relay released frame {}", old.sequence);
        }
    }

    /// Newest frame received so far.
    pub fn latest(&self) -> Option<CapturedFrame> {
        let mut slot = self.slot.lock();
        slot.read = true;
        slot.frame.clone()
    }

    /// Newest frame, only if its sequence is greater than `seen`.
    pub fn take_newer(&self, seen: Option<u64>) -> Option<CapturedFrame> {
        let mut slot = self.slot.lock();
        let newer = match (slot.frame.as_ref(), seen) {
            (Some(frame), Some(seen)) => frame.sequence > seen,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !newer {
            return None;
        }
        slot.read = true;
        slot.frame.clone()
    }

    /// Forgets the held frame, e.g. when the stream is torn down, and starts
    /// a new epoch.
    pub fn clear(&self) {
        let old = {
            let mut slot = self.slot.lock();
            slot.read = false;
            slot.epoch += 1;
            slot.frame.take()
        };
        drop(old);
    }

    /// Total frames offered.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Frames replaced before anyone read them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use crate::types::{PixelBuffer, Size};

    fn frame(seq: u64) -> CapturedFrame {
        CapturedFrame::new(Arc::new(PixelBuffer(vec![seq as u8; 4])),
                           Size::new(1., 1.), seq)
    }

    #[test]
    fn test_empty() {
        let relay = FrameRelay::new();
        assert!(relay.latest().is_none());
        assert!(relay.take_newer(None).is_none());
    }

    #[test]
    fn test_latest_is_newest() {
        let relay = FrameRelay::new();
        relay.submit(frame(1));
        relay.submit(frame(2));
        relay.submit(frame(3));
        assert_eq!(relay.latest().unwrap().sequence, 3);
        assert_eq!(relay.submitted(), 3);
        assert_eq!(relay.dropped(), 2);
    }

    #[test]
    fn test_out_of_order_submit_is_ignored() {
        let relay = FrameRelay::new();
        relay.submit(frame(5));
        relay.submit(frame(4));
        relay.submit(frame(5));
        assert_eq!(relay.latest().unwrap().sequence, 5);
    }

    #[test]
    fn test_latest_does_not_consume() {
        let relay = FrameRelay::new();
        relay.submit(frame(1));
        assert_eq!(relay.latest().unwrap().sequence, 1);
        assert_eq!(relay.latest().unwrap().sequence, 1);
        relay.submit(frame(2));
        assert_eq!(relay.dropped(), 0);
    }

    #[test]
    fn test_take_newer() {
        let relay = FrameRelay::new();
        relay.submit(frame(7));
        assert_eq!(relay.take_newer(None).unwrap().sequence, 7);
        assert!(relay.take_newer(Some(7)).is_none());
        relay.submit(frame(8));
        assert_eq!(relay.take_newer(Some(7)).unwrap().sequence, 8);
    }

    #[test]
    fn test_clear() {
        let relay = FrameRelay::new();
        relay.submit(frame(1));
        relay.clear();
        assert!(relay.latest().is_none());
    }

    #[test]
    fn test_submit_after_clear_is_discarded() {
        let relay = FrameRelay::new();
        let epoch = relay.epoch();
        relay.submit_in(epoch, frame(1));
        assert_eq!(relay.latest().unwrap().sequence, 1);
        // A producer that was mid-delivery when the stream was closed.
        relay.clear();
        relay.submit_in(epoch, frame(2));
        assert!(relay.latest().is_none());
        let epoch = relay.epoch();
        relay.submit_in(epoch, frame(3));
        assert_eq!(relay.latest().unwrap().sequence, 3);
    }

    #[test]
    fn test_concurrent_submit_and_read() {
        let relay = Arc::new(FrameRelay::new());
        let writers: Vec<_> = (0..4).map(|t| {
            let relay = relay.clone();
            thread::spawn(move || {
                for i in 0..500u64 {
                    relay.submit(frame(i * 4 + t));
                }
            })
        }).collect();
        let reader = {
            let relay = relay.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..2000 {
                    if let Some(f) = relay.latest() {
                        assert!(f.sequence >= last, "went backwards");
                        assert_eq!(f.image.bytes().unwrap()[0], f.sequence as u8);
                        last = f.sequence;
                    }
                }
            })
        };
        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(relay.latest().unwrap().sequence, 499 * 4 + 3);
        assert_eq!(relay.submitted(), 2000);
    }
}
