//! Clock page replacement for the buffer pool.

use crate::frame::FrameId;
use parking_lot::Mutex;

/// Clock replacement algorithm.
///
/// Frames carry a reference bit that is set on every access. The clock hand
/// sweeps the frames, clearing set bits, and picks the first evictable frame
/// whose bit is already clear. Evictability is decided by the caller (the
/// pool checks pin counts) so the replacer keeps no pinned-set of its own.
pub struct ClockReplacer {
    inner: Mutex<ClockReplacerInner>,
}

struct ClockReplacerInner {
    reference_bits: Vec<bool>,
    clock_hand: usize,
}

impl ClockReplacer {
    /// Creates a new clock replacer with the given number of frames.
    pub fn new(num_frames: usize) -> Self {
        Self {
            inner: Mutex::new(ClockReplacerInner {
                reference_bits: vec![false; num_frames],
                clock_hand: 0,
            }),
        }
    }

    /// Returns the total capacity.
    pub fn capacity(&self) -> usize {
        self.inner.lock().reference_bits.len()
    }

    /// Records that the given frame was accessed.
    pub fn record_access(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if let Some(bit) = inner.reference_bits.get_mut(frame_id.0 as usize) {
            *bit = true;
        }
    }

    /// Selects a victim among frames for which `is_evictable` returns true.
    ///
    /// Two full rotations are enough: the first clears every reference bit.
    pub fn evict<F>(&self, is_evictable: F) -> Option<FrameId>
    where
        F: Fn(FrameId) -> bool,
    {
        let mut inner = self.inner.lock();
        let num_frames = inner.reference_bits.len();
        if num_frames == 0 {
            return None;
        }

        for _ in 0..(2 * num_frames) {
            let hand = inner.clock_hand;
            inner.clock_hand = (hand + 1) % num_frames;

            let frame_id = FrameId(hand as u32);
            if !is_evictable(frame_id) {
                continue;
            }
            if inner.reference_bits[hand] {
                inner.reference_bits[hand] = false;
            } else {
                return Some(frame_id);
            }
        }
        None
    }
}
