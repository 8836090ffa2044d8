use std::collections::HashMap;
use parking_lot::Mutex;

use crate::common::types::FrameId;

/// Clock page replacement policy.
///
/// Tracks the frames currently eligible for eviction in a circular list
/// threaded through a hash map, one reference bit per tracked frame. The
/// hand sweeps the ring on `victim`, clearing reference bits until it
/// lands on a frame whose bit is already clear. All operations are O(1)
/// amortized; a sweep touches each tracked frame at most twice.
pub struct ClockReplacer {
    inner: Mutex<ClockState>,
}

/// Ring node; `prev`/`next` thread the tracked frames into a circle
struct ClockNode {
    prev: FrameId,
    next: FrameId,
    referenced: bool,
}

struct ClockState {
    nodes: HashMap<FrameId, ClockNode>,
    hand: Option<FrameId>,
    capacity: usize,
}

impl ClockState {
    /// Splice a new frame in just behind the hand, reference bit set
    fn link_behind_hand(&mut self, frame_id: FrameId) {
        match self.hand {
            None => {
                self.nodes.insert(
                    frame_id,
                    ClockNode {
                        prev: frame_id,
                        next: frame_id,
                        referenced: true,
                    },
                );
                self.hand = Some(frame_id);
            }
            Some(hand) => {
                let tail = self.nodes.get(&hand).expect("hand frame is tracked").prev;
                self.nodes.insert(
                    frame_id,
                    ClockNode {
                        prev: tail,
                        next: hand,
                        referenced: true,
                    },
                );
                self.nodes.get_mut(&tail).expect("ring neighbor is tracked").next = frame_id;
                self.nodes.get_mut(&hand).expect("hand frame is tracked").prev = frame_id;
            }
        }
    }

    /// Unsplice a frame, moving the hand off it if needed. No-op for
    /// untracked frames.
    fn unlink(&mut self, frame_id: FrameId) {
        let node = match self.nodes.remove(&frame_id) {
            Some(node) => node,
            None => return,
        };

        if self.nodes.is_empty() {
            self.hand = None;
            return;
        }

        self.nodes.get_mut(&node.prev).expect("ring neighbor is tracked").next = node.next;
        self.nodes.get_mut(&node.next).expect("ring neighbor is tracked").prev = node.prev;
        if self.hand == Some(frame_id) {
            self.hand = Some(node.next);
        }
    }
}

impl ClockReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ClockState {
                nodes: HashMap::with_capacity(capacity),
                hand: None,
                capacity,
            }),
        }
    }

    /// Select a frame for eviction and stop tracking it.
    ///
    /// Sweeps from the hand, clearing set reference bits; the first frame
    /// found with a clear bit is unspliced and returned.
    pub fn victim(&self) -> Option<FrameId> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;

        loop {
            let frame_id = state.hand?;
            let node = state.nodes.get_mut(&frame_id).expect("hand frame is tracked");

            if node.referenced {
                node.referenced = false;
                state.hand = Some(node.next);
            } else {
                state.unlink(frame_id);
                return Some(frame_id);
            }
        }
    }

    /// Stop tracking a frame that is now pinned. No-op for untracked frames.
    pub fn pin(&self, frame_id: FrameId) {
        self.inner.lock().unlink(frame_id);
    }

    /// Start tracking a frame whose pin count dropped to zero.
    ///
    /// Repeated unpins of the same frame only re-set its reference bit.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock();
        let state = &mut *guard;

        if let Some(node) = state.nodes.get_mut(&frame_id) {
            node.referenced = true;
        } else if state.nodes.len() < state.capacity {
            state.link_behind_hand(frame_id);
        }
    }

    /// Number of frames currently eligible for eviction
    pub fn size(&self) -> usize {
        self.inner.lock().nodes.len()
    }
}
