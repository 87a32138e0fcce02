//! Bounded frame buffer with drop-oldest overflow.

use std::collections::VecDeque;
use swing_core::PoseFrame;

/// Ring of the most recent accepted frames.
///
/// A frame evicted before it was ever part of an analysis snapshot is
/// counted as dropped.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    frames: VecDeque<PoseFrame>,
    capacity: usize,
    /// Newest frame index included in a snapshot
    snapshot_through: Option<u64>,
    dropped: u64,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            snapshot_through: None,
            dropped: 0,
        }
    }

    /// Append a frame, evicting the oldest when full. Returns true when the
    /// evicted frame had never been analyzed.
    pub fn push(&mut self, frame: PoseFrame) -> bool {
        let mut lost = false;
        if self.frames.len() == self.capacity {
            if let Some(evicted) = self.frames.pop_front() {
                lost = self
                    .snapshot_through
                    .map_or(true, |through| evicted.frame_index() > through);
                if lost {
                    self.dropped += 1;
                }
            }
        }
        self.frames.push_back(frame);
        lost
    }

    /// Copy of the buffered window, marking it as analyzed
    pub fn snapshot(&mut self) -> Vec<PoseFrame> {
        self.snapshot_through = self.frames.back().map(PoseFrame::frame_index);
        self.frames.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&PoseFrame> {
        self.frames.back()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Frames accepted since the last snapshot
    pub fn pending(&self) -> usize {
        match self.snapshot_through {
            Some(through) => self
                .frames
                .iter()
                .filter(|f| f.frame_index() > through)
                .count(),
            None => self.frames.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swing_core::synthetic::SyntheticSwing;

    #[test]
    fn test_drop_oldest() {
        let mut buffer = FrameBuffer::new(3);
        for frame in SyntheticSwing::default().truncated(5).frames() {
            buffer.push(frame);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.dropped(), 2);
        assert_eq!(buffer.last().map(PoseFrame::frame_index), Some(4));
    }

    #[test]
    fn test_analyzed_evictions_are_not_dropped() {
        let frames = SyntheticSwing::default().truncated(6).frames();
        let mut buffer = FrameBuffer::new(3);
        for frame in frames[..3].iter().cloned() {
            buffer.push(frame);
        }
        let window = buffer.snapshot();
        assert_eq!(window.len(), 3);
        assert_eq!(buffer.pending(), 0);

        for frame in frames[3..].iter().cloned() {
            assert!(!buffer.push(frame));
        }
        assert_eq!(buffer.dropped(), 0);
        assert_eq!(buffer.pending(), 3);
    }
}
