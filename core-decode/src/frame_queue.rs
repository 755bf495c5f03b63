//! # Frame Queue
//!
//! FIFO holding decoded frames between the codec and a [`FrameBuffer`].
//!
//! When a buffer fills up mid-decode, the frame it rejected stays at the head
//! of the queue and becomes the first frame offered to the next buffer.
//!
//! [`FrameBuffer`]: crate::frame_buffer::FrameBuffer

use std::collections::VecDeque;

use crate::frame::RawFrame;

/// Ordered queue of decoded frames. Dequeue order is decode order.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<RawFrame>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, frame: RawFrame) {
        self.frames.push_back(frame);
    }

    pub fn enqueue_all(&mut self, frames: impl IntoIterator<Item = RawFrame>) {
        self.frames.extend(frames);
    }

    /// Head of the queue, without removing it.
    pub fn peek(&self) -> Option<&RawFrame> {
        self.frames.front()
    }

    pub fn dequeue(&mut self) -> Option<RawFrame> {
        self.frames.pop_front()
    }

    /// Put a frame back at the head of the queue.
    ///
    /// Used when a dequeued frame was rejected by a full buffer.
    pub fn requeue(&mut self, frame: RawFrame) {
        self.frames.push_front(frame);
    }

    /// Remove and return every queued frame, in order.
    pub fn dequeue_all(&mut self) -> Vec<RawFrame> {
        self.frames.drain(..).collect()
    }

    /// Drop every queued frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total usable samples per channel currently queued.
    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(RawFrame::sample_count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawFrame> {
        self.frames.iter()
    }
}
