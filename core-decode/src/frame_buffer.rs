//! # Frame Buffer
//!
//! Collects decoded frames up to a sample budget; the result of one `decode()`
//! call before it is converted to playback PCM.

use crate::format::AudioFormatDescriptor;
use crate::frame::RawFrame;

/// Accumulates frames until adding another would exceed `max_sample_count`.
///
/// `sample_count` always equals the sum of the contained frames' usable
/// sample counts. Terminal frames (released at end of stream) bypass the cap.
#[derive(Debug)]
pub struct FrameBuffer {
    audio_format: AudioFormatDescriptor,
    max_sample_count: usize,
    frames: Vec<RawFrame>,
    sample_count: usize,
    max_frame_sample_count: usize,
}

impl FrameBuffer {
    pub fn new(audio_format: AudioFormatDescriptor, max_sample_count: usize) -> Self {
        Self {
            audio_format,
            max_sample_count,
            frames: Vec::new(),
            sample_count: 0,
            max_frame_sample_count: 0,
        }
    }

    pub fn audio_format(&self) -> &AudioFormatDescriptor {
        &self.audio_format
    }

    pub fn max_sample_count(&self) -> usize {
        self.max_sample_count
    }

    /// Usable samples per channel held by the buffer.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Largest `actual_sample_count` of any contained frame.
    ///
    /// Sizes the converter's per-frame scratch space.
    pub fn max_frame_sample_count(&self) -> usize {
        self.max_frame_sample_count
    }

    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns `true` if `frame` fits within the remaining budget.
    pub fn has_room_for(&self, frame: &RawFrame) -> bool {
        self.sample_count + frame.sample_count() <= self.max_sample_count
    }

    /// Append a frame if it fits; otherwise hand it back untouched.
    pub fn append_frame(&mut self, frame: RawFrame) -> Result<(), RawFrame> {
        if !self.has_room_for(&frame) {
            return Err(frame);
        }

        self.push(frame);
        Ok(())
    }

    /// Append frames drained at end of stream. Never rejects.
    pub fn append_terminal_frames(&mut self, frames: impl IntoIterator<Item = RawFrame>) {
        for frame in frames {
            self.push(frame);
        }
    }

    fn push(&mut self, frame: RawFrame) {
        self.sample_count += frame.sample_count();
        self.max_frame_sample_count = self.max_frame_sample_count.max(frame.actual_sample_count());
        self.frames.push(frame);
    }

    /// Release every frame's samples. Safe to call more than once.
    pub fn destroy(&mut self) {
        for frame in &mut self.frames {
            frame.release();
        }
        self.frames.clear();
        self.sample_count = 0;
        self.max_frame_sample_count = 0;
    }
}
