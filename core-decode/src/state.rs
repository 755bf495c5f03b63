//! # Decoder State
//!
//! Flags written by the decode thread and polled by a scheduler thread.
//! Each flag is an independent atomic cell; readers never block the decoder.

use std::sync::atomic::{AtomicBool, Ordering};

/// Point-in-time copy of every decoder flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStatus {
    pub eof: bool,
    pub fatal_error: bool,
    pub end_of_loop: bool,
    pub frames_need_timestamps: bool,
}

/// Lock-free decoder flags.
///
/// Single writer (the decode thread), any number of readers. Share it by
/// wrapping in an `Arc`; see [`Decoder::state`](crate::Decoder::state).
#[derive(Debug, Default)]
pub struct DecoderState {
    eof: AtomicBool,
    fatal_error: AtomicBool,
    end_of_loop: AtomicBool,
    frames_need_timestamps: AtomicBool,
}

impl DecoderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once every packet of the stream has been read.
    pub fn eof(&self) -> bool {
        self.eof.load(Ordering::Acquire)
    }

    pub fn set_eof(&self, value: bool) {
        self.eof.store(value, Ordering::Release);
    }

    /// `true` once the decoder gave up after repeated read failures.
    pub fn fatal_error(&self) -> bool {
        self.fatal_error.load(Ordering::Acquire)
    }

    pub fn set_fatal_error(&self, value: bool) {
        self.fatal_error.store(value, Ordering::Release);
    }

    /// `true` once a loop decode reached its end time.
    pub fn end_of_loop(&self) -> bool {
        self.end_of_loop.load(Ordering::Acquire)
    }

    pub fn set_end_of_loop(&self, value: bool) {
        self.end_of_loop.store(value, Ordering::Release);
    }

    /// Whether decoded frames get start/end timestamps assigned.
    pub fn frames_need_timestamps(&self) -> bool {
        self.frames_need_timestamps.load(Ordering::Acquire)
    }

    pub fn set_frames_need_timestamps(&self, value: bool) {
        self.frames_need_timestamps.store(value, Ordering::Release);
    }

    pub fn snapshot(&self) -> DecoderStatus {
        DecoderStatus {
            eof: self.eof(),
            fatal_error: self.fatal_error(),
            end_of_loop: self.end_of_loop(),
            frames_need_timestamps: self.frames_need_timestamps(),
        }
    }
}
