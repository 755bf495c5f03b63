//! # Stream and Codec Abstractions
//!
//! The decode pipeline does not demultiplex containers or decode packets
//! itself. It drives two collaborators:
//!
//! - **[`StreamContext`]**: an opened container. Exposes its best audio stream,
//!   reads that stream's packets, performs a best-effort seek and reports
//!   the stream duration.
//! - **[`Codec`]**: a decoder opened around the audio stream's parameters.
//!   Turns packets into [`RawFrame`](crate::RawFrame)s.
//!
//! ```text
//! StreamContext ──Packet──▶ Codec ──RawFrame──▶ FrameQueue ──▶ FrameBuffer ──▶ PcmBuffer
//! ```
//!
//! The Symphonia-backed implementations live in [`crate::backend`]; tests use
//! in-memory fakes.

use crate::error::{PacketReadError, Result, SeekError};
use crate::format::{AudioFormatDescriptor, ChannelLayout, SampleFormat};
use crate::frame::PacketFrames;
use bytes::Bytes;

// ============================================================================
// Stream Types
// ============================================================================

/// Unit of time in which a stream's timestamps are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBase {
    pub numer: u32,
    pub denom: u32,
}

impl TimeBase {
    pub fn new(numer: u32, denom: u32) -> Self {
        Self { numer, denom }
    }

    /// Seconds per timestamp unit.
    pub fn ratio(&self) -> f64 {
        if self.denom == 0 {
            return 0.0;
        }
        self.numer as f64 / self.denom as f64
    }

    /// Convert a timestamp to seconds.
    pub fn to_seconds(&self, ts: i64) -> f64 {
        ts as f64 * self.ratio()
    }

    /// Convert seconds to the nearest timestamp.
    pub fn to_timestamp(&self, seconds: f64) -> i64 {
        let ratio = self.ratio();
        if ratio == 0.0 {
            return 0;
        }
        (seconds / ratio).round() as i64
    }
}

/// Descriptor of the audio stream chosen from a container.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    /// Stream index / track id within the container.
    pub index: u32,
    /// Time base of the stream's timestamps.
    pub time_base: TimeBase,
    /// Stream duration in time-base units, if the container declares it.
    pub duration_ts: Option<i64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channel_count: u16,
    /// Channel arrangement.
    pub channel_layout: ChannelLayout,
    /// Codec label, best effort.
    pub codec_name: Option<String>,
}

impl AudioStream {
    /// Seconds per timestamp unit.
    pub fn time_base_ratio(&self) -> f64 {
        self.time_base.ratio()
    }

    /// Declared duration in seconds, if known and positive.
    pub fn duration(&self) -> Option<f64> {
        self.duration_ts
            .filter(|&ts| ts > 0)
            .map(|ts| self.time_base.to_seconds(ts))
    }
}

/// One compressed packet read from a container.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Index of the stream the packet belongs to.
    pub stream_index: u32,
    /// Presentation timestamp in stream time-base units.
    pub pts: i64,
    /// Duration in stream time-base units.
    pub duration: i64,
    /// Byte offset of the packet within the file, or -1 if unknown.
    pub byte_position: i64,
    /// Encoded payload.
    pub data: Bytes,
}

impl Packet {
    pub fn new(stream_index: u32, pts: i64, duration: i64, data: Bytes) -> Self {
        Self {
            stream_index,
            pts,
            duration,
            byte_position: -1,
            data,
        }
    }

    pub fn with_byte_position(mut self, byte_position: i64) -> Self {
        self.byte_position = byte_position;
        self
    }
}

// ============================================================================
// Core Traits
// ============================================================================

/// An opened container.
///
/// Reading is blocking I/O. Implementations are driven from a single decode
/// thread and need not be `Sync`.
pub trait StreamContext: Send {
    /// Path or label of the opened source, used in log messages.
    fn path(&self) -> &str;

    /// The first / best audio stream in the container, if any.
    fn best_audio_stream(&self) -> Option<AudioStream>;

    /// Read the next packet of the container.
    ///
    /// Returns `Ok(None)` when the packet belongs to a different stream than
    /// `stream`; callers simply read again.
    ///
    /// # Errors
    ///
    /// Returns a [`PacketReadError`] whose `is_eof()` is `true` at end of
    /// stream.
    fn read_packet(&mut self, stream: &AudioStream)
        -> std::result::Result<Option<Packet>, PacketReadError>;

    /// Best-effort seek to `time` (seconds) within `stream`.
    ///
    /// The next packet read may start before the target.
    ///
    /// # Errors
    ///
    /// Returns a [`SeekError`] whose `is_eof()` is `true` when `time` lies at
    /// or beyond the end of the stream.
    fn seek(&mut self, stream: &AudioStream, time: f64) -> std::result::Result<(), SeekError>;

    /// Stream duration in seconds, or 0 if unknown.
    fn duration(&self) -> f64;
}

/// A codec opened around one audio stream.
pub trait Codec: Send {
    /// Open the codec for decoding.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::CodecInitialization`](crate::DecodeError::CodecInitialization)
    /// if the codec cannot be opened.
    fn open(&mut self) -> Result<()>;

    /// Decode one packet into zero or more frames, in presentation order.
    fn decode(&mut self, packet: &Packet) -> Result<PacketFrames>;

    /// Decode a packet only to advance the codec's internal state; the
    /// produced frames are discarded. Failures are ignored.
    fn decode_and_drop(&mut self, packet: &Packet);

    /// Release frames the codec buffered internally. Call at end of stream.
    fn drain(&mut self) -> Result<PacketFrames>;

    /// Discard internal state. Must be called before seeking.
    fn flush_buffers(&mut self);

    fn sample_rate(&self) -> u32;

    fn sample_format(&self) -> SampleFormat;

    fn channel_layout(&self) -> ChannelLayout;

    fn channel_count(&self) -> u16;

    /// Format descriptor of the frames this codec produces.
    fn audio_format(&self) -> AudioFormatDescriptor {
        AudioFormatDescriptor::new(
            self.sample_rate(),
            self.channel_count(),
            self.channel_layout(),
            self.sample_format(),
        )
    }
}
