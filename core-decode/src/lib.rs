//! # Streaming Audio Decode Pipeline
//!
//! Turns compressed packets from a demultiplexed container into fixed-format
//! PCM buffers for a playback scheduler.
//!
//! ## Overview
//!
//! This crate handles:
//! - Frame queuing with carry-over between `decode()` calls
//! - End-of-stream draining of queued and codec-buffered frames
//! - Bounded retry on damaged streams
//! - Accurate seeking on top of approximate container seeks
//! - Packet indexing for streams without duration metadata
//! - Conversion of decoded samples to planar `f32`
//!
//! ## Components
//!
//! | Type | Role |
//! |------|------|
//! | [`StreamContext`] | Opened container (external collaborator) |
//! | [`Codec`] | Packet decoder (external collaborator) |
//! | [`FrameQueue`] | Decoded frames awaiting consumption |
//! | [`FrameBuffer`] | Frames collected for one `decode()` call |
//! | [`SampleConverter`] | Conversion to canonical PCM |
//! | [`PacketTable`] | Byte-position index for duration-less streams |
//! | [`Decoder`] | Orchestrator |
//!
//! ## Features
//!
//! - `core-decoder` (default): Symphonia-backed [`backend`]
//! - `decoder-*`: individual container/codec support
//!
//! ## Example
//!
//! ```rust,ignore
//! use core_decode::{Decoder, PcmFormat};
//!
//! let mut decoder = Decoder::new(context, codec)?;
//! let output_format = PcmFormat::from(decoder.audio_format());
//!
//! decoder.seek(30.0)?;
//! while let Some(chunk) = decoder.decode(4096, &output_format) {
//!     scheduler.schedule(chunk);
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod format;
pub mod frame;
pub mod frame_buffer;
pub mod frame_queue;
pub mod packet_table;
pub mod sample_converter;
pub mod state;
pub mod traits;

#[cfg(feature = "core-decoder")]
pub mod backend;

pub use config::DecoderConfig;
pub use decoder::Decoder;
pub use error::{DecodeError, ErrorCode, PacketReadError, Result, SeekError};
pub use format::{AudioFormatDescriptor, ChannelLayout, PcmFormat, SampleFormat};
pub use frame::{PacketFrames, RawFrame, SampleData};
pub use frame_buffer::FrameBuffer;
pub use frame_queue::FrameQueue;
pub use packet_table::{PacketTable, PacketTableEntry};
pub use sample_converter::{PcmBuffer, SampleConverter};
pub use state::{DecoderState, DecoderStatus};
pub use traits::{AudioStream, Codec, Packet, StreamContext, TimeBase};

#[cfg(feature = "core-decoder")]
pub use backend::{open_file, SymphoniaCodec, SymphoniaStreamContext};
