//! # Decoder
//!
//! Orchestrates the decode pipeline for one opened file: pulls packets from a
//! [`StreamContext`], decodes them with a [`Codec`], queues the frames, fills a
//! [`FrameBuffer`] per call and converts it to canonical PCM.
//!
//! ## Decode Loop
//!
//! ```text
//! decode(max)
//!   │
//!   ├─▶ next_frame ──ok──▶ append to buffer ──full──▶ leave frame queued, stop
//!   │        │
//!   │        ├─ EOF ──────▶ eof = true
//!   │        └─ error ────▶ retry, fatal after N consecutive failures
//!   │
//!   ├─▶ at EOF: queued frames + codec drain appended as terminal frames
//!   └─▶ convert buffer to PcmBuffer
//! ```
//!
//! ## Seeking
//!
//! Container seeks are approximate. After the low-level seek, packets are read
//! forward until one starts past the target. The packet just before it is the
//! first one kept; earlier packets only warm up the codec. If the kept packet
//! starts noticeably before the target, its leading samples are trimmed.
//!
//! ## Threading
//!
//! `decode`, `decode_loop`, `seek` and `stop` must be called from one thread
//! at a time. Status flags can be polled concurrently through
//! [`Decoder::state`].

use std::sync::Arc;

use crate::config::DecoderConfig;
use crate::error::{DecodeError, Result};
use crate::format::{AudioFormatDescriptor, PcmFormat};
use crate::frame::{PacketFrames, RawFrame};
use crate::frame_buffer::FrameBuffer;
use crate::frame_queue::FrameQueue;
use crate::sample_converter::{PcmBuffer, SampleConverter};
use crate::state::{DecoderState, DecoderStatus};
use crate::traits::{AudioStream, Codec, Packet, StreamContext};
use tracing::{debug, error, info, instrument, warn};

/// Where a frame lies relative to a loop end time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopPosition {
    /// Entirely before the loop end (or not timestamped).
    Inside,
    /// Crosses the loop end; truncated to end exactly there.
    Crossing,
    /// Starts at or after the loop end.
    Beyond,
}

/// Decoder for one audio stream.
pub struct Decoder<S: StreamContext, C: Codec> {
    context: S,
    codec: C,
    stream: AudioStream,
    audio_format: AudioFormatDescriptor,
    config: DecoderConfig,
    duration: f64,
    state: Arc<DecoderState>,
    frame_queue: FrameQueue,
    converter: SampleConverter,
    recurring_packet_read_errors: u32,
    destroyed: bool,
}

impl<S: StreamContext, C: Codec> Decoder<S, C> {
    /// Create a decoder with the default configuration.
    pub fn new(context: S, codec: C) -> Result<Self> {
        Self::with_config(context, codec, DecoderConfig::default())
    }

    /// Create a decoder over an opened container and a codec for its best
    /// audio stream. Opens the codec.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if `config` fails validation
    /// - `StreamInitialization` if the container has no audio stream
    /// - `CodecInitialization` if the codec cannot be opened
    /// - `ResamplerInitialization` if the sample converter cannot be set up
    #[instrument(skip_all, fields(path = %context.path()))]
    pub fn with_config(context: S, mut codec: C, config: DecoderConfig) -> Result<Self> {
        config.validate().map_err(DecodeError::InvalidConfig)?;

        let stream = context.best_audio_stream().ok_or_else(|| {
            DecodeError::StreamInitialization(format!(
                "No audio stream found in {}",
                context.path()
            ))
        })?;

        codec.open()?;

        let audio_format = codec.audio_format();
        let converter = SampleConverter::new(&audio_format, &config)?;

        let duration = stream
            .duration()
            .or_else(|| Some(context.duration()).filter(|d| *d > 0.0))
            .unwrap_or(0.0);

        info!(
            sample_rate = audio_format.sample_rate,
            channels = audio_format.channel_count,
            format = ?audio_format.sample_format,
            duration,
            "Decoder ready"
        );

        Ok(Self {
            context,
            codec,
            stream,
            audio_format,
            config,
            duration,
            state: Arc::new(DecoderState::new()),
            frame_queue: FrameQueue::new(),
            converter,
            recurring_packet_read_errors: 0,
            destroyed: false,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Shared handle to the status flags, for polling from other threads.
    pub fn state(&self) -> Arc<DecoderState> {
        Arc::clone(&self.state)
    }

    pub fn status(&self) -> DecoderStatus {
        self.state.snapshot()
    }

    pub fn eof(&self) -> bool {
        self.state.eof()
    }

    pub fn fatal_error(&self) -> bool {
        self.state.fatal_error()
    }

    /// Stream duration in seconds, or 0 if unknown.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn audio_format(&self) -> &AudioFormatDescriptor {
        &self.audio_format
    }

    pub fn stream(&self) -> &AudioStream {
        &self.stream
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Frames decoded but not yet handed out.
    pub fn frame_queue(&self) -> &FrameQueue {
        &self.frame_queue
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn context(&self) -> &S {
        &self.context
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Enable or disable start/end timestamps on newly decoded frames.
    pub fn set_frames_need_timestamps(&self, value: bool) {
        self.state.set_frames_need_timestamps(value);
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Decode up to `max_sample_count` samples per channel.
    ///
    /// Returns fewer samples at end of stream or after the retry budget is
    /// exhausted, and may return more when frames drained at end of stream
    /// exceed the budget. Returns `None` when nothing was decoded.
    ///
    /// A frame is never split to fit the budget. If the next frame alone
    /// holds more than `max_sample_count` samples, the call returns `None`
    /// with `eof` and `fatal_error` both clear and the frame stays queued;
    /// call again with a budget of at least the codec's frame size.
    ///
    /// A conversion failure sets `fatal_error`; the frames of that call are
    /// lost.
    #[instrument(skip(self, output_format), fields(path = %self.context.path()))]
    pub fn decode(
        &mut self,
        max_sample_count: usize,
        output_format: &PcmFormat,
    ) -> Option<PcmBuffer> {
        self.decode_frames(max_sample_count, None, output_format)
    }

    /// Decode like [`decode`](Self::decode), stopping at `loop_end_time`
    /// (seconds).
    ///
    /// The frame crossing the loop end is cut short; later frames are
    /// discarded. Sets `end_of_loop` once the end is reached. Frame
    /// timestamps are enabled from here on.
    #[instrument(skip(self, output_format), fields(path = %self.context.path()))]
    pub fn decode_loop(
        &mut self,
        max_sample_count: usize,
        loop_end_time: f64,
        output_format: &PcmFormat,
    ) -> Option<PcmBuffer> {
        self.state.set_frames_need_timestamps(true);
        self.decode_frames(max_sample_count, Some(loop_end_time), output_format)
    }

    /// Acknowledge the end of a loop: clear `end_of_loop` and discard any
    /// frames decoded past it.
    pub fn loop_completed(&mut self) {
        self.state.set_end_of_loop(false);
        self.frame_queue.clear();
    }

    fn decode_frames(
        &mut self,
        max_sample_count: usize,
        loop_end: Option<f64>,
        output_format: &PcmFormat,
    ) -> Option<PcmBuffer> {
        if self.destroyed || self.state.fatal_error() {
            return None;
        }

        let mut buffer = FrameBuffer::new(self.audio_format, max_sample_count);
        self.fill_buffer(&mut buffer, loop_end);

        if buffer.sample_count() == 0 {
            buffer.destroy();
            return None;
        }

        let capacity = max_sample_count.max(buffer.sample_count());
        let mut output = PcmBuffer::new(*output_format, capacity);
        let result = self.converter.convert(&buffer, &mut output);
        buffer.destroy();

        match result {
            Ok(()) => Some(output),
            Err(e) => {
                error!(path = %self.context.path(), error = %e, "Sample conversion failed");
                self.state.set_fatal_error(true);
                None
            }
        }
    }

    fn fill_buffer(&mut self, buffer: &mut FrameBuffer, loop_end: Option<f64>) {
        while !self.state.eof() {
            match self.next_frame() {
                Ok(()) => {
                    self.recurring_packet_read_errors = 0;

                    let Some(mut frame) = self.frame_queue.dequeue() else {
                        continue;
                    };

                    let position = match loop_end {
                        Some(end) => self.clip_to_loop_end(&mut frame, end),
                        None => LoopPosition::Inside,
                    };

                    if position == LoopPosition::Beyond {
                        self.state.set_end_of_loop(true);
                        return;
                    }

                    if let Err(rejected) = buffer.append_frame(frame) {
                        if buffer.sample_count() == 0 {
                            warn!(
                                frame_samples = rejected.sample_count(),
                                max_sample_count = buffer.max_sample_count(),
                                "Frame exceeds the requested sample budget"
                            );
                        }
                        self.frame_queue.requeue(rejected);
                        return;
                    }

                    if position == LoopPosition::Crossing {
                        self.state.set_end_of_loop(true);
                        return;
                    }
                }
                Err(e) if e.is_eof() => {
                    debug!("Reached end of stream");
                    self.state.set_eof(true);
                }
                Err(e) => {
                    self.recurring_packet_read_errors += 1;
                    warn!(
                        path = %self.context.path(),
                        attempt = self.recurring_packet_read_errors,
                        error = %e,
                        "Failed to read packet"
                    );

                    if self.recurring_packet_read_errors >= self.config.max_consecutive_errors {
                        error!(
                            path = %self.context.path(),
                            attempts = self.recurring_packet_read_errors,
                            "Giving up on stream after repeated read failures"
                        );
                        self.state.set_fatal_error(true);
                        return;
                    }
                }
            }
        }

        self.append_terminal_frames(buffer, loop_end);
    }

    /// Append every queued frame and the codec's buffered frames, ignoring
    /// the buffer's sample budget.
    fn append_terminal_frames(&mut self, buffer: &mut FrameBuffer, loop_end: Option<f64>) {
        let mut terminal = self.frame_queue.dequeue_all();

        match self.codec.drain() {
            Ok(drained) => {
                let mut drained = drained.into_frames();
                if self.state.frames_need_timestamps() {
                    let start = terminal
                        .last()
                        .and_then(RawFrame::end_timestamp)
                        .or_else(|| drained.first().map(|f| self.pts_to_seconds(f.pts())));
                    if let Some(start) = start {
                        self.timestamp_frames(&mut drained, start);
                    }
                }
                terminal.extend(drained);
            }
            Err(e) => {
                warn!(path = %self.context.path(), error = %e, "Failed to drain codec");
            }
        }

        if let Some(end) = loop_end {
            let mut kept = Vec::with_capacity(terminal.len());
            for mut frame in terminal {
                match self.clip_to_loop_end(&mut frame, end) {
                    LoopPosition::Inside => kept.push(frame),
                    LoopPosition::Crossing => {
                        kept.push(frame);
                        self.state.set_end_of_loop(true);
                        break;
                    }
                    LoopPosition::Beyond => {
                        self.state.set_end_of_loop(true);
                        break;
                    }
                }
            }
            terminal = kept;
        }

        if !terminal.is_empty() {
            debug!(frames = terminal.len(), "Appending terminal frames");
        }
        buffer.append_terminal_frames(terminal);
    }

    /// Make sure the frame queue is non-empty, reading and decoding packets
    /// as needed. The head of the queue is the next frame.
    fn next_frame(&mut self) -> Result<()> {
        while self.frame_queue.is_empty() {
            let Some(packet) = self.context.read_packet(&self.stream)? else {
                continue;
            };

            let frames = self.codec.decode(&packet)?;
            if frames.is_empty() {
                continue;
            }

            let mut frames = frames.into_frames();
            if self.state.frames_need_timestamps() {
                let start = self.pts_to_seconds(packet.pts);
                self.timestamp_frames(&mut frames, start);
            }

            self.frame_queue.enqueue_all(frames);
        }

        Ok(())
    }

    // ========================================================================
    // Seeking
    // ========================================================================

    /// Seek to `time` (seconds).
    ///
    /// Seeking at or past the end of the stream sets `eof` instead of
    /// failing.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Seek` if the container seek fails for any reason
    /// other than end of stream.
    #[instrument(skip(self), fields(path = %self.context.path()))]
    pub fn seek(&mut self, time: f64) -> Result<()> {
        self.codec.flush_buffers();
        self.frame_queue.clear();

        match self.context.seek(&self.stream, time) {
            Ok(()) => {}
            Err(e) if e.is_eof() => {
                debug!(time, "Seek past end of stream");
                self.state.set_eof(true);
                return Ok(());
            }
            Err(e) => {
                warn!(path = %self.context.path(), time, error = %e, "Seek failed");
                return Err(e.into());
            }
        }

        let frames = self.correct_seek(time);
        debug!(
            time,
            frames = frames.len(),
            "Seek complete"
        );

        self.frame_queue.enqueue_all(frames);
        self.state.set_eof(false);
        Ok(())
    }

    /// Read forward from the approximate seek position and decode only what
    /// is needed to resume at `time`.
    fn correct_seek(&mut self, time: f64) -> Vec<RawFrame> {
        let mut packets: Vec<(Packet, f64)> = Vec::new();
        let mut first_after: Option<usize> = None;

        loop {
            match self.context.read_packet(&self.stream) {
                Ok(Some(packet)) => {
                    let timestamp = self.pts_to_seconds(packet.pts);
                    packets.push((packet, timestamp));
                    if timestamp > time {
                        first_after = Some(packets.len() - 1);
                        break;
                    }
                }
                Ok(None) => continue,
                Err(e) if e.is_eof() => break,
                Err(e) => {
                    warn!(path = %self.context.path(), error = %e, "Read failed while locating seek target");
                    break;
                }
            }
        }

        if packets.is_empty() {
            return Vec::new();
        }

        let usable_start = first_after.map_or(0, |index| index.saturating_sub(1));

        for (packet, _) in &packets[..usable_start] {
            self.codec.decode_and_drop(packet);
        }

        let need_timestamps = self.state.frames_need_timestamps();
        let mut groups: Vec<PacketFrames> = Vec::with_capacity(packets.len() - usable_start);

        // One group per usable packet; groups[0] always belongs to the usable start.
        for (packet, timestamp) in &packets[usable_start..] {
            let frames = match self.codec.decode(packet) {
                Ok(frames) => {
                    let mut frames = frames.into_frames();
                    if need_timestamps {
                        self.timestamp_frames(&mut frames, *timestamp);
                    }
                    frames
                }
                Err(e) => {
                    warn!(
                        path = %self.context.path(),
                        pts = packet.pts,
                        error = %e,
                        "Failed to decode packet after seek"
                    );
                    Vec::new()
                }
            };
            groups.push(PacketFrames::new(frames));
        }

        let usable_count = packets.len() - usable_start;
        let usable_timestamp = packets[usable_start].1;

        if first_after.is_some()
            && usable_count > 1
            && time - usable_timestamp > self.config.seek_tolerance_secs
        {
            let next_timestamp = packets[usable_start + 1].1;
            let samples_to_keep =
                ((next_timestamp - time) * self.audio_format.sample_rate as f64).round().max(0.0) as usize;

            if let Some(first) = groups.first_mut().filter(|group| !group.is_empty()) {
                let before = first.sample_count();
                first.keep_last_n_samples(samples_to_keep);
                debug!(
                    usable_timestamp,
                    dropped = before - first.sample_count(),
                    "Trimmed leading samples after seek"
                );

                if need_timestamps {
                    let start = usable_timestamp
                        + self.audio_format.seconds_for(before - first.sample_count());
                    self.timestamp_frames(first.frames_mut(), start);
                }
            }
        }

        groups.into_iter().flat_map(PacketFrames::into_frames).collect()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Discard queued frames. Does not interrupt an in-flight call.
    pub fn stop(&mut self) {
        self.frame_queue.clear();
    }

    /// Release every frame and scratch buffer. Further decode calls return
    /// `None`. Safe to call more than once; also run on drop.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }

        for mut frame in self.frame_queue.dequeue_all() {
            frame.release();
        }
        self.converter.deallocate();
        self.destroyed = true;

        debug!(path = %self.context.path(), "Decoder destroyed");
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn pts_to_seconds(&self, pts: i64) -> f64 {
        pts as f64 * self.stream.time_base_ratio()
    }

    /// Chain start/end timestamps across `frames`, beginning at `start`.
    fn timestamp_frames(&self, frames: &mut [RawFrame], start: f64) {
        let mut start = start;
        for frame in frames {
            let end = start + self.audio_format.seconds_for(frame.sample_count());
            frame.set_timestamps(start, end);
            start = end;
        }
    }

    fn clip_to_loop_end(&self, frame: &mut RawFrame, loop_end: f64) -> LoopPosition {
        let (Some(start), Some(end)) = (frame.start_timestamp(), frame.end_timestamp()) else {
            return LoopPosition::Inside;
        };

        if start >= loop_end {
            return LoopPosition::Beyond;
        }

        if end > loop_end {
            let keep = ((loop_end - start) * self.audio_format.sample_rate as f64).round() as usize;
            frame.keep_first_n_samples(keep);
            frame.set_timestamps(start, loop_end);
            return LoopPosition::Crossing;
        }

        LoopPosition::Inside
    }
}

impl<S: StreamContext, C: Codec> Drop for Decoder<S, C> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<S: StreamContext, C: Codec> std::fmt::Debug for Decoder<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("path", &self.context.path())
            .field("audio_format", &self.audio_format)
            .field("duration", &self.duration)
            .field("status", &self.state.snapshot())
            .field("queued_frames", &self.frame_queue.len())
            .finish()
    }
}
