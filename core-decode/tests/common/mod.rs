//! Synthetic in-memory stream and codec shared by the integration tests.
//!
//! Packets carry no payload; the codec derives sample values from each
//! packet's pts so tests can tell exactly which samples came out.

#![allow(dead_code)]

use bytes::Bytes;
use core_decode::{
    AudioStream, ChannelLayout, Codec, DecodeError, ErrorCode, Packet, PacketFrames,
    PacketReadError, RawFrame, Result, SampleData, SampleFormat, SeekError, StreamContext,
    TimeBase,
};

pub const SAMPLE_RATE: u32 = 44_100;

// ============================================================================
// Synthetic Stream
// ============================================================================

/// Container holding pre-built packets, time base 1 / sample rate.
pub struct SyntheticStream {
    pub stream: AudioStream,
    pub packets: Vec<Packet>,
    pub cursor: usize,
    /// Every read fails with this code.
    pub fail_reads_with: Option<ErrorCode>,
    /// The next N reads fail with an I/O error, then reads succeed again.
    pub transient_failures: usize,
    /// Reads at or past this packet index fail with invalid data.
    pub fail_from_packet: Option<usize>,
    /// Every seek fails with this code.
    pub seek_error: Option<ErrorCode>,
    /// Coarse seeks land this many packets before the target packet.
    pub seek_slack_packets: usize,
    pub seeks: Vec<f64>,
    pub reads: usize,
}

impl SyntheticStream {
    /// `packet_count` packets of `samples_per_packet` samples, back to back.
    pub fn new(packet_count: usize, samples_per_packet: i64) -> Self {
        let packets = (0..packet_count as i64)
            .map(|i| {
                Packet::new(0, i * samples_per_packet, samples_per_packet, Bytes::new())
                    .with_byte_position(i * 512)
            })
            .collect::<Vec<_>>();

        let total = packet_count as i64 * samples_per_packet;

        Self {
            stream: AudioStream {
                index: 0,
                time_base: TimeBase::new(1, SAMPLE_RATE),
                duration_ts: Some(total),
                sample_rate: SAMPLE_RATE,
                channel_count: 2,
                channel_layout: ChannelLayout::Stereo,
                codec_name: Some("synthetic".to_string()),
            },
            packets,
            cursor: 0,
            fail_reads_with: None,
            transient_failures: 0,
            fail_from_packet: None,
            seek_error: None,
            seek_slack_packets: 0,
            seeks: Vec::new(),
            reads: 0,
        }
    }

    /// Interleave a packet of another stream after every audio packet.
    pub fn with_foreign_packets(mut self) -> Self {
        let mut packets = Vec::with_capacity(self.packets.len() * 2);
        for packet in self.packets.drain(..) {
            let foreign = Packet::new(7, packet.pts, packet.duration, Bytes::from_static(b"video"));
            packets.push(packet);
            packets.push(foreign);
        }
        self.packets = packets;
        self
    }

    pub fn without_duration(mut self) -> Self {
        self.stream.duration_ts = None;
        self
    }

    pub fn failing_reads(mut self, code: ErrorCode) -> Self {
        self.fail_reads_with = Some(code);
        self
    }

    pub fn failing_from(mut self, packet: usize) -> Self {
        self.fail_from_packet = Some(packet);
        self
    }

    pub fn with_transient_failures(mut self, count: usize) -> Self {
        self.transient_failures = count;
        self
    }

    pub fn with_seek_error(mut self, code: ErrorCode) -> Self {
        self.seek_error = Some(code);
        self
    }

    pub fn with_seek_slack(mut self, packets: usize) -> Self {
        self.seek_slack_packets = packets;
        self
    }

    fn total_duration(&self) -> f64 {
        self.packets
            .iter()
            .filter(|p| p.stream_index == self.stream.index)
            .map(|p| p.pts + p.duration)
            .max()
            .map_or(0.0, |ts| self.stream.time_base.to_seconds(ts))
    }
}

impl StreamContext for SyntheticStream {
    fn path(&self) -> &str {
        "memory://synthetic.raw"
    }

    fn best_audio_stream(&self) -> Option<AudioStream> {
        Some(self.stream.clone())
    }

    fn read_packet(
        &mut self,
        stream: &AudioStream,
    ) -> std::result::Result<Option<Packet>, PacketReadError> {
        self.reads += 1;

        if let Some(code) = self.fail_reads_with {
            return Err(PacketReadError::new(code));
        }

        if self.transient_failures > 0 {
            self.transient_failures -= 1;
            return Err(PacketReadError::new(ErrorCode::IO));
        }

        if self.fail_from_packet.is_some_and(|index| self.cursor >= index) {
            return Err(PacketReadError::new(ErrorCode::INVALID_DATA));
        }

        let Some(packet) = self.packets.get(self.cursor).cloned() else {
            return Err(PacketReadError::eof());
        };
        self.cursor += 1;

        if packet.stream_index != stream.index {
            return Ok(None);
        }

        Ok(Some(packet))
    }

    fn seek(&mut self, stream: &AudioStream, time: f64) -> std::result::Result<(), SeekError> {
        self.seeks.push(time);

        if let Some(code) = self.seek_error {
            return Err(SeekError::new(code));
        }

        if time >= self.total_duration() {
            return Err(SeekError::eof());
        }

        let target = stream.time_base.to_timestamp(time);
        let containing = self
            .packets
            .iter()
            .rposition(|p| p.stream_index == stream.index && p.pts <= target)
            .unwrap_or(0);

        self.cursor = containing.saturating_sub(self.seek_slack_packets);
        Ok(())
    }

    fn duration(&self) -> f64 {
        self.total_duration()
    }
}

// ============================================================================
// Synthetic Codec
// ============================================================================

/// Codec producing ramps derived from the packet pts.
///
/// Channel 0 sample `i` of a packet equals `pts + i`, channel 1 its negation.
pub struct SyntheticCodec {
    pub sample_format: SampleFormat,
    pub frames_per_packet: usize,
    pub opened: bool,
    pub fail_open: bool,
    pub decoded: Vec<i64>,
    pub dropped: Vec<i64>,
    pub flushes: usize,
    /// Frames held back until `drain()`.
    pub buffered: Vec<RawFrame>,
    /// Decoding the packet with this pts fails with invalid data.
    pub fail_decode_at: Option<i64>,
    /// Frames carry channel 0 only while the codec still reports stereo.
    pub mono_frames: bool,
}

impl SyntheticCodec {
    pub fn new(sample_format: SampleFormat) -> Self {
        Self {
            sample_format,
            frames_per_packet: 1,
            opened: false,
            fail_open: false,
            decoded: Vec::new(),
            dropped: Vec::new(),
            flushes: 0,
            buffered: Vec::new(),
            fail_decode_at: None,
            mono_frames: false,
        }
    }

    pub fn f32() -> Self {
        Self::new(SampleFormat::F32)
    }

    pub fn s16() -> Self {
        Self::new(SampleFormat::S16)
    }

    pub fn with_frames_per_packet(mut self, frames: usize) -> Self {
        self.frames_per_packet = frames;
        self
    }

    /// Hold `frames` back until end of stream.
    pub fn with_buffered(mut self, frames: Vec<RawFrame>) -> Self {
        self.buffered = frames;
        self
    }

    pub fn failing_decode_at(mut self, pts: i64) -> Self {
        self.fail_decode_at = Some(pts);
        self
    }

    pub fn emitting_mono(mut self) -> Self {
        self.mono_frames = true;
        self
    }

    /// Frame of `samples` ramp samples starting at `start`.
    pub fn frame(&self, start: i64, samples: usize) -> RawFrame {
        let channels = if self.mono_frames { 1 } else { 2 };
        ramp_frame_with_channels(self.sample_format, start, samples, channels)
    }
}

pub fn ramp_frame(format: SampleFormat, start: i64, samples: usize) -> RawFrame {
    ramp_frame_with_channels(format, start, samples, 2)
}

/// Ramp frame carrying the first `channels` planes (1 or 2).
pub fn ramp_frame_with_channels(
    format: SampleFormat,
    start: i64,
    samples: usize,
    channels: usize,
) -> RawFrame {
    let ramp = (0..samples as i64).map(|i| start + i);

    let data = match format {
        SampleFormat::S16 => {
            let left: Vec<i16> = ramp.map(|v| v as i16).collect();
            let right = left.iter().map(|v| v.wrapping_neg()).collect();
            let mut planes = vec![left, right];
            planes.truncate(channels);
            SampleData::S16(planes)
        }
        _ => {
            let left: Vec<f32> = ramp.map(|v| v as f32).collect();
            let right = left.iter().map(|v| -v).collect();
            let mut planes = vec![left, right];
            planes.truncate(channels);
            SampleData::F32(planes)
        }
    };

    RawFrame::new(data, start)
}

impl Codec for SyntheticCodec {
    fn open(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(DecodeError::CodecInitialization("synthetic failure".to_string()));
        }
        self.opened = true;
        Ok(())
    }

    fn decode(&mut self, packet: &Packet) -> Result<PacketFrames> {
        self.decoded.push(packet.pts);

        if self.fail_decode_at == Some(packet.pts) {
            return Err(DecodeError::decoder(ErrorCode::INVALID_DATA));
        }

        let per_frame = packet.duration as usize / self.frames_per_packet.max(1);
        let frames = (0..self.frames_per_packet)
            .map(|i| self.frame(packet.pts + (i * per_frame) as i64, per_frame))
            .collect();

        Ok(PacketFrames::new(frames))
    }

    fn decode_and_drop(&mut self, packet: &Packet) {
        self.dropped.push(packet.pts);
    }

    fn drain(&mut self) -> Result<PacketFrames> {
        Ok(PacketFrames::new(std::mem::take(&mut self.buffered)))
    }

    fn flush_buffers(&mut self) {
        self.flushes += 1;
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    fn channel_layout(&self) -> ChannelLayout {
        ChannelLayout::Stereo
    }

    fn channel_count(&self) -> u16 {
        2
    }
}
