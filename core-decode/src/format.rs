//! # Audio Format Types
//!
//! Descriptors for the decoded (source) sample format and the canonical
//! playback format produced by the pipeline.

use serde::{Deserialize, Serialize};

/// PCM sample format of decoded audio. Frames store one plane per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit.
    S16,
    /// Signed 32-bit (also used for 24-bit sources).
    S32,
    /// 32-bit floating point, planar. The canonical format.
    F32,
    /// 64-bit floating point.
    F64,
}

impl SampleFormat {
    /// The canonical output format: 32-bit float, non-interleaved.
    pub const CANONICAL: SampleFormat = SampleFormat::F32;

    /// Returns `true` if samples of this format must pass through the
    /// resampling context before playback.
    pub fn needs_format_conversion(&self) -> bool {
        *self != Self::CANONICAL
    }
}

/// Physical arrangement of channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    Mono,
    Stereo,
    /// 5.1 surround.
    Surround51,
    /// 7.1 surround.
    Surround71,
    /// Layout unknown; only the channel count is meaningful.
    Unspecified(u16),
}

impl ChannelLayout {
    /// Best guess layout for a channel count.
    pub fn default_for(channel_count: u16) -> Self {
        match channel_count {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            6 => ChannelLayout::Surround51,
            8 => ChannelLayout::Surround71,
            n => ChannelLayout::Unspecified(n),
        }
    }

    /// Number of channels described by this layout.
    pub fn channel_count(&self) -> u16 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Surround51 => 6,
            ChannelLayout::Surround71 => 8,
            ChannelLayout::Unspecified(n) => *n,
        }
    }
}

/// Format of the decoded audio stream. Created once per opened stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormatDescriptor {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channel_count: u16,
    /// Channel arrangement.
    pub channel_layout: ChannelLayout,
    /// Sample format produced by the codec.
    pub sample_format: SampleFormat,
}

impl AudioFormatDescriptor {
    pub fn new(
        sample_rate: u32,
        channel_count: u16,
        channel_layout: ChannelLayout,
        sample_format: SampleFormat,
    ) -> Self {
        Self {
            sample_rate,
            channel_count,
            channel_layout,
            sample_format,
        }
    }

    /// Returns `true` if decoded samples must be converted before playback.
    pub fn needs_format_conversion(&self) -> bool {
        self.sample_format.needs_format_conversion()
    }

    /// Duration in seconds of `sample_count` samples per channel.
    pub fn seconds_for(&self, sample_count: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        sample_count as f64 / self.sample_rate as f64
    }
}

/// Format of the PCM buffers handed to the playback scheduler.
///
/// Samples are always canonical (planar `f32`); this only fixes the rate and
/// channel count the scheduler expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (one output plane each).
    pub channel_count: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channel_count: u16) -> Self {
        Self {
            sample_rate,
            channel_count,
        }
    }
}

impl From<&AudioFormatDescriptor> for PcmFormat {
    fn from(format: &AudioFormatDescriptor) -> Self {
        Self::new(format.sample_rate, format.channel_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_format_needs_no_conversion() {
        assert!(!SampleFormat::F32.needs_format_conversion());
        assert!(SampleFormat::S16.needs_format_conversion());
        assert!(SampleFormat::F64.needs_format_conversion());
    }

    #[test]
    fn channel_layout_round_trips_count() {
        for count in [1u16, 2, 3, 6, 8] {
            assert_eq!(ChannelLayout::default_for(count).channel_count(), count);
        }
    }

    #[test]
    fn seconds_for_zero_rate() {
        let format = AudioFormatDescriptor::new(0, 2, ChannelLayout::Stereo, SampleFormat::F32);
        assert_eq!(format.seconds_for(1000), 0.0);

        let format =
            AudioFormatDescriptor::new(44_100, 2, ChannelLayout::Stereo, SampleFormat::F32);
        assert!((format.seconds_for(4410) - 0.1).abs() < 1e-9);
    }
}
