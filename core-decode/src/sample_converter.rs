//! # Sample Format Converter
//!
//! Turns the raw frames collected in a [`FrameBuffer`] into one contiguous
//! canonical PCM buffer: 32-bit float, one plane per channel.

use crate::config::DecoderConfig;
use crate::error::{DecodeError, Result};
use crate::format::{AudioFormatDescriptor, ChannelLayout, PcmFormat, SampleFormat};
use crate::frame::{RawFrame, SampleData};
use crate::frame_buffer::FrameBuffer;
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;
use tracing::{debug, trace};

/// Canonical PCM output of one `decode()` call.
///
/// Each channel plane is allocated to `frame_capacity` samples; only the
/// first `frame_length` are meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    format: PcmFormat,
    channels: Vec<Vec<f32>>,
    frame_length: usize,
}

impl PcmBuffer {
    /// Allocate a zeroed buffer able to hold `frame_capacity` samples per channel.
    pub fn new(format: PcmFormat, frame_capacity: usize) -> Self {
        Self {
            format,
            channels: vec![vec![0.0; frame_capacity]; format.channel_count as usize],
            frame_length: 0,
        }
    }

    pub fn format(&self) -> &PcmFormat {
        &self.format
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_capacity(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Number of valid samples per channel.
    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn is_empty(&self) -> bool {
        self.frame_length == 0
    }

    /// Valid samples of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels
            .get(index)
            .map(|plane| &plane[..self.frame_length])
    }

    /// Duration in seconds of the valid samples.
    pub fn duration_secs(&self) -> f64 {
        if self.format.sample_rate == 0 {
            return 0.0;
        }
        self.frame_length as f64 / self.format.sample_rate as f64
    }

    /// Consume the buffer, returning planes truncated to `frame_length`.
    pub fn into_channels(mut self) -> Vec<Vec<f32>> {
        for plane in &mut self.channels {
            plane.truncate(self.frame_length);
        }
        self.channels
    }
}

/// Format conversion context bound to one source layout, rate and format.
///
/// Output layout and rate equal the input's; only the sample format changes.
#[derive(Debug, Clone)]
struct ResamplingContext {
    channel_layout: ChannelLayout,
    sample_rate: u32,
    input_format: SampleFormat,
    channel_count: usize,
}

impl ResamplingContext {
    fn new(format: &AudioFormatDescriptor) -> Result<Self> {
        if format.sample_rate == 0 {
            return Err(DecodeError::ResamplerInitialization(
                "Unable to create a resampling context: sample rate is 0".to_string(),
            ));
        }

        Ok(Self {
            channel_layout: format.channel_layout,
            sample_rate: format.sample_rate,
            input_format: format.sample_format,
            channel_count: format.channel_count as usize,
        })
    }

    /// Convert `count` samples starting at `first` from every plane of `data`
    /// into the front of the matching `scratch` plane.
    fn convert(
        &self,
        data: &SampleData,
        first: usize,
        count: usize,
        scratch: &mut [Vec<f32>],
    ) -> Result<()> {
        if data.channel_count() != self.channel_count {
            return Err(DecodeError::Conversion(format!(
                "Frame has {} channels, resampling context expects {}",
                data.channel_count(),
                self.channel_count
            )));
        }

        match data {
            SampleData::U8(planes) => convert_planes(planes, first, count, scratch),
            SampleData::S16(planes) => convert_planes(planes, first, count, scratch),
            SampleData::S32(planes) => convert_planes(planes, first, count, scratch),
            SampleData::F64(planes) => convert_planes(planes, first, count, scratch),
            SampleData::F32(planes) => {
                for (plane, out) in planes.iter().zip(scratch.iter_mut()) {
                    out[..count].copy_from_slice(&plane[first..first + count]);
                }
            }
        }

        Ok(())
    }
}

fn convert_planes<T>(planes: &[Vec<T>], first: usize, count: usize, scratch: &mut [Vec<f32>])
where
    T: Sample + IntoSample<f32>,
{
    for (plane, out) in planes.iter().zip(scratch.iter_mut()) {
        for (dst, &src) in out[..count].iter_mut().zip(&plane[first..first + count]) {
            *dst = src.into_sample();
        }
    }
}

/// Converts decoded frames to canonical planar `f32`.
///
/// Owns a scratch allocation sized to the largest (channel count, sample
/// count) request seen so far. The allocation only grows; it is replaced
/// when a request exceeds it and is otherwise reused across calls.
#[derive(Debug)]
pub struct SampleConverter {
    resampler: Option<ResamplingContext>,
    scratch: Vec<Vec<f32>>,
    allocated_channel_count: usize,
    allocated_sample_count: usize,
}

impl SampleConverter {
    /// Create a converter for streams of `format`.
    ///
    /// A resampling context is only created when the codec's sample format
    /// is not already canonical.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ResamplerInitialization`] if the channel count
    /// is 0 or exceeds `config.max_channels`, or if a resampling context
    /// cannot be created.
    pub fn new(format: &AudioFormatDescriptor, config: &DecoderConfig) -> Result<Self> {
        let channels = format.channel_count as usize;
        if channels == 0 || channels > config.max_channels {
            return Err(DecodeError::ResamplerInitialization(format!(
                "Unsupported channel count {} (max {})",
                channels, config.max_channels
            )));
        }

        let resampler = if format.needs_format_conversion() {
            let ctx = ResamplingContext::new(format)?;
            debug!(
                "Created resampling context: {:?} {:?} @ {}Hz",
                ctx.input_format, ctx.channel_layout, ctx.sample_rate
            );
            Some(ctx)
        } else {
            None
        };

        Ok(Self {
            resampler,
            scratch: Vec::new(),
            allocated_channel_count: 0,
            allocated_sample_count: 0,
        })
    }

    /// Returns `true` if frames go through the resampling context.
    pub fn is_converting(&self) -> bool {
        self.resampler.is_some()
    }

    pub fn allocated_channel_count(&self) -> usize {
        self.allocated_channel_count
    }

    pub fn allocated_sample_count(&self) -> usize {
        self.allocated_sample_count
    }

    /// Make sure the scratch space holds `channel_count` planes of
    /// `sample_count` samples. Reallocates only when the request exceeds the
    /// current allocation.
    pub fn allocate_for(&mut self, channel_count: usize, sample_count: usize) {
        if channel_count > self.allocated_channel_count
            || sample_count > self.allocated_sample_count
        {
            let channels = channel_count.max(self.allocated_channel_count);
            let samples = sample_count.max(self.allocated_sample_count);

            self.deallocate();
            self.scratch = vec![vec![0.0; samples]; channels];
            self.allocated_channel_count = channels;
            self.allocated_sample_count = samples;

            trace!("Allocated converter scratch: {} x {}", channels, samples);
        }
    }

    /// Release the scratch space. Safe to call more than once.
    pub fn deallocate(&mut self) {
        if self.allocated_channel_count > 0 && self.allocated_sample_count > 0 {
            self.scratch = Vec::new();
        }
        self.allocated_channel_count = 0;
        self.allocated_sample_count = 0;
    }

    /// Convert every frame in `buffer` into `output`, back to back, and set
    /// the output's frame length to `buffer.sample_count()`.
    pub fn convert(&mut self, buffer: &FrameBuffer, output: &mut PcmBuffer) -> Result<()> {
        let channel_count = buffer.audio_format().channel_count as usize;

        if output.channel_count() < channel_count {
            return Err(DecodeError::Conversion(format!(
                "Output buffer has {} channels, need {}",
                output.channel_count(),
                channel_count
            )));
        }
        if output.frame_capacity() < buffer.sample_count() {
            return Err(DecodeError::Conversion(format!(
                "Output buffer holds {} samples, need {}",
                output.frame_capacity(),
                buffer.sample_count()
            )));
        }

        match self.resampler.take() {
            None => {
                let mut offset = 0;
                for frame in buffer.frames() {
                    offset += copy_frame(frame, channel_count, offset, output)?;
                }
            }
            Some(ctx) => {
                self.allocate_for(channel_count, buffer.max_frame_sample_count());
                let result = self.resample_frames(&ctx, buffer, output);
                self.resampler = Some(ctx);
                result?;
            }
        }

        output.frame_length = buffer.sample_count();
        Ok(())
    }

    fn resample_frames(
        &mut self,
        ctx: &ResamplingContext,
        buffer: &FrameBuffer,
        output: &mut PcmBuffer,
    ) -> Result<()> {
        let mut offset = 0;
        for frame in buffer.frames() {
            offset += self.resample_frame(ctx, frame, offset, output)?;
        }
        Ok(())
    }

    fn resample_frame(
        &mut self,
        ctx: &ResamplingContext,
        frame: &RawFrame,
        offset: usize,
        output: &mut PcmBuffer,
    ) -> Result<usize> {
        let Some(data) = frame.data() else {
            return Ok(0);
        };

        let first = frame.first_sample_index();
        let count = frame.sample_count();
        ctx.convert(data, first, count, &mut self.scratch)?;

        for (scratch, out) in self.scratch.iter().zip(output.channels.iter_mut()) {
            out[offset..offset + count].copy_from_slice(&scratch[..count]);
        }

        Ok(count)
    }
}

/// Straight copy of an already-canonical frame. No arithmetic is applied.
fn copy_frame(
    frame: &RawFrame,
    channel_count: usize,
    offset: usize,
    output: &mut PcmBuffer,
) -> Result<usize> {
    let planes = match frame.data() {
        Some(SampleData::F32(planes)) => planes,
        Some(other) => {
            return Err(DecodeError::Conversion(format!(
                "Expected canonical f32 samples, got {:?}",
                other.sample_format()
            )))
        }
        None => return Ok(0),
    };

    if planes.len() != channel_count {
        return Err(DecodeError::Conversion(format!(
            "Frame has {} channels, stream declares {}",
            planes.len(),
            channel_count
        )));
    }

    let first = frame.first_sample_index();
    let count = frame.sample_count();

    for (plane, out) in planes.iter().zip(output.channels.iter_mut()) {
        out[offset..offset + count].copy_from_slice(&plane[first..first + count]);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(sample_format: SampleFormat) -> AudioFormatDescriptor {
        AudioFormatDescriptor::new(48_000, 2, ChannelLayout::Stereo, sample_format)
    }

    #[test]
    fn rejects_unsupported_channel_counts() {
        let config = DecoderConfig::default();
        let mut fmt = format(SampleFormat::S16);
        fmt.channel_count = 0;
        assert!(matches!(
            SampleConverter::new(&fmt, &config),
            Err(DecodeError::ResamplerInitialization(_))
        ));

        fmt.channel_count = 9;
        assert!(SampleConverter::new(&fmt, &config).is_err());
    }

    #[test]
    fn canonical_format_skips_resampler() {
        let config = DecoderConfig::default();
        let converter = SampleConverter::new(&format(SampleFormat::F32), &config).unwrap();
        assert!(!converter.is_converting());

        let converter = SampleConverter::new(&format(SampleFormat::S32), &config).unwrap();
        assert!(converter.is_converting());
    }

    #[test]
    fn allocation_grows_but_never_shrinks() {
        let config = DecoderConfig::default();
        let mut converter = SampleConverter::new(&format(SampleFormat::S16), &config).unwrap();

        converter.allocate_for(2, 1152);
        assert_eq!(converter.allocated_sample_count(), 1152);

        converter.allocate_for(2, 576);
        assert_eq!(converter.allocated_sample_count(), 1152);
        assert_eq!(converter.allocated_channel_count(), 2);

        converter.allocate_for(6, 100);
        assert_eq!(converter.allocated_channel_count(), 6);
        assert_eq!(converter.allocated_sample_count(), 1152);

        converter.deallocate();
        converter.deallocate();
        assert_eq!(converter.allocated_sample_count(), 0);
    }

    fn buffer_with(format: AudioFormatDescriptor, data: SampleData) -> FrameBuffer {
        let mut buffer = FrameBuffer::new(format, 4096);
        buffer.append_terminal_frames([RawFrame::new(data, 0)]);
        buffer
    }

    #[test]
    fn convert_rejects_frames_missing_channels() {
        let config = DecoderConfig::default();
        let mut output = PcmBuffer::new(PcmFormat::new(48_000, 2), 4096);

        let fmt = format(SampleFormat::F32);
        let mut converter = SampleConverter::new(&fmt, &config).unwrap();
        let mono = buffer_with(fmt, SampleData::F32(vec![vec![0.5; 10]]));
        assert!(matches!(
            converter.convert(&mono, &mut output),
            Err(DecodeError::Conversion(_))
        ));

        let fmt = format(SampleFormat::S16);
        let mut converter = SampleConverter::new(&fmt, &config).unwrap();
        let mono = buffer_with(fmt, SampleData::S16(vec![vec![100; 10]]));
        assert!(matches!(
            converter.convert(&mono, &mut output),
            Err(DecodeError::Conversion(_))
        ));
    }

    #[test]
    fn convert_scales_integer_samples() {
        let config = DecoderConfig::default();
        let fmt = format(SampleFormat::S16);
        let mut converter = SampleConverter::new(&fmt, &config).unwrap();
        let buffer = buffer_with(fmt, SampleData::S16(vec![vec![16_384; 8], vec![-16_384; 8]]));
        let mut output = PcmBuffer::new(PcmFormat::new(48_000, 2), 8);

        converter.convert(&buffer, &mut output).unwrap();

        assert_eq!(output.frame_length(), 8);
        assert!((output.channel(0).unwrap()[3] - 0.5).abs() < 1e-6);
        assert!((output.channel(1).unwrap()[7] + 0.5).abs() < 1e-6);
        assert_eq!(converter.allocated_sample_count(), 8);
    }

    #[test]
    fn pcm_buffer_exposes_only_valid_samples() {
        let mut buffer = PcmBuffer::new(PcmFormat::new(48_000, 2), 100);
        buffer.frame_length = 10;
        assert_eq!(buffer.frame_capacity(), 100);
        assert_eq!(buffer.channel(0).map(<[f32]>::len), Some(10));
        assert!(buffer.channel(2).is_none());

        let planes = buffer.into_channels();
        assert_eq!(planes[1].len(), 10);
    }
}
