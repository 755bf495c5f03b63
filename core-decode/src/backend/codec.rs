use crate::error::{DecodeError, Result};
use crate::format::{ChannelLayout, SampleFormat};
use crate::frame::{PacketFrames, RawFrame, SampleData};
use crate::traits::{Codec, Packet};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{
    CodecParameters, Decoder as SymphoniaDecoder, DecoderOptions, CODEC_TYPE_PCM_F32BE,
    CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_F64BE, CODEC_TYPE_PCM_F64LE, CODEC_TYPE_PCM_S16BE,
    CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_U8,
};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::Packet as SymphoniaPacket;
use symphonia::core::sample::{i24, u24, Sample, SampleFormat as SymphoniaSampleFormat};
use tracing::{debug, error, trace};

use super::context::SymphoniaStreamContext;
use super::error_code;

/// Codec created from a track's [`CodecParameters`].
///
/// Every decoded buffer is converted to the sample format declared by the
/// track, so all frames of one stream share a format. Symphonia decoders hold
/// no frames back, so [`Codec::drain`] yields nothing.
pub struct SymphoniaCodec {
    track_id: u32,
    params: CodecParameters,
    decoder: Option<Box<dyn SymphoniaDecoder>>,
    sample_rate: u32,
    channel_count: u16,
    channel_layout: ChannelLayout,
    sample_format: SampleFormat,
}

impl SymphoniaCodec {
    pub fn new(track_id: u32, params: &CodecParameters) -> Result<Self> {
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| DecodeError::CodecInitialization("Missing sample rate".to_string()))?;
        let channel_count = params.channels.map(|ch| ch.count() as u16).unwrap_or(2);

        Ok(Self {
            track_id,
            params: params.clone(),
            decoder: None,
            sample_rate,
            channel_count,
            channel_layout: ChannelLayout::default_for(channel_count),
            sample_format: declared_sample_format(params),
        })
    }

    /// Codec for the stream selected by `context`.
    pub fn for_context(context: &SymphoniaStreamContext) -> Result<Self> {
        Self::new(context.stream().index, context.codec_params())
    }

    fn to_symphonia_packet(&self, packet: &Packet) -> SymphoniaPacket {
        SymphoniaPacket::new_from_slice(
            self.track_id,
            packet.pts.max(0) as u64,
            packet.duration.max(0) as u64,
            &packet.data,
        )
    }
}

impl Codec for SymphoniaCodec {
    fn open(&mut self) -> Result<()> {
        if self.decoder.is_some() {
            return Ok(());
        }

        let decoder = symphonia::default::get_codecs()
            .make(&self.params, &DecoderOptions::default())
            .map_err(|e| {
                error!(error = %e, "Failed to create codec decoder");
                DecodeError::CodecInitialization(format!("Failed to create codec decoder: {}", e))
            })?;

        debug!(codec = ?self.params.codec, format = ?self.sample_format, "Codec opened");
        self.decoder = Some(decoder);
        Ok(())
    }

    fn decode(&mut self, packet: &Packet) -> Result<PacketFrames> {
        let symphonia_packet = self.to_symphonia_packet(packet);
        let format = self.sample_format;

        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| DecodeError::CodecInitialization("Codec not opened".to_string()))?;

        let decoded = decoder
            .decode(&symphonia_packet)
            .map_err(|e| DecodeError::decoder(error_code(&e)))?;

        if decoded.frames() == 0 {
            return Ok(PacketFrames::default());
        }

        let data = sample_data(&decoded, format);
        Ok(PacketFrames::new(vec![RawFrame::new(data, packet.pts)]))
    }

    fn decode_and_drop(&mut self, packet: &Packet) {
        let symphonia_packet = self.to_symphonia_packet(packet);

        if let Some(decoder) = self.decoder.as_mut() {
            if let Err(e) = decoder.decode(&symphonia_packet) {
                trace!(error = %e, "Ignoring decode failure while warming up");
            }
        }
    }

    fn drain(&mut self) -> Result<PacketFrames> {
        Ok(PacketFrames::default())
    }

    fn flush_buffers(&mut self) {
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.reset();
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    fn channel_layout(&self) -> ChannelLayout {
        self.channel_layout
    }

    fn channel_count(&self) -> u16 {
        self.channel_count
    }
}

/// Frame sample format for a track.
///
/// Most demuxers leave `sample_format` unset, so the PCM codec type and then
/// `bits_per_sample` decide. Formats without a direct counterpart widen to
/// 32-bit integers; lossy codecs, which declare neither, decode to float.
fn declared_sample_format(params: &CodecParameters) -> SampleFormat {
    if let Some(format) = params.sample_format {
        return match format {
            SymphoniaSampleFormat::U8 => SampleFormat::U8,
            SymphoniaSampleFormat::S16 => SampleFormat::S16,
            SymphoniaSampleFormat::F32 => SampleFormat::F32,
            SymphoniaSampleFormat::F64 => SampleFormat::F64,
            _ => SampleFormat::S32,
        };
    }

    match params.codec {
        CODEC_TYPE_PCM_U8 => SampleFormat::U8,
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => SampleFormat::S16,
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => SampleFormat::F32,
        CODEC_TYPE_PCM_F64LE | CODEC_TYPE_PCM_F64BE => SampleFormat::F64,
        _ => match params.bits_per_sample {
            Some(bits) if bits <= 16 => SampleFormat::S16,
            Some(_) => SampleFormat::S32,
            None => SampleFormat::F32,
        },
    }
}

fn sample_data(decoded: &AudioBufferRef<'_>, format: SampleFormat) -> SampleData {
    match format {
        SampleFormat::U8 => SampleData::U8(planes(decoded)),
        SampleFormat::S16 => SampleData::S16(planes(decoded)),
        SampleFormat::S32 => SampleData::S32(planes(decoded)),
        SampleFormat::F64 => SampleData::F64(planes(decoded)),
        SampleFormat::F32 => SampleData::F32(planes(decoded)),
    }
}

fn planes<T>(decoded: &AudioBufferRef<'_>) -> Vec<Vec<T>>
where
    T: Sample
        + FromSample<u8>
        + FromSample<u16>
        + FromSample<u24>
        + FromSample<u32>
        + FromSample<i8>
        + FromSample<i16>
        + FromSample<i24>
        + FromSample<i32>
        + FromSample<f32>
        + FromSample<f64>,
{
    let mut buffer = AudioBuffer::<T>::new(decoded.capacity() as u64, *decoded.spec());
    decoded.convert(&mut buffer);

    (0..buffer.spec().channels.count())
        .map(|ch| buffer.chan(ch).to_vec())
        .collect()
}
