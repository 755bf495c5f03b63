use std::fs::File;
use std::path::Path;

use crate::config::DecoderConfig;
use crate::error::{DecodeError, PacketReadError, Result, SeekError};
use crate::format::ChannelLayout;
use crate::packet_table::PacketTable;
use crate::traits::{AudioStream, Packet, StreamContext, TimeBase};
use bytes::Bytes;
use symphonia::core::codecs::{CodecParameters, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::units::Time;
use tracing::{debug, error, info, instrument};

use super::{error_code, hint_from_path};

/// Container opened through Symphonia's format probe.
pub struct SymphoniaStreamContext {
    path: String,
    reader: Box<dyn FormatReader>,
    stream: AudioStream,
    codec_params: CodecParameters,
    packet_table: Option<PacketTable>,
    duration: f64,
}

impl SymphoniaStreamContext {
    /// Open and probe `path`, selecting the first track with a known codec.
    ///
    /// When the container declares no duration and
    /// `config.build_packet_table` is set, the file is scanned once more to
    /// build a [`PacketTable`].
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path, config: &DecoderConfig) -> Result<Self> {
        let mut context = Self::open_reader(path)?;

        if context.stream.duration().is_none() && config.build_packet_table {
            debug!("No duration metadata, building packet table");
            let mut scan = Self::open_reader(path)?;
            let stream = scan.stream.clone();
            context.packet_table = PacketTable::build(&mut scan, &stream);
        }

        context.duration = context
            .stream
            .duration()
            .or_else(|| context.packet_table.as_ref().map(PacketTable::duration))
            .unwrap_or(0.0);

        info!(
            codec = context.stream.codec_name.as_deref().unwrap_or("unknown"),
            sample_rate = context.stream.sample_rate,
            channels = context.stream.channel_count,
            duration = context.duration,
            "Opened audio stream"
        );

        Ok(context)
    }

    fn open_reader(path: &Path) -> Result<Self> {
        let path_str = path.display().to_string();

        let file = File::open(path).map_err(|e| {
            error!(path = %path_str, error = %e, "Failed to open file");
            DecodeError::StreamInitialization(format!("Failed to open {}: {}", path_str, e))
        })?;

        let media_source = Box::new(file) as Box<dyn MediaSource>;
        let mss = MediaSourceStream::new(media_source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint_from_path(path),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!(path = %path_str, error = %e, "Format probe failed");
                DecodeError::StreamInitialization(format!("Failed to probe {}: {}", path_str, e))
            })?;

        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                DecodeError::StreamInitialization(format!("No audio stream found in {}", path_str))
            })?;

        let codec_params = track.codec_params.clone();
        let stream = audio_stream(track.id, &codec_params)?;

        Ok(Self {
            path: path_str,
            reader,
            stream,
            codec_params,
            packet_table: None,
            duration: 0.0,
        })
    }

    /// Parameters of the selected track, for creating its codec.
    pub fn codec_params(&self) -> &CodecParameters {
        &self.codec_params
    }

    /// The selected audio stream.
    pub fn stream(&self) -> &AudioStream {
        &self.stream
    }

    /// Packet index, if one was built.
    pub fn packet_table(&self) -> Option<&PacketTable> {
        self.packet_table.as_ref()
    }
}

fn audio_stream(track_id: u32, params: &CodecParameters) -> Result<AudioStream> {
    let sample_rate = params
        .sample_rate
        .ok_or_else(|| DecodeError::StreamInitialization("Missing sample rate".to_string()))?;

    // Some codecs only report channels after the first packet.
    let channel_count = params.channels.map(|ch| ch.count() as u16).unwrap_or(2);

    let time_base = params
        .time_base
        .map(|tb| TimeBase::new(tb.numer, tb.denom))
        .unwrap_or_else(|| TimeBase::new(1, sample_rate));

    let duration_ts = params
        .n_frames
        .map(|frames| time_base.to_timestamp(frames as f64 / sample_rate as f64));

    let codec_name = symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|descriptor| descriptor.short_name.to_string());

    Ok(AudioStream {
        index: track_id,
        time_base,
        duration_ts,
        sample_rate,
        channel_count,
        channel_layout: ChannelLayout::default_for(channel_count),
        codec_name,
    })
}

impl StreamContext for SymphoniaStreamContext {
    fn path(&self) -> &str {
        &self.path
    }

    fn best_audio_stream(&self) -> Option<AudioStream> {
        Some(self.stream.clone())
    }

    fn read_packet(
        &mut self,
        stream: &AudioStream,
    ) -> std::result::Result<Option<Packet>, PacketReadError> {
        let packet = self
            .reader
            .next_packet()
            .map_err(|e| PacketReadError::new(error_code(&e)))?;

        if packet.track_id() != stream.index {
            return Ok(None);
        }

        Ok(Some(Packet::new(
            stream.index,
            packet.ts() as i64,
            packet.dur() as i64,
            Bytes::copy_from_slice(packet.buf()),
        )))
    }

    fn seek(&mut self, stream: &AudioStream, time: f64) -> std::result::Result<(), SeekError> {
        let to = SeekTo::Time {
            time: Time::from(time.max(0.0)),
            track_id: Some(stream.index),
        };

        let seeked = self
            .reader
            .seek(SeekMode::Coarse, to)
            .map_err(|e| SeekError::new(error_code(&e)))?;

        debug!(
            requested_ts = seeked.required_ts,
            actual_ts = seeked.actual_ts,
            "Container seek"
        );
        Ok(())
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}
