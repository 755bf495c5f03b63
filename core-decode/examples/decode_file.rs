//! # Decode File Example
//!
//! Decodes an audio file to the end, then seeks back to a position and
//! decodes the rest again, printing what came out.
//!
//! Run with:
//! ```bash
//! cargo run --example decode_file --package core-decode -- /path/to/song.flac
//!
//! # Seek position in seconds and JSON logs
//! cargo run --example decode_file --package core-decode -- /path/to/song.flac 30.0 json
//! ```

use core_decode::backend::open_file;
use core_decode::{DecoderConfig, PcmFormat};
use core_runtime::logging::{init_logging, strip_path, LogFormat, LogLevel, LoggingConfig};
use std::env;
use std::process::ExitCode;
use tracing::{error, info};

const CHUNK_SAMPLES: usize = 4096;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let Some(path) = args.get(1) else {
        eprintln!("usage: decode_file <path> [seek-seconds] [pretty|json|compact]");
        return ExitCode::FAILURE;
    };

    let seek_to = args
        .get(2)
        .and_then(|arg| arg.parse::<f64>().ok())
        .unwrap_or(0.0);

    let format = match args.get(3).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug);

    if let Err(e) = init_logging(config) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let mut decoder = match open_file(path, DecoderConfig::default()) {
        Ok(decoder) => decoder,
        Err(e) => {
            error!(path = strip_path(path), error = %e, "Unable to open file");
            return ExitCode::FAILURE;
        }
    };

    let output_format = PcmFormat::from(decoder.audio_format());
    info!(
        file = strip_path(path),
        sample_rate = output_format.sample_rate,
        channels = output_format.channel_count,
        duration = decoder.duration(),
        "Opened"
    );

    let (chunks, samples) = drain(&mut decoder, &output_format);
    info!(chunks, samples, status = ?decoder.status(), "First pass complete");

    if let Err(e) = decoder.seek(seek_to) {
        error!(time = seek_to, error = %e, "Seek failed");
        return ExitCode::FAILURE;
    }

    let (chunks, samples) = drain(&mut decoder, &output_format);
    info!(
        time = seek_to,
        chunks,
        samples,
        seconds = samples as f64 / output_format.sample_rate as f64,
        "Decoded after seek"
    );

    if decoder.fatal_error() {
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn drain<S, C>(decoder: &mut core_decode::Decoder<S, C>, format: &PcmFormat) -> (usize, usize)
where
    S: core_decode::StreamContext,
    C: core_decode::Codec,
{
    let mut chunks = 0;
    let mut samples = 0;

    while let Some(chunk) = decoder.decode(CHUNK_SAMPLES, format) {
        chunks += 1;
        samples += chunk.frame_length();
    }

    (chunks, samples)
}
