//! End-to-end decoding of a generated WAV file through the Symphonia backend

#![cfg(feature = "decoder-wav")]

use std::path::PathBuf;

use core_decode::backend::open_file;
use core_decode::{DecodeError, DecoderConfig, PcmFormat, SampleFormat};

const RATE: u32 = 44_100;

/// Sample value written at frame `i` of the left channel.
fn left_sample(i: u32) -> i16 {
    ((i % 1000) as i16) * 10
}

/// Write one second of 16-bit stereo PCM and return its path.
fn write_wav(name: &str) -> PathBuf {
    let frames = RATE;
    let data_len = frames * 4;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&RATE.to_le_bytes());
    bytes.extend_from_slice(&(RATE * 4).to_le_bytes());
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());

    for i in 0..frames {
        let left = left_sample(i);
        bytes.extend_from_slice(&left.to_le_bytes());
        bytes.extend_from_slice(&(-left).to_le_bytes());
    }

    let path = std::env::temp_dir().join(format!(
        "core-decode-{}-{}.wav",
        name,
        std::process::id()
    ));
    std::fs::write(&path, bytes).unwrap();
    path
}

fn decode_remaining(
    decoder: &mut core_decode::Decoder<
        core_decode::SymphoniaStreamContext,
        core_decode::SymphoniaCodec,
    >,
) -> Vec<f32> {
    let format = PcmFormat::new(RATE, 2);
    let mut left = Vec::new();
    while let Some(chunk) = decoder.decode(4096, &format) {
        left.extend_from_slice(chunk.channel(0).unwrap());
    }
    left
}

#[test]
fn test_wav_decodes_every_sample() {
    let path = write_wav("full");
    let mut decoder = open_file(&path, DecoderConfig::default()).unwrap();

    assert_eq!(decoder.audio_format().sample_rate, RATE);
    assert_eq!(decoder.audio_format().channel_count, 2);
    assert_eq!(decoder.audio_format().sample_format, SampleFormat::S16);
    assert!((decoder.duration() - 1.0).abs() < 1e-6);

    let left = decode_remaining(&mut decoder);
    assert_eq!(left.len(), RATE as usize);
    assert!((left[123] - left_sample(123) as f32 / 32768.0).abs() < 1e-6);
    assert!(decoder.eof());
    assert!(!decoder.fatal_error());

    std::fs::remove_file(path).ok();
}

#[test]
fn test_wav_seek_to_middle() {
    let path = write_wav("seek");
    let mut decoder = open_file(&path, DecoderConfig::default()).unwrap();

    decoder.seek(0.5).unwrap();
    let left = decode_remaining(&mut decoder);

    let remaining = left.len() as i64;
    assert!((remaining - 22_050).abs() <= 1152, "remaining {remaining}");

    decoder.seek(0.0).unwrap();
    assert!(!decoder.eof());
    assert_eq!(decode_remaining(&mut decoder).len(), RATE as usize);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_non_audio_file_fails_to_open() {
    let path = std::env::temp_dir().join(format!("core-decode-garbage-{}.wav", std::process::id()));
    std::fs::write(&path, b"definitely not a wave file").unwrap();

    let result = open_file(&path, DecoderConfig::default());
    assert!(matches!(result, Err(DecodeError::StreamInitialization(_))));

    std::fs::remove_file(path).ok();
}
