//! # Symphonia Backend
//!
//! [`StreamContext`](crate::traits::StreamContext) and
//! [`Codec`](crate::traits::Codec) implementations over the Symphonia
//! demuxers and decoders.
//!
//! Which containers and codecs are available depends on the `decoder-*`
//! features enabled on this crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use core_decode::backend::open_file;
//! use core_decode::{DecoderConfig, PcmFormat};
//!
//! let mut decoder = open_file("/music/song.flac", DecoderConfig::default())?;
//! let output_format = PcmFormat::from(decoder.audio_format());
//!
//! while let Some(chunk) = decoder.decode(4096, &output_format) {
//!     println!("decoded {} samples", chunk.frame_length());
//! }
//! # Ok::<(), core_decode::DecodeError>(())
//! ```

mod codec;
mod context;

pub use codec::SymphoniaCodec;
pub use context::SymphoniaStreamContext;

use std::path::Path;

use crate::config::DecoderConfig;
use crate::decoder::Decoder;
use crate::error::{ErrorCode, Result};
use symphonia::core::errors::{Error as SymphoniaError, SeekErrorKind};
use symphonia::core::probe::Hint;
use tracing::debug;

/// Open `path` and build a decoder for its first audio track.
pub fn open_file(
    path: impl AsRef<Path>,
    config: DecoderConfig,
) -> Result<Decoder<SymphoniaStreamContext, SymphoniaCodec>> {
    let context = SymphoniaStreamContext::open(path.as_ref(), &config)?;
    let codec = SymphoniaCodec::for_context(&context)?;
    Decoder::with_config(context, codec, config)
}

/// Probe hint from the file extension, if there is one.
pub(crate) fn hint_from_path(path: &Path) -> Hint {
    let mut hint = Hint::new();

    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        debug!(extension, "Setting probe hint extension");
        hint.with_extension(extension);
    }

    hint
}

/// Map a Symphonia error to the native code carried by pipeline errors.
pub(crate) fn error_code(error: &SymphoniaError) -> ErrorCode {
    match error {
        SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            ErrorCode::EOF
        }
        SymphoniaError::IoError(_) => ErrorCode::IO,
        SymphoniaError::DecodeError(_) => ErrorCode::INVALID_DATA,
        SymphoniaError::SeekError(SeekErrorKind::OutOfRange) => ErrorCode::EOF,
        SymphoniaError::SeekError(_) => ErrorCode::OUT_OF_RANGE,
        SymphoniaError::Unsupported(_) => ErrorCode::UNSUPPORTED,
        SymphoniaError::LimitError(_) => ErrorCode::OUT_OF_RANGE,
        SymphoniaError::ResetRequired => ErrorCode::RESET_REQUIRED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn unexpected_eof_maps_to_eof() {
        let err = SymphoniaError::IoError(io::Error::new(io::ErrorKind::UnexpectedEof, "end"));
        assert!(error_code(&err).is_eof());

        let err = SymphoniaError::IoError(io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(error_code(&err), ErrorCode::IO);
    }

    #[test]
    fn seek_out_of_range_maps_to_eof() {
        let err = SymphoniaError::SeekError(SeekErrorKind::OutOfRange);
        assert!(error_code(&err).is_eof());

        let err = SymphoniaError::SeekError(SeekErrorKind::Unseekable);
        assert_eq!(error_code(&err), ErrorCode::OUT_OF_RANGE);
    }

    #[test]
    fn codec_errors_map_to_known_codes() {
        assert_eq!(
            error_code(&SymphoniaError::DecodeError("bad frame")),
            ErrorCode::INVALID_DATA
        );
        assert_eq!(
            error_code(&SymphoniaError::Unsupported("codec")),
            ErrorCode::UNSUPPORTED
        );
        assert_eq!(
            error_code(&SymphoniaError::ResetRequired),
            ErrorCode::RESET_REQUIRED
        );
    }

    #[test]
    fn open_missing_file_is_stream_initialization_error() {
        let result = open_file("/nonexistent/track.mp3", DecoderConfig::default());
        assert!(matches!(
            result,
            Err(crate::DecodeError::StreamInitialization(_))
        ));
    }
}
