//! # Decode Error Types
//!
//! Error types raised by the decode pipeline and by the stream/codec
//! collaborators it drives.
//!
//! Every error carries a human-readable description derived from an
//! [`ErrorCode`], so callers can log failures without knowing which backend
//! produced them.

use std::fmt;
use thiserror::Error;

/// A native error code reported by a stream or codec backend.
///
/// Codes are negative, in the FFmpeg `AVERROR` style. Backends map their own
/// error kinds onto the well-known constants below; anything else is carried
/// through verbatim and described as an unknown error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// End of file / end of stream.
    pub const EOF: ErrorCode = ErrorCode(-541_478_725);
    /// Generic I/O failure.
    pub const IO: ErrorCode = ErrorCode(-5);
    /// The data could not be parsed or decoded.
    pub const INVALID_DATA: ErrorCode = ErrorCode(-1_094_995_529);
    /// A position or value was outside the valid range.
    pub const OUT_OF_RANGE: ErrorCode = ErrorCode(-34);
    /// The operation or format is not supported.
    pub const UNSUPPORTED: ErrorCode = ErrorCode(-1_414_092_869);
    /// The stream layout changed and the codec must be recreated.
    pub const RESET_REQUIRED: ErrorCode = ErrorCode(-1_381_258_232);
    /// Unspecified failure.
    pub const UNKNOWN: ErrorCode = ErrorCode(-1_313_558_101);

    /// Returns `true` if this code signals end of stream.
    pub fn is_eof(&self) -> bool {
        *self == Self::EOF
    }

    /// Human-readable description of this code.
    pub fn description(&self) -> &'static str {
        match *self {
            Self::EOF => "End of file",
            Self::IO => "I/O error",
            Self::INVALID_DATA => "Invalid data found when processing input",
            Self::OUT_OF_RANGE => "Value out of range",
            Self::UNSUPPORTED => "Operation not supported",
            Self::RESET_REQUIRED => "Stream reset required",
            _ => "Unknown error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.0)
    }
}

/// Failure while reading a packet from a [`StreamContext`](crate::traits::StreamContext).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unable to read packet: {code}")]
pub struct PacketReadError {
    /// Underlying native code.
    pub code: ErrorCode,
}

impl PacketReadError {
    pub fn new(code: ErrorCode) -> Self {
        Self { code }
    }

    /// End of stream, the normal terminal condition.
    pub fn eof() -> Self {
        Self::new(ErrorCode::EOF)
    }

    /// Returns `true` if this read failed because the stream is exhausted.
    pub fn is_eof(&self) -> bool {
        self.code.is_eof()
    }
}

/// Failure while performing a low-level seek.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unable to seek: {code}")]
pub struct SeekError {
    /// Underlying native code.
    pub code: ErrorCode,
}

impl SeekError {
    pub fn new(code: ErrorCode) -> Self {
        Self { code }
    }

    /// Seek target lies at or past the end of the stream.
    pub fn eof() -> Self {
        Self::new(ErrorCode::EOF)
    }

    /// Returns `true` if the seek went past the end of the stream.
    pub fn is_eof(&self) -> bool {
        self.code.is_eof()
    }
}

/// Errors that can occur while decoding an audio stream.
#[derive(Error, Debug)]
pub enum DecodeError {
    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// A packet could not be read from the container.
    #[error("Packet read error: {0}")]
    PacketRead(#[from] PacketReadError),

    /// A packet was read but the codec failed to decode it.
    #[error("Decoder error: {code}")]
    Decoder { code: ErrorCode },

    /// A seek within the stream failed.
    #[error("Seek error: {0}")]
    Seek(#[from] SeekError),

    /// Decoded samples could not be converted to the output format.
    #[error("Sample conversion error: {0}")]
    Conversion(String),

    // ========================================================================
    // Initialization Errors
    // ========================================================================
    /// The container could not be opened or has no usable audio stream.
    #[error("Stream initialization error: {0}")]
    StreamInitialization(String),

    /// The codec for the audio stream could not be found or opened.
    #[error("Codec initialization error: {0}")]
    CodecInitialization(String),

    /// The sample format converter could not be created.
    #[error("Resampler initialization error: {0}")]
    ResamplerInitialization(String),

    /// The decoder configuration was rejected.
    #[error("Invalid decoder configuration: {0}")]
    InvalidConfig(String),
}

impl DecodeError {
    /// Build a codec failure from a native code.
    pub fn decoder(code: ErrorCode) -> Self {
        DecodeError::Decoder { code }
    }

    /// Returns `true` if this error signals end of stream rather than a fault.
    pub fn is_eof(&self) -> bool {
        match self {
            DecodeError::PacketRead(e) => e.is_eof(),
            DecodeError::Seek(e) => e.is_eof(),
            DecodeError::Decoder { code } => code.is_eof(),
            _ => false,
        }
    }

    /// Returns `true` if this error was raised while setting up a decoder.
    pub fn is_initialization_error(&self) -> bool {
        matches!(
            self,
            DecodeError::StreamInitialization(_)
                | DecodeError::CodecInitialization(_)
                | DecodeError::ResamplerInitialization(_)
                | DecodeError::InvalidConfig(_)
        )
    }

    /// Returns `true` if retrying the operation may succeed.
    ///
    /// Packet and codec failures are usually confined to one damaged packet.
    pub fn is_transient(&self) -> bool {
        match self {
            DecodeError::PacketRead(e) => !e.is_eof(),
            DecodeError::Decoder { code } => !code.is_eof(),
            _ => false,
        }
    }
}

/// Result type for decode operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
