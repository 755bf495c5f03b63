//! Workspace facade crate.
//!
//! Re-exports the decode pipeline (`core-decode`) and the shared runtime
//! utilities (`core-runtime`) and forwards the `decoder-*` feature flags, so
//! host applications can depend on `pcm-decode-workspace` alone.

pub use core_decode as decode;
pub use core_runtime as runtime;

pub use core_decode::{
    DecodeError, Decoder, DecoderConfig, DecoderStatus, PcmBuffer, PcmFormat,
};

#[cfg(feature = "core-decoder")]
pub use core_decode::backend::open_file;
