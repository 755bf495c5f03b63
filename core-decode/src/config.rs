//! # Decoder Configuration
//!
//! Tunables for the decode pipeline.

use serde::{Deserialize, Serialize};

/// Decoder configuration.
///
/// Controls the retry budget for damaged streams, seek precision, and the
/// limits applied when setting up sample conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Number of consecutive non-EOF read/decode failures tolerated by
    /// `decode()` before the decoder is marked as fatally failed.
    ///
    /// The counter resets on every successful read.
    ///
    /// Default: 5.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Maximum distance (seconds) between a seek target and the start of the
    /// first usable packet that is tolerated without trimming samples.
    ///
    /// Default: 0.01 (10ms).
    #[serde(default = "default_seek_tolerance_secs")]
    pub seek_tolerance_secs: f64,

    /// Whether a packet table is built for streams that carry no duration
    /// metadata.
    ///
    /// Building the table reads the whole stream once, which can be slow for
    /// large files.
    ///
    /// Default: true.
    #[serde(default = "default_build_packet_table")]
    pub build_packet_table: bool,

    /// Maximum channel count accepted by the sample converter.
    ///
    /// Default: 8.
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: default_max_consecutive_errors(),
            seek_tolerance_secs: default_seek_tolerance_secs(),
            build_packet_table: default_build_packet_table(),
            max_channels: default_max_channels(),
        }
    }
}

impl DecoderConfig {
    /// Configuration that never reads a whole stream up front.
    ///
    /// Durations of streams without metadata are reported as unknown.
    pub fn without_packet_table() -> Self {
        Self {
            build_packet_table: false,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_consecutive_errors == 0 {
            return Err("max_consecutive_errors must be > 0".to_string());
        }

        if !self.seek_tolerance_secs.is_finite() || self.seek_tolerance_secs < 0.0 {
            return Err("seek_tolerance_secs must be a finite value >= 0".to_string());
        }

        if !(1..=64).contains(&self.max_channels) {
            return Err("max_channels must be between 1 and 64".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_seek_tolerance_secs() -> f64 {
    0.01
}

fn default_build_packet_table() -> bool {
    true
}

fn default_max_channels() -> usize {
    8
}
