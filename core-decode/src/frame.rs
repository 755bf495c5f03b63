//! # Decoded Frames
//!
//! A [`RawFrame`] is one unit of decoded audio as produced by a codec: a set
//! of per-channel sample planes in the codec's native sample format, plus the
//! bookkeeping needed to use only part of it (seek trimming, loop ends).

use crate::format::SampleFormat;

/// Per-channel sample planes in the codec's native format.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    U8(Vec<Vec<u8>>),
    S16(Vec<Vec<i16>>),
    S32(Vec<Vec<i32>>),
    F32(Vec<Vec<f32>>),
    F64(Vec<Vec<f64>>),
}

impl SampleData {
    /// Number of channel planes.
    pub fn channel_count(&self) -> usize {
        match self {
            SampleData::U8(p) => p.len(),
            SampleData::S16(p) => p.len(),
            SampleData::S32(p) => p.len(),
            SampleData::F32(p) => p.len(),
            SampleData::F64(p) => p.len(),
        }
    }

    /// Samples per channel (length of the shortest plane).
    pub fn samples_per_channel(&self) -> usize {
        fn shortest<T>(planes: &[Vec<T>]) -> usize {
            planes.iter().map(Vec::len).min().unwrap_or(0)
        }

        match self {
            SampleData::U8(p) => shortest(p),
            SampleData::S16(p) => shortest(p),
            SampleData::S32(p) => shortest(p),
            SampleData::F32(p) => shortest(p),
            SampleData::F64(p) => shortest(p),
        }
    }

    /// Planar sample format of this data.
    pub fn sample_format(&self) -> SampleFormat {
        match self {
            SampleData::U8(_) => SampleFormat::U8,
            SampleData::S16(_) => SampleFormat::S16,
            SampleData::S32(_) => SampleFormat::S32,
            SampleData::F32(_) => SampleFormat::F32,
            SampleData::F64(_) => SampleFormat::F64,
        }
    }
}

/// A single decoded frame.
///
/// Frames may be truncated at either end. Truncation never touches the
/// sample data; it only moves the window of usable samples:
///
/// ```text
/// actual_sample_count = 1000
/// keep_last_n_samples(300)  => sample_count = 300, first_sample_index = 700
/// keep_first_n_samples(300) => sample_count = 300, first_sample_index = 0
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    data: Option<SampleData>,
    actual_sample_count: usize,
    truncated_sample_count: Option<usize>,
    first_sample_index: usize,
    pts: i64,
    start_timestamp: Option<f64>,
    end_timestamp: Option<f64>,
}

impl RawFrame {
    /// Wrap decoded planes. `pts` is in the stream's time base.
    pub fn new(data: SampleData, pts: i64) -> Self {
        let actual_sample_count = data.samples_per_channel();
        Self {
            data: Some(data),
            actual_sample_count,
            truncated_sample_count: None,
            first_sample_index: 0,
            pts,
            start_timestamp: None,
            end_timestamp: None,
        }
    }

    /// Usable samples per channel, after any truncation.
    pub fn sample_count(&self) -> usize {
        self.truncated_sample_count
            .unwrap_or(self.actual_sample_count)
    }

    /// Samples per channel actually held by the frame.
    pub fn actual_sample_count(&self) -> usize {
        self.actual_sample_count
    }

    /// Index of the first usable sample in each plane.
    pub fn first_sample_index(&self) -> usize {
        self.first_sample_index
    }

    /// Presentation timestamp in stream time-base units.
    pub fn pts(&self) -> i64 {
        self.pts
    }

    pub fn start_timestamp(&self) -> Option<f64> {
        self.start_timestamp
    }

    pub fn end_timestamp(&self) -> Option<f64> {
        self.end_timestamp
    }

    /// Set the frame's start/end position in seconds.
    pub fn set_timestamps(&mut self, start: f64, end: f64) {
        self.start_timestamp = Some(start);
        self.end_timestamp = Some(end);
    }

    /// Sample planes, or `None` once the frame has been released.
    pub fn data(&self) -> Option<&SampleData> {
        self.data.as_ref()
    }

    pub fn channel_count(&self) -> usize {
        self.data.as_ref().map_or(0, SampleData::channel_count)
    }

    /// Use only the first `sample_count` usable samples.
    ///
    /// No-op if the frame does not hold more than `sample_count` usable
    /// samples.
    pub fn keep_first_n_samples(&mut self, sample_count: usize) {
        if sample_count < self.sample_count() {
            self.truncated_sample_count = Some(sample_count);
        }
    }

    /// Use only the last `sample_count` usable samples.
    ///
    /// No-op if the frame does not hold more than `sample_count` usable
    /// samples.
    pub fn keep_last_n_samples(&mut self, sample_count: usize) {
        let current = self.sample_count();
        if sample_count < current {
            self.first_sample_index += current - sample_count;
            self.truncated_sample_count = Some(sample_count);
        }
    }

    /// Drop the sample planes. Safe to call more than once.
    pub fn release(&mut self) {
        if self.data.take().is_some() {
            self.actual_sample_count = 0;
            self.truncated_sample_count = None;
            self.first_sample_index = 0;
        }
    }

    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }
}

/// All frames produced by decoding one packet, in decode order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketFrames {
    frames: Vec<RawFrame>,
}

impl PacketFrames {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [RawFrame] {
        &mut self.frames
    }

    pub fn into_frames(self) -> Vec<RawFrame> {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total usable samples per channel across all frames.
    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(RawFrame::sample_count).sum()
    }

    /// Keep only the trailing `sample_count` samples of the packet.
    ///
    /// Frames entirely before the kept region are dropped; the frame that
    /// straddles the boundary is truncated at its head.
    pub fn keep_last_n_samples(&mut self, sample_count: usize) {
        if sample_count >= self.sample_count() {
            return;
        }

        let mut remaining = sample_count;
        let mut first_kept = self.frames.len();

        for (index, frame) in self.frames.iter_mut().enumerate().rev() {
            if remaining == 0 {
                break;
            }

            let count = frame.sample_count();
            first_kept = index;

            if count > remaining {
                frame.keep_last_n_samples(remaining);
                remaining = 0;
            } else {
                remaining -= count;
            }
        }

        self.frames.drain(..first_kept);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: usize) -> RawFrame {
        RawFrame::new(
            SampleData::F32(vec![(0..samples).map(|i| i as f32).collect(); 2]),
            0,
        )
    }

    #[test]
    fn keep_last_moves_first_index() {
        let mut f = frame(1000);
        f.keep_last_n_samples(300);
        assert_eq!(f.sample_count(), 300);
        assert_eq!(f.first_sample_index(), 700);
        assert_eq!(f.actual_sample_count(), 1000);
    }

    #[test]
    fn keep_first_keeps_index_zero() {
        let mut f = frame(1000);
        f.keep_first_n_samples(300);
        assert_eq!(f.sample_count(), 300);
        assert_eq!(f.first_sample_index(), 0);
    }

    #[test]
    fn truncation_beyond_length_is_noop() {
        let mut f = frame(100);
        f.keep_last_n_samples(100);
        f.keep_first_n_samples(500);
        assert_eq!(f.sample_count(), 100);
        assert_eq!(f.first_sample_index(), 0);
    }

    #[test]
    fn truncations_compose() {
        let mut f = frame(1000);
        f.keep_last_n_samples(600);
        f.keep_first_n_samples(200);
        assert_eq!(f.first_sample_index(), 400);
        assert_eq!(f.sample_count(), 200);

        f.keep_last_n_samples(50);
        assert_eq!(f.first_sample_index(), 550);
        assert_eq!(f.sample_count(), 50);
    }

    #[test]
    fn release_is_idempotent() {
        let mut f = frame(100);
        f.release();
        assert!(f.is_released());
        assert_eq!(f.sample_count(), 0);
        f.release();
        assert!(f.is_released());
        assert_eq!(f.channel_count(), 0);
    }

    #[test]
    fn packet_keep_last_spans_frames() {
        let mut packet = PacketFrames::new(vec![frame(100), frame(100), frame(100)]);
        packet.keep_last_n_samples(150);

        assert_eq!(packet.sample_count(), 150);
        assert_eq!(packet.frames().len(), 2);
        assert_eq!(packet.frames()[0].sample_count(), 50);
        assert_eq!(packet.frames()[0].first_sample_index(), 50);
        assert_eq!(packet.frames()[1].sample_count(), 100);
    }

    #[test]
    fn packet_keep_last_on_frame_boundary() {
        let mut packet = PacketFrames::new(vec![frame(100), frame(100)]);
        packet.keep_last_n_samples(100);
        assert_eq!(packet.frames().len(), 1);
        assert_eq!(packet.frames()[0].first_sample_index(), 0);

        let mut packet = PacketFrames::new(vec![frame(100)]);
        packet.keep_last_n_samples(0);
        assert!(packet.is_empty());
    }
}
