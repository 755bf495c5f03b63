//! # Packet Table
//!
//! Byte-position index of every packet in an audio stream, for streams whose
//! container declares no duration.
//!
//! Building the table reads the whole stream once, so it is done at most once
//! per opened file and only when no other duration source is available.
//!
//! ## Lookup
//!
//! [`PacketTable::closest_packet_byte_position`] converts a time to the
//! stream's pts unit and binary-searches the pts-sorted entries:
//!
//! ```text
//! pts:   0     1152   2304   3456
//!              ▲  ▲
//!         1400 ┘  └ closer to 1152 than to 2304 → byte position of entry 1
//! ```

use crate::traits::{AudioStream, StreamContext};
use tracing::{debug, instrument, warn};

/// One packet of the indexed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketTableEntry {
    /// Offset of the packet within the file.
    pub byte_position: i64,
    /// Presentation timestamp in stream time-base units.
    pub pts: i64,
}

/// Sorted index of a stream's packets.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketTable {
    entries: Vec<PacketTableEntry>,
    time_base_ratio: f64,
    duration: f64,
}

impl PacketTable {
    /// Read every packet of `stream` from `context` and index it.
    ///
    /// Returns `None` if the stream holds no packets or a read fails for any
    /// reason other than end of stream; a partial table is never returned.
    ///
    /// The context is left positioned at the end of the stream.
    #[instrument(skip_all, fields(path = %context.path(), stream = stream.index))]
    pub fn build<S: StreamContext + ?Sized>(
        context: &mut S,
        stream: &AudioStream,
    ) -> Option<Self> {
        let mut entries = Vec::new();
        let mut last_end_pts: Option<i64> = None;

        loop {
            match context.read_packet(stream) {
                Ok(Some(packet)) => {
                    entries.push(PacketTableEntry {
                        byte_position: packet.byte_position,
                        pts: packet.pts,
                    });
                    last_end_pts = Some(packet.pts + packet.duration);
                }
                Ok(None) => continue,
                Err(e) if e.is_eof() => break,
                Err(e) => {
                    warn!(error = %e, "Packet table construction failed");
                    return None;
                }
            }
        }

        let last_end_pts = last_end_pts?;
        let time_base_ratio = stream.time_base_ratio();
        let table = Self::from_entries(entries, time_base_ratio, last_end_pts as f64 * time_base_ratio);

        debug!(
            packets = table.len(),
            duration = table.duration,
            "Built packet table"
        );

        Some(table)
    }

    /// Index pre-collected entries.
    ///
    /// Entries are sorted by pts; for duplicate pts values only the first
    /// occurrence is kept.
    pub fn from_entries(
        mut entries: Vec<PacketTableEntry>,
        time_base_ratio: f64,
        duration: f64,
    ) -> Self {
        entries.sort_by_key(|e| e.pts);
        entries.dedup_by_key(|e| e.pts);

        Self {
            entries,
            time_base_ratio,
            duration,
        }
    }

    /// Stream duration in seconds, from the end of the last packet read.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn entries(&self) -> &[PacketTableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte position of the packet whose pts is closest to `time` (seconds).
    ///
    /// Equidistant neighbours resolve to the earlier packet. Returns `None`
    /// only for an empty table.
    pub fn closest_packet_byte_position(&self, time: f64) -> Option<i64> {
        self.closest_index(time)
            .map(|index| self.entries[index].byte_position)
    }

    fn closest_index(&self, time: f64) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }

        let target = if self.time_base_ratio > 0.0 {
            (time / self.time_base_ratio).round() as i64
        } else {
            0
        };

        let last = self.entries.len() - 1;
        let index = match self.entries.binary_search_by_key(&target, |e| e.pts) {
            Ok(exact) => exact,
            Err(0) => 0,
            Err(insert) if insert > last => last,
            Err(insert) => {
                let before = &self.entries[insert - 1];
                let after = &self.entries[insert];
                if (after.pts - target).abs() < (target - before.pts).abs() {
                    insert
                } else {
                    insert - 1
                }
            }
        };

        Some(index.min(last))
    }
}
