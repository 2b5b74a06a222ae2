//! Alignment of the gaze timeline against the video frame timeline.
//!
//! Gaze and video run at unrelated rates. For every decoded frame the
//! synchronizer decides which output slots that frame produces and which
//! gaze sample, if any, each slot carries. The gaze cursor only moves
//! forward, so a sample is never used twice.

use crate::config::{AlignmentPolicy, DueTime, SyncConfig};
use crate::gaze::{GazeCursor, GazeTimeline};
use crate::types::GazeSample;

/// One output produced for a source frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSlot {
    pub frame_index: usize,
    /// Position of this slot among the frame's outputs.
    pub slot: usize,
    /// The gaze sample and its timeline index, or `None` when no sample is
    /// due yet.
    pub sample: Option<(usize, GazeSample)>,
}

impl SyncSlot {
    pub fn sample_index(&self) -> Option<usize> {
        self.sample.map(|(i, _)| i)
    }

    pub fn gaze(&self) -> Option<&GazeSample> {
        self.sample.as_ref().map(|(_, s)| s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub frames: usize,
    pub slots: usize,
    pub consumed: usize,
    /// Samples passed over without an output: those before the first frame
    /// under catch-up, or by the fixed-expansion forward scan.
    pub skipped: usize,
}

pub struct TimeSynchronizer<'a> {
    cursor: GazeCursor<'a>,
    policy: AlignmentPolicy,
    due_time: DueTime,
    frame_interval_ms: f64,
    stats: SyncStats,
}

impl<'a> TimeSynchronizer<'a> {
    /// `fps` is the nominal rate of the frame source, used by
    /// [`DueTime::FrameEnd`].
    pub fn new(timeline: &'a GazeTimeline, config: &SyncConfig, fps: f64) -> TimeSynchronizer<'a> {
        let frame_interval_ms = if fps > 0.0 { 1000.0 / fps } else { 0.0 };
        TimeSynchronizer {
            cursor: timeline.cursor(),
            policy: config.policy,
            due_time: config.due_time,
            frame_interval_ms,
            stats: SyncStats::default(),
        }
    }

    pub fn cursor_index(&self) -> usize {
        self.cursor.index()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    fn due_ms(&self, frame_timestamp_ms: f64) -> f64 {
        match self.due_time {
            DueTime::FrameStart => frame_timestamp_ms,
            DueTime::FrameEnd => frame_timestamp_ms + self.frame_interval_ms,
        }
    }

    /// Output slots for the frame decoded at `frame_timestamp_ms`.
    pub fn slots_for_frame(&mut self, frame_index: usize, frame_timestamp_ms: f64) -> Vec<SyncSlot> {
        let due_ms = self.due_ms(frame_timestamp_ms);
        let slots = match self.policy {
            AlignmentPolicy::CatchUp => {
                if self.stats.frames == 0 {
                    self.skip_before(frame_timestamp_ms);
                }
                self.catch_up(frame_index, due_ms)
            }
            AlignmentPolicy::FixedExpansion { k } => self.fixed_expansion(frame_index, due_ms, k),
        };
        self.stats.frames += 1;
        self.stats.slots += slots.len();
        slots
    }

    /// Drops samples recorded before the video started.
    fn skip_before(&mut self, first_frame_ms: f64) {
        while self.cursor.advance_if_before(first_frame_ms).is_some() {
            self.stats.skipped += 1;
        }
    }

    fn catch_up(&mut self, frame_index: usize, due_ms: f64) -> Vec<SyncSlot> {
        let mut slots = Vec::new();
        while let Some(sample) = self.cursor.advance_if_before(due_ms) {
            self.stats.consumed += 1;
            slots.push(SyncSlot {
                frame_index,
                slot: slots.len(),
                sample: Some(sample),
            });
        }
        slots
    }

    fn fixed_expansion(&mut self, frame_index: usize, due_ms: f64, k: usize) -> Vec<SyncSlot> {
        let slots: Vec<_> = (0..k)
            .map(|slot| {
                let sample = self.cursor.advance_if_before(due_ms);
                if sample.is_some() {
                    self.stats.consumed += 1;
                }
                SyncSlot {
                    frame_index,
                    slot,
                    sample,
                }
            })
            .collect();

        // keep at most one overdue sample pending so lag cannot accumulate
        while self
            .cursor
            .peek_second()
            .is_some_and(|s| s.timestamp_ms() < due_ms)
        {
            self.cursor.advance();
            self.stats.skipped += 1;
        }
        slots
    }
}
