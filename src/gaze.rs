use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{GazeError, Result};
use crate::types::{GazeSample, Validity};

const COL_VTS: &str = "vts_time";
const COL_VAL: &str = "gaze_pos_val";
const COL_X: &str = "gaze_pos_x";
const COL_Y: &str = "gaze_pos_y";

/// Gaze samples in non-decreasing timestamp order.
#[derive(Debug, Clone, Default)]
pub struct GazeTimeline {
    samples: Vec<GazeSample>,
}

impl GazeTimeline {
    pub fn new(samples: Vec<GazeSample>) -> Result<GazeTimeline> {
        if let Some(index) = samples.iter().position(|s| !s.timestamp_s.is_finite()) {
            return Err(GazeError::NonFiniteTimestamp { index });
        }
        for (i, pair) in samples.windows(2).enumerate() {
            if pair[1].timestamp_s < pair[0].timestamp_s {
                return Err(GazeError::NonMonotonic {
                    index: i + 1,
                    previous: pair[0].timestamp_s,
                    current: pair[1].timestamp_s,
                });
            }
        }
        Ok(GazeTimeline { samples })
    }

    /// Loads the tabular gaze export.
    ///
    /// Rows recorded before the video started carry no `vts_time` and are
    /// dropped. `ticks_per_second` converts `vts_time` into seconds.
    pub fn from_csv<P: AsRef<Path>>(path: P, ticks_per_second: f64) -> Result<GazeTimeline> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| GazeError::io(path, e))?;
        let timeline = Self::from_reader(BufReader::new(file), ticks_per_second)?;
        log::debug!("loaded {} gaze samples from {}", timeline.len(), path.display());
        Ok(timeline)
    }

    pub fn from_reader<R: BufRead>(reader: R, ticks_per_second: f64) -> Result<GazeTimeline> {
        let mut lines = reader.lines().enumerate();
        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line.map_err(|e| GazeError::io("<gaze table>", e))?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(GazeTimeline::default()),
            }
        };
        let columns: HashMap<&str, usize> = header
            .split(',')
            .enumerate()
            .map(|(i, name)| (name.trim(), i))
            .collect();
        let column = |name: &str| {
            columns.get(name).copied().ok_or_else(|| GazeError::GazeTable {
                line: 1,
                message: format!("missing column `{}`", name),
            })
        };
        let (vts_col, val_col, x_col, y_col) =
            (column(COL_VTS)?, column(COL_VAL)?, column(COL_X)?, column(COL_Y)?);

        let mut samples = Vec::new();
        for (line_idx, line) in lines {
            let line = line.map_err(|e| GazeError::io("<gaze table>", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let Some(vts) = fields.get(vts_col).and_then(|f| parse_field(f)) else {
                continue;
            };
            let val = fields.get(val_col).and_then(|f| parse_field(f));
            let x = fields.get(x_col).and_then(|f| parse_field(f));
            let y = fields.get(y_col).and_then(|f| parse_field(f));
            let sample = match (val, x, y) {
                (Some(v), Some(x), Some(y)) if v == 0.0 => GazeSample::new(
                    vts / ticks_per_second,
                    (x, y),
                    Validity::Valid,
                ),
                _ => GazeSample::invalid(vts / ticks_per_second),
            };
            log::trace!("line {}: {:?}", line_idx + 1, sample);
            samples.push(sample);
        }
        Self::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GazeSample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[GazeSample] {
        &self.samples
    }

    pub fn cursor(&self) -> GazeCursor<'_> {
        GazeCursor {
            timeline: self,
            index: 0,
        }
    }

    /// Mean sampling rate over the whole timeline, `None` with fewer than
    /// two samples or a zero time span.
    pub fn sample_rate_hz(&self) -> Option<f64> {
        let (first, last) = (self.samples.first()?, self.samples.last()?);
        let span_s = last.timestamp_s - first.timestamp_s;
        if span_s <= 0.0 {
            return None;
        }
        Some((self.samples.len() - 1) as f64 / span_s)
    }

    /// Number of samples with `start_ms <= t < end_ms`.
    pub fn count_within_ms(&self, start_ms: f64, end_ms: f64) -> usize {
        self.samples
            .iter()
            .filter(|s| s.timestamp_ms() >= start_ms && s.timestamp_ms() < end_ms)
            .count()
    }
}

/// Empty fields and pandas' `nan` both mean "no value".
fn parse_field(field: &str) -> Option<f64> {
    if field.is_empty() {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Forward-only position in a [`GazeTimeline`].
///
/// `index` points at the next unconsumed sample and never decreases.
#[derive(Debug, Clone)]
pub struct GazeCursor<'a> {
    timeline: &'a GazeTimeline,
    index: usize,
}

impl<'a> GazeCursor<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.timeline.len()
    }

    pub fn remaining(&self) -> usize {
        self.timeline.len().saturating_sub(self.index)
    }

    /// The next unconsumed sample.
    pub fn peek(&self) -> Option<&'a GazeSample> {
        self.timeline.get(self.index)
    }

    /// The sample after the next unconsumed one.
    pub fn peek_second(&self) -> Option<&'a GazeSample> {
        self.timeline.get(self.index + 1)
    }

    /// Consumes the next sample, returning it with its index.
    pub fn advance(&mut self) -> Option<(usize, GazeSample)> {
        let sample = *self.timeline.get(self.index)?;
        let index = self.index;
        self.index += 1;
        Some((index, sample))
    }

    /// Consumes the next sample only if it is due strictly before `due_ms`.
    pub fn advance_if_before(&mut self, due_ms: f64) -> Option<(usize, GazeSample)> {
        match self.peek() {
            Some(s) if s.timestamp_ms() < due_ms => self.advance(),
            _ => None,
        }
    }
}
