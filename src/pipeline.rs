//! Single forward pass over the scene video.
//!
//! Overlay mode burns gaze into the scene frames. Tracking mode locates each
//! reference image in every frame and writes gaze in reference coordinates.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rerun::RecordingStream;

use crate::config::{AlignmentPolicy, PipelineConfig};
use crate::data_loader::FrameSource;
use crate::error::{GazeError, Result};
use crate::features::{FeatureExtractor, FeatureMatcher, Homography, HomographyEstimator};
use crate::gaze::GazeTimeline;
use crate::io::FrameSink;
use crate::projector::GazeProjector;
use crate::sync::TimeSynchronizer;
use crate::track::ReferenceTrack;
use crate::types::{GazeSample, SENTINEL};
use crate::visualization::{OverlayRenderer, log_projection, log_reference_tracks};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_read: usize,
    pub outputs: usize,
    pub samples_consumed: usize,
    pub samples_skipped: usize,
    pub markers_drawn: usize,
}

/// Per reference track result of a tracking run.
#[derive(Debug, Clone)]
pub struct TrackOutput {
    pub name: String,
    /// One row per gaze sample index.
    pub points: Vec<[i32; 2]>,
    /// Frames where a transform was found.
    pub located_frames: usize,
}

impl TrackOutput {
    pub fn valid_points(&self) -> usize {
        self.points.iter().filter(|p| **p != SENTINEL).count()
    }
}

/// Output frame rate.
///
/// Fixed expansion writes `k` outputs per source frame. Catch-up writes one
/// output per gaze sample, so it plays back at the gaze rate.
pub fn output_fps(config: &PipelineConfig, source_fps: f64, timeline: &GazeTimeline) -> f64 {
    match config.sync.policy {
        AlignmentPolicy::CatchUp => timeline.sample_rate_hz().unwrap_or(source_fps),
        AlignmentPolicy::FixedExpansion { k } => source_fps * k as f64,
    }
}

/// Frame directory and points file for a reference track.
pub fn match_output_paths(prefix: &Path, track_name: &str) -> (PathBuf, PathBuf) {
    let stem = format!(
        "{}_match_{}",
        prefix.file_name().and_then(|n| n.to_str()).unwrap_or("gaze"),
        track_name
    );
    let parent = prefix.parent().unwrap_or(Path::new(""));
    (parent.join(&stem), parent.join(format!("{}.json", stem)))
}

fn progress_bar(config: &PipelineConfig, len: usize) -> ProgressBar {
    if !config.show_progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:50} {pos}/{len} frames [{elapsed}]") {
        pb.set_style(style);
    }
    pb
}

fn gaze_frame_size(config: &PipelineConfig, source: &dyn FrameSource) -> (u32, u32) {
    config.gaze_frame_size.unwrap_or_else(|| source.frame_size())
}

/// Burns the time-aligned gaze marker into copies of the scene frames.
pub fn run_overlay<S: FrameSink>(
    source: &mut dyn FrameSource,
    timeline: &GazeTimeline,
    sink: &mut S,
    config: &PipelineConfig,
) -> Result<RunSummary> {
    config.validate()?;
    let gaze_w_h = gaze_frame_size(config, source);
    let renderer = OverlayRenderer::new(&config.marker);
    let mut sync = TimeSynchronizer::new(timeline, &config.sync, source.fps());
    let mut summary = RunSummary::default();
    let pb = progress_bar(config, source.frame_count());

    log::info!("adding gaze to {} frames", source.frame_count());
    while let Some(frame) = source.next_frame()? {
        for slot in sync.slots_for_frame(frame.index, frame.timestamp_ms) {
            let mut canvas = frame.pixels.clone();
            if let Some(gaze) = slot.gaze().filter(|g| g.is_valid()) {
                let (x, y) = gaze.denormalize(gaze_w_h);
                renderer.draw_marker(&mut canvas, (x as i32, y as i32));
                summary.markers_drawn += 1;
            }
            sink.write_frame(&canvas)?;
            summary.outputs += 1;
        }
        summary.frames_read += 1;
        pb.inc(1);
    }
    pb.finish_and_clear();
    sink.finish()?;

    let stats = sync.stats();
    summary.samples_consumed = stats.consumed;
    summary.samples_skipped = stats.skipped;
    log::info!("{:?}", summary);
    Ok(summary)
}

/// Projects gaze into every reference track.
///
/// `sinks[i]` receives the output frames of `tracks[i]`. Each track's
/// `trace` keeps the accumulated gaze history after the run.
pub fn run_tracking<S: FrameSink>(
    source: &mut dyn FrameSource,
    timeline: &GazeTimeline,
    tracks: &mut [ReferenceTrack],
    sinks: &mut [S],
    extractor: &dyn FeatureExtractor,
    config: &PipelineConfig,
    recording: Option<&RecordingStream>,
) -> Result<(RunSummary, Vec<TrackOutput>)> {
    config.validate()?;
    if tracks.len() != sinks.len() {
        return Err(GazeError::Config(format!(
            "{} reference tracks but {} sinks",
            tracks.len(),
            sinks.len()
        )));
    }
    let matcher = FeatureMatcher::new(&config.matcher);
    let estimator = HomographyEstimator::new(&config.ransac, config.matcher.min_correspondences);
    let projector = GazeProjector::new(gaze_frame_size(config, source));
    let renderer = OverlayRenderer::new(&config.marker);
    let mut sync = TimeSynchronizer::new(timeline, &config.sync, source.fps());
    let mut summary = RunSummary::default();
    let mut outputs: Vec<TrackOutput> = tracks
        .iter()
        .map(|t| TrackOutput {
            name: t.name.clone(),
            points: vec![SENTINEL; timeline.len()],
            located_frames: 0,
        })
        .collect();
    if let Some(recording) = recording {
        log_reference_tracks(recording, tracks)?;
    }
    let pb = progress_bar(config, source.frame_count());

    log::info!(
        "tracking gaze over {} reference image(s) in {} frames",
        tracks.len(),
        source.frame_count()
    );
    while let Some(frame) = source.next_frame()? {
        summary.frames_read += 1;
        pb.inc(1);
        let slots = sync.slots_for_frame(frame.index, frame.timestamp_ms);
        if slots.is_empty() {
            continue;
        }

        let needs_transform = slots.iter().any(|s| s.gaze().is_some_and(GazeSample::is_valid));
        let homographies: Vec<Option<Homography>> = if needs_transform {
            let gray = image::imageops::grayscale(&frame.pixels);
            let frame_features = extractor.detect_and_compute(&gray);
            log::trace!("frame {}: {} features", frame.index, frame_features.len());
            tracks
                .par_iter()
                .map(|t| t.locate(&frame_features, &matcher, &estimator))
                .collect()
        } else {
            vec![None; tracks.len()]
        };
        for (output, h) in outputs.iter_mut().zip(&homographies) {
            if h.is_some() {
                output.located_frames += 1;
            }
        }

        for slot in &slots {
            let tracked = tracks.iter_mut().zip(sinks.iter_mut()).zip(&homographies);
            for (track_idx, ((track, sink), h)) in tracked.enumerate() {
                let mut canvas = track.trace.clone();
                if let Some((sample_idx, sample)) = slot.sample {
                    let projected = projector.project(frame.index, &sample, h.as_ref(), track.size);
                    if let Some(coord) = projected.coord {
                        renderer.draw_marker(&mut canvas, coord);
                        renderer.draw_trace(&mut track.trace, coord);
                        summary.markers_drawn += 1;
                        if let Some(recording) = recording {
                            log_projection(recording, track_idx, &track.name, frame.index, coord)?;
                        }
                    }
                    outputs[track_idx].points[sample_idx] = projected.row();
                }
                sink.write_frame(&canvas)?;
            }
            summary.outputs += 1;
        }
    }
    pb.finish_and_clear();
    for sink in sinks.iter_mut() {
        sink.finish()?;
    }

    let stats = sync.stats();
    summary.samples_consumed = stats.consumed;
    summary.samples_skipped = stats.skipped;
    log::info!("{:?}", summary);
    for output in &outputs {
        log::info!(
            "`{}`: located in {} frames, {} valid gaze points",
            output.name,
            output.located_frames,
            output.valid_points()
        );
    }
    Ok((summary, outputs))
}
