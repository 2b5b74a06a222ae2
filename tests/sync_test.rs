mod common;

use common::{gaze_at, range_ms};
use gaze_mapping::config::{AlignmentPolicy, DueTime, SyncConfig};
use gaze_mapping::gaze::GazeTimeline;
use gaze_mapping::sync::{SyncSlot, TimeSynchronizer};

fn sync_config(policy: AlignmentPolicy, due_time: DueTime) -> SyncConfig {
    SyncConfig { policy, due_time }
}

fn run(timeline: &GazeTimeline, config: &SyncConfig, frames_ms: &[f64], fps: f64) -> Vec<Vec<SyncSlot>> {
    let mut sync = TimeSynchronizer::new(timeline, config, fps);
    frames_ms
        .iter()
        .enumerate()
        .map(|(i, &t)| sync.slots_for_frame(i, t))
        .collect()
}

#[test]
fn test_fixed_expansion_scenario_frame_end() {
    let frames = range_ms(0.0, 100.0, 10);
    let timeline = GazeTimeline::new(gaze_at(&range_ms(0.0, 50.0, 20), (0.5, 0.5))).unwrap();
    let config = sync_config(AlignmentPolicy::FixedExpansion { k: 2 }, DueTime::FrameEnd);

    let slots: Vec<_> = run(&timeline, &config, &frames, 10.0).into_iter().flatten().collect();
    assert_eq!(slots.len(), 20);
    assert!(slots.iter().all(|s| s.sample.is_some()));
    let indices: Vec<_> = slots.iter().filter_map(|s| s.sample_index()).collect();
    assert_eq!(indices, (0..20).collect::<Vec<_>>());
}

#[test]
fn test_fixed_expansion_scenario_frame_start() {
    let frames = range_ms(0.0, 100.0, 10);
    let timeline = GazeTimeline::new(gaze_at(&range_ms(0.0, 50.0, 20), (0.5, 0.5))).unwrap();
    let config = sync_config(AlignmentPolicy::FixedExpansion { k: 2 }, DueTime::FrameStart);

    let per_frame = run(&timeline, &config, &frames, 10.0);
    assert_eq!(per_frame.iter().map(Vec::len).sum::<usize>(), 20);
    // nothing is due before the first frame starts
    assert!(per_frame[0].iter().all(|s| s.sample.is_none()));
    assert!(per_frame[1..].iter().flatten().all(|s| s.sample.is_some()));
    assert_eq!(per_frame[1][0].sample_index(), Some(0));
    assert_eq!(per_frame[9][1].sample_index(), Some(17));
}

#[test]
fn test_fixed_expansion_output_count_for_any_k() {
    let frames = range_ms(0.0, 40.0, 25);
    let timeline = GazeTimeline::new(gaze_at(&range_ms(3.0, 13.0, 77), (0.2, 0.8))).unwrap();
    for k in 1..=4 {
        let config = sync_config(AlignmentPolicy::FixedExpansion { k }, DueTime::FrameStart);
        let per_frame = run(&timeline, &config, &frames, 25.0);
        assert!(per_frame.iter().all(|slots| slots.len() == k));
        assert_eq!(per_frame.iter().map(Vec::len).sum::<usize>(), frames.len() * k);
    }
}

#[test]
fn test_catch_up_counts_samples_inside_video_range() {
    let frames = range_ms(0.0, 100.0, 10);
    let timeline = GazeTimeline::new(gaze_at(&range_ms(0.0, 37.0, 40), (0.5, 0.5))).unwrap();
    let config = sync_config(AlignmentPolicy::CatchUp, DueTime::FrameStart);

    let per_frame = run(&timeline, &config, &frames, 10.0);
    let emitted: usize = per_frame.iter().map(Vec::len).sum();
    assert_eq!(emitted, timeline.count_within_ms(0.0, 900.0));
    assert_eq!(emitted, 25);
    // frames with nothing due produce no output
    assert!(per_frame[0].is_empty());
    assert_eq!(per_frame[1].len(), 3);
}

#[test]
fn test_cursor_never_rewinds() {
    let frames = range_ms(0.0, 33.3, 60);
    let timeline = GazeTimeline::new(gaze_at(&range_ms(1.0, 20.0, 120), (0.5, 0.5))).unwrap();
    for policy in [
        AlignmentPolicy::CatchUp,
        AlignmentPolicy::FixedExpansion { k: 1 },
        AlignmentPolicy::FixedExpansion { k: 2 },
        AlignmentPolicy::FixedExpansion { k: 3 },
    ] {
        let config = sync_config(policy, DueTime::FrameStart);
        let mut sync = TimeSynchronizer::new(&timeline, &config, 30.0);
        let mut last_cursor = 0;
        let mut last_sample: Option<usize> = None;
        for (i, &t) in frames.iter().enumerate() {
            for slot in sync.slots_for_frame(i, t) {
                if let Some(idx) = slot.sample_index() {
                    assert!(last_sample.is_none_or(|last| idx > last), "{:?} reused a sample", policy);
                    last_sample = Some(idx);
                }
            }
            assert!(sync.cursor_index() >= last_cursor);
            last_cursor = sync.cursor_index();
        }
    }
}

#[test]
fn test_forward_catch_up_bounds_lag() {
    // gaze at three times the video rate but only one slot per frame
    let frames = range_ms(0.0, 90.0, 6);
    let timeline = GazeTimeline::new(gaze_at(&range_ms(5.0, 30.0, 30), (0.5, 0.5))).unwrap();
    let config = sync_config(AlignmentPolicy::FixedExpansion { k: 1 }, DueTime::FrameStart);
    let mut sync = TimeSynchronizer::new(&timeline, &config, 1000.0 / 90.0);

    let mut consumed = Vec::new();
    for (i, &t) in frames.iter().enumerate() {
        let slots = sync.slots_for_frame(i, t);
        consumed.push(slots[0].sample_index());
        // at most one overdue sample is left pending
        let after_next = timeline.get(sync.cursor_index() + 1);
        assert!(after_next.is_none_or(|s| s.timestamp_ms() >= t));
    }
    assert_eq!(consumed, vec![None, Some(0), Some(2), Some(5), Some(8), Some(11)]);
    let stats = sync.stats();
    assert_eq!(stats.consumed, 5);
    assert_eq!(stats.skipped, 9);
    assert_eq!(stats.consumed + stats.skipped, sync.cursor_index());
}

#[test]
fn test_gaze_exhausted_before_video() {
    let frames = range_ms(0.0, 100.0, 10);
    let timeline = GazeTimeline::new(gaze_at(&range_ms(10.0, 50.0, 6), (0.5, 0.5))).unwrap();

    let fixed = sync_config(AlignmentPolicy::FixedExpansion { k: 2 }, DueTime::FrameStart);
    let per_frame = run(&timeline, &fixed, &frames, 10.0);
    assert_eq!(per_frame.iter().map(Vec::len).sum::<usize>(), 20);
    assert!(per_frame[5..].iter().flatten().all(|s| s.sample.is_none()));
    let used = per_frame.iter().flatten().filter(|s| s.sample.is_some()).count();
    assert_eq!(used, 6);

    let catch_up = sync_config(AlignmentPolicy::CatchUp, DueTime::FrameStart);
    let per_frame = run(&timeline, &catch_up, &frames, 10.0);
    assert_eq!(per_frame.iter().map(Vec::len).sum::<usize>(), 6);
    assert!(per_frame[4..].iter().all(Vec::is_empty));
}

#[test]
fn test_empty_timeline() {
    let frames = range_ms(0.0, 100.0, 4);
    let timeline = GazeTimeline::default();
    let fixed = sync_config(AlignmentPolicy::FixedExpansion { k: 3 }, DueTime::FrameEnd);
    let per_frame = run(&timeline, &fixed, &frames, 10.0);
    assert_eq!(per_frame.iter().flatten().count(), 12);
    assert!(per_frame.iter().flatten().all(|s| s.sample.is_none()));
}

#[test]
fn test_uneven_rate_ratio() {
    // 2.5 gaze samples per frame, two slots per frame
    let frames = range_ms(0.0, 100.0, 20);
    let timeline = GazeTimeline::new(gaze_at(&range_ms(7.0, 40.0, 50), (0.5, 0.5))).unwrap();
    let config = sync_config(AlignmentPolicy::FixedExpansion { k: 2 }, DueTime::FrameStart);
    let mut sync = TimeSynchronizer::new(&timeline, &config, 10.0);

    for (i, &t) in frames.iter().enumerate() {
        let slots = sync.slots_for_frame(i, t);
        assert_eq!(slots.len(), 2);
        for s in slots.iter().filter_map(SyncSlot::gaze) {
            // every consumed sample is due, and never more than two frames late
            assert!(s.timestamp_ms() < t);
            assert!(s.timestamp_ms() >= t - 200.0);
        }
    }
    let stats = sync.stats();
    assert_eq!(stats.consumed + stats.skipped, sync.cursor_index());
}

#[test]
fn test_catch_up_drops_gaze_recorded_before_video() {
    // gaze starts 100 ms before the first frame
    let frames = range_ms(100.0, 100.0, 10);
    let timeline = GazeTimeline::new(gaze_at(&range_ms(0.0, 50.0, 20), (0.5, 0.5))).unwrap();
    let config = sync_config(AlignmentPolicy::CatchUp, DueTime::FrameStart);
    let mut sync = TimeSynchronizer::new(&timeline, &config, 10.0);

    let per_frame: Vec<_> = frames
        .iter()
        .enumerate()
        .map(|(i, &t)| sync.slots_for_frame(i, t))
        .collect();
    let emitted: usize = per_frame.iter().map(Vec::len).sum();
    assert_eq!(emitted, timeline.count_within_ms(100.0, 1000.0));
    assert_eq!(emitted, 18);
    assert!(per_frame[0].is_empty());
    assert_eq!(per_frame[1][0].sample_index(), Some(2));

    let stats = sync.stats();
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.consumed, 18);
    assert_eq!(stats.consumed + stats.skipped, sync.cursor_index());
}
