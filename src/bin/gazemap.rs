use clap::{Parser, Subcommand};
use gaze_mapping::config::PipelineConfig;
use gaze_mapping::data_loader::{FrameSource, ImageSequenceSource};
use gaze_mapping::features::BriefExtractor;
use gaze_mapping::gaze::GazeTimeline;
use gaze_mapping::io::{ImageSequenceSink, config_from_json, object_to_json, write_points};
use gaze_mapping::pipeline::{match_output_paths, output_fps, run_overlay, run_tracking};
use gaze_mapping::track::ReferenceTrack;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct GazemapCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct InputArgs {
    /// folder of decoded scene video frames (.png/.jpg)
    frames: PathBuf,

    /// gaze table csv with vts_time, gaze_pos_val, gaze_pos_x, gaze_pos_y
    gaze: PathBuf,

    /// nominal frame rate of the scene video
    #[arg(long, default_value = "25.0")]
    fps: f64,

    /// frame file stems are nanosecond timestamps
    #[arg(long)]
    timestamped: bool,

    /// pipeline configuration json
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Burn the gaze marker into the scene video
    Overlay {
        #[command(flatten)]
        input: InputArgs,

        /// output frame folder
        output: PathBuf,
    },
    /// Track reference images and map gaze into their coordinates
    Track {
        #[command(flatten)]
        input: InputArgs,

        /// reference image(s) to find in the video
        #[arg(short, long, num_args = 1.., required = true)]
        matches: Vec<PathBuf>,

        /// prefix for `<prefix>_match_<name>` outputs
        #[arg(short, long, default_value = "gaze")]
        out_prefix: PathBuf,

        /// save a rerun recording of the projected gaze
        #[arg(long)]
        rerun: Option<PathBuf>,
    },
    /// Write the default configuration
    DefaultConfig { path: PathBuf },
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(p) => config_from_json(p)?,
        None => PipelineConfig::default(),
    })
}

fn open_inputs(
    input: &InputArgs,
) -> Result<(PipelineConfig, ImageSequenceSource, GazeTimeline), Box<dyn std::error::Error>> {
    let config = load_config(input.config.as_deref())?;
    let source = if input.timestamped {
        ImageSequenceSource::open_timestamped(&input.frames, input.fps)?
    } else {
        ImageSequenceSource::open(&input.frames, input.fps)?
    };
    let timeline = GazeTimeline::from_csv(&input.gaze, config.vts_ticks_per_second)?;
    Ok((config, source, timeline))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = GazemapCli::parse();
    let now = Instant::now();

    match cli.command {
        Commands::Overlay { input, output } => {
            let (config, mut source, timeline) = open_inputs(&input)?;
            let mut sink = ImageSequenceSink::create(&output, output_fps(&config, source.fps(), &timeline))?;
            run_overlay(&mut source, &timeline, &mut sink, &config)?;
            log::info!("wrote frames to {}", sink.folder().display());
        }
        Commands::Track {
            input,
            matches,
            out_prefix,
            rerun,
        } => {
            let (config, mut source, timeline) = open_inputs(&input)?;
            let extractor = BriefExtractor::new(&config.extractor);
            let mut tracks = matches
                .iter()
                .map(|p| ReferenceTrack::load(p, &extractor))
                .collect::<Result<Vec<_>, _>>()?;
            let fps = output_fps(&config, source.fps(), &timeline);
            let mut sinks = tracks
                .iter()
                .map(|t| ImageSequenceSink::create(match_output_paths(&out_prefix, &t.name).0, fps))
                .collect::<Result<Vec<_>, _>>()?;
            let recording = match rerun {
                Some(path) => Some(rerun::RecordingStreamBuilder::new("gazemap").save(path)?),
                None => None,
            };
            let (_, outputs) = run_tracking(
                &mut source,
                &timeline,
                &mut tracks,
                &mut sinks,
                &extractor,
                &config,
                recording.as_ref(),
            )?;
            for output in &outputs {
                let (_, points_path) = match_output_paths(&out_prefix, &output.name);
                write_points(&points_path, &output.points)?;
                log::info!("wrote {}", points_path.display());
            }
        }
        Commands::DefaultConfig { path } => {
            object_to_json(&path, &PipelineConfig::default())?;
        }
    }
    println!("took {:.3} sec", now.elapsed().as_secs_f64());
    Ok(())
}
