//! Bounce command line.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bounce_cli::{Pipeline, PipelineConfig, RunRequest};
use bounce_models::{
    parse_timestamp, AlignConfig, CutPlan, DEFAULT_BEATS_PER_MEASURE, DEFAULT_SCENE_THRESHOLD,
};

/// Beat-synchronized music video creator
#[derive(Parser)]
#[command(name = "bounce")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cut a video so its scene changes land on the downbeats of a song")]
#[command(long_about = r#"
Bounce detects beats in a song and scene changes in a video, snaps every
scene cut to the nearest measure and renders the result with the song as
its soundtrack.

Examples:
  bounce run song.mp3 video.mp4
  bounce run song.mp3 video.mp4 -o result.mp4 --max-scene-measures 16
  bounce measures beats.txt -o measures.txt
  bounce plan video.mp4 measures.txt -o scene_plan.txt
  bounce assemble video.mp4 scene_plan.txt song.mp3 -o result.mp4
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Alignment flags shared by `run` and `plan`.
#[derive(Args, Debug, Clone)]
struct AlignArgs {
    /// Scene detection sensitivity in (0, 1]; lower finds more scenes
    #[arg(long, env = "BOUNCE_SCENE_THRESHOLD", default_value_t = DEFAULT_SCENE_THRESHOLD)]
    scene_threshold: f64,

    /// Split scenes longer than this many measures
    #[arg(long, env = "BOUNCE_MAX_SCENE_MEASURES")]
    max_scene_measures: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage: beats, measures, scenes, alignment and assembly
    Run {
        /// Music track
        audio: PathBuf,

        /// Source footage
        video: PathBuf,

        /// Output video
        #[arg(short, long, default_value = "output.mp4")]
        output: PathBuf,

        /// Beats per measure (4 for 4/4 time)
        #[arg(long, env = "BOUNCE_BEATS_PER_MEASURE", default_value_t = DEFAULT_BEATS_PER_MEASURE)]
        beats_per_measure: u32,

        #[command(flatten)]
        align: AlignArgs,

        /// Use a precomputed beat list instead of running the beat tracker
        #[arg(long)]
        beats: Option<PathBuf>,

        /// Keep intermediate files
        #[arg(long)]
        keep_workspace: bool,
    },

    /// Filter a beat list down to measures
    Measures {
        /// Beat list (`index, seconds` lines)
        beats: PathBuf,

        /// Output measure list
        #[arg(short, long, default_value = "measures.txt")]
        output: PathBuf,

        /// Beats per measure (4 for 4/4 time)
        #[arg(long, env = "BOUNCE_BEATS_PER_MEASURE", default_value_t = DEFAULT_BEATS_PER_MEASURE)]
        beats_per_measure: u32,
    },

    /// Detect scenes and align them to a measure list
    Plan {
        /// Source footage
        video: PathBuf,

        /// Measure list
        measures: PathBuf,

        /// Output cut plan
        #[arg(short, long, default_value = "scene_plan.txt")]
        output: PathBuf,

        #[command(flatten)]
        align: AlignArgs,

        /// Cap the plan at this length (usually the song length): SS, MM:SS or HH:MM:SS
        #[arg(long, value_parser = parse_duration)]
        audio_duration: Option<f64>,
    },

    /// Render a cut plan with an audio track
    Assemble {
        /// Source footage the plan was made from
        video: PathBuf,

        /// Cut plan
        plan: PathBuf,

        /// Music track
        audio: PathBuf,

        /// Output video
        #[arg(short, long, default_value = "output.mp4")]
        output: PathBuf,
    },

    /// Print the JSON schema of the cut plan and alignment settings
    Schema,
}

fn align_config(beats_per_measure: u32, args: &AlignArgs) -> AlignConfig {
    AlignConfig::default()
        .with_beats_per_measure(beats_per_measure)
        .with_max_scene_measures(args.max_scene_measures)
        .with_scene_threshold(args.scene_threshold)
}

fn parse_duration(value: &str) -> Result<f64, String> {
    match parse_timestamp(value) {
        Ok(secs) if secs > 0.0 => Ok(secs),
        Ok(_) => Err("duration must be positive".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn print_schema() -> Result<()> {
    let schema = serde_json::json!({
        "cut_plan": schemars::schema_for!(CutPlan),
        "align_config": schemars::schema_for!(AlignConfig),
    });
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn init_tracing(use_json: bool) -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("bounce=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = PipelineConfig::from_env();
    init_tracing(config.log_json)?;

    let cli = Cli::parse();
    info!("Pipeline config: {:?}", config);
    let pipeline = Pipeline::new(config);

    let result = match cli.command {
        Commands::Run {
            audio,
            video,
            output,
            beats_per_measure,
            align,
            beats,
            keep_workspace,
        } => {
            let request = RunRequest {
                audio,
                video,
                output,
                align: align_config(beats_per_measure, &align),
                beats_file: beats,
                keep_workspace,
            };
            pipeline.run(&request).await.map(|summary| {
                info!(
                    output = %summary.output.display(),
                    segments = summary.segments,
                    warnings = summary.warnings,
                    time_scale = summary.time_scale,
                    "Video ready"
                );
            })
        }
        Commands::Measures {
            beats,
            output,
            beats_per_measure,
        } => pipeline
            .measures(&beats, &output, beats_per_measure)
            .await
            .map(|_| ()),
        Commands::Plan {
            video,
            measures,
            output,
            align,
            audio_duration,
        } => {
            let config = align_config(DEFAULT_BEATS_PER_MEASURE, &align);
            pipeline
                .plan(&video, &measures, &output, &config, audio_duration)
                .await
                .map(|_| ())
        }
        Commands::Assemble {
            video,
            plan,
            audio,
            output,
        } => pipeline
            .assemble(&video, &plan, &audio, &output)
            .await
            .map(|path| info!(output = %path.display(), "Video ready")),
        Commands::Schema => print_schema(),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
