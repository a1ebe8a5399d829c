#![deny(warnings)]

use anyhow::Context;
use clap::{ArgGroup, Parser};
use emotts_core::assemble::FfmpegConcatenator;
use emotts_core::config::{
    resolve_program, resolve_voice, AppConfig, ChunkThreshold, StdEnv, DEFAULT_CHUNK_THRESHOLD,
    DEFAULT_FFMPEG_PROGRAM, DEFAULT_SYNTH_PROGRAM, ENV_FFMPEG_PROGRAM, ENV_SYNTH_PROGRAM,
};
use emotts_core::pipeline::{default_task_id, GenerationRequest, Pipeline, PipelineConfig};
use emotts_core::progress::ProgressTracker;
use emotts_core::tts::EdgeTtsClient;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emotts")]
#[command(about = "Emotion-annotated text to speech ([happy] Hi [sad] Bye -> one audio file)")]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .multiple(false)
        .args(["text", "text_file", "preview"])
))]
struct Args {
    /// Text with inline emotion markers.
    #[arg(long)]
    text: Option<String>,

    /// Read the marked-up text from a file.
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Generate a short voice preview instead of a full synthesis.
    #[arg(long, default_value_t = false)]
    preview: bool,

    #[arg(long)]
    voice: Option<String>,

    #[arg(short, long, default_value = "speech.mp3")]
    output: PathBuf,

    #[arg(long)]
    task_id: Option<String>,

    /// Path to the synthesis helper binary.
    #[arg(long)]
    synth_bin: Option<PathBuf>,

    /// Path to the ffmpeg binary used for concatenation.
    #[arg(long)]
    ffmpeg_bin: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_CHUNK_THRESHOLD)]
    chunk_threshold: usize,

    /// Print the result summary as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;

    tracing::info!(
        voice = %cfg.voice.as_str(),
        synth = %cfg.synth_program.display(),
        ffmpeg = %cfg.ffmpeg_program.display(),
        "config loaded"
    );

    let pipeline = Pipeline {
        synthesizer: EdgeTtsClient::new(cfg.synth_program.clone()),
        concatenator: FfmpegConcatenator::new(cfg.ffmpeg_program.clone()),
        progress: ProgressTracker::new(),
        config: PipelineConfig::from_app(&cfg),
    };

    if args.preview {
        let handle = pipeline.preview(&cfg.voice, &args.output).await?;
        tracing::info!(output = %handle.path().display(), "preview written");
        if args.json {
            println!(
                "{}",
                serde_json::json!({ "output": handle.path(), "preview": true })
            );
        }
        return Ok(());
    }

    let text = match (&args.text, &args.text_file) {
        (Some(text), None) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        _ => anyhow::bail!("exactly one of --text or --text-file must be provided"),
    };

    let task_id = effective_task_id(args.task_id.clone());
    let request = GenerationRequest {
        text,
        voice: cfg.voice.clone(),
        task_id: Some(task_id.clone()),
    };

    let poller = spawn_progress_poller(pipeline.progress.clone(), task_id);
    let generation = pipeline.generate(request, &args.output).await;
    poller.abort();

    let generation = generation?;
    if generation.degraded {
        tracing::warn!("transcoder failed; output contains only the first segment's audio");
    }
    tracing::info!(
        task_id = %generation.task_id,
        segments = generation.segments,
        output = %generation.artifact.path().display(),
        "speech written"
    );

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "task_id": generation.task_id,
                "output": generation.artifact.path(),
                "segments": generation.segments,
                "degraded": generation.degraded,
            })
        );
    }

    Ok(())
}

/// Resolves the id the generation runs under. Minted here rather than
/// inside the pipeline so the progress poller watches the same entry.
fn effective_task_id(cli_value: Option<String>) -> String {
    cli_value.unwrap_or_else(default_task_id)
}

fn spawn_progress_poller(
    progress: ProgressTracker,
    task_id: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let snapshot = progress.snapshot(&task_id).await;
            tracing::info!(
                completed = snapshot.completed,
                total = snapshot.total,
                "synthesis progress"
            );
        }
    })
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: &Args, env: &impl emotts_core::config::Env) -> anyhow::Result<AppConfig> {
    let voice = resolve_voice(args.voice.clone(), env)?;
    let chunk_threshold = ChunkThreshold::new(args.chunk_threshold)?;

    Ok(AppConfig {
        voice,
        synth_program: resolve_program(
            args.synth_bin.clone(),
            ENV_SYNTH_PROGRAM,
            env,
            DEFAULT_SYNTH_PROGRAM,
        ),
        ffmpeg_program: resolve_program(
            args.ffmpeg_bin.clone(),
            ENV_FFMPEG_PROGRAM,
            env,
            DEFAULT_FFMPEG_PROGRAM,
        ),
        chunk_threshold,
    })
}
